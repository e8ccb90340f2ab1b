//! Pure placement math for card composition.
//!
//! All functions here are pure and testable without fonts, images, or I/O.
//! Pixel origin is top-left; regions may extend past the canvas (drawing
//! clips), and vertical positions are signed because bottom-anchored stacks
//! can push blocks above y=0 when the text is taller than the canvas.

/// Fraction of the canvas height covered by the title band.
const TITLE_BAND_BOTTOM: f64 = 0.40;
/// Vertical extent of the subtitle band as canvas-height fractions.
const SUBTITLE_BAND_TOP: f64 = 0.38;
const SUBTITLE_BAND_BOTTOM: f64 = 0.75;

/// A pixel rectangle on (or partially off) the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a region from corner coordinates, clamping inverted corners
    /// to zero extent.
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            x: x0,
            y: y0,
            width: (x1 - x0).max(0) as u32,
            height: (y1 - y0).max(0) as u32,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

/// The full-width band holding the title block: y = 0 to 40% of height.
pub fn title_region(canvas_width: u32, canvas_height: u32) -> Region {
    Region::new(
        0,
        0,
        canvas_width,
        (canvas_height as f64 * TITLE_BAND_BOTTOM) as u32,
    )
}

/// The full-width band holding the subtitle block: 38% to 75% of height.
///
/// Overlaps the title band; blocks center within their band, so the
/// overlap only matters for unusually tall titles.
pub fn subtitle_region(canvas_width: u32, canvas_height: u32) -> Region {
    let top = (canvas_height as f64 * SUBTITLE_BAND_TOP) as u32;
    let bottom = (canvas_height as f64 * SUBTITLE_BAND_BOTTOM) as u32;
    Region::new(0, top as i32, canvas_width, bottom.saturating_sub(top))
}

/// Vertical start of a text block centered inside a region.
///
/// Blocks taller than the region clamp to the region top rather than
/// centering into negative space.
pub fn block_start_y(region: &Region, total_text_height: u32) -> i32 {
    let slack = (region.height as i64 - total_text_height as i64).max(0) / 2;
    region.y + slack as i32
}

/// Horizontal start of a line centered inside a region.
///
/// Not clamped: wrap guarantees lines fit the wrap width, which callers
/// derive from the region, so a negative result only occurs for text that
/// deliberately bypassed wrapping.
pub fn centered_x(region: &Region, line_width: f32) -> i32 {
    region.x + ((region.width as f32 - line_width) / 2.0) as i32
}

/// Total height of a stack of lines with fixed spacing between them.
pub fn lines_height(heights: &[u32], spacing: u32) -> u32 {
    if heights.is_empty() {
        return 0;
    }
    heights.iter().sum::<u32>() + spacing * (heights.len() as u32 - 1)
}

/// Centered square crop of a `width` x `height` image.
pub fn square_crop(width: u32, height: u32) -> Region {
    let side = width.min(height);
    Region::new(
        ((width - side) / 2) as i32,
        ((height - side) / 2) as i32,
        side,
        side,
    )
}

/// Reduce a size to its simplest ratio label, e.g. 1080x1350 → "4:5".
pub fn aspect_ratio_label(width: u32, height: u32) -> String {
    let divisor = gcd(width, height).max(1);
    format!("{}:{}", width / divisor, height / divisor)
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// A length proportional to the canvas side with a lower bound, e.g.
/// `proportional(512, 12, 24)` = max(24, 512/12) = 42.
pub fn proportional(base: u32, divisor: u32, floor: u32) -> u32 {
    (base / divisor).max(floor)
}

/// Margins, gaps, and font sizes for the brand card layout, all derived
/// from the square side length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrandMetrics {
    /// Outer margin on all four sides.
    pub margin: u32,
    /// Gap between the subtitle block and the footer line.
    pub gap_footer: u32,
    /// Gap between the title block and the subtitle block.
    pub gap_title_subtitle: u32,
    /// Line spacing inside the title block.
    pub title_spacing: u32,
    /// Line spacing inside the subtitle block.
    pub subtitle_spacing: u32,
    pub brand_font_size: u32,
    pub title_font_size: u32,
    pub subtitle_font_size: u32,
    pub footer_font_size: u32,
}

impl BrandMetrics {
    pub fn for_size(size: u32) -> Self {
        Self {
            margin: proportional(size, 12, 24),
            gap_footer: proportional(size, 18, 16),
            gap_title_subtitle: proportional(size, 26, 14),
            title_spacing: proportional(size, 36, 10),
            subtitle_spacing: proportional(size, 40, 8),
            brand_font_size: proportional(size, 24, 18),
            title_font_size: proportional(size, 9, 36),
            subtitle_font_size: proportional(size, 16, 20),
            footer_font_size: proportional(size, 20, 18),
        }
    }

    /// Wrap width for the left-aligned title/subtitle blocks.
    pub fn max_text_width(&self, size: u32) -> f32 {
        size as f32 - (self.margin * 2) as f32
    }
}

/// Top coordinates of the bottom-anchored brand card blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrandStack {
    pub title_top: i32,
    pub subtitle_top: i32,
    pub footer_top: i32,
}

/// Stack the title, subtitle, and footer blocks upward from the bottom
/// margin.
///
/// The footer anchors at `canvas_height - margin`. The subtitle sits above
/// it separated by `gap_footer` (or takes the footer's anchor when there is
/// no footer), and the title sits above the subtitle separated by
/// `gap_title_subtitle` (or takes the subtitle's anchor when there is no
/// subtitle). Tops go negative when the stack is taller than the canvas.
pub fn brand_stack(
    canvas_height: u32,
    margin: u32,
    title_height: u32,
    subtitle_height: u32,
    has_subtitle: bool,
    footer_height: u32,
    gap_footer: u32,
    gap_title_subtitle: u32,
) -> BrandStack {
    let footer_bottom = canvas_height as i32 - margin as i32;
    let footer_top = if footer_height > 0 {
        footer_bottom - footer_height as i32
    } else {
        footer_bottom
    };
    let subtitle_bottom = if footer_height > 0 {
        footer_top - gap_footer as i32
    } else {
        footer_bottom
    };
    let subtitle_top = subtitle_bottom - subtitle_height as i32;
    let title_bottom = if has_subtitle {
        subtitle_top - gap_title_subtitle as i32
    } else {
        subtitle_bottom
    };
    let title_top = title_bottom - title_height as i32;

    BrandStack {
        title_top,
        subtitle_top,
        footer_top,
    }
}
