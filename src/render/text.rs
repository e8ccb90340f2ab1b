//! Text measurement, wrapping, and glyph drawing.
//!
//! Fonts are TrueType/OpenType files rasterized through `rusttype`. Layout
//! logic (wrapping, truncation, block sizing) is written against the
//! [`TextMeasure`] trait rather than a concrete font, so it can be unit
//! tested with a fixed-advance mock and no font files on disk.
//!
//! Vertical conventions: callers position blocks by their *top* edge, and
//! drawing converts to the font baseline via the ascent. Block stacking
//! uses ink heights (topmost to bottommost painted row), matching how the
//! stock card layouts were tuned.

use super::params::FontSpec;
use image::{Rgb, Rgba, RgbaImage};
use rusttype::{Font, GlyphId, Scale, point};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use walkdir::WalkDir;

/// Font filenames probed when a spec has no path or its path is unusable,
/// in priority order.
const FALLBACK_FONTS: [&str; 7] = [
    "Pretendard-Bold.otf",
    "Pretendard-SemiBold.otf",
    "Pretendard-Regular.otf",
    "Pretendard.ttf",
    "Pretendard.otf",
    "Arial.ttf",
    "arial.ttf",
];

/// Offset of the shadow pass relative to the fill pass, in pixels.
const SHADOW_OFFSET: i32 = 2;
/// Alpha of the shadow fill.
const SHADOW_ALPHA: u8 = 180;
/// How far each RGB channel is lowered to derive the shadow color.
const SHADOW_DROP: u8 = 120;

#[derive(Error, Debug)]
pub enum TextError {
    #[error(
        "no usable font found; set fonts.<slot>.path in the config or place a .ttf/.otf in the fonts directory"
    )]
    NoUsableFont,
}

/// Measurement interface for layout logic.
pub trait TextMeasure {
    /// Advance width of the text in pixels, including kerning.
    fn width(&self, text: &str) -> f32;
    /// Ink height in pixels: topmost to bottommost painted row. Zero for
    /// text with no visible glyphs.
    fn height(&self, text: &str) -> u32;
}

/// A parsed font bound to a pixel size.
pub struct ScaledFont {
    font: Arc<Font<'static>>,
    scale: Scale,
}

impl ScaledFont {
    pub fn new(font: Arc<Font<'static>>, size: u32) -> Self {
        Self {
            font,
            scale: Scale::uniform(size as f32),
        }
    }

    fn ascent(&self) -> f32 {
        self.font.v_metrics(self.scale).ascent
    }
}

impl TextMeasure for ScaledFont {
    fn width(&self, text: &str) -> f32 {
        let mut width = 0.0;
        let mut last: Option<GlyphId> = None;
        for ch in text.chars() {
            let glyph = self.font.glyph(ch);
            if let Some(prev) = last {
                width += self.font.pair_kerning(self.scale, prev, glyph.id());
            }
            last = Some(glyph.id());
            width += glyph.scaled(self.scale).h_metrics().advance_width;
        }
        width
    }

    fn height(&self, text: &str) -> u32 {
        let mut min_y = i32::MAX;
        let mut max_y = i32::MIN;
        for glyph in self.font.layout(text, self.scale, point(0.0, self.ascent())) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                min_y = min_y.min(bb.min.y);
                max_y = max_y.max(bb.max.y);
            }
        }
        if max_y < min_y {
            0
        } else {
            (max_y - min_y) as u32
        }
    }
}

/// Loads and caches fonts for the lifetime of a command.
///
/// Resolution order for a [`FontSpec`]:
/// 1. The spec's own path, when set and parsable.
/// 2. The [`FALLBACK_FONTS`] names under the fonts directory, then the
///    working directory.
/// 3. Any `.ttf`/`.otf` found walking the fonts directory.
///
/// Fonts are only requested when a non-empty text block is about to be
/// drawn, so text-free renders never fail on missing fonts.
pub struct FontStore {
    fonts_dir: Option<PathBuf>,
    cache: Mutex<HashMap<PathBuf, Arc<Font<'static>>>>,
}

impl FontStore {
    pub fn new(fonts_dir: Option<PathBuf>) -> Self {
        Self {
            fonts_dir,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a spec to a parsed font, falling back as described above.
    pub fn load(&self, spec: &FontSpec) -> Result<Arc<Font<'static>>, TextError> {
        if let Some(path) = &spec.path {
            if let Some(font) = self.cached_or_read(path) {
                return Ok(font);
            }
            log::warn!(
                "font {} is missing or unreadable, trying fallbacks",
                path.display()
            );
        }

        for candidate in FALLBACK_FONTS {
            for root in [self.fonts_dir.as_deref(), Some(Path::new("."))]
                .into_iter()
                .flatten()
            {
                if let Some(font) = self.cached_or_read(&root.join(candidate)) {
                    return Ok(font);
                }
            }
        }

        if let Some(dir) = &self.fonts_dir {
            for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
                if is_font_file(entry.path()) {
                    if let Some(font) = self.cached_or_read(entry.path()) {
                        return Ok(font);
                    }
                }
            }
        }

        Err(TextError::NoUsableFont)
    }

    /// Load a font bound to the spec's pixel size.
    pub fn scaled(&self, spec: &FontSpec) -> Result<ScaledFont, TextError> {
        Ok(ScaledFont::new(self.load(spec)?, spec.size))
    }

    fn cached_or_read(&self, path: &Path) -> Option<Arc<Font<'static>>> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(font) = cache.get(path) {
            return Some(font.clone());
        }
        let bytes = fs::read(path).ok()?;
        let font = Arc::new(Font::try_from_vec(bytes)?);
        cache.insert(path.to_path_buf(), font.clone());
        Some(font)
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ext == "ttf" || ext == "otf"
        })
        .unwrap_or(false)
}

/// Wrap text to a pixel width.
///
/// Splits on spaces when the text contains any (word mode); otherwise
/// per character, which handles CJK text without word separators. A token
/// that alone exceeds `max_width` is truncated to its widest fitting
/// prefix and the remainder dropped. Provided a single character fits,
/// no returned line measures wider than `max_width`.
pub fn wrap_text<M: TextMeasure>(measure: &M, text: &str, max_width: f32) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let has_spaces = text.contains(' ');
    let tokens: Vec<String> = if has_spaces {
        text.split(' ').map(str::to_string).collect()
    } else {
        text.chars().map(String::from).collect()
    };

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for token in tokens {
        let candidate = if has_spaces && !current.is_empty() {
            format!("{current} {token}")
        } else {
            format!("{current}{token}")
        };

        if !current.is_empty() && measure.width(&candidate) > max_width {
            lines.push(std::mem::take(&mut current));
            if measure.width(&token) > max_width {
                lines.push(truncate_to_width(measure, &token, max_width));
            } else {
                current = token;
            }
        } else if measure.width(&candidate) > max_width {
            // The token alone overflows an empty line; truncate instead of
            // emitting an overwide line.
            lines.push(truncate_to_width(measure, &token, max_width));
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// The widest prefix of `token` that fits in `max_width`, dropping the
/// rest. Falls back to the first character when even that is too wide.
pub fn truncate_to_width<M: TextMeasure>(measure: &M, token: &str, max_width: f32) -> String {
    let mut accum = String::new();
    for ch in token.chars() {
        let mut trial = accum.clone();
        trial.push(ch);
        if measure.width(&trial) > max_width {
            break;
        }
        accum = trial;
    }
    if accum.is_empty() {
        token.chars().next().map(String::from).unwrap_or_default()
    } else {
        accum
    }
}

/// Wrap multiline text for left-aligned blocks: each non-blank source line
/// is trimmed and wrapped independently.
pub fn split_paragraphs<M: TextMeasure>(measure: &M, text: &str, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for segment in text.lines() {
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            continue;
        }
        lines.extend(wrap_text(measure, trimmed, max_width));
    }
    lines
}

/// Shadow variant of a fill color: each channel lowered, translucent.
pub fn shadow_color(fill: Rgb<u8>) -> Rgba<u8> {
    Rgba([
        fill[0].saturating_sub(SHADOW_DROP),
        fill[1].saturating_sub(SHADOW_DROP),
        fill[2].saturating_sub(SHADOW_DROP),
        SHADOW_ALPHA,
    ])
}

fn opaque(fill: Rgb<u8>) -> Rgba<u8> {
    Rgba([fill[0], fill[1], fill[2], 255])
}

/// Draw one line of text with its top edge at `y`.
///
/// Glyph coverage is scaled by the fill alpha and blended src-over; pixels
/// outside the canvas are clipped.
pub fn draw_line(
    canvas: &mut RgbaImage,
    font: &ScaledFont,
    x: i32,
    y: i32,
    fill: Rgba<u8>,
    text: &str,
) {
    let baseline = y as f32 + font.ascent();
    let fill_alpha = fill[3] as f32 / 255.0;

    for glyph in font
        .font
        .layout(text, font.scale, point(x as f32, baseline))
    {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, coverage| {
            let px = gx as i32 + bb.min.x;
            let py = gy as i32 + bb.min.y;
            if px < 0 || py < 0 {
                return;
            }
            let (px, py) = (px as u32, py as u32);
            if px >= canvas.width() || py >= canvas.height() {
                return;
            }
            let alpha = coverage * fill_alpha;
            if alpha <= 0.0 {
                return;
            }
            let inv = 1.0 - alpha;
            let dst = canvas.get_pixel_mut(px, py);
            dst[0] = (fill[0] as f32 * alpha + dst[0] as f32 * inv) as u8;
            dst[1] = (fill[1] as f32 * alpha + dst[1] as f32 * inv) as u8;
            dst[2] = (fill[2] as f32 * alpha + dst[2] as f32 * inv) as u8;
            dst[3] = 255;
        });
    }
}

/// Draw a line with an optional shadow pass offset down-right.
pub fn draw_shadowed_line(
    canvas: &mut RgbaImage,
    font: &ScaledFont,
    x: i32,
    y: i32,
    fill: Rgb<u8>,
    shadow: bool,
    text: &str,
) {
    if shadow {
        draw_line(
            canvas,
            font,
            x + SHADOW_OFFSET,
            y + SHADOW_OFFSET,
            shadow_color(fill),
            text,
        );
    }
    draw_line(canvas, font, x, y, opaque(fill), text);
}

/// Draw a stack of left-aligned lines starting at `start`, advancing by
/// each line's ink height plus `spacing`.
pub fn draw_lines(
    canvas: &mut RgbaImage,
    font: &ScaledFont,
    lines: &[String],
    start: (i32, i32),
    fill: Rgb<u8>,
    spacing: u32,
    shadow: bool,
) {
    let (x, mut y) = start;
    for line in lines {
        draw_shadowed_line(canvas, font, x, y, fill, shadow, line);
        y += (font.height(line) + spacing) as i32;
    }
}
