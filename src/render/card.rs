//! Card composition: backdrop, overlay, and positioned text.
//!
//! Two layouts are produced here. The standard card centers wrapped text
//! inside fixed horizontal bands; the brand card anchors a left-aligned
//! title/subtitle/footer stack to the bottom margin with a brand mark at
//! the top right. Both pick their text color from the composited backdrop
//! and return RGB canvases ready to encode.

use super::background;
use super::layout::{self, Region};
use super::params::{BrandCardParams, CardContent, CardFonts, FontSpec, RenderOptions, TextBlock};
use super::text::{self, FontStore, ScaledFont, TextError, TextMeasure};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use thiserror::Error;

/// Spacing between wrapped lines in the banded card layout.
const LINE_SPACING: u32 = 12;
/// Horizontal inset subtracted from a band's width before wrapping.
const BAND_INSET: u32 = 80;
/// Translucent darkening layer for legibility over busy backdrops.
const CARD_OVERLAY: Rgba<u8> = Rgba([0, 0, 0, 96]);
/// Backdrop for brand cards rendered without any background source.
const BRAND_BACKDROP: Rgb<u8> = Rgb([236, 236, 236]);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("could not prepare text: {0}")]
    Font(#[from] TextError),
    #[error("could not process image: {0}")]
    Image(#[from] image::ImageError),
}

/// Compose a standard card: square backdrop, optional overlay, title and
/// subtitle centered in their bands.
///
/// The canvas side is the smaller of the requested dimensions. Fonts are
/// resolved only for non-blank blocks, so a text-free card renders without
/// any font on disk.
pub fn compose_card(
    content: &CardContent,
    fonts: &CardFonts,
    options: &RenderOptions,
    store: &FontStore,
) -> Result<RgbImage, RenderError> {
    let target = options.width.min(options.height);

    let mut canvas = match (&content.background_image, &content.background_path) {
        (Some(image), _) => background::scale_to_square(image, target),
        (None, Some(path)) => background::load_background(path, target)?,
        (None, None) => background::gradient_for_prompt(
            target,
            target,
            content.prompt.as_deref().unwrap_or(""),
        ),
    };

    if options.overlay {
        background::tint(&mut canvas, CARD_OVERLAY);
    }
    let fill = background::pick_text_color(&canvas);

    draw_block(
        &mut canvas,
        &content.title,
        &fonts.title,
        &layout::title_region(target, target),
        fill,
        options.shadow,
        store,
    )?;
    draw_block(
        &mut canvas,
        &content.subtitle,
        &fonts.subtitle,
        &layout::subtitle_region(target, target),
        fill,
        options.shadow,
        store,
    )?;

    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Compose a brand card: bottom-anchored text stack over a flat, file, or
/// supplied backdrop, brand mark top-right.
pub fn compose_brand_card(
    params: &BrandCardParams,
    store: &FontStore,
) -> Result<RgbImage, RenderError> {
    let size = params.size;

    let mut canvas = match (&params.background_image, &params.background_path) {
        (Some(image), _) => background::scale_to_square(image, size),
        (None, Some(path)) => background::load_background(path, size)?,
        (None, None) => background::flat_color(size, size, BRAND_BACKDROP),
    };

    if let Some(overlay) = params.overlay {
        background::tint(&mut canvas, overlay);
    }

    let metrics = layout::BrandMetrics::for_size(size);
    let fill = background::pick_text_color(&canvas);
    let max_width = metrics.max_text_width(size);

    let brand_font = slot_font(
        store,
        params.fonts.brand.as_ref(),
        metrics.brand_font_size,
        &params.brand_text,
    )?;
    let title_font = slot_font(
        store,
        params.fonts.title.as_ref(),
        metrics.title_font_size,
        &params.title_text,
    )?;
    let subtitle_font = slot_font(
        store,
        params.fonts.subtitle.as_ref(),
        metrics.subtitle_font_size,
        &params.subtitle_text,
    )?;
    let footer_font = slot_font(
        store,
        params.fonts.footer.as_ref(),
        metrics.footer_font_size,
        &params.footer_text,
    )?;

    let (title_lines, title_height) = measured_block(
        title_font.as_ref(),
        &params.title_text,
        max_width,
        metrics.title_spacing,
    );
    let (subtitle_lines, subtitle_height) = measured_block(
        subtitle_font.as_ref(),
        &params.subtitle_text,
        max_width,
        metrics.subtitle_spacing,
    );
    let footer_height = footer_font
        .as_ref()
        .map(|font| font.height(&params.footer_text))
        .unwrap_or(0);

    let stack = layout::brand_stack(
        size,
        metrics.margin,
        title_height,
        subtitle_height,
        !subtitle_lines.is_empty(),
        footer_height,
        metrics.gap_footer,
        metrics.gap_title_subtitle,
    );

    if let Some(font) = &brand_font {
        let x = (size as f32 - metrics.margin as f32 - font.width(&params.brand_text)) as i32;
        text::draw_shadowed_line(
            &mut canvas,
            font,
            x,
            metrics.margin as i32,
            fill,
            params.shadow,
            &params.brand_text,
        );
    }

    if let Some(font) = &title_font {
        text::draw_lines(
            &mut canvas,
            font,
            &title_lines,
            (metrics.margin as i32, stack.title_top),
            fill,
            metrics.title_spacing,
            params.shadow,
        );
    }

    if let Some(font) = &subtitle_font {
        text::draw_lines(
            &mut canvas,
            font,
            &subtitle_lines,
            (metrics.margin as i32, stack.subtitle_top),
            fill,
            metrics.subtitle_spacing,
            params.shadow,
        );
    }

    if let Some(font) = &footer_font {
        let x = (size as f32 - metrics.margin as f32 - font.width(&params.footer_text)) as i32;
        text::draw_shadowed_line(
            &mut canvas,
            font,
            x,
            stack.footer_top,
            fill,
            params.shadow,
            &params.footer_text,
        );
    }

    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Draw a set of positioned text blocks onto the canvas.
///
/// Blocks with blank text are skipped. Fill precedence per block: the
/// block's own color, then `default_fill`, then luminance-based selection
/// against the canvas as already drawn.
pub fn draw_text_blocks(
    canvas: &mut RgbaImage,
    blocks: &[TextBlock],
    shadow: bool,
    default_fill: Option<Rgb<u8>>,
    store: &FontStore,
) -> Result<(), RenderError> {
    for block in blocks {
        if block.text.trim().is_empty() {
            continue;
        }
        let fill = block
            .fill
            .or(default_fill)
            .unwrap_or_else(|| background::pick_text_color(canvas));
        draw_block(
            canvas,
            &block.text,
            &block.font,
            &block.region,
            fill,
            shadow,
            store,
        )?;
    }
    Ok(())
}

/// Wrap text to the region's inset width and draw it centered, both axes.
fn draw_block(
    canvas: &mut RgbaImage,
    content: &str,
    spec: &FontSpec,
    region: &Region,
    fill: Rgb<u8>,
    shadow: bool,
    store: &FontStore,
) -> Result<(), RenderError> {
    if content.trim().is_empty() {
        return Ok(());
    }
    let font = store.scaled(spec)?;
    let max_width = region.width.saturating_sub(BAND_INSET) as f32;
    let lines = text::wrap_text(&font, content, max_width);
    if lines.is_empty() {
        return Ok(());
    }

    let heights: Vec<u32> = lines.iter().map(|line| font.height(line)).collect();
    let total = layout::lines_height(&heights, LINE_SPACING);
    let mut y = layout::block_start_y(region, total);
    for (line, height) in lines.iter().zip(&heights) {
        let x = layout::centered_x(region, font.width(line));
        text::draw_shadowed_line(canvas, &font, x, y, fill, shadow, line);
        y += (*height + LINE_SPACING) as i32;
    }
    Ok(())
}

/// Resolve the font for a brand card slot, or `None` when the slot's text
/// is blank and no font is needed.
fn slot_font(
    store: &FontStore,
    override_spec: Option<&FontSpec>,
    default_size: u32,
    content: &str,
) -> Result<Option<ScaledFont>, TextError> {
    if content.trim().is_empty() {
        return Ok(None);
    }
    let spec = override_spec
        .cloned()
        .unwrap_or_else(|| FontSpec::sized(default_size));
    Ok(Some(store.scaled(&spec)?))
}

/// Paragraph-split lines and their stacked height for one slot.
fn measured_block(
    font: Option<&ScaledFont>,
    content: &str,
    max_width: f32,
    spacing: u32,
) -> (Vec<String>, u32) {
    let Some(font) = font else {
        return (Vec::new(), 0);
    };
    let lines = text::split_paragraphs(font, content, max_width);
    let heights: Vec<u32> = lines.iter().map(|line| font.height(line)).collect();
    let total = layout::lines_height(&heights, spacing);
    (lines, total)
}
