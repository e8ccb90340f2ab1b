//! Background synthesis and color analysis.
//!
//! A card backdrop comes from one of three sources: an image already in
//! memory, an image file on disk, or a deterministic gradient derived from
//! the generation prompt. All three paths yield RGBA canvases; the square
//! variants center-crop before scaling so a landscape source keeps its
//! middle. [`pick_text_color`] then chooses a readable fill for whatever
//! backdrop was produced.

use super::layout;
use image::imageops::{self, FilterType};
use image::{Rgb, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Colors a prompt hash can select from. Warm to cool, plus a neutral.
const GRADIENT_PALETTE: [[u8; 3]; 8] = [
    [255, 92, 87],
    [255, 149, 0],
    [255, 204, 0],
    [76, 217, 100],
    [90, 200, 250],
    [88, 86, 214],
    [255, 45, 85],
    [142, 142, 147],
];

/// Stand-in prompt when a card has neither background nor prompt text.
pub const DEFAULT_GRADIENT_PROMPT: &str = "default gradient";

/// Fill used over light backdrops.
pub const DARK_TEXT: Rgb<u8> = Rgb([20, 20, 20]);
/// Fill used over dark backdrops.
pub const LIGHT_TEXT: Rgb<u8> = Rgb([240, 240, 240]);

/// Mean luminance above which a backdrop counts as light.
const LUMINANCE_THRESHOLD: f64 = 160.0;

/// Center-crop an image to a square of its shorter side.
pub fn ensure_square(image: &RgbaImage) -> RgbaImage {
    if image.width() == image.height() {
        return image.clone();
    }
    let crop = layout::square_crop(image.width(), image.height());
    imageops::crop_imm(image, crop.x as u32, crop.y as u32, crop.width, crop.height).to_image()
}

/// Square-crop and scale an in-memory image to `target` x `target`.
pub fn scale_to_square(image: &RgbaImage, target: u32) -> RgbaImage {
    let square = ensure_square(image);
    if square.width() == target {
        square
    } else {
        imageops::resize(&square, target, target, FilterType::Lanczos3)
    }
}

/// Read an image file and fit it to a square backdrop of `target` pixels.
pub fn load_background(path: &Path, target: u32) -> Result<RgbaImage, image::ImageError> {
    let image = image::open(path)?.to_rgba8();
    Ok(scale_to_square(&image, target))
}

/// Scale an image to exact dimensions, without cropping.
pub fn fit_box(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.width() == width && image.height() == height {
        image.clone()
    } else {
        imageops::resize(image, width, height, FilterType::Lanczos3)
    }
}

/// An opaque single-color canvas.
pub fn flat_color(width: u32, height: u32, color: Rgb<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([color[0], color[1], color[2], 255]))
}

/// Vertical gradient through the given color stops.
///
/// The base pass interpolates first stop to last, top to bottom. With more
/// than two stops, a second pass renders each adjacent pair into its own
/// horizontal band, blurs the result so band seams disappear, and blends
/// it over the base at 40%.
pub fn linear_gradient(width: u32, height: u32, colors: &[[u8; 3]]) -> RgbaImage {
    let first = colors.first().copied().unwrap_or([0, 0, 0]);
    let last = colors.last().copied().unwrap_or(first);

    let mut base = RgbaImage::new(width, height);
    for y in 0..height {
        let ratio = y as f32 / height.saturating_sub(1).max(1) as f32;
        let row = lerp_color(first, last, ratio);
        for x in 0..width {
            base.put_pixel(x, y, row);
        }
    }

    if colors.len() > 2 {
        let mut overlay = RgbaImage::new(width, height);
        let steps = colors.len() - 1;
        for (i, pair) in colors.windows(2).enumerate() {
            let y0 = (height as usize * i / steps) as u32;
            let y1 = (height as usize * (i + 1) / steps) as u32;
            for y in y0..y1 {
                let ratio = (y - y0) as f32 / (y1 - y0).max(1) as f32;
                let row = lerp_color(pair[0], pair[1], ratio);
                for x in 0..width {
                    overlay.put_pixel(x, y, row);
                }
            }
        }
        let overlay = imageops::blur(&overlay, height as f32 / 12.0);
        for (dst, src) in base.pixels_mut().zip(overlay.pixels()) {
            for c in 0..3 {
                dst[c] = (dst[c] as f32 * 0.6 + src[c] as f32 * 0.4) as u8;
            }
        }
    }

    base
}

/// Palette stops selected by hashing the prompt.
///
/// The first three digest bytes each index the palette, so the same prompt
/// always yields the same three stops. Repeats are kept, which biases some
/// prompts toward flatter gradients.
fn prompt_stops(prompt: &str) -> [[u8; 3]; 3] {
    let digest = Sha256::digest(prompt.as_bytes());
    let pick = |byte: u8| GRADIENT_PALETTE[byte as usize % GRADIENT_PALETTE.len()];
    [pick(digest[0]), pick(digest[1]), pick(digest[2])]
}

/// Deterministic gradient backdrop for a prompt. An empty prompt falls
/// back to a fixed stand-in so the output stays stable.
pub fn gradient_for_prompt(width: u32, height: u32, prompt: &str) -> RgbaImage {
    let prompt = if prompt.is_empty() {
        DEFAULT_GRADIENT_PROMPT
    } else {
        prompt
    };
    linear_gradient(width, height, &prompt_stops(prompt))
}

/// Composite a translucent color over the whole canvas.
pub fn tint(canvas: &mut RgbaImage, color: Rgba<u8>) {
    let alpha = color[3] as u32;
    if alpha == 0 {
        return;
    }
    let inv = 255 - alpha;
    for px in canvas.pixels_mut() {
        for c in 0..3 {
            px[c] = ((color[c] as u32 * alpha + px[c] as u32 * inv + 127) / 255) as u8;
        }
        px[3] = 255;
    }
}

/// Mean luminance of the canvas, 0 (black) to 255 (white).
pub fn average_luminance(image: &RgbaImage) -> f64 {
    let count = (image.width() as u64 * image.height() as u64).max(1);
    let mut total: u64 = 0;
    for px in image.pixels() {
        let luma = (299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32) / 1000;
        total += luma as u64;
    }
    total as f64 / count as f64
}

/// Near-black text for light backdrops, near-white for dark ones.
pub fn pick_text_color(image: &RgbaImage) -> Rgb<u8> {
    if average_luminance(image) > LUMINANCE_THRESHOLD {
        DARK_TEXT
    } else {
        LIGHT_TEXT
    }
}

fn lerp_color(from: [u8; 3], to: [u8; 3], ratio: f32) -> Rgba<u8> {
    let channel =
        |a: u8, b: u8| -> u8 { (a as f32 + (b as f32 - a as f32) * ratio) as u8 };
    Rgba([
        channel(from[0], to[0]),
        channel(from[1], to[1]),
        channel(from[2], to[2]),
        255,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn coordinate_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    // =========================================================================
    // Cropping and scaling tests
    // =========================================================================

    #[test]
    fn square_of_landscape_keeps_center() {
        let image = coordinate_image(100, 60);
        let square = ensure_square(&image);
        assert_eq!(square.dimensions(), (60, 60));
        // left crop edge sits at x = (100 - 60) / 2 = 20
        assert_eq!(square.get_pixel(0, 0), &Rgba([20, 0, 0, 255]));
    }

    #[test]
    fn square_of_portrait_keeps_center() {
        let image = coordinate_image(60, 100);
        let square = ensure_square(&image);
        assert_eq!(square.dimensions(), (60, 60));
        assert_eq!(square.get_pixel(0, 0), &Rgba([0, 20, 0, 255]));
    }

    #[test]
    fn square_input_is_untouched() {
        let image = coordinate_image(40, 40);
        assert_eq!(ensure_square(&image), image);
    }

    #[test]
    fn scale_to_square_hits_target_size() {
        let image = coordinate_image(100, 60);
        assert_eq!(scale_to_square(&image, 50).dimensions(), (50, 50));
    }

    #[test]
    fn load_background_reads_and_squares_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bg.png");
        coordinate_image(80, 40).save(&path).unwrap();
        let loaded = load_background(&path, 50).unwrap();
        assert_eq!(loaded.dimensions(), (50, 50));
    }

    #[test]
    fn load_background_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        assert!(load_background(&dir.path().join("absent.png"), 50).is_err());
    }

    #[test]
    fn fit_box_reaches_exact_dimensions() {
        let image = coordinate_image(40, 40);
        assert_eq!(fit_box(&image, 30, 10).dimensions(), (30, 10));
    }

    // =========================================================================
    // Gradient tests
    // =========================================================================

    #[test]
    fn two_stop_gradient_hits_both_ends() {
        let gradient = linear_gradient(4, 10, &[[200, 0, 0], [0, 0, 200]]);
        assert_eq!(gradient.get_pixel(0, 0), &Rgba([200, 0, 0, 255]));
        assert_eq!(gradient.get_pixel(3, 9), &Rgba([0, 0, 200, 255]));
    }

    #[test]
    fn gradient_rows_are_uniform() {
        let gradient = linear_gradient(6, 8, &[[10, 20, 30], [200, 100, 50]]);
        for y in 0..8 {
            let row: Vec<_> = (0..6).map(|x| *gradient.get_pixel(x, y)).collect();
            assert!(row.iter().all(|px| *px == row[0]));
        }
    }

    #[test]
    fn multi_stop_gradient_is_opaque_and_sized() {
        let gradient = linear_gradient(8, 24, &[[255, 0, 0], [0, 255, 0], [0, 0, 255]]);
        assert_eq!(gradient.dimensions(), (8, 24));
        assert!(gradient.pixels().all(|px| px[3] == 255));
    }

    #[test]
    fn prompt_gradient_is_deterministic() {
        let a = gradient_for_prompt(16, 16, "city skyline at dusk");
        let b = gradient_for_prompt(16, 16, "city skyline at dusk");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_prompt_uses_standin() {
        let empty = gradient_for_prompt(16, 16, "");
        let standin = gradient_for_prompt(16, 16, DEFAULT_GRADIENT_PROMPT);
        assert_eq!(empty, standin);
    }

    // =========================================================================
    // Tint and luminance tests
    // =========================================================================

    #[test]
    fn tint_blends_toward_overlay() {
        let mut canvas = flat_color(2, 2, Rgb([255, 255, 255]));
        tint(&mut canvas, Rgba([0, 0, 0, 96]));
        // (0 * 96 + 255 * 159 + 127) / 255 = 159
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([159, 159, 159, 255]));
    }

    #[test]
    fn zero_alpha_tint_is_noop() {
        let mut canvas = flat_color(2, 2, Rgb([10, 120, 230]));
        tint(&mut canvas, Rgba([255, 255, 255, 0]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([10, 120, 230, 255]));
    }

    #[test]
    fn opaque_tint_replaces_canvas() {
        let mut canvas = flat_color(2, 2, Rgb([10, 120, 230]));
        tint(&mut canvas, Rgba([5, 6, 7, 255]));
        assert_eq!(canvas.get_pixel(0, 1), &Rgba([5, 6, 7, 255]));
    }

    #[test]
    fn luminance_of_black_and_white_halves() {
        let mut image = flat_color(2, 1, Rgb([255, 255, 255]));
        image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        assert!((average_luminance(&image) - 127.5).abs() < 1e-9);
    }

    #[test]
    fn light_backdrop_gets_dark_text() {
        let image = flat_color(4, 4, Rgb([236, 236, 236]));
        assert_eq!(pick_text_color(&image), DARK_TEXT);
    }

    #[test]
    fn dark_backdrop_gets_light_text() {
        let image = flat_color(4, 4, Rgb([30, 30, 30]));
        assert_eq!(pick_text_color(&image), LIGHT_TEXT);
    }

    #[test]
    fn threshold_is_exclusive() {
        let at_threshold = flat_color(4, 4, Rgb([160, 160, 160]));
        assert_eq!(pick_text_color(&at_threshold), LIGHT_TEXT);
        let above = flat_color(4, 4, Rgb([161, 161, 161]));
        assert_eq!(pick_text_color(&above), DARK_TEXT);
    }
}
