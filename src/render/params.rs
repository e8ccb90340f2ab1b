//! Parameter types for card rendering.
//!
//! These structs describe *what* to render, not *how* to render it. They are
//! the interface between the CLI layer (which resolves flags, input records,
//! and config into concrete values) and the composition functions in
//! [`card`](super::card) (which do the pixel work).
//!
//! ## Types
//!
//! - [`FontSpec`] — optional font file path + pixel size.
//! - [`RenderOptions`] — output dimensions and overlay/shadow switches.
//! - [`CardContent`] — text plus one of three background sources.
//! - [`BrandCardParams`] — the square brand card variant.
//! - [`TextBlock`] — a positioned block for template-driven drawing.

use super::layout::Region;
use image::{Rgb, Rgba, RgbaImage};
use std::path::PathBuf;

/// Overlay drawn on brand cards unless disabled: translucent white.
pub const DEFAULT_BRAND_OVERLAY: Rgba<u8> = Rgba([255, 255, 255, 48]);

/// Default square side for brand cards.
pub const DEFAULT_BRAND_SIZE: u32 = 512;

/// A font request: an optional file path and a pixel size.
///
/// A `None` path means "use whatever usable font can be found" (see
/// [`FontStore`](super::text::FontStore) for the fallback chain).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSpec {
    pub path: Option<PathBuf>,
    pub size: u32,
}

impl FontSpec {
    pub fn new(path: Option<PathBuf>, size: u32) -> Self {
        Self { path, size }
    }

    /// A spec with no preferred file, just a size.
    pub fn sized(size: u32) -> Self {
        Self { path: None, size }
    }
}

/// Output dimensions and compositing switches for standard cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Darken the background with a translucent black layer before text.
    pub overlay: bool,
    /// Draw a dark offset copy beneath each text line.
    pub shadow: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            overlay: true,
            shadow: true,
        }
    }
}

/// Fonts for the two standard card text blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFonts {
    pub title: FontSpec,
    pub subtitle: FontSpec,
}

impl Default for CardFonts {
    fn default() -> Self {
        Self {
            title: FontSpec::sized(72),
            subtitle: FontSpec::sized(42),
        }
    }
}

/// Text and background source for a standard card.
///
/// Background precedence: a supplied buffer (e.g. API-generated) wins over
/// a file path, which wins over the prompt-derived gradient fallback.
#[derive(Debug, Clone, Default)]
pub struct CardContent {
    pub title: String,
    pub subtitle: String,
    /// Prompt that produced (or would produce) the background; also seeds
    /// the gradient fallback.
    pub prompt: Option<String>,
    pub background_path: Option<PathBuf>,
    pub background_image: Option<RgbaImage>,
}

/// Per-slot font overrides for the brand card layout.
///
/// Slots left `None` fall back to sizes proportional to the card side
/// (see [`BrandMetrics`](super::layout::BrandMetrics)).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandFontOverrides {
    pub brand: Option<FontSpec>,
    pub title: Option<FontSpec>,
    pub subtitle: Option<FontSpec>,
    pub footer: Option<FontSpec>,
}

/// Everything needed to compose a brand card.
#[derive(Debug, Clone)]
pub struct BrandCardParams {
    pub brand_text: String,
    pub title_text: String,
    pub subtitle_text: String,
    pub footer_text: String,
    pub background_path: Option<PathBuf>,
    pub background_image: Option<RgbaImage>,
    /// Square side length in pixels.
    pub size: u32,
    pub fonts: BrandFontOverrides,
    /// Overlay color composited over the background; `None` disables it.
    pub overlay: Option<Rgba<u8>>,
    pub shadow: bool,
}

impl Default for BrandCardParams {
    fn default() -> Self {
        Self {
            brand_text: String::new(),
            title_text: String::new(),
            subtitle_text: String::new(),
            footer_text: String::new(),
            background_path: None,
            background_image: None,
            size: DEFAULT_BRAND_SIZE,
            fonts: BrandFontOverrides::default(),
            overlay: Some(DEFAULT_BRAND_OVERLAY),
            shadow: false,
        }
    }
}

/// A text block positioned by an explicit region, used when drawing into
/// template layouts (e.g. Figma frames) instead of the stock card bands.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub text: String,
    pub font: FontSpec,
    pub region: Region,
    /// Explicit fill; `None` defers to the caller's default, then to
    /// luminance-based selection.
    pub fill: Option<Rgb<u8>>,
}
