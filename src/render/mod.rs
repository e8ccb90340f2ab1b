//! Card rendering: placement math, text shaping, backdrops, composition.
//!
//! | Concern | Module |
//! |---|---|
//! | **Placement math** | `layout` — bands, bottom-anchored stacks, crops |
//! | **What to render** | `params` — content, fonts, options |
//! | **Text** | `text` — font resolution, measurement, wrapping, glyphs |
//! | **Backdrops** | `background` — gradients, files, tint, text color |
//! | **Composition** | `card` — the two card layouts + block drawing |
//!
//! `layout` and the wrapping half of `text` are pure and unit tested
//! against a mock measure; everything touching real glyphs goes through
//! [`FontStore`], which resolves fonts lazily so text-free renders work
//! on systems with no fonts at all.

pub mod background;
pub mod card;
pub mod layout;
pub mod params;
pub mod text;

pub use card::{RenderError, compose_brand_card, compose_card, draw_text_blocks};
pub use params::{
    BrandCardParams, BrandFontOverrides, CardContent, CardFonts, FontSpec, RenderOptions, TextBlock,
};
pub use text::{FontStore, TextError};
