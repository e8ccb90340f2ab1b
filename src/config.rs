//! Application configuration module.
//!
//! Handles loading, validating, and merging the `config.yaml` file. Stock
//! defaults are always the base layer; the user file overrides only the
//! keys it names, and `config --set` writes the fully-merged result back.
//!
//! ## Config File Location
//!
//! The default location follows the platform config directory, e.g.
//! `~/.config/cardforge/config.yaml` on Linux. The `--config` flag or the
//! `CARDFORGE_CONFIG` environment variable override it; a value with a
//! file extension names the file itself, anything else is treated as a
//! directory holding `config.yaml`.
//!
//! ## Configuration Options
//!
//! ```yaml
//! # All options are optional - defaults shown below
//!
//! fonts:
//!   title: {path: Pretendard-Bold.otf, size: 72}
//!   subtitle: {path: Pretendard-Regular.otf, size: 42}
//!   business: {path: Pretendard-Regular.otf, size: 36}
//!
//! # Extra directory searched for font files (null = working directory only)
//! fonts_dir: null
//!
//! image:
//!   width: 1080
//!   height: 1080
//!   overlay: true        # darken backgrounds for text legibility
//!
//! brand_card:
//!   overlay: true        # translucent white wash over the backdrop
//!   overlay_alpha: 48    # 0..255
//!   shadow: false
//!   fonts:               # per-slot overrides; null slots use scaled defaults
//!     brand: null
//!     title: null
//!     subtitle: null
//!     footer: null
//!
//! gemini:
//!   model: gemini-2.0-flash
//!   image_model: gemini-2.5-flash-image
//!
//! figma:
//!   file_key: ""
//!   frame_id: ""
//!   nodes:
//!     title: ""
//!     subtitle: ""
//!     business: ""
//!   backgrounds: []      # node ids or names of background slots
//!   scale: 1.0
//!   format: png
//! ```
//!
//! ## Partial Configuration
//!
//! The file is sparse — set just the values you want:
//!
//! ```yaml
//! # Only override the text model
//! gemini:
//!   model: gemini-2.0-pro
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::render::{BrandFontOverrides, CardFonts, FontSpec};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the config location.
pub const CONFIG_ENV: &str = "CARDFORGE_CONFIG";

const CONFIG_FILE: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.yaml`.
///
/// All fields have defaults. User config files need only specify the
/// values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Fonts for the standard card blocks and template business slot.
    pub fonts: FontsConfig,
    /// Extra directory searched for font files.
    pub fonts_dir: Option<PathBuf>,
    /// Standard card dimensions and overlay switch.
    pub image: ImageConfig,
    /// Brand card compositing defaults.
    pub brand_card: BrandCardConfig,
    /// Gemini model names.
    pub gemini: GeminiConfig,
    /// Figma template coordinates.
    pub figma: FigmaConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image.width == 0 || self.image.height == 0 {
            return Err(ConfigError::Validation(
                "image.width and image.height must be at least 1".into(),
            ));
        }
        for (name, entry) in [
            ("fonts.title", &self.fonts.title),
            ("fonts.subtitle", &self.fonts.subtitle),
            ("fonts.business", &self.fonts.business),
        ] {
            if entry.size == 0 {
                return Err(ConfigError::Validation(format!(
                    "{name}.size must be at least 1"
                )));
            }
        }
        for (name, entry) in [
            ("brand", &self.brand_card.fonts.brand),
            ("title", &self.brand_card.fonts.title),
            ("subtitle", &self.brand_card.fonts.subtitle),
            ("footer", &self.brand_card.fonts.footer),
        ] {
            if let Some(entry) = entry {
                if entry.size == 0 {
                    return Err(ConfigError::Validation(format!(
                        "brand_card.fonts.{name}.size must be at least 1"
                    )));
                }
            }
        }
        if self.figma.scale <= 0.0 {
            return Err(ConfigError::Validation(
                "figma.scale must be positive".into(),
            ));
        }
        if self.figma.format != "png" && self.figma.format != "jpg" {
            return Err(ConfigError::Validation(
                "figma.format must be png or jpg".into(),
            ));
        }
        Ok(())
    }

    /// Font specs for the standard card title/subtitle blocks.
    pub fn card_fonts(&self) -> CardFonts {
        CardFonts {
            title: self.fonts.title.to_spec(),
            subtitle: self.fonts.subtitle.to_spec(),
        }
    }

    /// Per-slot font overrides for the brand card.
    pub fn brand_overrides(&self) -> BrandFontOverrides {
        let spec = |entry: &Option<FontEntry>| entry.as_ref().map(FontEntry::to_spec);
        BrandFontOverrides {
            brand: spec(&self.brand_card.fonts.brand),
            title: spec(&self.brand_card.fonts.title),
            subtitle: spec(&self.brand_card.fonts.subtitle),
            footer: spec(&self.brand_card.fonts.footer),
        }
    }
}

/// A font file reference plus pixel size.
///
/// `path` is optional (the font fallback chain fills in); `size` is
/// required whenever an entry is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontEntry {
    #[serde(default)]
    pub path: Option<PathBuf>,
    pub size: u32,
}

impl FontEntry {
    pub fn to_spec(&self) -> FontSpec {
        FontSpec::new(self.path.clone(), self.size)
    }
}

/// Fonts for the standard card blocks and the template business slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    pub title: FontEntry,
    pub subtitle: FontEntry,
    pub business: FontEntry,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            title: FontEntry {
                path: Some(PathBuf::from("Pretendard-Bold.otf")),
                size: 72,
            },
            subtitle: FontEntry {
                path: Some(PathBuf::from("Pretendard-Regular.otf")),
                size: 42,
            },
            business: FontEntry {
                path: Some(PathBuf::from("Pretendard-Regular.otf")),
                size: 36,
            },
        }
    }
}

/// Standard card dimensions and overlay switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    pub width: u32,
    pub height: u32,
    /// Darken backgrounds with a translucent layer before drawing text.
    pub overlay: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            overlay: true,
        }
    }
}

/// Brand card compositing defaults, overridable per run by flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrandCardConfig {
    /// Wash the backdrop with translucent white.
    pub overlay: bool,
    /// Alpha of that wash, 0..255.
    pub overlay_alpha: u8,
    /// Draw text shadows.
    pub shadow: bool,
    /// Per-slot font overrides.
    pub fonts: BrandCardFonts,
}

impl Default for BrandCardConfig {
    fn default() -> Self {
        Self {
            overlay: true,
            overlay_alpha: 48,
            shadow: false,
            fonts: BrandCardFonts::default(),
        }
    }
}

/// Optional per-slot fonts for the brand card layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrandCardFonts {
    pub brand: Option<FontEntry>,
    pub title: Option<FontEntry>,
    pub subtitle: Option<FontEntry>,
    pub footer: Option<FontEntry>,
}

/// Gemini model names for content and background generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiConfig {
    /// Text model producing card copy.
    pub model: String,
    /// Image model producing backgrounds.
    pub image_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: crate::gemini::DEFAULT_TEXT_MODEL.to_string(),
            image_model: crate::gemini::DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

/// Figma template coordinates: which file, frame, and slot nodes to use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FigmaConfig {
    pub file_key: String,
    pub frame_id: String,
    /// Text slot nodes, by id or by layer name.
    pub nodes: FigmaNodes,
    /// Background slot nodes, by id or by layer name.
    pub backgrounds: Vec<String>,
    /// Export scale passed to the Figma image API.
    pub scale: f64,
    /// Export format: `png` or `jpg`.
    pub format: String,
}

impl Default for FigmaConfig {
    fn default() -> Self {
        Self {
            file_key: String::new(),
            frame_id: String::new(),
            nodes: FigmaNodes::default(),
            backgrounds: Vec::new(),
            scale: 1.0,
            format: "png".to_string(),
        }
    }
}

/// Text slot nodes inside the Figma frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FigmaNodes {
    pub title: String,
    pub subtitle: String,
    pub business: String,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `serde_yaml::Value` mapping.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Value {
    serde_yaml::to_value(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Mappings are merged key-by-key (overlay keys override base keys).
/// - Non-mapping values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_yaml(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base_map), Value::Mapping(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_val) => merge_yaml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_map.insert(key, merged);
            }
            Value::Mapping(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load the user config file as a raw YAML value.
///
/// Returns `Ok(None)` when the file does not exist or is empty (an empty
/// file parses as null). Returns `Err` for unreadable or invalid YAML.
pub fn load_raw_config(path: &Path) -> Result<Option<Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&content)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and
/// validate.
pub fn resolve_config(base: Value, overlay: Option<Value>) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(overlay) => merge_yaml(base, overlay),
        None => base,
    };
    let config: AppConfig = serde_yaml::from_value(merged)?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, merged over stock defaults, with
/// unknown keys rejected and values validated.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// The fully-merged config as a raw value, for key listing and lookup.
pub fn effective_value(path: &Path) -> Result<Value, ConfigError> {
    Ok(match load_raw_config(path)? {
        Some(user) => merge_yaml(stock_defaults_value(), user),
        None => stock_defaults_value(),
    })
}

/// Write a YAML value to the config file, creating parent directories.
pub fn save_config(path: &Path, value: &Value) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}

/// Apply an overlay of updates to the config file.
///
/// The merged result must deserialize and validate before anything is
/// written, so a bad `--set` never corrupts the file on disk.
pub fn update_config(path: &Path, updates: Value) -> Result<AppConfig, ConfigError> {
    let merged = merge_yaml(effective_value(path)?, updates);
    let config: AppConfig = serde_yaml::from_value(merged.clone())?;
    config.validate()?;
    save_config(path, &merged)?;
    Ok(config)
}

/// Overwrite the config file with stock defaults.
pub fn reset_config(path: &Path) -> Result<(), ConfigError> {
    save_config(path, &stock_defaults_value())
}

/// Resolve the config file location from an optional override.
///
/// An override with a file extension is the file itself; one without is a
/// directory holding `config.yaml`. With no override, the platform config
/// directory is used.
pub fn effective_config_path(override_path: Option<&Path>) -> PathBuf {
    match override_path {
        Some(path) if path.extension().is_some() => path.to_path_buf(),
        Some(path) => path.join(CONFIG_FILE),
        None => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "cardforge")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

// =============================================================================
// Dotted-key access for the `config` command
// =============================================================================

/// Look up a dotted key (e.g. `gemini.model`) in a YAML value.
pub fn get_path<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in dotted.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// Build a minimal overlay mapping that sets one dotted key.
pub fn overlay_for(dotted: &str, value: Value) -> Value {
    let mut current = value;
    for part in dotted.rsplit('.') {
        let mut map = Mapping::new();
        map.insert(Value::String(part.to_string()), current);
        current = Value::Mapping(map);
    }
    current
}

/// Parse a CLI-provided value as YAML, so `true`, `42` and `1.5` become
/// typed scalars while anything unparsable stays a string.
pub fn parse_scalar(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
