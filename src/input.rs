//! Input records: JSON/CSV loading, prompt hints, and output naming.
//!
//! Records are deliberately lax where the config is strict: unknown keys
//! are ignored (batch files in the wild carry extra columns) and empty
//! values normalize to absent so `or`-style fallbacks work uniformly
//! across JSON objects, array elements, and CSV rows.

use chrono::Local;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Suffix nudging the image model toward photographic output.
const REALISM_HINT: &str = "photorealistic style";

#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("card definition must be a JSON object")]
    NotAnObject,
    #[error("unsupported input structure; provide a JSON array, object, or CSV file")]
    Unsupported,
}

/// One raw input record: a JSON object, a JSON array element, or a CSV row.
///
/// Aliases cover the key variants existing batch files use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CardRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default, alias = "background")]
    pub background_path: Option<String>,
    #[serde(default, alias = "brand_text")]
    pub brand: Option<String>,
    #[serde(default, alias = "footer_text")]
    pub footer: Option<String>,
}

impl CardRecord {
    /// Drop empty strings so fallback chains treat them as missing.
    fn normalize(mut self) -> Self {
        let scrub = |field: &mut Option<String>| {
            if field.as_deref().is_some_and(str::is_empty) {
                *field = None;
            }
        };
        scrub(&mut self.title);
        scrub(&mut self.subtitle);
        scrub(&mut self.image_prompt);
        scrub(&mut self.output);
        scrub(&mut self.background_path);
        scrub(&mut self.brand);
        scrub(&mut self.footer);
        self
    }
}

/// Load a single card definition from a JSON object file.
pub fn load_record(path: &Path) -> Result<CardRecord, InputError> {
    let value: serde_json::Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    if !value.is_object() {
        return Err(InputError::NotAnObject);
    }
    let record: CardRecord = serde_json::from_value(value)?;
    Ok(record.normalize())
}

/// Load multiple records from a JSON array/object or a CSV file.
///
/// The format is chosen by extension: `.csv` (any case) parses as CSV with
/// a header row, everything else as JSON. A single JSON object becomes a
/// one-element batch.
pub fn load_records(path: &Path) -> Result<Vec<CardRecord>, InputError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        return load_csv(path);
    }

    let value: serde_json::Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| Ok(serde_json::from_value::<CardRecord>(item)?.normalize()))
            .collect(),
        serde_json::Value::Object(_) => {
            Ok(vec![serde_json::from_value::<CardRecord>(value)?.normalize()])
        }
        _ => Err(InputError::Unsupported),
    }
}

fn load_csv(path: &Path) -> Result<Vec<CardRecord>, InputError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: CardRecord = row?;
        records.push(record.normalize());
    }
    Ok(records)
}

/// Append the photorealism hint to a prompt unless it already carries one.
/// Blank prompts stay absent.
pub fn ensure_realistic_prompt(prompt: Option<&str>) -> Option<String> {
    let text = prompt.unwrap_or("").trim();
    if text.is_empty() {
        return None;
    }
    if text.contains(REALISM_HINT) {
        Some(text.to_string())
    } else {
        Some(format!("{text} {REALISM_HINT}"))
    }
}

/// Timestamped default name for a single card, e.g.
/// `card_20250114_093012.jpg`.
pub fn default_card_name() -> String {
    Local::now().format("card_%Y%m%d_%H%M%S.jpg").to_string()
}

/// Timestamped default name for a brand card (PNG).
pub fn default_brand_card_name() -> String {
    Local::now().format("brand_card_%Y%m%d_%H%M%S.png").to_string()
}

/// Timestamped default name for a Figma template card (PNG).
pub fn default_figma_card_name() -> String {
    Local::now().format("figma_card_%Y%m%d_%H%M%S.png").to_string()
}

/// Batch output name for a 1-based record index: `card_01.jpg`.
pub fn batch_card_name(index: usize) -> String {
    format!("card_{index:02}.jpg")
}

/// Output name for generated cards: slugged topic plus 1-based index,
/// e.g. `morning coffee` → `morning_coffee_01.jpg`.
pub fn topic_card_name(topic: &str, index: usize) -> String {
    format!("{}_{index:02}.jpg", topic_slug(topic))
}

fn topic_slug(topic: &str) -> String {
    let lowered = topic.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut gap = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            gap = !slug.is_empty();
        } else {
            if gap {
                slug.push('_');
                gap = false;
            }
            slug.push(ch);
        }
    }
    slug
}
