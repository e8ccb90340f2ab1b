//! Gemini REST client for card copy and background images.
//!
//! Two generation paths share one request helper. [`generate_cards`] asks a
//! text model for a strict-JSON array of card copy and falls back to stock
//! templates whenever the API is missing, unreachable, or returns something
//! unparseable. [`generate_background`] asks an image model for inline image
//! data and reports every failure as an error so the caller can pick its own
//! fallback (the card pipeline drops to gradients).

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbaImage;
use log::warn;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Text model used for card copy unless the config names another.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";

/// Image model used for backgrounds unless the config names another.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Gemini API key is not configured; set {API_KEY_ENV}")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Gemini API error (status {status}): {body}")]
    Api { status: StatusCode, body: String },
    #[error("Gemini response has no inline image data")]
    MissingImage,
    #[error("Gemini response has no text part")]
    MissingText,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("could not decode generated image: {0}")]
    Image(#[from] image::ImageError),
}

/// One card's worth of generated copy. Missing fields deserialize as empty
/// strings so partial model output still renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeneratedCard {
    pub title: String,
    pub subtitle: String,
    pub image_prompt: String,
}

/// Read the API key from the environment. Blank values count as unset.
pub fn get_api_key() -> Option<String> {
    let key = std::env::var(API_KEY_ENV).ok()?;
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Generate `count` cards of copy for `topic`, falling back to stock
/// templates when no API key is set or the request fails in any way.
///
/// The model is asked for strict JSON but replies routinely arrive fenced in
/// code blocks; those fences are stripped before parsing. A reply that parses
/// but holds more than `count` entries is truncated, one with fewer is
/// returned as-is.
pub fn generate_cards(
    topic: &str,
    count: usize,
    style: Option<&str>,
    model: &str,
    api_key: Option<&str>,
) -> Vec<GeneratedCard> {
    let Some(key) = resolve_key(api_key) else {
        return fallback_cards(topic, count);
    };
    match request_cards(topic, count, style, model, &key) {
        Ok(cards) => cards,
        Err(err) => {
            warn!("card copy generation failed, using stock copy: {}", err);
            fallback_cards(topic, count)
        }
    }
}

/// Generate a background image for `prompt` at the given aspect ratio
/// (e.g. `"1:1"`). Unlike [`generate_cards`] this surfaces failures: the
/// caller decides whether to warn, abort, or drop to a gradient.
pub fn generate_background(
    prompt: &str,
    aspect_ratio: &str,
    model: &str,
    api_key: Option<&str>,
) -> Result<RgbaImage, GeminiError> {
    let key = resolve_key(api_key).ok_or(GeminiError::NotConfigured)?;
    let payload = json!({
        "contents": [{"parts": [{"text": prompt}]}],
        "generationConfig": {
            "imageConfig": {"aspectRatio": aspect_ratio},
        },
    });
    let response = post_generate(model, &key, &payload)?;
    let data = inline_image_data(&response).ok_or(GeminiError::MissingImage)?;
    let bytes = BASE64.decode(data)?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

fn resolve_key(api_key: Option<&str>) -> Option<String> {
    match api_key.map(str::trim) {
        Some(key) if !key.is_empty() => Some(key.to_string()),
        _ => get_api_key(),
    }
}

fn request_cards(
    topic: &str,
    count: usize,
    style: Option<&str>,
    model: &str,
    key: &str,
) -> Result<Vec<GeneratedCard>, GeminiError> {
    let payload = json!({
        "contents": [{"parts": [{"text": build_prompt(topic, count, style)}]}],
        "generationConfig": {"responseMimeType": "application/json"},
    });
    let response = post_generate(model, key, &payload)?;
    let text = response_text(&response).ok_or(GeminiError::MissingText)?;
    let mut cards: Vec<GeneratedCard> = serde_json::from_str(strip_code_fence(text))?;
    cards.truncate(count);
    Ok(cards)
}

fn post_generate(model: &str, key: &str, payload: &Value) -> Result<Value, GeminiError> {
    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| GeminiError::Http(e.to_string()))?;
    let url = format!("{API_BASE}/{model}:generateContent");
    let response = client
        .post(&url)
        .header("x-goog-api-key", key)
        .json(payload)
        .send()
        .map_err(|e| GeminiError::Http(e.to_string()))?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        return Err(GeminiError::Api { status, body });
    }
    response
        .json::<Value>()
        .map_err(|e| GeminiError::Http(e.to_string()))
}

fn build_prompt(topic: &str, count: usize, style: Option<&str>) -> String {
    let style_text = style
        .map(|style| format!(" in the style of {style}"))
        .unwrap_or_default();
    format!(
        "You are a social media copywriter. Create brief Instagram card content. \
         Respond strictly with JSON: an array of objects containing title, subtitle, \
         and image_prompt. Topic: {topic}.{style_text}\nGenerate {count} unique entries."
    )
}

/// Pull the first text part out of a generateContent response.
fn response_text(payload: &Value) -> Option<&str> {
    let parts = payload.pointer("/candidates/0/content/parts")?.as_array()?;
    parts
        .iter()
        .find_map(|part| part.get("text").and_then(Value::as_str))
}

/// Pull the first inline image payload out of a generateContent response.
/// The API documents camelCase but some deployments emit snake_case.
fn inline_image_data(payload: &Value) -> Option<&str> {
    let parts = payload.pointer("/candidates/0/content/parts")?.as_array()?;
    parts.iter().find_map(|part| {
        part.get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(|data| data.get("data"))
            .and_then(Value::as_str)
    })
}

/// Strip a surrounding markdown code fence, dropping the language line when
/// one is present.
fn strip_code_fence(text: &str) -> &str {
    let cleaned = text.trim();
    if !cleaned.starts_with("```") {
        return cleaned;
    }
    let cleaned = cleaned.trim_matches('`');
    match cleaned.split_once('\n') {
        Some((_, rest)) => rest,
        None => cleaned,
    }
}

/// Stock copy used whenever the API cannot be asked. Three templates rotate
/// so small batches still vary.
fn fallback_cards(topic: &str, count: usize) -> Vec<GeneratedCard> {
    const TEMPLATES: [(&str, &str, &str); 3] = [
        (
            "Today's insight",
            "A short thought on {topic}",
            "minimal gradient, modern, {topic}",
        ),
        (
            "One step at a time",
            "Practical tips for {topic}",
            "soft lighting, inspirational, {topic}",
        ),
        (
            "Worth remembering",
            "The key message about {topic}",
            "bold typography, vibrant, {topic}",
        ),
    ];

    (0..count)
        .map(|index| {
            let (title, subtitle, prompt) = TEMPLATES[index % TEMPLATES.len()];
            GeneratedCard {
                title: title.to_string(),
                subtitle: subtitle.replace("{topic}", topic),
                image_prompt: prompt.replace("{topic}", topic),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Prompt building tests
    // =========================================================================

    #[test]
    fn prompt_names_topic_and_count() {
        let prompt = build_prompt("morning routines", 4, None);
        assert!(prompt.contains("Topic: morning routines."));
        assert!(prompt.contains("Generate 4 unique entries."));
        assert!(!prompt.contains("in the style of"));
    }

    #[test]
    fn prompt_appends_style_clause() {
        let prompt = build_prompt("coffee", 2, Some("film noir"));
        assert!(prompt.contains("Topic: coffee. in the style of film noir"));
    }

    // =========================================================================
    // Code fence stripping tests
    // =========================================================================

    #[test]
    fn bare_json_passes_through() {
        assert_eq!(strip_code_fence("  [1, 2]  "), "[1, 2]");
    }

    #[test]
    fn fence_with_language_line_is_dropped() {
        let text = "```json\n[{\"title\": \"a\"}]\n```";
        assert_eq!(strip_code_fence(text), "[{\"title\": \"a\"}]\n");
    }

    #[test]
    fn fence_without_newline_keeps_content() {
        assert_eq!(strip_code_fence("```[1]```"), "[1]");
    }

    #[test]
    fn plain_fence_keeps_first_line_content() {
        let text = "```\n[true]\n```";
        assert_eq!(strip_code_fence(text), "[true]\n");
    }

    // =========================================================================
    // Card parsing tests
    // =========================================================================

    #[test]
    fn cards_parse_from_fenced_reply() {
        let reply = "```json\n[{\"title\": \"T\", \"subtitle\": \"S\", \"image_prompt\": \"P\"}]\n```";
        let cards: Vec<GeneratedCard> =
            serde_json::from_str(strip_code_fence(reply)).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "T");
        assert_eq!(cards[0].subtitle, "S");
        assert_eq!(cards[0].image_prompt, "P");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let cards: Vec<GeneratedCard> =
            serde_json::from_str(r#"[{"title": "only title"}]"#).unwrap();
        assert_eq!(cards[0].title, "only title");
        assert_eq!(cards[0].subtitle, "");
        assert_eq!(cards[0].image_prompt, "");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let cards: Vec<GeneratedCard> =
            serde_json::from_str(r#"[{"title": "t", "mood": "upbeat"}]"#).unwrap();
        assert_eq!(cards[0].title, "t");
    }

    #[test]
    fn non_array_reply_is_an_error() {
        let result: Result<Vec<GeneratedCard>, _> =
            serde_json::from_str(r#"{"title": "not a list"}"#);
        assert!(result.is_err());
    }

    // =========================================================================
    // Response extraction tests
    // =========================================================================

    #[test]
    fn text_part_is_found() {
        let payload = json!({
            "candidates": [{
                "content": {"parts": [{"text": "[\"hello\"]"}]}
            }]
        });
        assert_eq!(response_text(&payload), Some("[\"hello\"]"));
    }

    #[test]
    fn missing_candidates_yield_none() {
        assert_eq!(response_text(&json!({"candidates": []})), None);
        assert_eq!(response_text(&json!({})), None);
    }

    #[test]
    fn inline_data_camel_case() {
        let payload = json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "here is your image"},
                    {"inlineData": {"mimeType": "image/png", "data": "QUJD"}}
                ]}
            }]
        });
        assert_eq!(inline_image_data(&payload), Some("QUJD"));
    }

    #[test]
    fn inline_data_snake_case() {
        let payload = json!({
            "candidates": [{
                "content": {"parts": [
                    {"inline_data": {"mime_type": "image/png", "data": "ZGVm"}}
                ]}
            }]
        });
        assert_eq!(inline_image_data(&payload), Some("ZGVm"));
    }

    #[test]
    fn text_only_reply_has_no_image() {
        let payload = json!({
            "candidates": [{"content": {"parts": [{"text": "no image"}]}}]
        });
        assert_eq!(inline_image_data(&payload), None);
    }

    // =========================================================================
    // Fallback copy tests
    // =========================================================================

    #[test]
    fn fallback_produces_requested_count() {
        assert_eq!(fallback_cards("tea", 0).len(), 0);
        assert_eq!(fallback_cards("tea", 2).len(), 2);
        assert_eq!(fallback_cards("tea", 7).len(), 7);
    }

    #[test]
    fn fallback_rotates_templates() {
        let cards = fallback_cards("tea", 4);
        assert_eq!(cards[0].title, "Today's insight");
        assert_eq!(cards[1].title, "One step at a time");
        assert_eq!(cards[2].title, "Worth remembering");
        assert_eq!(cards[3].title, cards[0].title);
    }

    #[test]
    fn fallback_embeds_topic() {
        let cards = fallback_cards("slow mornings", 3);
        for card in &cards {
            assert!(card.subtitle.contains("slow mornings"));
            assert!(card.image_prompt.contains("slow mornings"));
        }
    }

    #[test]
    fn blank_explicit_key_defers_to_environment() {
        // A blank key argument behaves like no argument at all.
        assert_eq!(resolve_key(Some("  ")), get_api_key());
        assert_eq!(resolve_key(Some("abc")), Some("abc".to_string()));
    }
}
