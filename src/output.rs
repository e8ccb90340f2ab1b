//! CLI output formatting for card generation.
//!
//! Every command reports through this module so the texture stays uniform:
//! a `format_*` function returns displayable lines (pure, no I/O) and a
//! `print_*` wrapper writes them to stdout. Warnings go to stderr.
//!
//! # Output Format
//!
//! ## Dry-run plans
//!
//! A plan leads with the output path and dimensions, followed by indented
//! field lines. Empty fields are omitted rather than printed blank.
//!
//! ```text
//! [DRY-RUN] output/card_01.jpg (1080x1080)
//!     Title: Morning focus
//!     Subtitle: Start with one thing
//!     Background: generated from prompt "calm sunrise, photorealistic style"
//! ```
//!
//! ## Batch progress
//!
//! One line per record, 1-based zero-padded to match the `card_NN.jpg`
//! output names, with a closing summary that counts failures.
//!
//! ```text
//! 01 card_01.jpg
//! 02 skipped: a background_path or image_prompt is required
//! Saved 1 cards to output, 1 failed
//! ```
//!
//! ## Config display
//!
//! Values render as YAML, the same notation users write in the config file.

use std::path::{Path, PathBuf};

/// Where a card's backdrop comes from. Plans describe the source without
/// touching the network, so "generated" means "would be generated".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundSource {
    /// An image file supplied by the user.
    File(PathBuf),
    /// Generated from a prompt via the Gemini image model.
    Generated(String),
    /// Deterministic gradient seeded by a prompt.
    Gradient(String),
}

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based record index as 2-digit zero-padded, matching the
/// default batch output names.
fn format_index(pos: usize) -> String {
    format!("{:0>2}", pos)
}

/// Append an indented `Label: value` line, skipping blank values.
fn push_field(lines: &mut Vec<String>, label: &str, value: &str) {
    if !value.trim().is_empty() {
        lines.push(format!("    {label}: {value}"));
    }
}

fn describe_background(source: &BackgroundSource) -> String {
    match source {
        BackgroundSource::File(path) => format!("file {}", path.display()),
        BackgroundSource::Generated(prompt) => format!("generated from prompt \"{prompt}\""),
        BackgroundSource::Gradient(prompt) => format!("gradient seeded by \"{prompt}\""),
    }
}

// ============================================================================
// Dry-run plans
// ============================================================================

/// Format the resolved plan for a standard card.
pub fn format_card_plan(
    title: &str,
    subtitle: &str,
    background: &BackgroundSource,
    width: u32,
    height: u32,
    output: &Path,
) -> Vec<String> {
    let mut lines = vec![format!(
        "[DRY-RUN] {} ({width}x{height})",
        output.display()
    )];
    push_field(&mut lines, "Title", title);
    push_field(&mut lines, "Subtitle", subtitle);
    push_field(&mut lines, "Background", &describe_background(background));
    lines
}

/// Print a standard card plan to stdout.
pub fn print_card_plan(
    title: &str,
    subtitle: &str,
    background: &BackgroundSource,
    width: u32,
    height: u32,
    output: &Path,
) {
    for line in format_card_plan(title, subtitle, background, width, height, output) {
        println!("{}", line);
    }
}

/// Format the resolved plan for a brand card.
pub fn format_brand_card_plan(
    brand: &str,
    title: &str,
    subtitle: &str,
    footer: &str,
    background: &BackgroundSource,
    size: u32,
    output: &Path,
) -> Vec<String> {
    let mut lines = vec![format!("[DRY-RUN] {} ({size}x{size})", output.display())];
    push_field(&mut lines, "Brand", brand);
    push_field(&mut lines, "Title", title);
    push_field(&mut lines, "Subtitle", subtitle);
    push_field(&mut lines, "Footer", footer);
    push_field(&mut lines, "Background", &describe_background(background));
    lines
}

/// Print a brand card plan to stdout.
pub fn print_brand_card_plan(
    brand: &str,
    title: &str,
    subtitle: &str,
    footer: &str,
    background: &BackgroundSource,
    size: u32,
    output: &Path,
) {
    for line in format_brand_card_plan(brand, title, subtitle, footer, background, size, output) {
        println!("{}", line);
    }
}

/// Format the resolved plan for a Figma template card. `background` is
/// `None` when the rendered frame supplies its own backdrop.
pub fn format_figma_plan(
    file_key: &str,
    frame_id: &str,
    title: &str,
    subtitle: &str,
    business: &str,
    background: Option<&BackgroundSource>,
    output: &Path,
) -> Vec<String> {
    let mut lines = vec![format!(
        "[DRY-RUN] {} (frame {frame_id} of {file_key})",
        output.display()
    )];
    push_field(&mut lines, "Title", title);
    push_field(&mut lines, "Subtitle", subtitle);
    push_field(&mut lines, "Business", business);
    if let Some(source) = background {
        push_field(&mut lines, "Background", &describe_background(source));
    }
    lines
}

/// Print a Figma template plan to stdout.
pub fn print_figma_plan(
    file_key: &str,
    frame_id: &str,
    title: &str,
    subtitle: &str,
    business: &str,
    background: Option<&BackgroundSource>,
    output: &Path,
) {
    for line in format_figma_plan(
        file_key, frame_id, title, subtitle, business, background, output,
    ) {
        println!("{}", line);
    }
}

// ============================================================================
// Progress and summaries
// ============================================================================

/// Line printed after a card is written to disk.
pub fn format_saved(output: &Path) -> String {
    format!("Saved: {}", output.display())
}

/// Print a saved-card line to stdout.
pub fn print_saved(output: &Path) {
    println!("{}", format_saved(output));
}

/// One batch record rendered and saved.
pub fn format_batch_entry(index: usize, filename: &str) -> String {
    format!("{} {}", format_index(index), filename)
}

/// Print a batch success line to stdout.
pub fn print_batch_entry(index: usize, filename: &str) {
    println!("{}", format_batch_entry(index, filename));
}

/// One batch record skipped with a reason.
pub fn format_batch_failure(index: usize, reason: &str) -> String {
    format!("{} skipped: {}", format_index(index), reason)
}

/// Print a batch failure line to stdout.
pub fn print_batch_failure(index: usize, reason: &str) {
    println!("{}", format_batch_failure(index, reason));
}

/// Closing batch line counting saved and failed records.
pub fn format_batch_summary(saved: usize, failed: usize, output_dir: &Path) -> String {
    if failed == 0 {
        format!("Saved {} cards to {}", saved, output_dir.display())
    } else {
        format!(
            "Saved {} cards to {}, {} failed",
            saved,
            output_dir.display(),
            failed
        )
    }
}

/// Print the batch summary to stdout.
pub fn print_batch_summary(saved: usize, failed: usize, output_dir: &Path) {
    println!("{}", format_batch_summary(saved, failed, output_dir));
}

/// Warning line shown on stderr.
pub fn format_warning(message: &str) -> String {
    format!("Warning: {message}")
}

/// Print a warning to stderr.
pub fn print_warning(message: &str) {
    eprintln!("{}", format_warning(message));
}

// ============================================================================
// Config display
// ============================================================================

/// Render one config value as a `key: value` YAML entry. Nested values
/// render as an indented YAML block under the key.
pub fn format_config_value(key: &str, value: &serde_yaml::Value) -> String {
    let mut entry = serde_yaml::Mapping::new();
    entry.insert(serde_yaml::Value::String(key.to_string()), value.clone());
    serde_yaml::to_string(&serde_yaml::Value::Mapping(entry))
        .expect("config values must serialize")
        .trim_end()
        .to_string()
}

/// Print one config value to stdout.
pub fn print_config_value(key: &str, value: &serde_yaml::Value) {
    println!("{}", format_config_value(key, value));
}

/// Render the effective config as YAML lines.
pub fn format_config_listing(config: &serde_yaml::Value) -> Vec<String> {
    serde_yaml::to_string(config)
        .expect("config values must serialize")
        .trim_end()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Print the effective config to stdout.
pub fn print_config_listing(config: &serde_yaml::Value) {
    for line in format_config_listing(config) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Plan formatting tests
    // =========================================================================

    #[test]
    fn card_plan_lists_all_fields() {
        let lines = format_card_plan(
            "Morning focus",
            "Start with one thing",
            &BackgroundSource::Generated("calm sunrise".to_string()),
            1080,
            1080,
            Path::new("output/card_01.jpg"),
        );
        assert_eq!(lines[0], "[DRY-RUN] output/card_01.jpg (1080x1080)");
        assert_eq!(lines[1], "    Title: Morning focus");
        assert_eq!(lines[2], "    Subtitle: Start with one thing");
        assert_eq!(
            lines[3],
            "    Background: generated from prompt \"calm sunrise\""
        );
    }

    #[test]
    fn card_plan_skips_blank_subtitle() {
        let lines = format_card_plan(
            "Title only",
            "  ",
            &BackgroundSource::File(PathBuf::from("bg.png")),
            800,
            600,
            Path::new("card.jpg"),
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "    Title: Title only");
        assert_eq!(lines[2], "    Background: file bg.png");
    }

    #[test]
    fn brand_card_plan_is_square() {
        let lines = format_brand_card_plan(
            "ACME",
            "Launch day",
            "",
            "acme.example",
            &BackgroundSource::Gradient("brand-card".to_string()),
            512,
            Path::new("brand.png"),
        );
        assert_eq!(lines[0], "[DRY-RUN] brand.png (512x512)");
        assert_eq!(lines[1], "    Brand: ACME");
        assert_eq!(lines[2], "    Title: Launch day");
        assert_eq!(lines[3], "    Footer: acme.example");
        assert_eq!(lines[4], "    Background: gradient seeded by \"brand-card\"");
    }

    #[test]
    fn figma_plan_names_the_frame() {
        let lines = format_figma_plan(
            "a1b2c3",
            "12:34",
            "Title",
            "",
            "Acme Studio",
            None,
            Path::new("figma.png"),
        );
        assert_eq!(lines[0], "[DRY-RUN] figma.png (frame 12:34 of a1b2c3)");
        assert_eq!(lines[1], "    Title: Title");
        assert_eq!(lines[2], "    Business: Acme Studio");
    }

    #[test]
    fn figma_plan_shows_optional_background() {
        let lines = format_figma_plan(
            "key",
            "1:1",
            "T",
            "",
            "",
            Some(&BackgroundSource::Gradient("brand-card".to_string())),
            Path::new("out.png"),
        );
        assert_eq!(
            lines.last().unwrap(),
            "    Background: gradient seeded by \"brand-card\""
        );
    }

    // =========================================================================
    // Progress line tests
    // =========================================================================

    #[test]
    fn saved_line_shows_path() {
        assert_eq!(
            format_saved(Path::new("output/card.jpg")),
            "Saved: output/card.jpg"
        );
    }

    #[test]
    fn batch_lines_pad_the_index() {
        assert_eq!(format_batch_entry(3, "card_03.jpg"), "03 card_03.jpg");
        assert_eq!(format_batch_entry(12, "card_12.jpg"), "12 card_12.jpg");
        assert_eq!(
            format_batch_failure(2, "no background"),
            "02 skipped: no background"
        );
    }

    #[test]
    fn batch_summary_counts_failures() {
        assert_eq!(
            format_batch_summary(5, 0, Path::new("output")),
            "Saved 5 cards to output"
        );
        assert_eq!(
            format_batch_summary(4, 1, Path::new("output")),
            "Saved 4 cards to output, 1 failed"
        );
    }

    #[test]
    fn warning_is_prefixed() {
        assert_eq!(
            format_warning("no Gemini API key; using gradient backgrounds"),
            "Warning: no Gemini API key; using gradient backgrounds"
        );
    }

    // =========================================================================
    // Config display tests
    // =========================================================================

    #[test]
    fn scalar_config_value_is_one_line() {
        let value = serde_yaml::Value::Number(72.into());
        assert_eq!(
            format_config_value("fonts.title.size", &value),
            "fonts.title.size: 72"
        );
    }

    #[test]
    fn null_config_value_renders_as_null() {
        assert_eq!(
            format_config_value("missing.key", &serde_yaml::Value::Null),
            "missing.key: null"
        );
    }

    #[test]
    fn nested_config_value_renders_as_block() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("width: 1080\nheight: 1080").unwrap();
        let rendered = format_config_value("image", &value);
        assert!(rendered.starts_with("image:"));
        assert!(rendered.contains("\n  width: 1080"));
        assert!(rendered.contains("\n  height: 1080"));
    }

    #[test]
    fn listing_splits_lines() {
        let value: serde_yaml::Value = serde_yaml::from_str("a: 1\nb: two").unwrap();
        let lines = format_config_listing(&value);
        assert_eq!(lines, vec!["a: 1", "b: two"]);
    }

    #[test]
    fn background_descriptions() {
        assert_eq!(
            describe_background(&BackgroundSource::File(PathBuf::from("x/y.png"))),
            "file x/y.png"
        );
        assert_eq!(
            describe_background(&BackgroundSource::Generated("p".to_string())),
            "generated from prompt \"p\""
        );
        assert_eq!(
            describe_background(&BackgroundSource::Gradient("p".to_string())),
            "gradient seeded by \"p\""
        );
    }
}
