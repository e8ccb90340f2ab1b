//! # Cardforge
//!
//! A command-line composer for Instagram-sized promotional card images.
//! Feed it a title and a background source (an image file, a generation
//! prompt, or nothing at all) and it renders a square card with wrapped,
//! shadowed, band-centered text ready to post.
//!
//! # Architecture: Resolve, Then Render
//!
//! Every command runs the same two phases:
//!
//! ```text
//! 1. Resolve   flags + input records + config  →  render parameters
//! 2. Render    parameters                      →  JPEG/PNG on disk
//! ```
//!
//! Resolution is where all the precedence lives: CLI flags, JSON/CSV records,
//! the YAML config file, and stock defaults collapse into plain parameter
//! structs. Rendering is deterministic given those structs plus font files;
//! network sources (Gemini backgrounds, Figma frames) are fetched up front
//! and enter rendering as ordinary pixel buffers. That split keeps the
//! interesting logic testable without fonts, files, or HTTP.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`render`] | Card composition: placement math, text wrapping and rasterizing, backdrops |
//! | [`input`] | JSON/CSV record loading, prompt hints, output naming |
//! | [`config`] | Layered YAML configuration and the `config` subcommand plumbing |
//! | [`gemini`] | Gemini REST client for card copy and generated backgrounds |
//! | [`figma`] | Figma REST client for template layout and frame export |
//! | [`output`] | CLI output formatting: dry-run plans, progress, summaries |
//!
//! # Design Decisions
//!
//! ## Deterministic Fallbacks Over Hard Failures
//!
//! A card must render even on a bare machine: no API key, no fonts
//! installed, no background supplied. Backgrounds fall back to a gradient
//! seeded by hashing the prompt (same prompt, same gradient), generated copy
//! falls back to rotating stock templates, and fonts fall back to a search
//! over well-known names. The only hard rendering failure is text with no
//! usable font anywhere, because there is nothing sensible to draw.
//!
//! ## Bands, Not Baselines
//!
//! Standard cards place text by horizontal bands (title in the top 40% of
//! the canvas, subtitle between 38% and 75%) and center each wrapped block
//! inside its band. Bands keep unrelated blocks from interacting: a
//! three-line title never pushes the subtitle downward, it just fills more
//! of its own band. Brand cards instead stack bottom-up from the footer,
//! which is the layout that keeps short footers pinned to the margin.
//!
//! ## Blocking HTTP
//!
//! Cards render one at a time from a CLI, so both REST clients use
//! reqwest's blocking API. Call sites stay flat, errors stay synchronous,
//! and there is no runtime to keep alive between commands.
//!
//! ## One YAML Config File
//!
//! All tunables live in a single `config.yaml` under the platform config
//! directory (`CARDFORGE_CONFIG` overrides the location). The file is
//! deep-merged over stock defaults, so users write only the keys they
//! change; `cardforge config` reads and edits the same file.

pub mod config;
pub mod figma;
pub mod gemini;
pub mod input;
pub mod output;
pub mod render;
