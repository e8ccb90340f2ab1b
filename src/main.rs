use cardforge::config::{self, AppConfig};
use cardforge::figma::FigmaClient;
use cardforge::gemini;
use cardforge::input::{self, CardRecord};
use cardforge::output::{self, BackgroundSource};
use cardforge::render::{
    BrandCardParams, CardContent, CardFonts, FontStore, RenderOptions, TextBlock, background,
    compose_brand_card, compose_card, draw_text_blocks,
};
use clap::{Parser, Subcommand};
use image::{Rgba, RgbaImage};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Shared flags for commands that render standard cards.
#[derive(clap::Args, Clone)]
struct RenderArgs {
    /// Output size as WIDTHxHEIGHT (defaults to the configured size)
    #[arg(long)]
    size: Option<String>,

    /// Skip the dark band behind the text
    #[arg(long)]
    no_overlay: bool,

    /// Skip the drop shadow behind the text
    #[arg(long)]
    no_shadow: bool,

    /// Print what would be rendered without writing any file
    #[arg(long)]
    dry_run: bool,
}

#[derive(Parser)]
#[command(name = "cardforge")]
#[command(about = "Compose Instagram-sized promotional card images")]
#[command(long_about = "\
Compose Instagram-sized promotional card images

Text comes from flags or JSON/CSV records; the background comes from the
first source available: a local image file, a Gemini-generated image, or a
deterministic gradient seeded by the prompt. Without GEMINI_API_KEY every
card still renders; backgrounds fall back to gradients.

Record keys (JSON object, JSON array element, or CSV row):

  title             main heading
  subtitle          supporting line under the title
  image_prompt      background description for Gemini
  background        path to a local background image
  output            target file for the rendered card
  brand_text        brand line (brand cards)
  footer_text       footer line (brand cards)

Configuration is a YAML file resolved from --config, $CARDFORGE_CONFIG, or
the platform config directory. 'cardforge config' prints the effective
values; 'cardforge config --set fonts.title.size 80' edits them.")]
#[command(version)]
struct Cli {
    /// Config file or directory (defaults to the platform config dir)
    #[arg(long, env = config::CONFIG_ENV, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a single card from flags or a JSON record
    Create(CreateArgs),
    /// Render every record in a JSON or CSV file
    Batch(BatchArgs),
    /// Write card copy with Gemini, then render each card
    Generate(GenerateArgs),
    /// Render a square brand card with corner-anchored text
    BrandCard(BrandCardArgs),
    /// Render text into a Figma template frame
    Figma(FigmaArgs),
    /// Show or edit the YAML configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
struct CreateArgs {
    /// Card title
    #[arg(long)]
    title: Option<String>,

    /// Supporting line under the title
    #[arg(long)]
    subtitle: Option<String>,

    /// Background description for Gemini
    #[arg(long)]
    image_prompt: Option<String>,

    /// Local background image file
    #[arg(long)]
    background_path: Option<PathBuf>,

    /// JSON record supplying any of the fields above
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output file (defaults to card_<timestamp>.jpg)
    #[arg(long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(clap::Args)]
struct BatchArgs {
    /// JSON array or CSV file of card records
    #[arg(long)]
    input: PathBuf,

    /// Directory receiving the rendered cards
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Topic to write cards about
    #[arg(long)]
    topic: String,

    /// Number of cards to generate
    #[arg(long, default_value_t = 3)]
    count: usize,

    /// Writing style hint, e.g. "motivational"
    #[arg(long)]
    style: Option<String>,

    /// Directory receiving the rendered cards
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(clap::Args)]
struct BrandCardArgs {
    /// Brand line drawn top-right
    #[arg(long, default_value = "")]
    brand_text: String,

    /// Card title
    #[arg(long)]
    title: Option<String>,

    /// Supporting line under the title
    #[arg(long, default_value = "")]
    subtitle: String,

    /// Footer line drawn bottom-right
    #[arg(long, default_value = "")]
    footer_text: String,

    /// Local background image file
    #[arg(long)]
    background_path: Option<PathBuf>,

    /// Background description for Gemini
    #[arg(long)]
    image_prompt: Option<String>,

    /// JSON record supplying any of the fields above
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output file (defaults to brand_card_<timestamp>.png)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Square side length in pixels
    #[arg(long, default_value_t = 512)]
    size: u32,

    /// Background overlay alpha, 0-255 (defaults to the configured value)
    #[arg(long)]
    overlay_alpha: Option<u8>,

    /// Skip the background overlay
    #[arg(long)]
    no_overlay: bool,

    /// Draw drop shadows behind the text
    #[arg(long)]
    shadow: bool,

    /// Print what would be rendered without writing any file
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args)]
struct FigmaArgs {
    /// Text for the title slot
    #[arg(long)]
    title: String,

    /// Text for the subtitle slot
    #[arg(long, default_value = "")]
    subtitle: String,

    /// Text for the business slot
    #[arg(long, default_value = "")]
    business: String,

    /// Figma file key (defaults to figma.file_key in the config)
    #[arg(long)]
    file_key: Option<String>,

    /// Frame node id (defaults to figma.frame_id in the config)
    #[arg(long)]
    frame_id: Option<String>,

    /// Export scale (defaults to figma.scale in the config)
    #[arg(long)]
    scale: Option<f64>,

    /// Image pasted into the template's background layers
    #[arg(long)]
    background_path: Option<PathBuf>,

    /// Background description for Gemini
    #[arg(long)]
    image_prompt: Option<String>,

    /// Output file (defaults to figma_card_<timestamp>.png)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print what would be rendered without writing any file
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Print the value at a dotted key (repeatable)
    #[arg(long, value_name = "KEY")]
    get: Vec<String>,

    /// Set a dotted key to a YAML scalar value (repeatable)
    #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
    set: Vec<String>,

    /// Restore the stock defaults
    #[arg(long)]
    reset: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = config::effective_config_path(cli.config.as_deref());

    match cli.command {
        Command::Create(args) => run_create(args, &config_path),
        Command::Batch(args) => run_batch(args, &config_path),
        Command::Generate(args) => run_generate(args, &config_path),
        Command::BrandCard(args) => run_brand_card(args, &config_path),
        Command::Figma(args) => run_figma(args, &config_path),
        Command::Config(args) => run_config(args, &config_path),
    }
}

/// A bad flag or input value, reported as a plain one-line message.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UsageError(String);

fn usage(message: impl Into<String>) -> Box<dyn std::error::Error> {
    Box::new(UsageError(message.into()))
}

fn run_create(args: CreateArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(config_path)?;
    let record = match &args.input {
        Some(path) => input::load_record(path)?,
        None => CardRecord::default(),
    };

    // Record text wins over flags: the record is the card, flags fill gaps.
    let title = first_non_blank(record.title.as_deref(), args.title.as_deref());
    let subtitle = first_non_blank(record.subtitle.as_deref(), args.subtitle.as_deref());
    let prompt_raw = first_non_blank(record.image_prompt.as_deref(), args.image_prompt.as_deref());
    let prompt = input::ensure_realistic_prompt(Some(prompt_raw.as_str()));
    if title.is_empty() {
        return Err(usage(
            "a title is required; pass --title or put one in the input record",
        ));
    }

    // The paths go the other way: an explicit --background-path or --output
    // wins over the record.
    let background_path = args
        .background_path
        .clone()
        .or_else(|| record.background_path.as_ref().map(PathBuf::from));
    let output = args
        .output
        .clone()
        .or_else(|| record.output.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(input::default_card_name()));

    let options = build_render_options(&config, &args.render)?;
    let api_key = gemini::get_api_key();
    let source = background_source_for(background_path, prompt.as_deref(), api_key.as_deref())?
        .ok_or_else(|| usage("a background path or an image prompt is required"))?;

    let mut ctx = RenderContext::new(&config, options, api_key);
    let job = CardJob {
        title,
        subtitle,
        prompt,
        source,
        output,
    };
    if let Some(path) = run_card_job(&mut ctx, job, args.render.dry_run)? {
        output::print_saved(&path);
    }
    Ok(())
}

fn run_batch(args: BatchArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(config_path)?;
    let records = input::load_records(&args.input)?;
    if records.is_empty() {
        return Err(usage("no card records found in the input file"));
    }

    let options = build_render_options(&config, &args.render)?;
    if !args.render.dry_run {
        std::fs::create_dir_all(&args.output_dir)?;
    }

    let api_key = gemini::get_api_key();
    let mut ctx = RenderContext::new(&config, options, api_key);
    let mut saved = 0usize;
    let mut failed = 0usize;
    for (index, record) in records.into_iter().enumerate() {
        let index = index + 1;
        let filename = record
            .output
            .clone()
            .unwrap_or_else(|| input::batch_card_name(index));
        match render_batch_record(&mut ctx, record, &args.output_dir, &filename, args.render.dry_run)
        {
            Ok(Some(_)) => {
                output::print_batch_entry(index, &filename);
                saved += 1;
            }
            Ok(None) => {}
            Err(err) => {
                output::print_batch_failure(index, &err.to_string());
                failed += 1;
            }
        }
    }

    if !args.render.dry_run {
        output::print_batch_summary(saved, failed, &args.output_dir);
        if saved == 0 {
            return Err(usage("every card in the batch failed"));
        }
    }
    Ok(())
}

fn run_generate(args: GenerateArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(config_path)?;
    let options = build_render_options(&config, &args.render)?;
    let api_key = gemini::get_api_key();
    let cards = gemini::generate_cards(
        &args.topic,
        args.count,
        args.style.as_deref(),
        &config.gemini.model,
        api_key.as_deref(),
    );

    if !args.render.dry_run {
        std::fs::create_dir_all(&args.output_dir)?;
    }

    let mut ctx = RenderContext::new(&config, options, api_key);
    for (index, card) in cards.into_iter().enumerate() {
        let filename = input::topic_card_name(&args.topic, index + 1);
        // Model-authored prompts are used verbatim, without the realism hint.
        let prompt = Some(card.image_prompt).filter(|p| !p.trim().is_empty());
        let source = background_source_for(None, prompt.as_deref(), ctx.api_key.as_deref())?
            .unwrap_or_else(|| {
                BackgroundSource::Gradient(background::DEFAULT_GRADIENT_PROMPT.to_string())
            });
        let job = CardJob {
            title: card.title,
            subtitle: card.subtitle,
            prompt,
            source,
            output: args.output_dir.join(&filename),
        };
        if run_card_job(&mut ctx, job, args.render.dry_run)?.is_some() {
            output::print_saved(Path::new(&filename));
        }
    }
    Ok(())
}

fn run_brand_card(
    args: BrandCardArgs,
    config_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(config_path)?;
    if args.size == 0 {
        return Err(usage("--size must be at least 1"));
    }
    let record = match &args.input {
        Some(path) => input::load_record(path)?,
        None => CardRecord::default(),
    };

    // Brand cards resolve the other way around: flags win, the record fills gaps.
    let brand = first_non_blank(Some(args.brand_text.as_str()), record.brand.as_deref());
    let title = first_non_blank(args.title.as_deref(), record.title.as_deref());
    let subtitle = first_non_blank(Some(args.subtitle.as_str()), record.subtitle.as_deref());
    let footer = first_non_blank(Some(args.footer_text.as_str()), record.footer.as_deref());
    if title.is_empty() {
        return Err(usage(
            "a title is required; pass --title or put one in the input record",
        ));
    }

    let prompt_raw = first_non_blank(args.image_prompt.as_deref(), record.image_prompt.as_deref());
    let prompt = input::ensure_realistic_prompt(Some(prompt_raw.as_str()));
    let background_path = args
        .background_path
        .clone()
        .or_else(|| record.background_path.as_ref().map(PathBuf::from));
    let output = args
        .output
        .clone()
        .or_else(|| record.output.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(input::default_brand_card_name()));

    let overlay_alpha = args.overlay_alpha.unwrap_or(config.brand_card.overlay_alpha);
    let overlay_off = args.no_overlay || !config.brand_card.overlay;
    let shadow = args.shadow || config.brand_card.shadow;

    let api_key = gemini::get_api_key();
    let source = background_source_for(background_path, prompt.as_deref(), api_key.as_deref())?
        .ok_or_else(|| usage("a background path or an image prompt is required"))?;

    if args.dry_run {
        output::print_brand_card_plan(
            &brand, &title, &subtitle, &footer, &source, args.size, &output,
        );
        return Ok(());
    }

    let mut warnings = Warnings::default();
    let (bg_path, bg_image) = match source {
        BackgroundSource::File(path) => (Some(path), None),
        _ => {
            let generated = maybe_generate_background(
                prompt.as_deref(),
                args.size,
                args.size,
                &config,
                api_key.as_deref(),
                &mut warnings,
            );
            let image = generated.unwrap_or_else(|| {
                background::gradient_for_prompt(
                    args.size,
                    args.size,
                    prompt.as_deref().unwrap_or("brand-card"),
                )
            });
            (None, Some(image))
        }
    };

    let params = BrandCardParams {
        brand_text: brand,
        title_text: title,
        subtitle_text: subtitle,
        footer_text: footer,
        background_path: bg_path,
        background_image: bg_image,
        size: args.size,
        fonts: config.brand_overrides(),
        overlay: (!overlay_off).then_some(Rgba([255, 255, 255, overlay_alpha])),
        shadow,
    };
    let store = FontStore::new(config.fonts_dir.clone());
    let image = compose_brand_card(&params, &store)?;
    ensure_parent_dir(&output)?;
    image.save(&output)?;
    output::print_saved(&output);
    Ok(())
}

fn run_figma(args: FigmaArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(config_path)?;
    let figma_cfg = &config.figma;

    let file_key = first_non_blank(args.file_key.as_deref(), Some(figma_cfg.file_key.as_str()));
    let frame_id = first_non_blank(args.frame_id.as_deref(), Some(figma_cfg.frame_id.as_str()));
    if file_key.is_empty() || frame_id.is_empty() {
        return Err(usage(
            "a Figma file key and frame id are required; pass --file-key and --frame-id or set figma.file_key and figma.frame_id",
        ));
    }
    let scale = args.scale.unwrap_or(figma_cfg.scale);
    if scale <= 0.0 {
        return Err(usage("--scale must be positive"));
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(input::default_figma_card_name()));
    let prompt = input::ensure_realistic_prompt(args.image_prompt.as_deref());
    let api_key = gemini::get_api_key();
    let source = background_source_for(
        args.background_path.clone(),
        prompt.as_deref(),
        api_key.as_deref(),
    )?;

    if args.dry_run {
        output::print_figma_plan(
            &file_key,
            &frame_id,
            &args.title,
            &args.subtitle,
            &args.business,
            source.as_ref(),
            &output,
        );
        return Ok(());
    }

    let client = FigmaClient::from_env()?;
    let mut slot_ids = BTreeMap::new();
    slot_ids.insert("title".to_string(), figma_cfg.nodes.title.clone());
    slot_ids.insert("subtitle".to_string(), figma_cfg.nodes.subtitle.clone());
    slot_ids.insert("business".to_string(), figma_cfg.nodes.business.clone());
    let template =
        client.fetch_layout(&file_key, &frame_id, &slot_ids, &figma_cfg.backgrounds, scale)?;
    let mut canvas = client.render_frame(&file_key, &frame_id, &figma_cfg.format, scale)?;

    let mut warnings = Warnings::default();
    if let Some(source) = source {
        let boxes = template.background_boxes();
        if boxes.is_empty() {
            warnings.warn_once(
                "figma-no-background-layers",
                "the template has no background layers; the background is ignored",
            );
        } else {
            let image = match source {
                BackgroundSource::File(path) => image::open(&path)?.to_rgba8(),
                _ => maybe_generate_background(
                    prompt.as_deref(),
                    canvas.width(),
                    canvas.height(),
                    &config,
                    api_key.as_deref(),
                    &mut warnings,
                )
                .unwrap_or_else(|| {
                    background::gradient_for_prompt(
                        canvas.width(),
                        canvas.height(),
                        prompt.as_deref().unwrap_or(""),
                    )
                }),
            };
            for region in boxes {
                let fitted = background::fit_box(&image, region.width, region.height);
                image::imageops::replace(
                    &mut canvas,
                    &fitted,
                    i64::from(region.x),
                    i64::from(region.y),
                );
            }
        }
    }

    let store = FontStore::new(config.fonts_dir.clone());
    let mut blocks = Vec::new();
    let slots = [
        ("title", args.title.as_str(), &config.fonts.title),
        ("subtitle", args.subtitle.as_str(), &config.fonts.subtitle),
        ("business", args.business.as_str(), &config.fonts.business),
    ];
    for (slot, text, font) in slots {
        if text.trim().is_empty() {
            continue;
        }
        // Slots the template does not provide are skipped, not errors.
        let Some(region) = template.slot_box(slot) else {
            continue;
        };
        blocks.push(TextBlock {
            text: text.to_string(),
            font: font.to_spec(),
            region,
            fill: None,
        });
    }
    draw_text_blocks(&mut canvas, &blocks, false, None, &store)?;

    ensure_parent_dir(&output)?;
    let jpeg = output
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
    if jpeg {
        image::DynamicImage::ImageRgba8(canvas).to_rgb8().save(&output)?;
    } else {
        canvas.save(&output)?;
    }
    output::print_saved(&output);
    Ok(())
}

fn run_config(args: ConfigArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if args.reset {
        config::reset_config(config_path)?;
        println!("Configuration reset to defaults");
    }

    if !args.set.is_empty() {
        let mut updates = Value::Mapping(serde_yaml::Mapping::new());
        for pair in args.set.chunks(2) {
            let [key, value] = pair else {
                return Err(usage("--set expects KEY VALUE pairs"));
            };
            updates =
                config::merge_yaml(updates, config::overlay_for(key, config::parse_scalar(value)));
        }
        config::update_config(config_path, updates)?;
    }

    if !args.get.is_empty() {
        let effective = config::effective_value(config_path)?;
        for key in &args.get {
            let value = config::get_path(&effective, key)
                .cloned()
                .unwrap_or(Value::Null);
            output::print_config_value(key, &value);
        }
        return Ok(());
    }

    if args.set.is_empty() && !args.reset {
        output::print_config_listing(&config::effective_value(config_path)?);
    }
    Ok(())
}

/// Per-run state shared by every standard-card render.
struct RenderContext<'a> {
    config: &'a AppConfig,
    options: RenderOptions,
    fonts: CardFonts,
    store: FontStore,
    api_key: Option<String>,
    warnings: Warnings,
}

impl<'a> RenderContext<'a> {
    fn new(config: &'a AppConfig, options: RenderOptions, api_key: Option<String>) -> Self {
        Self {
            fonts: config.card_fonts(),
            store: FontStore::new(config.fonts_dir.clone()),
            config,
            options,
            api_key,
            warnings: Warnings::default(),
        }
    }
}

/// A fully resolved standard-card render: everything decided, nothing loaded.
struct CardJob {
    title: String,
    subtitle: String,
    prompt: Option<String>,
    source: BackgroundSource,
    output: PathBuf,
}

/// Render one standard card, or print its plan when `dry_run` is set.
///
/// Returns the written path, or `None` for a dry run.
fn run_card_job(
    ctx: &mut RenderContext,
    job: CardJob,
    dry_run: bool,
) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    if dry_run {
        output::print_card_plan(
            &job.title,
            &job.subtitle,
            &job.source,
            ctx.options.width,
            ctx.options.height,
            &job.output,
        );
        return Ok(None);
    }

    let (background_path, background_image) = match job.source {
        BackgroundSource::File(path) => (Some(path), None),
        _ => {
            let image = maybe_generate_background(
                job.prompt.as_deref(),
                ctx.options.width,
                ctx.options.height,
                ctx.config,
                ctx.api_key.as_deref(),
                &mut ctx.warnings,
            );
            (None, image)
        }
    };
    let content = CardContent {
        title: job.title,
        subtitle: job.subtitle,
        prompt: job.prompt,
        background_path,
        background_image,
    };
    let image = compose_card(&content, &ctx.fonts, &ctx.options, &ctx.store)?;
    image.save(&job.output)?;
    Ok(Some(job.output))
}

/// Resolve and render one batch record. Failures are reported by the caller
/// and do not stop the run.
fn render_batch_record(
    ctx: &mut RenderContext,
    record: CardRecord,
    output_dir: &Path,
    filename: &str,
    dry_run: bool,
) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let prompt = input::ensure_realistic_prompt(record.image_prompt.as_deref());
    let background_path = record.background_path.as_ref().map(PathBuf::from);
    let source = background_source_for(background_path, prompt.as_deref(), ctx.api_key.as_deref())?
        .ok_or_else(|| usage("a background path or an image prompt is required"))?;
    let job = CardJob {
        title: record.title.unwrap_or_default(),
        subtitle: record.subtitle.unwrap_or_default(),
        prompt,
        source,
        output: output_dir.join(filename),
    };
    run_card_job(ctx, job, dry_run)
}

/// Resolve width/height/overlay/shadow from the config plus shared flags.
fn build_render_options(
    config: &AppConfig,
    args: &RenderArgs,
) -> Result<RenderOptions, Box<dyn std::error::Error>> {
    let (width, height) = match &args.size {
        Some(size) => parse_size(size)?,
        None => (config.image.width, config.image.height),
    };
    Ok(RenderOptions {
        width,
        height,
        overlay: config.image.overlay && !args.no_overlay,
        shadow: !args.no_shadow,
    })
}

/// Parse a `WIDTHxHEIGHT` flag value, e.g. `1080x1350`.
fn parse_size(size: &str) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let lowered = size.to_lowercase();
    let parsed = lowered
        .split_once('x')
        .and_then(|(w, h)| Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?)));
    match parsed {
        Some((width, height)) if width > 0 && height > 0 => Ok((width, height)),
        _ => Err(usage(format!("size must look like 1080x1080, got '{size}'"))),
    }
}

/// First value that is non-blank after trimming, or an empty string.
fn first_non_blank(primary: Option<&str>, fallback: Option<&str>) -> String {
    for value in [primary, fallback].into_iter().flatten() {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    String::new()
}

/// Decide where the card background will come from.
///
/// A file path must exist; otherwise a non-blank prompt maps to a Gemini
/// generation when an API key is present and to a gradient when not.
/// `None` means the caller has nothing to build a background from.
fn background_source_for(
    path: Option<PathBuf>,
    prompt: Option<&str>,
    api_key: Option<&str>,
) -> Result<Option<BackgroundSource>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        if !path.is_file() {
            return Err(usage(format!(
                "background image not found: {}",
                path.display()
            )));
        }
        return Ok(Some(BackgroundSource::File(path)));
    }
    match prompt {
        Some(prompt) if !prompt.trim().is_empty() => Ok(Some(if api_key.is_some() {
            BackgroundSource::Generated(prompt.to_string())
        } else {
            BackgroundSource::Gradient(prompt.to_string())
        })),
        _ => Ok(None),
    }
}

/// Ask Gemini for a background, degrading to `None` so the caller can fall
/// back to a gradient. Each failure mode warns once per run.
fn maybe_generate_background(
    prompt: Option<&str>,
    width: u32,
    height: u32,
    config: &AppConfig,
    api_key: Option<&str>,
    warnings: &mut Warnings,
) -> Option<RgbaImage> {
    let prompt = match prompt {
        Some(text) if !text.trim().is_empty() => text,
        _ => return None,
    };
    let Some(key) = api_key else {
        warnings.warn_once(
            "gemini-missing",
            "GEMINI_API_KEY is not set; backgrounds fall back to gradients",
        );
        return None;
    };
    let ratio = cardforge::render::layout::aspect_ratio_label(width, height);
    match gemini::generate_background(prompt, &ratio, &config.gemini.image_model, Some(key)) {
        Ok(image) => Some(image),
        Err(gemini::GeminiError::NotConfigured) => {
            warnings.warn_once(
                "gemini-missing",
                "GEMINI_API_KEY is not set; backgrounds fall back to gradients",
            );
            None
        }
        Err(err) => {
            warnings.warn_once(
                "gemini-background-failed",
                &format!("background generation failed ({err}); using a gradient instead"),
            );
            None
        }
    }
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Deduplicates user-facing warnings across a multi-card run.
#[derive(Default)]
struct Warnings(HashSet<String>);

impl Warnings {
    fn warn_once(&mut self, key: &str, message: &str) {
        if self.0.insert(key.to_string()) {
            output::print_warning(message);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Size parsing
    // ------------------------------------------------------------------------

    #[test]
    fn parse_size_accepts_width_x_height() {
        assert_eq!(parse_size("1080x1350").ok(), Some((1080, 1350)));
    }

    #[test]
    fn parse_size_is_case_insensitive_and_trims() {
        assert_eq!(parse_size("1080X1350").ok(), Some((1080, 1350)));
        assert_eq!(parse_size("1080 x 1350").ok(), Some((1080, 1350)));
    }

    #[test]
    fn parse_size_rejects_garbage_and_zero() {
        assert!(parse_size("square").is_err());
        assert!(parse_size("1080").is_err());
        assert!(parse_size("0x1080").is_err());
        assert!(parse_size("1080x").is_err());
    }

    // ------------------------------------------------------------------------
    // Value resolution
    // ------------------------------------------------------------------------

    #[test]
    fn first_non_blank_prefers_the_primary() {
        assert_eq!(first_non_blank(Some("a"), Some("b")), "a");
        assert_eq!(first_non_blank(Some("  "), Some("b")), "b");
        assert_eq!(first_non_blank(None, Some(" b ")), "b");
        assert_eq!(first_non_blank(None, None), "");
    }

    #[test]
    fn background_source_requires_the_file_to_exist() {
        let result = background_source_for(Some(PathBuf::from("/no/such/card.png")), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn background_source_uses_the_file_when_present() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bg.png");
        std::fs::write(&path, b"not really a png").unwrap();
        let source = background_source_for(Some(path.clone()), Some("ignored"), None).unwrap();
        assert_eq!(source, Some(BackgroundSource::File(path)));
    }

    #[test]
    fn background_source_splits_on_api_key_presence() {
        let generated = background_source_for(None, Some("sunrise"), Some("key")).unwrap();
        assert_eq!(
            generated,
            Some(BackgroundSource::Generated("sunrise".to_string()))
        );
        let gradient = background_source_for(None, Some("sunrise"), None).unwrap();
        assert_eq!(
            gradient,
            Some(BackgroundSource::Gradient("sunrise".to_string()))
        );
    }

    #[test]
    fn background_source_ignores_blank_prompts() {
        assert_eq!(background_source_for(None, Some("  "), None).unwrap(), None);
        assert_eq!(
            background_source_for(None, None, Some("key")).unwrap(),
            None
        );
    }

    // ------------------------------------------------------------------------
    // Warning dedup
    // ------------------------------------------------------------------------

    #[test]
    fn warnings_fire_once_per_key() {
        let mut warnings = Warnings::default();
        warnings.warn_once("k", "first");
        warnings.warn_once("k", "second");
        warnings.warn_once("other", "third");
        assert_eq!(warnings.0.len(), 2);
    }

    #[test]
    fn usage_error_displays_the_message_alone() {
        let err = usage("a title is required");
        assert_eq!(err.to_string(), "a title is required");
    }

    #[test]
    fn exit_errors_print_the_bare_message() {
        // `main` reports failures with this exact line.
        let err = usage("background image not found: /tmp/bg.png");
        let line = format!("Error: {err}");
        assert_eq!(line, "Error: background image not found: /tmp/bg.png");
        assert!(!line.contains("UsageError"));
    }

    // ------------------------------------------------------------------------
    // Command runs
    // ------------------------------------------------------------------------

    /// A font most Linux systems carry; tests that draw real glyphs skip
    /// when none is present.
    fn system_font() -> Option<PathBuf> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        ]
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(Path::to_path_buf)
    }

    fn solid_background(dir: &Path) -> PathBuf {
        let path = dir.join("bg.png");
        RgbaImage::from_pixel(24, 24, Rgba([40, 90, 140, 255]))
            .save(&path)
            .unwrap();
        path
    }

    fn render_args(size: Option<&str>, dry_run: bool) -> RenderArgs {
        RenderArgs {
            size: size.map(str::to_string),
            no_overlay: false,
            no_shadow: false,
            dry_run,
        }
    }

    fn create_args(
        background_path: Option<PathBuf>,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        render: RenderArgs,
    ) -> CreateArgs {
        CreateArgs {
            title: None,
            subtitle: None,
            image_prompt: None,
            background_path,
            input,
            output,
            render,
        }
    }

    #[test]
    fn create_prefers_the_flag_background_over_the_record() {
        let dir = tempfile::TempDir::new().unwrap();
        let bg = solid_background(dir.path());
        let record = dir.path().join("card.json");
        std::fs::write(
            &record,
            serde_json::json!({
                "title": "Launch day",
                "background_path": dir.path().join("missing.png")
            })
            .to_string(),
        )
        .unwrap();
        let config = dir.path().join("config.yaml");

        // The record names a dead file; the flag's file wins.
        let args = create_args(Some(bg), Some(record.clone()), None, render_args(None, true));
        run_create(args, &config).unwrap();

        // Without the flag the record's path is used and must exist.
        let args = create_args(None, Some(record), None, render_args(None, true));
        assert!(run_create(args, &config).is_err());
    }

    #[test]
    fn create_prefers_the_flag_output_over_the_record() {
        let Some(font) = system_font() else {
            return;
        };
        let dir = tempfile::TempDir::new().unwrap();
        let bg = solid_background(dir.path());
        let record_out = dir.path().join("record.jpg");
        let flag_out = dir.path().join("flag.jpg");
        let record = dir.path().join("card.json");
        std::fs::write(
            &record,
            serde_json::json!({
                "title": "Launch day",
                "background_path": bg,
                "output": record_out
            })
            .to_string(),
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.fonts.title.path = Some(font.clone());
        config.fonts.subtitle.path = Some(font);
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, serde_yaml::to_string(&config).unwrap()).unwrap();

        let args = create_args(
            None,
            Some(record),
            Some(flag_out.clone()),
            render_args(Some("96x96"), false),
        );
        run_create(args, &config_path).unwrap();

        assert!(flag_out.is_file());
        assert!(!record_out.exists());
    }

    #[test]
    fn batch_skips_failed_records_and_keeps_going() {
        let dir = tempfile::TempDir::new().unwrap();
        let bg = solid_background(dir.path());
        let input = dir.path().join("cards.json");
        // A text-free good record needs no font files.
        std::fs::write(
            &input,
            serde_json::json!([
                {"title": "Bad", "background_path": dir.path().join("missing.png")},
                {"background_path": bg}
            ])
            .to_string(),
        )
        .unwrap();
        let out_dir = dir.path().join("cards");

        let args = BatchArgs {
            input,
            output_dir: out_dir.clone(),
            render: render_args(Some("64x64"), false),
        };
        run_batch(args, &dir.path().join("config.yaml")).unwrap();

        // The bad record is skipped; the good one still renders.
        assert!(!out_dir.join("card_01.jpg").exists());
        assert!(out_dir.join("card_02.jpg").is_file());
    }

    #[test]
    fn batch_errors_when_every_record_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("cards.json");
        std::fs::write(
            &input,
            serde_json::json!([
                {"title": "Only", "background_path": dir.path().join("missing.png")}
            ])
            .to_string(),
        )
        .unwrap();

        let args = BatchArgs {
            input,
            output_dir: dir.path().join("cards"),
            render: render_args(None, false),
        };
        let err = run_batch(args, &dir.path().join("config.yaml")).unwrap_err();
        assert_eq!(err.to_string(), "every card in the batch failed");
    }
}
