//! End-to-end pipeline tests that stay offline: backgrounds come from
//! fixture files or prompt-seeded gradients, never from the network, and
//! the cards carry no text so no font files are needed either.
//!
//! Run with: cargo test --test pipeline

use cardforge::config;
use cardforge::input;
use cardforge::render::{
    BrandCardParams, BrandFontOverrides, CardContent, CardFonts, FontStore, RenderOptions,
    background, compose_brand_card, compose_card,
};
use image::{Rgb, Rgba, RgbaImage};
use tempfile::TempDir;

fn text_free_content(prompt: &str) -> CardContent {
    CardContent {
        title: String::new(),
        subtitle: String::new(),
        prompt: Some(prompt.to_string()),
        background_path: None,
        background_image: None,
    }
}

fn stock_fonts() -> CardFonts {
    config::AppConfig::default().card_fonts()
}

#[test]
fn gradient_card_saves_at_the_requested_square_size() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("card.jpg");
    let options = RenderOptions {
        width: 320,
        height: 240,
        overlay: true,
        shadow: true,
    };

    let card = compose_card(
        &text_free_content("sunrise over water"),
        &stock_fonts(),
        &options,
        &FontStore::new(None),
    )
    .unwrap();
    card.save(&path).unwrap();

    let reloaded = image::open(&path).unwrap();
    assert_eq!((reloaded.width(), reloaded.height()), (240, 240));
}

#[test]
fn file_background_feeds_the_card() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("bg.png");
    RgbaImage::from_pixel(64, 32, Rgba([200, 30, 30, 255]))
        .save(&source)
        .unwrap();

    let content = CardContent {
        background_path: Some(source),
        ..text_free_content("")
    };
    let options = RenderOptions {
        width: 100,
        height: 100,
        overlay: false,
        shadow: false,
    };
    let card = compose_card(&content, &stock_fonts(), &options, &FontStore::new(None)).unwrap();

    assert_eq!((card.width(), card.height()), (100, 100));
    // Cover-crop of a solid source stays solid; no overlay was applied.
    assert_eq!(card.get_pixel(50, 50), &Rgb([200, 30, 30]));
}

#[test]
fn missing_background_file_is_an_error() {
    let content = CardContent {
        background_path: Some("/no/such/background.png".into()),
        ..text_free_content("")
    };
    let options = RenderOptions {
        width: 64,
        height: 64,
        overlay: false,
        shadow: false,
    };
    let result = compose_card(&content, &stock_fonts(), &options, &FontStore::new(None));
    assert!(result.is_err());
}

#[test]
fn same_prompt_renders_identical_cards() {
    let options = RenderOptions {
        width: 96,
        height: 96,
        overlay: true,
        shadow: true,
    };
    let fonts = stock_fonts();
    let store = FontStore::new(None);

    let first = compose_card(&text_free_content("winter cabin"), &fonts, &options, &store).unwrap();
    let second =
        compose_card(&text_free_content("winter cabin"), &fonts, &options, &store).unwrap();
    assert_eq!(first.as_raw(), second.as_raw());

    let other = compose_card(&text_free_content("summer beach"), &fonts, &options, &store).unwrap();
    assert_ne!(first.as_raw(), other.as_raw());
}

#[test]
fn brand_card_saves_with_gradient_backdrop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("brand.png");
    let params = BrandCardParams {
        brand_text: String::new(),
        title_text: String::new(),
        subtitle_text: String::new(),
        footer_text: String::new(),
        background_path: None,
        background_image: Some(background::gradient_for_prompt(96, 96, "brand-card")),
        size: 96,
        fonts: BrandFontOverrides::default(),
        overlay: Some(Rgba([255, 255, 255, 48])),
        shadow: false,
    };

    let card = compose_brand_card(&params, &FontStore::new(None)).unwrap();
    card.save(&path).unwrap();

    let reloaded = image::open(&path).unwrap();
    assert_eq!((reloaded.width(), reloaded.height()), (96, 96));
}

#[test]
fn a_batch_of_records_renders_every_card() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("cards.json");
    std::fs::write(
        &input_path,
        r#"[
            {"output": "first.jpg", "image_prompt": "city lights"},
            {"output": "second.jpg", "image_prompt": "forest path"}
        ]"#,
    )
    .unwrap();

    let records = input::load_records(&input_path).unwrap();
    assert_eq!(records.len(), 2);

    let options = RenderOptions {
        width: 80,
        height: 80,
        overlay: true,
        shadow: false,
    };
    let fonts = stock_fonts();
    let store = FontStore::new(None);
    for record in records {
        let content = CardContent {
            prompt: record.image_prompt.clone(),
            ..text_free_content("")
        };
        let card = compose_card(&content, &fonts, &options, &store).unwrap();
        card.save(dir.path().join(record.output.as_deref().unwrap()))
            .unwrap();
    }

    assert!(dir.path().join("first.jpg").is_file());
    assert!(dir.path().join("second.jpg").is_file());
}

#[test]
fn csv_records_flow_through_the_same_pipeline() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("cards.csv");
    std::fs::write(
        &input_path,
        "title,subtitle,image_prompt,output\n,,mountain lake,lake.jpg\n",
    )
    .unwrap();

    let records = input::load_records(&input_path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].image_prompt.as_deref(), Some("mountain lake"));

    let options = RenderOptions {
        width: 64,
        height: 64,
        overlay: false,
        shadow: false,
    };
    let content = CardContent {
        prompt: records[0].image_prompt.clone(),
        ..text_free_content("")
    };
    let card = compose_card(&content, &stock_fonts(), &options, &FontStore::new(None)).unwrap();
    card.save(dir.path().join(records[0].output.as_deref().unwrap()))
        .unwrap();
    assert!(dir.path().join("lake.jpg").is_file());
}

#[test]
fn config_updates_survive_a_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");

    let updates = config::overlay_for("fonts.title.size", config::parse_scalar("84"));
    config::update_config(&path, updates).unwrap();

    let loaded = config::load_config(&path).unwrap();
    assert_eq!(loaded.fonts.title.size, 84);
    // Untouched keys keep their stock values.
    assert_eq!(loaded.image.width, 1080);

    config::reset_config(&path).unwrap();
    let reset = config::load_config(&path).unwrap();
    assert_eq!(reset.fonts.title.size, 72);
}
