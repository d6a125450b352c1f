//! Recipe-to-file tests for the CLI library.

use std::path::PathBuf;

use clap::Parser;
use sheet_cli::{compose, pattern_config, render_pattern, CliArgs, PatternArgs, SheetConfig};
use tempfile::TempDir;

fn config_for(out_dir: &std::path::Path, extra: &[&str]) -> SheetConfig {
    let mut argv = vec!["sheet", "--out-dir"];
    let dir = out_dir.to_str().expect("utf-8 temp path");
    argv.push(dir);
    argv.extend_from_slice(extra);
    argv.extend_from_slice(&["compose", "unused.json"]);
    SheetConfig::from(&CliArgs::parse_from(argv))
}

fn write_recipe(dir: &TempDir, json: &str) -> PathBuf {
    let path = dir.path().join("recipe.json");
    std::fs::write(&path, json).expect("write recipe");
    path
}

#[test]
fn test_compose_writes_png_with_margin() {
    let work = TempDir::new().expect("tempdir");
    let out = TempDir::new().expect("tempdir");
    let recipe = write_recipe(
        &work,
        r#"{
            "width": 800, "height": 600,
            "operations": [
                { "op": "pattern", "fields": { "patKind": "triangles", "patSeed": "3", "patCanvas": "200", "patDensity": "4" } },
                { "op": "move", "transform": { "x": 50, "y": 60 } },
                { "op": "text", "text": "Title", "style": { "font_size": 32 } }
            ]
        }"#,
    );

    let config = config_for(out.path(), &["--margin", "8", "--prefix", "sheet"]);
    let report = compose(&config, &recipe).expect("compose");

    assert!(report.filename.starts_with("sheet_"));
    assert_eq!(report.width, report.rect.width + 16);
    let written = image::open(out.path().join(&report.filename)).expect("png");
    assert_eq!(written.width(), report.width);
    assert_eq!(written.height(), report.height);
}

#[test]
fn test_compose_reports_failing_operation() {
    let work = TempDir::new().expect("tempdir");
    let out = TempDir::new().expect("tempdir");
    let recipe = write_recipe(
        &work,
        r#"{ "operations": [ { "op": "effects", "shadow": { "blur": 4 } } ] }"#,
    );

    let err = compose(&config_for(out.path(), &[]), &recipe).unwrap_err();
    assert!(format!("{err:#}").contains("operation 1 (effects)"));
    assert_eq!(std::fs::read_dir(out.path()).expect("read dir").count(), 0);
}

#[test]
fn test_compose_creates_output_directory() {
    let work = TempDir::new().expect("tempdir");
    let recipe = write_recipe(&work, r#"{ "operations": [ { "op": "text", "text": "hi" } ] }"#);
    let nested = work.path().join("out").join("sheets");

    let report = compose(&config_for(&nested, &[]), &recipe).expect("compose");
    assert!(nested.join(report.filename).is_file());
}

#[test]
fn test_pattern_tile_is_deterministic() {
    let out = TempDir::new().expect("tempdir");
    let args = PatternArgs {
        kind: "zigzag",
        seed: Some(11),
        size: 240,
        density: Some(5.0),
        transparent: false,
    };
    let first = out.path().join("a.png");
    let second = out.path().join("b.png");
    render_pattern(&pattern_config(&args).expect("config"), &first).expect("render");
    render_pattern(&pattern_config(&args).expect("config"), &second).expect("render");

    let a = std::fs::read(first).expect("read");
    let b = std::fs::read(second).expect("read");
    assert_eq!(a, b);
    let tile = image::load_from_memory(&a).expect("png");
    assert_eq!((tile.width(), tile.height()), (240, 240));
}
