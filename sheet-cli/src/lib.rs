//! # Sheet Composer CLI
//!
//! Headless host for the sheet composition core.
//!
//! ## Usage
//!
//! ```bash
//! sheet --out-dir exports compose poster.json
//! sheet --margin 24 --bg-color '#f8fafc' compose poster.json
//! sheet pattern --kind triangles --seed 42 --out tile.png
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `SheetConfig` - Canvas size, output directory and export options
//! - `Recipe` - JSON list of editor operations applied to a fresh document
//! - Export runs through `sheet-renderer`'s `Compositor` with a `DirectoryHost`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

pub mod recipe;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sheet_core::form::{pattern_keys, read_pattern_config};
use sheet_core::scene::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
use sheet_core::{Color, FormSnapshot, PatternConfig};
use sheet_renderer::{
    generate_pattern, random_seed, Compositor, DirectoryHost, ExportOptions, ExportReport,
    SoftwareEngine, DEFAULT_PREFIX,
};

pub use recipe::{Operation, Recipe};

/// Command-line arguments for the sheet CLI.
#[derive(Debug, Clone, Parser)]
#[command(name = "sheet")]
#[command(about = "Compose sheets and export them as flattened PNG images")]
#[command(version)]
pub struct CliArgs {
    /// Directory exported files are written to
    #[arg(long, env = "SHEET_OUT_DIR", default_value = ".", global = true)]
    pub out_dir: PathBuf,

    /// Empty border around the exported content, in pixels
    #[arg(long, default_value_t = 0, global = true)]
    pub margin: u32,

    /// Keep the export background transparent
    #[arg(long, global = true)]
    pub transparent: bool,

    /// Export background color
    #[arg(long, default_value = "#ffffff", global = true)]
    pub bg_color: String,

    /// Export filename prefix
    #[arg(long, env = "SHEET_EXPORT_PREFIX", default_value = DEFAULT_PREFIX, global = true)]
    pub prefix: String,

    /// Canvas width in pixels, unless the recipe sets one
    #[arg(long, default_value_t = DEFAULT_CANVAS_WIDTH, global = true)]
    pub width: u32,

    /// Canvas height in pixels, unless the recipe sets one
    #[arg(long, default_value_t = DEFAULT_CANVAS_HEIGHT, global = true)]
    pub height: u32,

    /// Print the export report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Apply a JSON recipe to a new sheet and export it
    Compose {
        /// Recipe file
        recipe: PathBuf,
    },
    /// Render a single pattern tile to a PNG file
    Pattern {
        /// Shape kind: dots, triangles, plus, zigzag or rings
        #[arg(long, default_value = "dots")]
        kind: String,
        /// Seed; a random one is picked when omitted
        #[arg(long)]
        seed: Option<u32>,
        /// Tile edge length in pixels
        #[arg(long, default_value_t = 1200)]
        size: u32,
        /// Shapes per row and column
        #[arg(long)]
        density: Option<f64>,
        /// Output file
        #[arg(long, short)]
        out: PathBuf,
    },
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    /// Default canvas size.
    pub canvas: (u32, u32),
    /// Output directory.
    pub out_dir: PathBuf,
    /// Export options; `background` is parsed later.
    pub export: ExportOptions,
    /// Raw background color argument.
    pub bg_color: String,
}

impl From<&CliArgs> for SheetConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            canvas: (args.width, args.height),
            out_dir: args.out_dir.clone(),
            export: ExportOptions {
                margin: args.margin,
                transparent: args.transparent,
                prefix: args.prefix.clone(),
                ..ExportOptions::default()
            },
            bg_color: args.bg_color.clone(),
        }
    }
}

impl SheetConfig {
    /// Export options with the background color parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the background color is not a hex color.
    pub fn export_options(&self) -> Result<ExportOptions> {
        let background = Color::from_hex(&self.bg_color)
            .with_context(|| format!("invalid --bg-color {:?}", self.bg_color))?;
        Ok(ExportOptions {
            background,
            ..self.export.clone()
        })
    }
}

/// Build the recipe's document and export it into the output directory.
///
/// # Errors
///
/// Returns an error if the recipe is invalid, an operation fails, or the
/// export cannot be rasterized or written.
pub fn compose(config: &SheetConfig, recipe_path: &Path) -> Result<ExportReport> {
    let options = config.export_options()?;
    let recipe = Recipe::load(recipe_path)?;
    let base_dir = recipe_path.parent().unwrap_or_else(|| Path::new("."));
    let doc = recipe.build(config.canvas, base_dir)?;

    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed to create {}", config.out_dir.display()))?;
    let compositor = Compositor::new(SoftwareEngine::new(), DirectoryHost::new(&config.out_dir));
    let report = compositor
        .export(doc.scene(), &options)
        .context("export failed")?;
    Ok(report)
}

/// Pattern settings gathered from the `pattern` subcommand.
#[derive(Debug, Clone)]
pub struct PatternArgs<'a> {
    /// Shape kind name.
    pub kind: &'a str,
    /// Seed, or `None` for a random one.
    pub seed: Option<u32>,
    /// Tile size.
    pub size: u32,
    /// Density override.
    pub density: Option<f64>,
    /// Transparent background.
    pub transparent: bool,
}

/// Pattern configuration for the given arguments, read through the same
/// form boundary the editor uses.
///
/// # Errors
///
/// Returns an error if the shape kind is unknown.
pub fn pattern_config(args: &PatternArgs<'_>) -> Result<PatternConfig> {
    let kind: sheet_core::ShapeKind = args.kind.parse().map_err(anyhow::Error::msg)?;
    let seed = args.seed.unwrap_or_else(random_seed);

    let mut form = FormSnapshot::new()
        .with(pattern_keys::KIND, kind.to_string())
        .with(pattern_keys::SEED, seed.to_string())
        .with(pattern_keys::CANVAS, args.size.to_string());
    if let Some(density) = args.density {
        form.set(pattern_keys::DENSITY, density.to_string());
    }
    if args.transparent {
        form.set(pattern_keys::TRANSPARENT, "1");
    }
    Ok(read_pattern_config(&form))
}

/// Render a pattern tile and write it as PNG.
///
/// # Errors
///
/// Returns an error if the tile cannot be generated or written.
pub fn render_pattern(config: &PatternConfig, out: &Path) -> Result<()> {
    let pixmap = generate_pattern(config)?;
    let png = pixmap.encode_png().context("failed to encode pattern")?;
    std::fs::write(out, png).with_context(|| format!("failed to write {}", out.display()))?;
    tracing::info!(
        path = %out.display(),
        seed = config.seed,
        kind = %config.shape_kind,
        "pattern written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["sheet", "compose", "r.json"]);
        let config = SheetConfig::from(&args);
        assert_eq!(config.canvas, (1600, 1200));
        let options = config.export_options().expect("options");
        assert_eq!(options.margin, 0);
        assert!(!options.transparent);
        assert_eq!(options.background, Color::WHITE);
        assert_eq!(options.prefix, "display");
    }

    #[test]
    fn test_export_flags_after_subcommand() {
        let args = CliArgs::parse_from([
            "sheet",
            "compose",
            "r.json",
            "--margin",
            "12",
            "--bg-color",
            "#000000",
            "--prefix",
            "poster",
        ]);
        let options = SheetConfig::from(&args).export_options().expect("options");
        assert_eq!(options.margin, 12);
        assert_eq!(options.background, Color::BLACK);
        assert_eq!(options.prefix, "poster");
    }

    #[test]
    fn test_bad_color_rejected() {
        let args = CliArgs::parse_from(["sheet", "--bg-color", "teal", "compose", "r.json"]);
        assert!(SheetConfig::from(&args).export_options().is_err());
    }

    #[test]
    fn test_pattern_config_from_args() {
        let cfg = pattern_config(&PatternArgs {
            kind: "rings",
            seed: Some(9),
            size: 150,
            density: Some(4.0),
            transparent: true,
        })
        .expect("config");
        assert_eq!(cfg.shape_kind, sheet_core::ShapeKind::Rings);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.canvas_size, 200);
        assert!((cfg.density - 4.0).abs() < f64::EPSILON);
        assert!(cfg.transparent);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let args = PatternArgs {
            kind: "hexagons",
            seed: None,
            size: 400,
            density: None,
            transparent: false,
        };
        assert!(pattern_config(&args).is_err());
    }
}
