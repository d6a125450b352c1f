//! # Sheet Composer CLI
//!
//! Builds sheets from recipes and exports them as PNG.

use clap::Parser;
use sheet_cli::{compose, pattern_config, render_pattern, CliArgs, Command, PatternArgs, SheetConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = SheetConfig::from(&args);

    match &args.command {
        Command::Compose { recipe } => {
            tracing::debug!(recipe = %recipe.display(), out_dir = %config.out_dir.display(), "composing");
            let report = compose(&config, recipe)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} ({}x{})",
                    config.out_dir.join(&report.filename).display(),
                    report.width,
                    report.height
                );
            }
        }
        Command::Pattern {
            kind,
            seed,
            size,
            density,
            out,
        } => {
            let pattern = pattern_config(&PatternArgs {
                kind,
                seed: *seed,
                size: *size,
                density: *density,
                transparent: args.transparent,
            })?;
            render_pattern(&pattern, out)?;
            println!("{} (seed {})", out.display(), pattern.seed);
        }
    }
    Ok(())
}

/// `RUST_LOG` filter, plus `RUST_LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sheet_core=debug,sheet_renderer=debug".into());
    let json = std::env::var("RUST_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
