//! # Sheet Composer Renderer
//!
//! Rasterization and export for sheet scenes.
//!
//! ## Export pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 Compositor                  │
//! ├─────────────┬─────────────┬─────────────────┤
//! │ Bounding    │ Render      │ Persistence     │
//! │ box         │ engine      │ fallback        │
//! │ resolver    │ (resvg)     │ blob/data/view  │
//! └─────────────┴─────────────┴─────────────────┘
//! ```
//!
//! Pattern tiles come from a seeded xorshift generator drawn with tiny-skia;
//! radar charts are drawn with plotters behind the `charts` feature.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod bounds;
pub mod cache;
pub mod chart;
pub mod error;
pub mod export;
pub mod filename;
pub mod image;
pub mod pattern;
pub mod persist;

pub use backend::software::encode_png;
pub use backend::{RectOptions, RenderEngine, SoftwareEngine};
pub use bounds::{BoundingBoxResolver, DEFAULT_BLEED};
pub use cache::{CacheStats, ContentCache, ContentCacheConfig};
#[cfg(feature = "charts")]
pub use chart::RadarChartRenderer;
pub use chart::{default_chart_renderer, ChartRenderer, UnavailableChartRenderer, CHART_SIZE};
pub use error::{RenderError, RenderResult};
pub use export::{Composition, Compositor, ExportGate, ExportOptions, ExportReport, EXPORT_BLEED};
pub use filename::{dated_filename, export_filename, DEFAULT_PREFIX};
pub use pattern::{generate_pattern, random_seed, XorShift32};
pub use persist::{
    default_strategies, persist_with_fallback, DirectoryHost, PersistHost, PersistStrategy,
    PersistedVia,
};
