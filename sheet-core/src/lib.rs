//! # Sheet Composer Core
//!
//! Data model and editing state for the sheet composition editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 sheet-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Scene Graph     │  Document                │
//! │  - Visual nodes  │  - Selection             │
//! │  - Dense z-order │  - Naming registry       │
//! │  - Background    │  - Form boundary         │
//! ├─────────────────────────────────────────────┤
//! │  Chart datasets  │  Pattern configuration   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Rendering, bounds resolution and export live in `sheet-renderer`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod color;
pub mod dataset;
pub mod document;
pub mod error;
pub mod form;
pub mod geometry;
pub mod naming;
pub mod node;
pub mod pattern;
pub mod scene;
pub mod selection;
mod zorder;

pub use color::Color;
pub use dataset::{
    normalize_range, ChartConfig, ChartRequest, Dataset, DatasetStore, MIN_CHART_LABELS,
};
pub use document::{Document, LayerEntry};
pub use error::{SheetError, SheetResult};
pub use form::{ChartForm, FormSnapshot};
pub use geometry::{BackgroundFit, PixelRect, Rect};
pub use naming::NamingRegistry;
pub use node::{
    Bitmap, Effects, HslAdjust, ImageContent, ImageFilters, NodeContent, NodeId, NodeKindTag,
    Shadow, TextContent, Transform, VisualNode,
};
pub use pattern::{PatternConfig, ShapeKind};
pub use scene::{Background, Scene};
pub use selection::SelectionController;

/// Sheet core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
