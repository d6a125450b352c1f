//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering and export.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A bitmap could not be loaded or decoded.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// The region contains a cross-origin bitmap and cannot be read back.
    #[error("Region is tainted by a cross-origin image; export is not possible")]
    Tainted,

    /// No charting capability is installed.
    #[error("Chart rendering is not available")]
    ChartUnavailable,

    /// The charting capability failed.
    #[error("Chart rendering failed: {0}")]
    Chart(String),

    /// The intermediate SVG could not be parsed.
    #[error("SVG rasterization failed: {0}")]
    Svg(String),

    /// PNG/pixel encoding failed.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Rasterizing or compositing the export failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// Another export has not finished yet.
    #[error("An export is already in progress")]
    ExportInProgress,

    /// The last persistence fallback could not open a viewer.
    #[error("Popup blocked: allow popups to view the exported image")]
    PopupBlocked,

    /// Filesystem error while persisting.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
