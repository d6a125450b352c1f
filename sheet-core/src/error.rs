//! Error types for sheet operations.

use thiserror::Error;

use crate::node::NodeKindTag;

/// Result type for sheet operations.
pub type SheetResult<T> = Result<T, SheetError>;

/// Errors that can occur in sheet operations.
///
/// Every variant is recoverable: the editor reports it as a notice and
/// stays interactive.
#[derive(Debug, Error)]
pub enum SheetError {
    /// An operation needs an active node but nothing is selected.
    #[error("No node is selected")]
    NoSelection,

    /// The selected node is not of the kind the operation works on.
    #[error("Selected node is a {actual}, expected a {expected}")]
    WrongKind {
        /// Kind the operation requires.
        expected: NodeKindTag,
        /// Kind of the selected node.
        actual: NodeKindTag,
    },

    /// A dataset index does not address an existing dataset.
    #[error("Dataset index {index} out of range (have {len})")]
    DatasetIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of datasets.
        len: usize,
    },

    /// A color string could not be parsed.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Recipe serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
