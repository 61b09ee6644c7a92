//! Error types for table operations

use phyco_core::NodeKey;
use phyco_formula::{FormulaError, GraphError};
use thiserror::Error;

/// Result type for table operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while mutating or loading a table
///
/// Validation problems are reported through
/// [`ValidationReport`](crate::ValidationReport) rather than errors; an
/// `Error` means an operation was attempted on state it does not fit.
#[derive(Debug, Error)]
pub enum Error {
    /// Core data error
    #[error(transparent)]
    Core(#[from] phyco_core::Error),

    /// Formula compilation error
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// Dependency graph error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// No column with this key
    #[error("Column does not exist: {0}")]
    UnknownColumn(NodeKey),

    /// No chart with this key
    #[error("Chart does not exist: {0}")]
    UnknownChart(NodeKey),

    /// Formula columns whose references never resolved while loading
    #[error("Could not resolve formula columns: {}", .0.join(", "))]
    UnresolvedColumns(Vec<String>),

    /// Saved edge that no formula or chart reads through
    #[error("Unexpected dependency of {dependent} on {dependee}")]
    UnexpectedDependency { dependent: NodeKey, dependee: NodeKey },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Index past the end of a collection
    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Error::Core(phyco_core::Error::IndexOutOfBounds { index, len })
    }
}
