//! Error types for phyco-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in phyco-core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Cell value rejected by the column's datatype
    #[error("Invalid cell value '{value}' for {datatype} column")]
    InvalidCellValue { value: String, datatype: &'static str },

    /// Datatype name not recognised
    #[error("Datatype does not exist: {0}")]
    UnknownDatatype(String),

    /// Name already used by another node
    #[error("Name already exists: {0}")]
    DuplicateName(String),

    /// Index out of bounds
    #[error("Index {index} out of bounds (len: {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
