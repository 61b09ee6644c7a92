//! Formula and graph error types

use phyco_core::NodeKey;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Result type for dependency graph operations
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while compiling a column formula
///
/// All of these are produced before a formula column is committed; a
/// successfully compiled formula never fails to evaluate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    /// Bracketed token that is neither `[Name]` nor `[Name.stat]`
    #[error("Bad variable syntax: {0}")]
    BadVariableSyntax(String),

    /// Referenced column name is unknown
    #[error("Column with name '{name}' does not exist: {variable}")]
    ColumnDoesNotExist { name: String, variable: String },

    /// Unrecognised statistic suffix
    #[error("'{stat}' is not a statistic type: {variable}")]
    NotAStatisticType { stat: String, variable: String },

    /// Formulas operate on numeric data only
    #[error("Column '{name}' contains text and cannot be used in a formula: {variable}")]
    TextColumnNotAllowed { name: String, variable: String },

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Malformed arithmetic
    #[error("Parse error: {0}")]
    Syntax(String),
}

/// Errors raised by dependency graph mutations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The edge would close a cycle
    #[error("Circular dependency between '{dependent}' and '{dependee}'")]
    CircularDependency { dependent: NodeKey, dependee: NodeKey },

    /// Edge endpoint is not a registered node
    #[error("Couldn't find node with key: {0}")]
    MissingNode(NodeKey),
}
