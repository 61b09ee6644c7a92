//! Prelude module - common imports for phyco users
//!
//! ```rust
//! use phyco::prelude::*;
//! ```

pub use crate::{
    // Actions
    Action,
    ActionManager,
    // Charts
    Chart,
    ChartKind,
    // Columns
    Column,
    ColumnType,
    DataSeries,
    // Main types
    Editor,
    EngineOptions,
    // Error types
    Error,
    Intent,
    NodeKey,
    ProjectSnapshot,
    Result,
    Row,
    StatisticKind,
    TableStore,
    ValidationReport,
};
