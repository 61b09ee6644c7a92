//! # phyco
//!
//! A reactive table engine for tabular-data editors.
//!
//! Columns hold numbers or text, or are computed by formulas over other
//! columns (`[Mass] * [Acceleration]`, `[Time] - [Time.mean]`). Formula
//! columns and charts are linked to what they read by an acyclic dependency
//! graph, so an edit recomputes exactly the columns downstream of it, in
//! dependency order. Every structural edit is an undoable action.
//!
//! ## Example
//!
//! ```rust
//! use phyco::prelude::*;
//!
//! let mut editor = Editor::new();
//! editor.submit(Intent::AddColumn {
//!     name: "A".into(),
//!     column_type: "numerical".into(),
//!     formula: None,
//! });
//! editor.submit(Intent::AddColumn {
//!     name: "B".into(),
//!     column_type: "formula".into(),
//!     formula: Some("[A] * 2".into()),
//! });
//!
//! let a = editor.table().column_at(0).unwrap().key().clone();
//! let b = editor.table().column_at(1).unwrap().key().clone();
//! let report = editor.submit(Intent::EditCell {
//!     column_key: a,
//!     row_index: 0,
//!     value: "21".into(),
//! });
//! assert!(report.is_valid());
//! assert_eq!(editor.table().cell(0, &b), Some("42"));
//!
//! editor.undo();
//! assert_eq!(editor.table().cell(0, &b), Some("NaN"));
//! ```

pub mod action;
pub mod column;
pub mod editor;
pub mod error;
pub mod intent;
pub mod options;
pub mod prelude;
pub mod project;
pub mod table;
pub mod validation;

pub use action::{
    Action, ActionManager, AddChart, AddColumn, AddRow, DeleteChart, DeleteColumn, DeleteRow,
    EditCell, EditColumn,
};
pub use column::{Column, ColumnContext, FormulaColumn, PlainColumn};
pub use editor::Editor;
pub use error::{Error, Result};
pub use intent::Intent;
pub use options::EngineOptions;
pub use project::{ColumnRecord, ProjectSnapshot};
pub use table::{SeriesData, TableStore};
pub use validation::{FieldValidation, ValidationReport};

// Re-export the building blocks
pub use phyco_chart::{Chart, ChartKind, DataSeries};
pub use phyco_core::{ColumnType, NodeKey, Row, RowKey};
pub use phyco_formula::{
    format_number, ColumnFormula, Dependency, DependencyGraph, FormulaError, GraphError,
    StatisticKind, StatisticSet, StatisticStore, StatisticValues,
};
