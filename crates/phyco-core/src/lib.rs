//! # phyco-core
//!
//! Core data structures for the phyco table engine.
//!
//! This crate provides the fundamental types shared by the other crates:
//! - [`NodeKey`] and [`RowKey`] - stable identifiers for graph nodes and rows
//! - [`ColumnType`] - column datatypes with validation and normalization
//! - [`Row`] - a row of cell strings addressed by column key
//!
//! ## Example
//!
//! ```rust
//! use phyco_core::{ColumnType, NodeKey, Row, RowKey};
//!
//! let key = NodeKey::from("c0");
//! let mut row = Row::new(RowKey::new(0));
//! row.set(key.clone(), "42");
//!
//! assert_eq!(row.get(&key), Some("42"));
//! assert!(ColumnType::Numerical.is_valid(" 3.5 "));
//! ```

pub mod datatype;
pub mod error;
pub mod key;
pub mod row;

pub use datatype::{parse_number, parse_value, ColumnType};
pub use error::{Error, Result};
pub use key::{KeySequence, NodeKey, RowKey};
pub use row::Row;
