//! # phyco-formula
//!
//! Formula engine and dependency tracking for phyco.
//!
//! This crate provides:
//! - Column formula compilation (`[Name]` / `[Name.stat]` variables → AST)
//! - Arithmetic evaluation with a small numeric function library
//! - Lazily cached column statistics (sum, mean, median, stddev, min, max)
//! - The dependency graph linking formula columns and charts to their inputs
//!
//! ## Example
//!
//! ```rust
//! use phyco_core::{ColumnType, NodeKey};
//! use phyco_formula::{ColumnFormula, ColumnSignature, FormulaInput, VariableInput};
//!
//! let a = NodeKey::from("c0");
//! let columns = [ColumnSignature::new(&a, "A", ColumnType::Numerical)];
//! let formula = ColumnFormula::new("[A] * 2 + 1", &columns).unwrap();
//!
//! let mut input = FormulaInput::default();
//! input.insert(a, VariableInput::value(3.0));
//! assert_eq!(formula.evaluate(&input), 7.0);
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod functions;
pub mod parser;
pub mod statistics;

pub use ast::{BinaryOperator, Expr, UnaryOperator, Variable, VariableAttribute};
pub use dependency::{Dependency, DependencyGraph, RemovedNodes};
pub use error::{FormulaError, FormulaResult, GraphError, GraphResult};
pub use evaluator::{evaluate, format_number, FormulaInput, VariableInput, VariableSource};
pub use formula::{ColumnFormula, ColumnSignature, FormulaDependency};
pub use parser::parse_expression;
pub use statistics::{
    numeric_values, StatisticCache, StatisticKind, StatisticSet, StatisticStore, StatisticValues,
};
