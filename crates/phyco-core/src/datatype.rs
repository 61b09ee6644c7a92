//! Column datatypes
//!
//! A datatype decides whether a raw cell string is acceptable for a column and
//! how it is normalized before being committed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Column datatype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Numbers (empty cells allowed)
    Numerical,
    /// Free text
    Text,
    /// Derived from a formula, read-only
    Formula,
}

impl ColumnType {
    /// All datatypes, in display order
    pub const ALL: [ColumnType; 3] = [ColumnType::Numerical, ColumnType::Text, ColumnType::Formula];

    /// Machine name (`numerical`, `text`, `formula`)
    pub fn value(self) -> &'static str {
        match self {
            ColumnType::Numerical => "numerical",
            ColumnType::Text => "text",
            ColumnType::Formula => "formula",
        }
    }

    /// Human readable label
    pub fn text(self) -> &'static str {
        match self {
            ColumnType::Numerical => "Numerical",
            ColumnType::Text => "Text",
            ColumnType::Formula => "Formula",
        }
    }

    /// Cells of this type cannot be edited directly
    pub fn is_readonly(self) -> bool {
        matches!(self, ColumnType::Formula)
    }

    /// Whether the value may be referenced from a formula
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Numerical | ColumnType::Formula)
    }

    /// Check a raw (not yet normalized) cell value
    pub fn is_valid(self, value: &str) -> bool {
        match self {
            ColumnType::Numerical => {
                let trimmed = value.trim();
                trimmed.is_empty() || parse_number(trimmed).is_some()
            }
            ColumnType::Text => true,
            ColumnType::Formula => false,
        }
    }

    /// Normalize a value before commit
    pub fn preprocess(self, value: &str) -> String {
        match self {
            ColumnType::Numerical | ColumnType::Text => value.trim().to_string(),
            ColumnType::Formula => value.to_string(),
        }
    }

    /// Validate then normalize a value
    pub fn accept(self, value: &str) -> Result<String, Error> {
        if self.is_valid(value) {
            Ok(self.preprocess(value))
        } else {
            Err(Error::InvalidCellValue {
                value: value.to_string(),
                datatype: self.value(),
            })
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::ALL
            .into_iter()
            .find(|t| t.value() == s)
            .ok_or_else(|| Error::UnknownDatatype(s.to_string()))
    }
}

/// Parse a cell as a finite number
///
/// Surrounding whitespace is ignored. Empty cells, text, `NaN` and infinities
/// are not numbers.
pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a stored cell as a number
///
/// Like [`parse_number`], but also reads back the `Infinity` and `-Infinity`
/// text written for infinite formula results.
pub fn parse_value(cell: &str) -> Option<f64> {
    match cell.trim() {
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        trimmed => parse_number(trimmed),
    }
}
