//! Edit requests coming from the host application

use phyco_core::NodeKey;
use serde::{Deserialize, Serialize};

/// A requested edit, before validation
///
/// Datatype and chart kind are carried as text so that unknown values can be
/// reported through validation instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    AddColumn {
        name: String,
        #[serde(rename = "type")]
        column_type: String,
        #[serde(default)]
        formula: Option<String>,
    },
    EditColumn {
        index: usize,
        name: String,
        #[serde(default)]
        formula: Option<String>,
    },
    DeleteColumn {
        index: usize,
    },
    EditCell {
        column_key: NodeKey,
        row_index: usize,
        value: String,
    },
    AddRow,
    DeleteRow {
        index: usize,
    },
    AddChart {
        name: String,
        kind: String,
        #[serde(default)]
        columns: Vec<NodeKey>,
    },
    DeleteChart {
        index: usize,
    },
}
