//! Data series types

use phyco_core::NodeKey;
use serde::{Deserialize, Serialize};

/// A plotted column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSeries {
    /// Key of the plotted column
    pub column: NodeKey,
    /// Legend label; the column name is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl DataSeries {
    /// Create a new data series
    pub fn new(column: NodeKey) -> Self {
        Self {
            column,
            label: None,
        }
    }

    /// Set series label
    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }
}
