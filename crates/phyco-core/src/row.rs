//! Row type

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::key::{NodeKey, RowKey};

/// A table row: cell strings addressed by column key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Stable row key
    pub key: RowKey,
    /// Cell values by column key
    #[serde(default)]
    pub cells: BTreeMap<NodeKey, String>,
}

impl Row {
    /// Create an empty row
    pub fn new(key: RowKey) -> Self {
        Self {
            key,
            cells: BTreeMap::new(),
        }
    }

    /// Get a cell value
    pub fn get(&self, column: &NodeKey) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Set a cell value, returning the previous one
    pub fn set<S: Into<String>>(&mut self, column: NodeKey, value: S) -> Option<String> {
        self.cells.insert(column, value.into())
    }

    /// Remove a cell, returning its value
    pub fn remove(&mut self, column: &NodeKey) -> Option<String> {
        self.cells.remove(column)
    }

    /// Remove several cells at once, returning the removed entries
    pub fn take_cells(&mut self, columns: &[NodeKey]) -> BTreeMap<NodeKey, String> {
        columns
            .iter()
            .filter_map(|k| self.cells.remove_entry(k))
            .collect()
    }

    /// Merge previously taken cells back into the row
    pub fn merge_cells(&mut self, cells: BTreeMap<NodeKey, String>) {
        self.cells.extend(cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_take_and_merge_cells() {
        let a = NodeKey::from("a");
        let b = NodeKey::from("b");
        let mut row = Row::new(RowKey::new(1));
        row.set(a.clone(), "1");
        row.set(b.clone(), "2");
        let before = row.clone();

        let taken = row.take_cells(&[b.clone()]);
        assert_eq!(row.get(&b), None);
        assert_eq!(taken.len(), 1);

        row.merge_cells(taken);
        assert_eq!(row, before);
    }
}
