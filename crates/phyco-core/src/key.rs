//! Stable identifiers for graph nodes and rows

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable unique key of a graph node (column or chart)
///
/// Keys never change once assigned; display names may be edited freely.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Create a key from any string-like value
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for NodeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Stable row identifier in creation order
///
/// Unlike a row index, a row key does not shift when rows before it are
/// inserted or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(u64);

impl RowKey {
    /// Create a row key
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric id
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic generator of node keys with a fixed prefix
#[derive(Debug, Clone)]
pub struct KeySequence {
    prefix: &'static str,
    next: u64,
}

impl KeySequence {
    /// Create a sequence producing `{prefix}0`, `{prefix}1`, ...
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix, next: 0 }
    }

    /// Produce the next key for which `is_taken` returns false
    pub fn next_key(&mut self, is_taken: impl Fn(&NodeKey) -> bool) -> NodeKey {
        loop {
            let key = NodeKey(format!("{}{}", self.prefix, self.next));
            self.next += 1;
            if !is_taken(&key) {
                return key;
            }
        }
    }
}
