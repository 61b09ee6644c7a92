//! Column statistics and their lazily refreshed caches

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;
use phyco_core::{parse_value, NodeKey};
use serde::{Deserialize, Serialize};

/// A whole-column aggregate usable as `[Name.stat]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticKind {
    Sum,
    Mean,
    Median,
    Stddev,
    Min,
    Max,
}

/// Set of aggregates attached to a dependency edge
pub type StatisticSet = BTreeSet<StatisticKind>;

impl StatisticKind {
    /// Every aggregate kind
    pub const ALL: [StatisticKind; 6] = [
        StatisticKind::Sum,
        StatisticKind::Mean,
        StatisticKind::Median,
        StatisticKind::Stddev,
        StatisticKind::Min,
        StatisticKind::Max,
    ];

    /// Name used in formula text
    pub fn name(self) -> &'static str {
        match self {
            StatisticKind::Sum => "sum",
            StatisticKind::Mean => "mean",
            StatisticKind::Median => "median",
            StatisticKind::Stddev => "stddev",
            StatisticKind::Min => "min",
            StatisticKind::Max => "max",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Compute this aggregate over numeric values
    ///
    /// An empty input sums to zero; every other aggregate of nothing is NaN.
    pub fn compute(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return match self {
                StatisticKind::Sum => 0.0,
                _ => f64::NAN,
            };
        }

        let n = values.len() as f64;
        match self {
            StatisticKind::Sum => values.iter().sum(),
            StatisticKind::Mean => values.iter().sum::<f64>() / n,
            StatisticKind::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            StatisticKind::Stddev => {
                let mean = values.iter().sum::<f64>() / n;
                let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
                variance.sqrt()
            }
            StatisticKind::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            StatisticKind::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatisticKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatisticKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Collect the numeric values of a column's cells
///
/// Infinite formula results count; empty cells, text and `NaN` do not.
pub fn numeric_values<'a, I>(cells: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a str>,
{
    cells.into_iter().filter_map(parse_value).collect()
}

/// Computed aggregate values, one optional slot per kind
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticValues {
    slots: [Option<f64>; 6],
}

impl StatisticValues {
    /// Value of an aggregate, if computed
    pub fn get(&self, kind: StatisticKind) -> Option<f64> {
        self.slots[kind.index()]
    }

    /// Store an aggregate value
    pub fn set(&mut self, kind: StatisticKind, value: f64) {
        self.slots[kind.index()] = Some(value);
    }

    /// Whether no aggregate is computed
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    fn clear(&mut self) {
        self.slots = [None; 6];
    }
}

// Bitwise comparison so that a cached NaN equals itself
impl PartialEq for StatisticValues {
    fn eq(&self, other: &Self) -> bool {
        self.slots
            .iter()
            .zip(other.slots.iter())
            .all(|(a, b)| a.map(f64::to_bits) == b.map(f64::to_bits))
    }
}

/// Aggregate cache for one column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticCache {
    values: StatisticValues,
    stale: bool,
}

impl StatisticCache {
    /// Cached value of an aggregate, ignoring staleness
    pub fn get(&self, kind: StatisticKind) -> Option<f64> {
        self.values.get(kind)
    }

    /// Whether the column changed since the cache was filled
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Flag the cache stale
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Make sure the requested aggregates are fresh
    ///
    /// `values` is called at most once, and only when something must be computed.
    pub fn ensure<F>(&mut self, kinds: &StatisticSet, values: F) -> StatisticValues
    where
        F: FnOnce() -> Vec<f64>,
    {
        if self.stale {
            self.values.clear();
            self.stale = false;
        }

        let missing: Vec<StatisticKind> = kinds
            .iter()
            .copied()
            .filter(|kind| self.values.get(*kind).is_none())
            .collect();

        if !missing.is_empty() {
            let data = values();
            for kind in missing {
                self.values.set(kind, kind.compute(&data));
            }
        }

        self.values
    }
}

/// Aggregate caches for every column, keyed by node key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticStore {
    caches: AHashMap<NodeKey, StatisticCache>,
}

impl StatisticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache of a column, if one exists
    pub fn get(&self, key: &NodeKey) -> Option<&StatisticCache> {
        self.caches.get(key)
    }

    /// Fresh aggregates for `key`, computing what is stale or missing
    pub fn ensure<F>(&mut self, key: &NodeKey, kinds: &StatisticSet, values: F) -> StatisticValues
    where
        F: FnOnce() -> Vec<f64>,
    {
        let cache = self.caches.entry(key.clone()).or_default();
        let was_stale = cache.is_stale();
        let result = cache.ensure(kinds, values);
        if was_stale {
            log::trace!("refreshed statistics for {}", key);
        }
        result
    }

    /// Flag a column's cache stale
    pub fn invalidate(&mut self, key: &NodeKey) {
        if let Some(cache) = self.caches.get_mut(key) {
            cache.invalidate();
        }
    }

    /// Flag every cache stale
    pub fn invalidate_all(&mut self) {
        for cache in self.caches.values_mut() {
            cache.invalidate();
        }
    }

    /// Drop a column's cache
    pub fn remove(&mut self, key: &NodeKey) -> Option<StatisticCache> {
        self.caches.remove(key)
    }

    /// Put back a cache
    pub fn insert(&mut self, key: NodeKey, cache: StatisticCache) {
        self.caches.insert(key, cache);
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}
