//! Chart types

use std::fmt;
use std::str::FromStr;

use phyco_core::NodeKey;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::series::DataSeries;

/// Chart kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    #[serde(rename = "linear")]
    Linear,
    #[serde(rename = "bar")]
    Bar,
    #[serde(rename = "correlation")]
    CorrelationMatrix,
}

/// Returned when parsing an unknown chart kind
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown chart type: {0}")]
pub struct UnknownChartKind(pub String);

impl ChartKind {
    /// Every chart kind
    pub const ALL: [ChartKind; 3] = [ChartKind::Linear, ChartKind::Bar, ChartKind::CorrelationMatrix];

    /// Identifier used in intents and project files
    pub fn value(self) -> &'static str {
        match self {
            ChartKind::Linear => "linear",
            ChartKind::Bar => "bar",
            ChartKind::CorrelationMatrix => "correlation",
        }
    }

    /// Display text
    pub fn text(self) -> &'static str {
        match self {
            ChartKind::Linear => "Linear",
            ChartKind::Bar => "Bar",
            ChartKind::CorrelationMatrix => "Correlation Matrix",
        }
    }

    /// Minimum number of plotted columns
    pub fn min_series(self) -> usize {
        match self {
            ChartKind::Linear | ChartKind::Bar => 1,
            ChartKind::CorrelationMatrix => 2,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for ChartKind {
    type Err = UnknownChartKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.value() == s)
            .ok_or_else(|| UnknownChartKind(s.to_string()))
    }
}

/// Chart definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    /// Stable node key
    pub key: NodeKey,
    /// Display name
    pub name: String,
    /// Chart kind
    pub kind: ChartKind,
    /// Plotted columns
    #[serde(default)]
    pub series: Vec<DataSeries>,
}

impl Chart {
    /// Create a new chart with no series
    pub fn new<S: Into<String>>(key: NodeKey, name: S, kind: ChartKind) -> Self {
        Self {
            key,
            name: name.into(),
            kind,
            series: Vec::new(),
        }
    }

    /// Add a data series
    pub fn with_series(mut self, series: DataSeries) -> Self {
        self.series.push(series);
        self
    }

    /// Keys of plotted columns, without repeats
    pub fn referenced_columns(&self) -> Vec<NodeKey> {
        let mut columns: Vec<NodeKey> = Vec::with_capacity(self.series.len());
        for series in &self.series {
            if !columns.contains(&series.column) {
                columns.push(series.column.clone());
            }
        }
        columns
    }

    /// Whether the chart plots `column`
    pub fn plots(&self, column: &NodeKey) -> bool {
        self.series.iter().any(|s| &s.column == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_values() {
        assert_eq!("correlation".parse::<ChartKind>(), Ok(ChartKind::CorrelationMatrix));
        assert_eq!(ChartKind::Bar.text(), "Bar");
        assert_eq!(
            "pie".parse::<ChartKind>(),
            Err(UnknownChartKind("pie".into()))
        );
    }

    #[test]
    fn test_referenced_columns() {
        let chart = Chart::new("g0".into(), "Speed", ChartKind::Linear)
            .with_series(DataSeries::new("c0".into()))
            .with_series(DataSeries::new("c1".into()).with_label("v"))
            .with_series(DataSeries::new("c0".into()));

        assert_eq!(chart.referenced_columns(), vec![NodeKey::from("c0"), NodeKey::from("c1")]);
        assert!(chart.plots(&"c1".into()));
        assert!(!chart.plots(&"c2".into()));
    }

    #[test]
    fn test_serde_shape() {
        let chart = Chart::new("g0".into(), "Speed", ChartKind::CorrelationMatrix)
            .with_series(DataSeries::new("c0".into()));
        let json = serde_json::to_string(&chart).unwrap();
        assert_eq!(
            json,
            r#"{"key":"g0","name":"Speed","kind":"correlation","series":[{"column":"c0"}]}"#
        );
        let back: Chart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chart);
    }
}
