//! # phyco-chart
//!
//! Chart nodes for phyco. A chart plots one or more columns and takes part
//! in the dependency graph as a dependent of every column it plots.
//! Rendering is left to the host application.

mod chart;
mod series;

pub use chart::{Chart, ChartKind, UnknownChartKind};
pub use series::DataSeries;
