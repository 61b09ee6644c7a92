//! Project snapshots
//!
//! A snapshot is the persistable form of a table: column definitions, rows,
//! dependency edges and charts. Caches and history are not saved.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use phyco_chart::Chart;
use phyco_core::{ColumnType, NodeKey, Row};
use phyco_formula::{ColumnFormula, ColumnSignature, Dependency, DependencyGraph, FormulaError};
use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::error::{Error, Result};
use crate::options::EngineOptions;
use crate::table::TableStore;

/// A saved column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub key: NodeKey,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_expression: Option<String>,
}

impl From<&Column> for ColumnRecord {
    fn from(column: &Column) -> Self {
        Self {
            key: column.key().clone(),
            name: column.name().to_string(),
            column_type: column.column_type(),
            raw_expression: column.raw_expression().map(str::to_string),
        }
    }
}

/// Persistable table state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub columns: Vec<ColumnRecord>,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub charts: Vec<Chart>,
}

impl ProjectSnapshot {
    /// Capture a table
    pub fn from_table(table: &TableStore) -> Self {
        Self {
            columns: table.columns().iter().map(ColumnRecord::from).collect(),
            rows: table.rows().to_vec(),
            dependencies: table.graph().to_project_model(),
            charts: table.charts().to_vec(),
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write as JSON to a file
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Read JSON from a file
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Rebuild a table
    ///
    /// Formula columns may reference columns saved after them, so they are
    /// compiled in passes until every one resolves; a pass that resolves
    /// nothing fails with [`Error::UnresolvedColumns`]. Saved edges are then
    /// replayed through the checked graph path; an edge that no formula or
    /// chart implies fails with [`Error::UnexpectedDependency`]. Cells are
    /// taken as saved.
    pub fn into_table(self, options: EngineOptions) -> Result<TableStore> {
        let columns = build_columns(&self.columns)?;

        let mut graph = DependencyGraph::new();
        graph.add_nodes(columns.iter().map(|c| c.key().clone()));
        graph.add_nodes(self.charts.iter().map(|c| c.key.clone()));
        let saved = self.dependencies;
        graph.load_project_model(saved.clone())?;
        check_implied(&saved, &columns, &self.charts)?;

        // Files written by hand may omit edges; adding an existing edge is a no-op
        for column in &columns {
            graph.add_dependencies(column.dependencies())?;
        }
        for chart in &self.charts {
            graph.add_dependencies(
                chart
                    .referenced_columns()
                    .into_iter()
                    .filter(|key| graph.contains_node(key))
                    .map(|key| Dependency::value(chart.key.clone(), key))
                    .collect::<Vec<_>>(),
            )?;
        }

        Ok(TableStore::from_parts(
            columns,
            self.rows,
            self.charts,
            graph,
            options,
        ))
    }
}

/// Every saved edge must be one a formula column or chart reads through
fn check_implied(saved: &[Dependency], columns: &[Column], charts: &[Chart]) -> Result<()> {
    let mut implied: BTreeSet<(NodeKey, NodeKey)> = columns
        .iter()
        .flat_map(Column::dependencies)
        .map(|d| (d.dependent, d.dependee))
        .collect();
    for chart in charts {
        implied.extend(
            chart
                .referenced_columns()
                .into_iter()
                .map(|column| (chart.key.clone(), column)),
        );
    }

    match saved
        .iter()
        .find(|d| !implied.contains(&(d.dependent.clone(), d.dependee.clone())))
    {
        Some(bogus) => {
            log::warn!("rejecting saved edge {} -> {}", bogus.dependent, bogus.dependee);
            Err(Error::UnexpectedDependency {
                dependent: bogus.dependent.clone(),
                dependee: bogus.dependee.clone(),
            })
        }
        None => Ok(()),
    }
}

fn build_columns(records: &[ColumnRecord]) -> Result<Vec<Column>> {
    let mut built: Vec<Option<Column>> = records
        .iter()
        .map(|record| match record.column_type {
            ColumnType::Formula => None,
            plain => Some(Column::plain(record.key.clone(), record.name.clone(), plain)),
        })
        .collect();

    loop {
        let mut progress = false;
        let mut pending = false;

        for (index, record) in records.iter().enumerate() {
            if built[index].is_some() {
                continue;
            }
            let raw = record.raw_expression.as_deref().unwrap_or_default();

            let compiled = {
                let signatures: Vec<ColumnSignature<'_>> = built
                    .iter()
                    .flatten()
                    .map(|c| ColumnSignature::new(c.key(), c.name(), c.column_type()))
                    .collect();
                ColumnFormula::new(raw, &signatures)
            };

            match compiled {
                Ok(formula) => {
                    built[index] = Some(Column::formula(
                        record.key.clone(),
                        record.name.clone(),
                        formula,
                    ));
                    progress = true;
                }
                Err(FormulaError::ColumnDoesNotExist { .. }) => pending = true,
                Err(err) => return Err(err.into()),
            }
        }

        if !pending {
            break;
        }
        if !progress {
            let unresolved: Vec<String> = records
                .iter()
                .zip(&built)
                .filter(|(_, column)| column.is_none())
                .map(|(record, _)| record.name.clone())
                .collect();
            log::warn!("formula columns never resolved: {:?}", unresolved);
            return Err(Error::UnresolvedColumns(unresolved));
        }
        log::debug!("retrying formula columns with unresolved references");
    }

    Ok(built.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(key: &str, name: &str, column_type: ColumnType, raw: Option<&str>) -> ColumnRecord {
        ColumnRecord {
            key: key.into(),
            name: name.into(),
            column_type,
            raw_expression: raw.map(str::to_string),
        }
    }

    #[test]
    fn test_formula_order_is_resolved_in_passes() {
        let snapshot = ProjectSnapshot {
            columns: vec![
                record("c2", "C", ColumnType::Formula, Some("[B] + 1")),
                record("c1", "B", ColumnType::Formula, Some("[A] * 2")),
                record("c0", "A", ColumnType::Numerical, None),
            ],
            ..Default::default()
        };

        let table = snapshot.into_table(EngineOptions::default()).unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
        assert_eq!(table.graph().edges().len(), 2);
        assert_eq!(
            table.graph().topological_sort(),
            vec![NodeKey::from("c0"), NodeKey::from("c1"), NodeKey::from("c2")]
        );
    }

    #[test]
    fn test_unresolved_columns() {
        let snapshot = ProjectSnapshot {
            columns: vec![
                record("c0", "A", ColumnType::Numerical, None),
                record("c1", "B", ColumnType::Formula, Some("[Missing] + [A]")),
            ],
            ..Default::default()
        };

        match snapshot.into_table(EngineOptions::default()) {
            Err(Error::UnresolvedColumns(names)) => assert_eq!(names, vec!["B".to_string()]),
            other => panic!("expected unresolved columns, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_other_formula_errors_fail_immediately() {
        let snapshot = ProjectSnapshot {
            columns: vec![
                record("c0", "A", ColumnType::Numerical, None),
                record("c1", "B", ColumnType::Formula, Some("[A] +")),
            ],
            ..Default::default()
        };
        assert!(matches!(
            snapshot.into_table(EngineOptions::default()),
            Err(Error::Formula(FormulaError::Syntax(_)))
        ));
    }

    #[test]
    fn test_missing_edge_endpoint() {
        let snapshot = ProjectSnapshot {
            columns: vec![record("c0", "A", ColumnType::Numerical, None)],
            dependencies: vec![Dependency::value("c9".into(), "c0".into())],
            ..Default::default()
        };
        assert!(matches!(
            snapshot.into_table(EngineOptions::default()),
            Err(Error::Graph(_))
        ));
    }

    #[test]
    fn test_edge_into_plain_column_is_rejected() {
        let snapshot = ProjectSnapshot {
            columns: vec![
                record("c0", "A", ColumnType::Numerical, None),
                record("c1", "B", ColumnType::Numerical, None),
            ],
            dependencies: vec![Dependency::value("c1".into(), "c0".into())],
            ..Default::default()
        };
        match snapshot.into_table(EngineOptions::default()) {
            Err(Error::UnexpectedDependency { dependent, dependee }) => {
                assert_eq!(dependent, NodeKey::from("c1"));
                assert_eq!(dependee, NodeKey::from("c0"));
            }
            other => panic!("expected unexpected dependency, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_edge_not_read_by_formula_is_rejected() {
        let snapshot = ProjectSnapshot {
            columns: vec![
                record("c0", "A", ColumnType::Numerical, None),
                record("c1", "B", ColumnType::Numerical, None),
                record("c2", "C", ColumnType::Formula, Some("[A] * 2")),
            ],
            dependencies: vec![
                Dependency::value("c2".into(), "c0".into()),
                Dependency::value("c2".into(), "c1".into()),
            ],
            ..Default::default()
        };
        assert!(matches!(
            snapshot.into_table(EngineOptions::default()),
            Err(Error::UnexpectedDependency { .. })
        ));
    }

    #[test]
    fn test_implied_edges_load() {
        let snapshot = ProjectSnapshot {
            columns: vec![
                record("c0", "A", ColumnType::Numerical, None),
                record("c1", "B", ColumnType::Formula, Some("[A] * 2")),
            ],
            rows: vec![Row::new(phyco_core::RowKey::new(0))],
            dependencies: vec![
                Dependency::value("c1".into(), "c0".into()),
                Dependency::value("g0".into(), "c1".into()),
            ],
            charts: vec![Chart::new("g0".into(), "Line", phyco_chart::ChartKind::Linear)
                .with_series(phyco_chart::DataSeries::new("c1".into()))],
        };
        let mut editor = crate::Editor::from_snapshot(snapshot, EngineOptions::default()).unwrap();

        let report = editor.submit(crate::Intent::EditCell {
            column_key: "c0".into(),
            row_index: 0,
            value: "4".into(),
        });
        assert!(report.is_valid(), "{:?}", report);
        assert_eq!(editor.table().cell(0, &"c1".into()), Some("8"));
    }

    #[test]
    fn test_json_shape() {
        let snapshot = ProjectSnapshot {
            columns: vec![record("c0", "A", ColumnType::Numerical, None)],
            ..Default::default()
        };
        let json = snapshot.to_json().unwrap();
        assert!(json.contains(r#""type": "numerical""#));
        assert!(!json.contains("raw_expression"));
        assert_eq!(ProjectSnapshot::from_json(&json).unwrap(), snapshot);
    }
}
