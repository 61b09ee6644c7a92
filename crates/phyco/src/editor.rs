//! Editor facade
//!
//! [`Editor`] ties a [`TableStore`] to its [`ActionManager`]: intents are
//! validated, turned into actions and executed; undo and redo walk the
//! history.

use std::path::Path;

use phyco_chart::{Chart, ChartKind, DataSeries};
use phyco_core::{ColumnType, NodeKey};
use phyco_formula::{StatisticSet, StatisticValues};

use crate::action::{
    Action, ActionManager, AddChart, AddColumn, AddRow, DeleteChart, DeleteColumn, DeleteRow,
    EditCell, EditColumn,
};
use crate::column::Column;
use crate::error::{Error, Result};
use crate::intent::Intent;
use crate::options::EngineOptions;
use crate::project::ProjectSnapshot;
use crate::table::TableStore;
use crate::validation::{self, ValidationReport};

/// Field used to report a failure of an otherwise valid intent
const ACTION_FIELD: &str = "action";

/// A table with undo history
#[derive(Debug, Clone, Default)]
pub struct Editor {
    table: TableStore,
    actions: ActionManager,
}

impl Editor {
    /// Create an editor over an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an editor over an empty table with custom options
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            table: TableStore::with_options(options),
            actions: ActionManager::new(),
        }
    }

    /// Create an editor over an existing table, with no history
    pub fn from_table(table: TableStore) -> Self {
        Self {
            table,
            actions: ActionManager::new(),
        }
    }

    pub fn table(&self) -> &TableStore {
        &self.table
    }

    pub fn actions(&self) -> &ActionManager {
        &self.actions
    }

    /// Validate an intent and, if valid, execute it
    pub fn submit(&mut self, intent: Intent) -> ValidationReport {
        let (mut report, action) = self.prepare(intent);
        if let Some(action) = action {
            if let Err(err) = self.actions.execute(&mut self.table, action) {
                log::warn!("validated action failed: {}", err);
                report.fail(ACTION_FIELD, err.to_string());
            }
        }
        report
    }

    /// Validate an intent and build its action
    fn prepare(&mut self, intent: Intent) -> (ValidationReport, Option<Action>) {
        let table = &self.table;
        let report = match &intent {
            Intent::AddColumn {
                name,
                column_type,
                formula,
            } => validation::validate_add_column(table, name, column_type, formula.as_deref()),
            Intent::EditColumn {
                index,
                name,
                formula,
            } => validation::validate_edit_column(table, *index, name, formula.as_deref()),
            Intent::DeleteColumn { index } => validation::validate_delete_column(table, *index),
            Intent::EditCell {
                column_key,
                row_index,
                value,
            } => validation::validate_edit_cell(table, column_key, *row_index, value),
            Intent::AddRow => ValidationReport::new(),
            Intent::DeleteRow { index } => validation::validate_delete_row(table, *index),
            Intent::AddChart {
                name,
                kind,
                columns,
            } => validation::validate_add_chart(table, name, kind, columns),
            Intent::DeleteChart { index } => validation::validate_delete_chart(table, *index),
        };

        if !report.is_valid() {
            log::debug!("intent rejected: {:?}", report.errors().collect::<Vec<_>>());
            return (report, None);
        }

        match self.build_action(intent) {
            Ok(action) => (report, Some(action)),
            Err(err) => {
                let mut report = report;
                report.fail(ACTION_FIELD, err.to_string());
                (report, None)
            }
        }
    }

    fn build_action(&mut self, intent: Intent) -> Result<Action> {
        let action: Action = match intent {
            Intent::AddColumn {
                name,
                column_type,
                formula,
            } => {
                let name = name.trim().to_string();
                let column_type = column_type.parse::<ColumnType>()?;
                let key = self.table.next_column_key();
                let column = match column_type {
                    ColumnType::Formula => {
                        let raw = formula.unwrap_or_default();
                        Column::formula(key, name, self.table.compile_formula(&raw)?)
                    }
                    plain => Column::plain(key, name, plain),
                };
                AddColumn::new(column).into()
            }
            Intent::EditColumn {
                index,
                name,
                formula,
            } => {
                let len = self.table.column_count();
                let current = self
                    .table
                    .column_at(index)
                    .ok_or_else(|| Error::out_of_bounds(index, len))?;
                let name = name.trim().to_string();
                let column = match current {
                    Column::Plain(plain) => {
                        Column::plain(plain.key.clone(), name, plain.column_type)
                    }
                    Column::Formula(existing) => {
                        let raw = formula.unwrap_or_default();
                        let compiled = if raw == existing.formula.raw_expression() {
                            existing.formula.clone()
                        } else {
                            self.table.compile_formula(&raw)?
                        };
                        Column::formula(existing.key.clone(), name, compiled)
                    }
                };
                EditColumn::new(index, column).into()
            }
            Intent::DeleteColumn { index } => DeleteColumn::new(index).into(),
            Intent::EditCell {
                column_key,
                row_index,
                value,
            } => EditCell::new(&self.table, &column_key, row_index, &value)?.into(),
            Intent::AddRow => AddRow::new(self.table.next_row_key()).into(),
            Intent::DeleteRow { index } => DeleteRow::new(index).into(),
            Intent::AddChart {
                name,
                kind,
                columns,
            } => {
                let kind = kind
                    .parse::<ChartKind>()
                    .map_err(|err| phyco_core::Error::other(err.to_string()))?;
                let mut chart = Chart::new(self.table.next_chart_key(), name.trim(), kind);
                let mut seen: Vec<NodeKey> = Vec::new();
                for column in columns {
                    if !seen.contains(&column) {
                        seen.push(column.clone());
                        chart = chart.with_series(DataSeries::new(column));
                    }
                }
                AddChart::new(chart).into()
            }
            Intent::DeleteChart { index } => DeleteChart::new(index).into(),
        };
        Ok(action)
    }

    /// Execute an already built action
    pub fn execute(&mut self, action: impl Into<Action>) -> Result<()> {
        self.actions.execute(&mut self.table, action)
    }

    /// Undo the last action; false when there is nothing to undo
    pub fn undo(&mut self) -> bool {
        self.actions.undo(&mut self.table)
    }

    /// Redo the last undone action; false when there is nothing to redo
    pub fn redo(&mut self) -> bool {
        self.actions.redo(&mut self.table)
    }

    pub fn can_undo(&self) -> bool {
        self.actions.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.actions.can_redo()
    }

    /// Recompute every formula column
    ///
    /// Not undoable; history is kept since recomputation does not change
    /// what any action recorded.
    pub fn recalculate_all(&mut self) -> usize {
        self.table.recalculate_all()
    }

    /// Aggregates of a column, computed on demand and cached
    pub fn column_statistics(&mut self, key: &NodeKey, kinds: &StatisticSet) -> StatisticValues {
        self.table.column_statistics(key, kinds)
    }

    /// Persistable snapshot of the table
    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot::from_table(&self.table)
    }

    /// Rebuild an editor from a snapshot, with empty history
    pub fn from_snapshot(snapshot: ProjectSnapshot, options: EngineOptions) -> Result<Self> {
        Ok(Self::from_table(snapshot.into_table(options)?))
    }

    /// Save the table as a JSON project file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.snapshot().write_to(path)
    }

    /// Open a JSON project file
    pub fn open<P: AsRef<Path>>(path: P, options: EngineOptions) -> Result<Self> {
        Self::from_snapshot(ProjectSnapshot::read_from(path)?, options)
    }
}
