//! Undoable table edits
//!
//! Every mutation of a [`TableStore`] is an [`Action`]. Applying an action
//! records what it destroys (rows, columns, graph edges with their positions,
//! previous cell values) so that reverting it restores the table exactly.
//! The [`ActionManager`] keeps the undo and redo stacks and snapshots the
//! statistic caches around each action.

use std::collections::BTreeMap;

use phyco_chart::Chart;
use phyco_core::{NodeKey, Row, RowKey};
use phyco_formula::{Dependency, RemovedNodes, StatisticStore};

use crate::column::Column;
use crate::error::{Error, Result};
use crate::table::TableStore;

/// An undoable edit
#[derive(Debug, Clone)]
pub enum Action {
    AddColumn(AddColumn),
    EditColumn(EditColumn),
    DeleteColumn(DeleteColumn),
    AddRow(AddRow),
    DeleteRow(DeleteRow),
    EditCell(EditCell),
    AddChart(AddChart),
    DeleteChart(DeleteChart),
}

impl Action {
    /// Short description for menus and logs
    pub fn label(&self) -> &'static str {
        match self {
            Action::AddColumn(_) => "Add column",
            Action::EditColumn(_) => "Edit column",
            Action::DeleteColumn(_) => "Delete column",
            Action::AddRow(_) => "Add row",
            Action::DeleteRow(_) => "Delete row",
            Action::EditCell(_) => "Edit cell",
            Action::AddChart(_) => "Add chart",
            Action::DeleteChart(_) => "Delete chart",
        }
    }

    /// Apply the action; on error the table is unchanged
    pub(crate) fn apply(&mut self, table: &mut TableStore) -> Result<()> {
        match self {
            Action::AddColumn(a) => a.apply(table),
            Action::EditColumn(a) => a.apply(table),
            Action::DeleteColumn(a) => a.apply(table),
            Action::AddRow(a) => a.apply(table),
            Action::DeleteRow(a) => a.apply(table),
            Action::EditCell(a) => a.apply(table),
            Action::AddChart(a) => a.apply(table),
            Action::DeleteChart(a) => a.apply(table),
        }
    }

    /// Revert a previously applied action
    pub(crate) fn revert(&mut self, table: &mut TableStore) {
        match self {
            Action::AddColumn(a) => a.revert(table),
            Action::EditColumn(a) => a.revert(table),
            Action::DeleteColumn(a) => a.revert(table),
            Action::AddRow(a) => a.revert(table),
            Action::DeleteRow(a) => a.revert(table),
            Action::EditCell(a) => a.revert(table),
            Action::AddChart(a) => a.revert(table),
            Action::DeleteChart(a) => a.revert(table),
        }
    }
}

macro_rules! impl_from_command {
    ($($name:ident),* $(,)?) => {
        $(
            impl From<$name> for Action {
                fn from(command: $name) -> Self {
                    Action::$name(command)
                }
            }
        )*
    };
}

impl_from_command!(AddColumn, EditColumn, DeleteColumn, AddRow, DeleteRow, EditCell, AddChart, DeleteChart);

// === Columns ===

/// Append a column
#[derive(Debug, Clone)]
pub struct AddColumn {
    column: Column,
    seed_row: Option<RowKey>,
    displaced_rows: Option<Vec<Row>>,
}

impl AddColumn {
    pub fn new(column: Column) -> Self {
        Self {
            column,
            seed_row: None,
            displaced_rows: None,
        }
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    fn apply(&mut self, table: &mut TableStore) -> Result<()> {
        let key = self.column.key().clone();
        if table.column(&key).is_some() {
            return Err(phyco_core::Error::DuplicateName(key.to_string()).into());
        }

        table.graph.add_dependencies(self.column.dependencies())?;
        table.graph.add_node(key.clone());

        self.displaced_rows = None;
        if table.columns.is_empty() && table.options().seed_first_row {
            let seed = match self.seed_row {
                Some(seed) => seed,
                None => {
                    let seed = table.next_row_key();
                    self.seed_row = Some(seed);
                    seed
                }
            };
            self.displaced_rows = Some(std::mem::replace(&mut table.rows, vec![Row::new(seed)]));
        }

        for (index, row) in table.rows.iter_mut().enumerate() {
            if row.get(&key).is_none() {
                row.set(key.clone(), self.column.new_row(index));
            }
        }

        table.columns.push(self.column.clone());
        let index = table.columns.len() - 1;
        table.with_column(index, |column, ctx| column.initialize(ctx));

        log::debug!("added column {} ({})", self.column.name(), key);
        Ok(())
    }

    fn revert(&mut self, table: &mut TableStore) {
        let key = self.column.key();
        if let Some(index) = table.column_index(key) {
            table.columns.remove(index);
        }
        table.graph.remove_node(key);

        match self.displaced_rows.take() {
            Some(rows) => table.rows = rows,
            None => {
                for row in &mut table.rows {
                    row.remove(key);
                }
            }
        }
    }
}

/// Replace the column at an index with an edited version of itself
#[derive(Debug, Clone)]
pub struct EditColumn {
    index: usize,
    column: Column,
    previous: Option<Column>,
    removed_edges: RemovedNodes,
}

impl EditColumn {
    /// `column` must carry the key of the column at `index`
    pub fn new(index: usize, column: Column) -> Self {
        Self {
            index,
            column,
            previous: None,
            removed_edges: RemovedNodes::default(),
        }
    }

    fn apply(&mut self, table: &mut TableStore) -> Result<()> {
        let len = table.columns.len();
        let current = table
            .columns
            .get(self.index)
            .ok_or_else(|| Error::out_of_bounds(self.index, len))?;
        let key = current.key().clone();
        if &key != self.column.key() {
            return Err(Error::UnknownColumn(self.column.key().clone()));
        }

        let removed = table.graph.pop_dependencies(&key);
        if let Err(err) = table.graph.add_dependencies(self.column.dependencies()) {
            table.graph.restore_nodes(removed);
            return Err(err.into());
        }
        self.removed_edges = removed;

        let previous = std::mem::replace(&mut table.columns[self.index], self.column.clone());
        swap_in(table, self.index, &previous);
        log::debug!("edited column {} ({})", self.column.name(), key);
        self.previous = Some(previous);
        Ok(())
    }

    fn revert(&mut self, table: &mut TableStore) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        let key = previous.key().clone();

        table.graph.remove_dependencies(&key);
        table.graph.restore_nodes(std::mem::take(&mut self.removed_edges));

        let edited = std::mem::replace(&mut table.columns[self.index], previous);
        swap_in(table, self.index, &edited);
    }
}

/// Finish replacing `old` with the column now at `index`
fn swap_in(table: &mut TableStore, index: usize, old: &Column) {
    let key = old.key().clone();
    let new_name = table.columns[index].name().to_string();

    if old.name() != new_name {
        let dependents: Vec<NodeKey> = table
            .graph
            .query_dependents(&key)
            .into_iter()
            .map(|d| d.dependent.clone())
            .collect();
        for dependent in dependents {
            if let Some(position) = table.column_index(&dependent) {
                table.columns[position].on_dependency_name_edit(old.name(), &new_name);
            }
        }
    }

    let changed = table.with_column(index, |column, ctx| column.update(old, ctx));
    if changed {
        table.propagate(&key);
    }
}

/// Delete a column and everything that depends on it
#[derive(Debug, Clone)]
pub struct DeleteColumn {
    index: usize,
    removed_columns: Vec<(usize, Column)>,
    removed_cells: Vec<BTreeMap<NodeKey, String>>,
    removed_nodes: RemovedNodes,
}

impl DeleteColumn {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            removed_columns: Vec::new(),
            removed_cells: Vec::new(),
            removed_nodes: RemovedNodes::default(),
        }
    }

    fn apply(&mut self, table: &mut TableStore) -> Result<()> {
        let len = table.columns.len();
        let key = table
            .columns
            .get(self.index)
            .ok_or_else(|| Error::out_of_bounds(self.index, len))?
            .key()
            .clone();

        // Charts in the cascade stay; they only lose their edges
        let cascade: Vec<NodeKey> = table
            .graph
            .traverse_dependents(&key)
            .into_iter()
            .filter(|k| table.column_index(k).is_some())
            .collect();

        self.removed_nodes = table.graph.pop_nodes(&cascade);

        self.removed_columns.clear();
        let mut kept = Vec::with_capacity(table.columns.len());
        for (index, column) in std::mem::take(&mut table.columns).into_iter().enumerate() {
            if cascade.contains(column.key()) {
                self.removed_columns.push((index, column));
            } else {
                kept.push(column);
            }
        }
        table.columns = kept;

        self.removed_cells = table
            .rows
            .iter_mut()
            .map(|row| row.take_cells(&cascade))
            .collect();

        for removed in &cascade {
            table.statistics.remove(removed);
        }

        log::debug!("deleted column {} with cascade {:?}", key, cascade);
        Ok(())
    }

    fn revert(&mut self, table: &mut TableStore) {
        table.graph.restore_nodes(std::mem::take(&mut self.removed_nodes));

        for (index, column) in std::mem::take(&mut self.removed_columns) {
            let index = index.min(table.columns.len());
            table.columns.insert(index, column);
        }

        for (row, cells) in table
            .rows
            .iter_mut()
            .zip(std::mem::take(&mut self.removed_cells))
        {
            row.merge_cells(cells);
        }
    }
}

// === Rows ===

/// Append a row
#[derive(Debug, Clone)]
pub struct AddRow {
    key: RowKey,
}

impl AddRow {
    pub fn new(key: RowKey) -> Self {
        Self { key }
    }

    fn apply(&mut self, table: &mut TableStore) -> Result<()> {
        let index = table.rows.len();
        let mut row = Row::new(self.key);
        for column in &table.columns {
            row.set(column.key().clone(), column.new_row(index));
        }
        table.rows.push(row);

        table.statistics.invalidate_all();
        table.notify_row_added(index);
        log::debug!("added row {} at {}", self.key, index);
        Ok(())
    }

    fn revert(&mut self, table: &mut TableStore) {
        if let Some(index) = table.rows.iter().rposition(|r| r.key == self.key) {
            table.rows.remove(index);
            table.statistics.invalidate_all();
            table.notify_row_deleted(index);
        }
    }
}

/// Delete the row at an index
#[derive(Debug, Clone)]
pub struct DeleteRow {
    index: usize,
    removed: Option<Row>,
}

impl DeleteRow {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            removed: None,
        }
    }

    fn apply(&mut self, table: &mut TableStore) -> Result<()> {
        if self.index >= table.rows.len() {
            return Err(Error::out_of_bounds(self.index, table.rows.len()));
        }
        let row = table.rows.remove(self.index);
        log::debug!("deleted row {} at {}", row.key, self.index);
        self.removed = Some(row);

        table.statistics.invalidate_all();
        table.notify_row_deleted(self.index);
        Ok(())
    }

    fn revert(&mut self, table: &mut TableStore) {
        if let Some(row) = self.removed.take() {
            let index = self.index.min(table.rows.len());
            table.rows.insert(index, row);
            table.statistics.invalidate_all();
            table.notify_row_added(index);
        }
    }
}

// === Cells ===

/// Set one cell of a plain column
#[derive(Debug, Clone)]
pub struct EditCell {
    column: NodeKey,
    row_index: usize,
    value: String,
    previous: Option<String>,
}

impl EditCell {
    /// Build an edit, validating and normalizing `value`
    ///
    /// # Errors
    ///
    /// Fails when the column is unknown or read-only, the row index is out
    /// of range, or the value is not valid for the column's datatype.
    pub fn new(table: &TableStore, column: &NodeKey, row_index: usize, value: &str) -> Result<Self> {
        let target = table
            .column(column)
            .ok_or_else(|| Error::UnknownColumn(column.clone()))?;
        if !target.is_editable() {
            return Err(phyco_core::Error::other(format!("Column is read-only: {}", column)).into());
        }
        if row_index >= table.row_count() {
            return Err(Error::out_of_bounds(row_index, table.row_count()));
        }

        let column_type = target.column_type();
        if !column_type.is_valid(value) {
            return Err(phyco_core::Error::InvalidCellValue {
                value: value.to_string(),
                datatype: column_type.value(),
            }
            .into());
        }

        Ok(Self {
            column: column.clone(),
            row_index,
            value: table.normalize_cell(column_type, value),
            previous: None,
        })
    }

    /// The normalized value this edit writes
    pub fn value(&self) -> &str {
        &self.value
    }

    fn apply(&mut self, table: &mut TableStore) -> Result<()> {
        let len = table.rows.len();
        let index = table
            .column_index(&self.column)
            .ok_or_else(|| Error::UnknownColumn(self.column.clone()))?;
        let row = table
            .rows
            .get_mut(self.row_index)
            .ok_or_else(|| Error::out_of_bounds(self.row_index, len))?;

        let previous = row.get(&self.column).map(str::to_string);
        if !table.columns[index].update_cell(row, &self.value) {
            return Err(phyco_core::Error::other(format!("Column is read-only: {}", self.column)).into());
        }
        self.previous = previous;

        table.statistics.invalidate(&self.column);
        let changed = table.propagate(&self.column);
        log::debug!(
            "edited cell {}[{}], {} dependents recomputed",
            self.column,
            self.row_index,
            changed.len()
        );
        Ok(())
    }

    fn revert(&mut self, table: &mut TableStore) {
        let Some(row) = table.rows.get_mut(self.row_index) else {
            return;
        };
        match self.previous.take() {
            Some(previous) => {
                row.set(self.column.clone(), previous);
            }
            None => {
                row.remove(&self.column);
            }
        }
        table.statistics.invalidate(&self.column);
        table.propagate(&self.column);
    }
}

// === Charts ===

/// Append a chart
#[derive(Debug, Clone)]
pub struct AddChart {
    chart: Chart,
}

impl AddChart {
    pub fn new(chart: Chart) -> Self {
        Self { chart }
    }

    fn apply(&mut self, table: &mut TableStore) -> Result<()> {
        let key = self.chart.key.clone();
        if table.chart(&key).is_some() || table.column(&key).is_some() {
            return Err(phyco_core::Error::DuplicateName(key.to_string()).into());
        }
        let columns = self.chart.referenced_columns();
        if let Some(missing) = columns.iter().find(|c| table.column(c).is_none()) {
            return Err(Error::UnknownColumn(missing.clone()));
        }

        table.graph.add_dependencies(
            columns
                .into_iter()
                .map(|column| Dependency::value(key.clone(), column)),
        )?;
        table.graph.add_node(key.clone());
        table.charts.push(self.chart.clone());
        log::debug!("added chart {} ({})", self.chart.name, key);
        Ok(())
    }

    fn revert(&mut self, table: &mut TableStore) {
        if let Some(index) = table.chart_index(&self.chart.key) {
            table.charts.remove(index);
        }
        table.graph.remove_node(&self.chart.key);
    }
}

/// Delete the chart at an index
#[derive(Debug, Clone)]
pub struct DeleteChart {
    index: usize,
    removed: Option<Chart>,
    removed_nodes: RemovedNodes,
}

impl DeleteChart {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            removed: None,
            removed_nodes: RemovedNodes::default(),
        }
    }

    fn apply(&mut self, table: &mut TableStore) -> Result<()> {
        if self.index >= table.charts.len() {
            return Err(Error::out_of_bounds(self.index, table.charts.len()));
        }
        let chart = table.charts.remove(self.index);
        self.removed_nodes = table.graph.pop_nodes(std::slice::from_ref(&chart.key));
        log::debug!("deleted chart {} ({})", chart.name, chart.key);
        self.removed = Some(chart);
        Ok(())
    }

    fn revert(&mut self, table: &mut TableStore) {
        if let Some(chart) = self.removed.take() {
            table.graph.restore_nodes(std::mem::take(&mut self.removed_nodes));
            let index = self.index.min(table.charts.len());
            table.charts.insert(index, chart);
        }
    }
}

// === Manager ===

/// An applied action and the statistic caches from before it
#[derive(Debug, Clone)]
struct Record {
    action: Action,
    statistics: StatisticStore,
}

/// Undo and redo stacks
#[derive(Debug, Clone, Default)]
pub struct ActionManager {
    undo_stack: Vec<Record>,
    redo_stack: Vec<Record>,
}

impl ActionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an action and push it on the undo stack, clearing redo
    ///
    /// A failing action leaves the table untouched and is not recorded.
    pub fn execute(&mut self, table: &mut TableStore, action: impl Into<Action>) -> Result<()> {
        let mut action = action.into();
        let statistics = table.statistics.clone();

        if let Err(err) = action.apply(table) {
            table.statistics = statistics;
            log::debug!("{} rejected: {}", action.label(), err);
            return Err(err);
        }

        log::debug!("executed {}", action.label());
        self.undo_stack.push(Record { action, statistics });
        self.redo_stack.clear();
        Ok(())
    }

    /// Revert the most recent action; false when there is nothing to undo
    pub fn undo(&mut self, table: &mut TableStore) -> bool {
        let Some(mut record) = self.undo_stack.pop() else {
            return false;
        };

        record.action.revert(table);
        let after = std::mem::replace(&mut table.statistics, record.statistics);
        record.statistics = after;

        log::debug!("undid {}", record.action.label());
        self.redo_stack.push(record);
        true
    }

    /// Re-apply the most recently undone action; false when there is nothing to redo
    pub fn redo(&mut self, table: &mut TableStore) -> bool {
        let Some(mut record) = self.redo_stack.pop() else {
            return false;
        };

        let before = table.statistics.clone();
        if let Err(err) = record.action.apply(table) {
            table.statistics = before;
            log::warn!("redo of {} failed: {}", record.action.label(), err);
            self.redo_stack.push(record);
            return false;
        }

        record.statistics = before;
        log::debug!("redid {}", record.action.label());
        self.undo_stack.push(record);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Label of the action [`undo`](Self::undo) would revert
    pub fn undo_label(&self) -> Option<&'static str> {
        self.undo_stack.last().map(|r| r.action.label())
    }

    /// Label of the action [`redo`](Self::redo) would re-apply
    pub fn redo_label(&self) -> Option<&'static str> {
        self.redo_stack.last().map(|r| r.action.label())
    }

    /// Forget all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
