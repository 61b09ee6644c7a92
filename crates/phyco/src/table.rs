//! Table state
//!
//! [`TableStore`] owns everything an edit can touch: columns, rows, charts,
//! the dependency graph and the statistic caches. Mutation goes through
//! [`Action`](crate::Action)s so that it can be undone; this module offers
//! read access plus the primitives actions are built from.

use phyco_chart::Chart;
use phyco_core::{parse_value, ColumnType, KeySequence, NodeKey, Row, RowKey};
use phyco_formula::{
    ColumnFormula, ColumnSignature, DependencyGraph, FormulaResult, StatisticKind, StatisticSet,
    StatisticStore, StatisticValues,
};

use crate::column::{Column, ColumnContext};
use crate::options::EngineOptions;

/// Values of one plotted column
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub column: NodeKey,
    /// Series label, or the column name
    pub name: String,
    /// One value per row; cells that are not numbers are NaN
    pub values: Vec<f64>,
}

/// The table: columns, rows, charts and their dependency graph
#[derive(Debug, Clone)]
pub struct TableStore {
    pub(crate) columns: Vec<Column>,
    pub(crate) rows: Vec<Row>,
    pub(crate) charts: Vec<Chart>,
    pub(crate) graph: DependencyGraph,
    pub(crate) statistics: StatisticStore,
    column_keys: KeySequence,
    chart_keys: KeySequence,
    next_row: u64,
    options: EngineOptions,
}

impl Default for TableStore {
    fn default() -> Self {
        Self::with_options(EngineOptions::default())
    }
}

impl TableStore {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with custom options
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            charts: Vec::new(),
            graph: DependencyGraph::new(),
            statistics: StatisticStore::new(),
            column_keys: KeySequence::new("c"),
            chart_keys: KeySequence::new("g"),
            next_row: 0,
            options,
        }
    }

    pub(crate) fn from_parts(
        columns: Vec<Column>,
        rows: Vec<Row>,
        charts: Vec<Chart>,
        graph: DependencyGraph,
        options: EngineOptions,
    ) -> Self {
        let next_row = rows.iter().map(|r| r.key.get() + 1).max().unwrap_or(0);
        Self {
            columns,
            rows,
            charts,
            graph,
            statistics: StatisticStore::new(),
            column_keys: KeySequence::new("c"),
            chart_keys: KeySequence::new("g"),
            next_row,
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    // === Columns ===

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, key: &NodeKey) -> Option<&Column> {
        self.columns.iter().find(|c| c.key() == key)
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_index(&self, key: &NodeKey) -> Option<usize> {
        self.columns.iter().position(|c| c.key() == key)
    }

    /// Find a column by exact name
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// What formulas need to know about every column
    pub fn signatures(&self) -> Vec<ColumnSignature<'_>> {
        self.columns
            .iter()
            .map(|c| ColumnSignature::new(c.key(), c.name(), c.column_type()))
            .collect()
    }

    /// Compile a formula against the current columns
    pub fn compile_formula(&self, raw_expression: &str) -> FormulaResult<ColumnFormula> {
        ColumnFormula::new(raw_expression, &self.signatures())
    }

    // === Rows ===

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell text at a row index
    pub fn cell(&self, row_index: usize, column: &NodeKey) -> Option<&str> {
        self.rows.get(row_index).and_then(|row| row.get(column))
    }

    /// A column's cells in row order; missing cells are empty
    pub fn column_cells(&self, column: &NodeKey) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.get(column).unwrap_or_default())
            .collect()
    }

    /// The finite numeric values of a column
    pub fn numeric_values(&self, column: &NodeKey) -> Vec<f64> {
        phyco_formula::numeric_values(self.rows.iter().filter_map(|row| row.get(column)))
    }

    // === Charts ===

    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    pub fn chart(&self, key: &NodeKey) -> Option<&Chart> {
        self.charts.iter().find(|c| &c.key == key)
    }

    pub fn chart_index(&self, key: &NodeKey) -> Option<usize> {
        self.charts.iter().position(|c| &c.key == key)
    }

    /// Data for every series of a chart whose column still exists
    pub fn chart_series(&self, key: &NodeKey) -> Option<Vec<SeriesData>> {
        let chart = self.chart(key)?;
        let series = chart
            .series
            .iter()
            .filter_map(|series| {
                let column = self.column(&series.column)?;
                let values = self
                    .rows
                    .iter()
                    .map(|row| row.get(&series.column).and_then(parse_value).unwrap_or(f64::NAN))
                    .collect();
                Some(SeriesData {
                    column: series.column.clone(),
                    name: series.label.clone().unwrap_or_else(|| column.name().to_string()),
                    values,
                })
            })
            .collect();
        Some(series)
    }

    // === Graph and statistics ===

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn statistics(&self) -> &StatisticStore {
        &self.statistics
    }

    /// Fresh aggregates of a column, computing what is stale or missing
    pub fn column_statistics(&mut self, key: &NodeKey, kinds: &StatisticSet) -> StatisticValues {
        let rows = &self.rows;
        self.statistics.ensure(key, kinds, || {
            phyco_formula::numeric_values(rows.iter().filter_map(|row| row.get(key)))
        })
    }

    /// One fresh aggregate of a column
    pub fn statistic(&mut self, key: &NodeKey, kind: StatisticKind) -> f64 {
        let kinds: StatisticSet = [kind].into_iter().collect();
        self.column_statistics(key, &kinds)
            .get(kind)
            .unwrap_or(f64::NAN)
    }

    /// Recompute every formula column in dependency order
    ///
    /// Returns the number of formula columns evaluated.
    pub fn recalculate_all(&mut self) -> usize {
        self.statistics.invalidate_all();
        let mut count = 0;
        for key in self.graph.topological_sort() {
            if let Some(index) = self.column_index(&key) {
                if matches!(self.columns[index], Column::Formula(_)) {
                    self.with_column(index, |column, ctx| column.initialize(ctx));
                    count += 1;
                }
            }
        }
        log::debug!("recalculated {} formula columns", count);
        count
    }

    // === Primitives for actions ===

    /// Allocate a key for a new column
    pub fn next_column_key(&mut self) -> NodeKey {
        let columns = &self.columns;
        let charts = &self.charts;
        self.column_keys.next_key(|key| {
            columns.iter().any(|c| c.key() == key) || charts.iter().any(|c| &c.key == key)
        })
    }

    /// Allocate a key for a new chart
    pub fn next_chart_key(&mut self) -> NodeKey {
        let columns = &self.columns;
        let charts = &self.charts;
        self.chart_keys.next_key(|key| {
            columns.iter().any(|c| c.key() == key) || charts.iter().any(|c| &c.key == key)
        })
    }

    /// Allocate a key for a new row
    pub fn next_row_key(&mut self) -> RowKey {
        let key = RowKey::new(self.next_row);
        self.next_row += 1;
        key
    }

    /// Normalize a validated plain cell value
    pub fn normalize_cell(&self, column_type: ColumnType, value: &str) -> String {
        if self.options.trim_input {
            column_type.preprocess(value)
        } else {
            value.to_string()
        }
    }

    /// Run `f` on the column at `index` with a context over the rest of the table
    pub(crate) fn with_column<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut Column, &mut ColumnContext<'_>) -> R,
    ) -> R {
        let TableStore {
            columns,
            rows,
            statistics,
            options,
            ..
        } = self;
        let mut ctx = ColumnContext {
            rows,
            statistics,
            options,
        };
        f(&mut columns[index], &mut ctx)
    }

    /// Recompute the transitive dependents of `changed`
    ///
    /// Returns the keys of the columns that changed.
    pub(crate) fn propagate(&mut self, changed: &NodeKey) -> Vec<NodeKey> {
        let TableStore {
            columns,
            rows,
            graph,
            statistics,
            options,
            ..
        } = self;

        graph.propagate_dependents(changed, |node, changed_dependees| {
            // Charts have nothing to recompute
            let Some(column) = columns.iter_mut().find(|c| c.key() == node) else {
                return false;
            };
            let mut ctx = ColumnContext {
                rows: &mut *rows,
                statistics: &mut *statistics,
                options: &*options,
            };
            column.on_dependency_update(changed_dependees, &mut ctx)
        })
    }

    /// Column keys in dependency order
    pub(crate) fn column_order(&self) -> Vec<NodeKey> {
        self.graph
            .topological_sort()
            .into_iter()
            .filter(|key| self.column_index(key).is_some())
            .collect()
    }

    /// Tell every column, dependencies first, that a row was added
    pub(crate) fn notify_row_added(&mut self, index: usize) {
        for key in self.column_order() {
            if let Some(position) = self.column_index(&key) {
                self.with_column(position, |column, ctx| column.on_row_added(index, ctx));
            }
        }
    }

    /// Tell every column, dependencies first, that a row was removed
    pub(crate) fn notify_row_deleted(&mut self, index: usize) {
        for key in self.column_order() {
            if let Some(position) = self.column_index(&key) {
                self.with_column(position, |column, ctx| column.on_row_deleted(index, ctx));
            }
        }
    }
}
