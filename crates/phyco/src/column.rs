//! Column abstraction
//!
//! A column is either a plain data column (numerical or text, user
//! editable) or a formula column whose cells are computed from other
//! columns. Cells live in the table's rows; a column only knows how to fill
//! and refresh its own cells.

use phyco_core::{ColumnType, NodeKey, Row};
use phyco_formula::{format_number, ColumnFormula, Dependency, StatisticStore};

use crate::options::EngineOptions;

/// Table state a column may touch while refreshing itself
pub struct ColumnContext<'a> {
    pub rows: &'a mut Vec<Row>,
    pub statistics: &'a mut StatisticStore,
    pub options: &'a EngineOptions,
}

/// A user-entered data column
#[derive(Debug, Clone, PartialEq)]
pub struct PlainColumn {
    pub key: NodeKey,
    pub name: String,
    pub column_type: ColumnType,
}

/// A computed column
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaColumn {
    pub key: NodeKey,
    pub name: String,
    pub formula: ColumnFormula,
}

/// A table column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Plain(PlainColumn),
    Formula(FormulaColumn),
}

impl Column {
    /// Create a plain column
    ///
    /// `column_type` should be numerical or text; formula columns are built
    /// with [`Column::formula`].
    pub fn plain<S: Into<String>>(key: NodeKey, name: S, column_type: ColumnType) -> Self {
        Column::Plain(PlainColumn {
            key,
            name: name.into(),
            column_type,
        })
    }

    /// Create a formula column
    pub fn formula<S: Into<String>>(key: NodeKey, name: S, formula: ColumnFormula) -> Self {
        Column::Formula(FormulaColumn {
            key,
            name: name.into(),
            formula,
        })
    }

    pub fn key(&self) -> &NodeKey {
        match self {
            Column::Plain(c) => &c.key,
            Column::Formula(c) => &c.key,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Column::Plain(c) => &c.name,
            Column::Formula(c) => &c.name,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Plain(c) => c.column_type,
            Column::Formula(_) => ColumnType::Formula,
        }
    }

    /// Whether users may edit cells
    pub fn is_editable(&self) -> bool {
        !self.column_type().is_readonly()
    }

    /// Formula text, for formula columns
    pub fn raw_expression(&self) -> Option<&str> {
        match self {
            Column::Plain(_) => None,
            Column::Formula(c) => Some(c.formula.raw_expression()),
        }
    }

    pub fn as_formula(&self) -> Option<&FormulaColumn> {
        match self {
            Column::Plain(_) => None,
            Column::Formula(c) => Some(c),
        }
    }

    /// Graph edges this column needs
    pub fn dependencies(&self) -> Vec<Dependency> {
        match self {
            Column::Plain(_) => Vec::new(),
            Column::Formula(c) => c
                .formula
                .dependencies()
                .iter()
                .map(|d| Dependency::new(c.key.clone(), d.key.clone(), d.statistics.clone()))
                .collect(),
        }
    }

    /// Fill this column's cells
    ///
    /// Formula columns evaluate every row (refreshing the aggregates they
    /// read) and flag their own cache stale. Plain columns hold user data and
    /// do nothing.
    pub fn initialize(&self, ctx: &mut ColumnContext<'_>) {
        let Column::Formula(column) = self else {
            return;
        };

        let results = column.formula.evaluate_range(ctx.rows, ctx.statistics);
        for (row, value) in ctx.rows.iter_mut().zip(results) {
            row.set(column.key.clone(), format_number(value, &ctx.options.nan_text));
        }
        ctx.statistics.invalidate(&column.key);
        log::trace!("initialized formula column {}", column.key);
    }

    /// Take over from `old`, the column previously at this key
    ///
    /// Returns whether this column's cells changed. A formula column whose
    /// text is unchanged keeps the old compiled formula.
    pub fn update(&mut self, old: &Column, ctx: &mut ColumnContext<'_>) -> bool {
        let Column::Formula(column) = self else {
            return false;
        };

        if let Column::Formula(previous) = old {
            if previous.formula.raw_expression() == column.formula.raw_expression() {
                column.formula = previous.formula.clone();
                return false;
            }
        }

        ctx.statistics.invalidate(&column.key);
        self.initialize(ctx);
        true
    }

    /// React to changed dependees; returns whether this column changed
    ///
    /// # Panics
    ///
    /// Plain columns have no dependees, so calling this on one is a bug.
    pub fn on_dependency_update(&mut self, changed: &[NodeKey], ctx: &mut ColumnContext<'_>) -> bool {
        match self {
            Column::Plain(c) => {
                unreachable!("unreachable operation: plain column {} has no dependencies", c.key)
            }
            Column::Formula(_) => {
                for key in changed {
                    ctx.statistics.invalidate(key);
                }
                self.initialize(ctx);
                true
            }
        }
    }

    /// Follow the rename of a referenced column
    ///
    /// # Panics
    ///
    /// Plain columns have no dependees, so calling this on one is a bug.
    pub fn on_dependency_name_edit(&mut self, old_name: &str, new_name: &str) {
        match self {
            Column::Plain(c) => {
                unreachable!("unreachable operation: plain column {} has no dependencies", c.key)
            }
            Column::Formula(c) => c.formula.rename_dependency(old_name, new_name),
        }
    }

    /// A row was inserted at `index`
    pub fn on_row_added(&self, _index: usize, ctx: &mut ColumnContext<'_>) {
        self.refresh_after_row_change(ctx);
    }

    /// The row at `index` was removed
    pub fn on_row_deleted(&self, _index: usize, ctx: &mut ColumnContext<'_>) {
        self.refresh_after_row_change(ctx);
    }

    fn refresh_after_row_change(&self, ctx: &mut ColumnContext<'_>) {
        ctx.statistics.invalidate(self.key());
        if let Column::Formula(_) = self {
            self.initialize(ctx);
        }
    }

    /// Initial cell text for a new row
    pub fn new_row(&self, _index: usize) -> String {
        String::new()
    }

    /// Write a user value into `row`; returns whether it was accepted
    ///
    /// The value must already be validated and normalized.
    pub fn update_cell(&self, row: &mut Row, value: &str) -> bool {
        match self {
            Column::Plain(c) => {
                row.set(c.key.clone(), value);
                true
            }
            Column::Formula(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phyco_core::RowKey;
    use phyco_formula::ColumnSignature;
    use pretty_assertions::assert_eq;

    fn rows(values: &[&str]) -> Vec<Row> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut row = Row::new(RowKey::new(i as u64));
                row.set("a".into(), *v);
                row
            })
            .collect()
    }

    fn doubled() -> Column {
        let a = NodeKey::from("a");
        let columns = [ColumnSignature::new(&a, "A", ColumnType::Numerical)];
        let formula = ColumnFormula::new("[A] * 2", &columns).unwrap();
        Column::formula("b".into(), "B", formula)
    }

    fn cells(rows: &[Row], key: &str) -> Vec<String> {
        let key = NodeKey::from(key);
        rows.iter()
            .map(|r| r.get(&key).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_formula_initialize() {
        let mut rows = rows(&["1", "x", "3"]);
        let mut statistics = StatisticStore::new();
        let options = EngineOptions::default();
        let mut ctx = ColumnContext {
            rows: &mut rows,
            statistics: &mut statistics,
            options: &options,
        };

        doubled().initialize(&mut ctx);
        assert_eq!(cells(&rows, "b"), vec!["2", "NaN", "6"]);
    }

    #[test]
    fn test_dependencies() {
        assert!(Column::plain("a".into(), "A", ColumnType::Numerical)
            .dependencies()
            .is_empty());
        assert_eq!(
            doubled().dependencies(),
            vec![Dependency::value("b".into(), "a".into())]
        );
    }

    #[test]
    fn test_update_keeps_unchanged_formula() {
        let mut rows = rows(&["1"]);
        let mut statistics = StatisticStore::new();
        let options = EngineOptions::default();
        let mut ctx = ColumnContext {
            rows: &mut rows,
            statistics: &mut statistics,
            options: &options,
        };

        let old = doubled();
        let mut renamed = doubled();
        if let Column::Formula(c) = &mut renamed {
            c.name = "Twice".into();
        }
        assert!(!renamed.update(&old, &mut ctx));
        assert!(ctx.rows[0].get(&"b".into()).is_none());
    }

    #[test]
    fn test_update_cell() {
        let mut row = Row::new(RowKey::new(0));
        let plain = Column::plain("a".into(), "A", ColumnType::Text);
        assert!(plain.update_cell(&mut row, "hello"));
        assert_eq!(row.get(&"a".into()), Some("hello"));
        assert!(!doubled().update_cell(&mut row, "1"));
        assert!(!doubled().is_editable());
    }

    #[test]
    #[should_panic(expected = "unreachable operation")]
    fn test_plain_dependency_update_panics() {
        let mut rows = Vec::new();
        let mut statistics = StatisticStore::new();
        let options = EngineOptions::default();
        let mut ctx = ColumnContext {
            rows: &mut rows,
            statistics: &mut statistics,
            options: &options,
        };
        let mut plain = Column::plain("a".into(), "A", ColumnType::Numerical);
        plain.on_dependency_update(&["x".into()], &mut ctx);
    }
}
