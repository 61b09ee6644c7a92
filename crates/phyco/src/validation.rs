//! Pre-commit validation of edit intents
//!
//! Validators inspect the table without mutating it and report a per-field
//! verdict. An intent whose report is invalid is never turned into an action.

use std::collections::BTreeMap;

use phyco_chart::ChartKind;
use phyco_core::{ColumnType, NodeKey};
use phyco_formula::Dependency;
use serde::{Deserialize, Serialize};

use crate::column::Column;
use crate::table::TableStore;

pub const NAME_REQUIRED: &str = "Name is required";
pub const COLUMN_NAME_NOT_UNIQUE: &str = "Column name is not unique";
pub const COLUMN_NAME_RESERVED_CHARS: &str = "Column name can't contain '[', ']' or '.'";
pub const DATATYPE_REQUIRED: &str = "Datatype is required";
pub const DATATYPE_DOES_NOT_EXIST: &str = "Datatype does not exist";
pub const FORMULA_REQUIRED: &str = "Formula is required";
pub const CIRCULAR_DEPENDENCY: &str = "Cannot have circular dependency between columns";
pub const COLUMN_INDEX_OUT_OF_RANGE: &str = "Column index out of range";
pub const ROW_INDEX_OUT_OF_RANGE: &str = "Row index out of range";
pub const COLUMN_DOES_NOT_EXIST: &str = "Column does not exist";
pub const COLUMN_READ_ONLY: &str = "Column is read-only";
pub const INVALID_CELL_VALUE: &str = "Invalid cell value";
pub const CHART_NAME_NOT_UNIQUE: &str = "Chart name is not unique";
pub const CHART_NAME_SPECIAL_CHARS: &str = "Chart name can't contain special characters";
pub const CHART_TYPE_REQUIRED: &str = "Type is required";
pub const CHART_TYPE_DOES_NOT_EXIST: &str = "Chart type does not exist";
pub const CHART_COLUMN_NOT_NUMERIC: &str = "Chart columns must be numeric";
pub const CHART_INDEX_OUT_OF_RANGE: &str = "Chart index out of range";

/// Verdict for one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValidation {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl FieldValidation {
    pub fn valid() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Per-field validation results, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationReport {
    fields: BTreeMap<String, FieldValidation>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a field valid unless it already failed
    pub fn pass(&mut self, field: &str) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(FieldValidation::valid);
    }

    /// Record a failure; the first failure of a field wins
    pub fn fail<S: Into<String>>(&mut self, field: &str, message: S) {
        let entry = self
            .fields
            .entry(field.to_string())
            .or_insert_with(FieldValidation::valid);
        if entry.ok {
            *entry = FieldValidation::invalid(message);
        }
    }

    /// Record the outcome of a check
    fn check(&mut self, field: &str, failure: Option<String>) {
        match failure {
            Some(message) => self.fail(field, message),
            None => self.pass(field),
        }
    }

    /// Whether every field passed
    pub fn is_valid(&self) -> bool {
        self.fields.values().all(|f| f.ok)
    }

    pub fn field(&self, name: &str) -> Option<&FieldValidation> {
        self.fields.get(name)
    }

    /// Failure message of a field, if it failed
    pub fn message(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .filter(|f| !f.ok)
            .map(|f| f.message.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValidation)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Failed fields and their messages
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.ok)
            .map(|(k, v)| (k.as_str(), v.message.as_str()))
    }
}

fn column_name_problem(table: &TableStore, name: &str, editing: Option<usize>) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return Some(NAME_REQUIRED.into());
    }
    let taken = table
        .columns()
        .iter()
        .enumerate()
        .any(|(i, c)| c.name() == name && Some(i) != editing);
    if taken {
        return Some(COLUMN_NAME_NOT_UNIQUE.into());
    }
    if name.contains(['[', ']', '.']) {
        return Some(COLUMN_NAME_RESERVED_CHARS.into());
    }
    None
}

/// Compile a formula and check it against the graph
///
/// `key` is the column that will own the formula, if it already exists.
fn formula_problem(table: &TableStore, key: Option<&NodeKey>, formula: Option<&str>) -> Option<String> {
    let raw = match formula {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Some(FORMULA_REQUIRED.into()),
    };

    let compiled = match table.compile_formula(raw) {
        Ok(compiled) => compiled,
        Err(err) => return Some(err.to_string()),
    };

    if let Some(key) = key {
        let dependencies: Vec<Dependency> = compiled
            .dependencies()
            .iter()
            .map(|d| Dependency::new(key.clone(), d.key.clone(), d.statistics.clone()))
            .collect();
        if table.graph().would_create_cycle(key, &dependencies) {
            return Some(CIRCULAR_DEPENDENCY.into());
        }
    }
    None
}

/// Validate adding a column
pub fn validate_add_column(
    table: &TableStore,
    name: &str,
    column_type: &str,
    formula: Option<&str>,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    report.check("name", column_name_problem(table, name, None));

    let parsed = if column_type.is_empty() {
        report.fail("type", DATATYPE_REQUIRED);
        None
    } else {
        match column_type.parse::<ColumnType>() {
            Ok(parsed) => {
                report.pass("type");
                Some(parsed)
            }
            Err(_) => {
                report.fail("type", DATATYPE_DOES_NOT_EXIST);
                None
            }
        }
    };

    if parsed == Some(ColumnType::Formula) {
        report.check("formula", formula_problem(table, None, formula));
    }
    report
}

/// Validate renaming a column and, for formula columns, changing its formula
pub fn validate_edit_column(
    table: &TableStore,
    index: usize,
    name: &str,
    formula: Option<&str>,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    let Some(column) = table.column_at(index) else {
        report.fail("index", COLUMN_INDEX_OUT_OF_RANGE);
        return report;
    };
    report.pass("index");
    report.check("name", column_name_problem(table, name, Some(index)));

    if let Column::Formula(_) = column {
        report.check("formula", formula_problem(table, Some(column.key()), formula));
    }
    report
}

/// Validate deleting a column
pub fn validate_delete_column(table: &TableStore, index: usize) -> ValidationReport {
    let mut report = ValidationReport::new();
    if index < table.column_count() {
        report.pass("index");
    } else {
        report.fail("index", COLUMN_INDEX_OUT_OF_RANGE);
    }
    report
}

/// Validate a user cell edit
pub fn validate_edit_cell(
    table: &TableStore,
    column: &NodeKey,
    row_index: usize,
    value: &str,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    match table.column(column) {
        None => report.fail("column", COLUMN_DOES_NOT_EXIST),
        Some(target) if !target.is_editable() => report.fail("column", COLUMN_READ_ONLY),
        Some(target) => {
            report.pass("column");
            if target.column_type().is_valid(value) {
                report.pass("value");
            } else {
                report.fail("value", INVALID_CELL_VALUE);
            }
        }
    }

    if row_index < table.row_count() {
        report.pass("row");
    } else {
        report.fail("row", ROW_INDEX_OUT_OF_RANGE);
    }
    report
}

/// Validate deleting a row
pub fn validate_delete_row(table: &TableStore, index: usize) -> ValidationReport {
    let mut report = ValidationReport::new();
    if index < table.row_count() {
        report.pass("index");
    } else {
        report.fail("index", ROW_INDEX_OUT_OF_RANGE);
    }
    report
}

fn is_chart_name_allowed(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '_' || c == '-')
}

/// Validate adding a chart
pub fn validate_add_chart(
    table: &TableStore,
    name: &str,
    kind: &str,
    columns: &[NodeKey],
) -> ValidationReport {
    let mut report = ValidationReport::new();

    let trimmed = name.trim();
    if trimmed.is_empty() {
        report.fail("name", NAME_REQUIRED);
    } else if table.charts().iter().any(|c| c.name == trimmed) {
        report.fail("name", CHART_NAME_NOT_UNIQUE);
    } else if !is_chart_name_allowed(trimmed) {
        report.fail("name", CHART_NAME_SPECIAL_CHARS);
    } else {
        report.pass("name");
    }

    let parsed = if kind.is_empty() {
        report.fail("kind", CHART_TYPE_REQUIRED);
        None
    } else {
        match kind.parse::<ChartKind>() {
            Ok(parsed) => {
                report.pass("kind");
                Some(parsed)
            }
            Err(_) => {
                report.fail("kind", CHART_TYPE_DOES_NOT_EXIST);
                None
            }
        }
    };

    for key in columns {
        match table.column(key) {
            None => report.fail("columns", COLUMN_DOES_NOT_EXIST),
            Some(column) if !column.column_type().is_numeric() => {
                report.fail("columns", CHART_COLUMN_NOT_NUMERIC)
            }
            Some(_) => {}
        }
    }
    if let Some(kind) = parsed {
        let mut distinct: Vec<&NodeKey> = Vec::new();
        for key in columns {
            if !distinct.contains(&key) {
                distinct.push(key);
            }
        }
        if distinct.len() < kind.min_series() {
            report.fail(
                "columns",
                format!("{} chart needs at least {} column(s)", kind.text(), kind.min_series()),
            );
        }
    }
    report.pass("columns");
    report
}

/// Validate deleting a chart
pub fn validate_delete_chart(table: &TableStore, index: usize) -> ValidationReport {
    let mut report = ValidationReport::new();
    if index < table.charts().len() {
        report.pass("index");
    } else {
        report.fail("index", CHART_INDEX_OUT_OF_RANGE);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionManager, AddColumn, AddRow};
    use pretty_assertions::assert_eq;

    fn table_with(columns: &[(&str, &str)]) -> TableStore {
        let mut table = TableStore::new();
        let mut actions = ActionManager::new();
        for (name, kind) in columns {
            let key = table.next_column_key();
            let column = match kind.parse::<ColumnType>().unwrap() {
                ColumnType::Formula => {
                    Column::formula(key, *name, table.compile_formula("1").unwrap())
                }
                plain => Column::plain(key, *name, plain),
            };
            actions.execute(&mut table, AddColumn::new(column)).unwrap();
        }
        let row = table.next_row_key();
        actions.execute(&mut table, AddRow::new(row)).unwrap();
        table
    }

    #[test]
    fn test_report_first_failure_wins() {
        let mut report = ValidationReport::new();
        report.pass("name");
        report.fail("name", "first");
        report.fail("name", "second");
        report.pass("name");
        assert!(!report.is_valid());
        assert_eq!(report.message("name"), Some("first"));
        assert_eq!(report.errors().count(), 1);
    }

    #[test]
    fn test_add_column_messages() {
        let table = table_with(&[("A", "numerical"), ("Label", "text")]);

        let report = validate_add_column(&table, "  ", "", None);
        assert_eq!(report.message("name"), Some(NAME_REQUIRED));
        assert_eq!(report.message("type"), Some(DATATYPE_REQUIRED));

        let report = validate_add_column(&table, "A", "date", None);
        assert_eq!(report.message("name"), Some(COLUMN_NAME_NOT_UNIQUE));
        assert_eq!(report.message("type"), Some(DATATYPE_DOES_NOT_EXIST));

        let report = validate_add_column(&table, "A.b", "numerical", None);
        assert_eq!(report.message("name"), Some(COLUMN_NAME_RESERVED_CHARS));

        let report = validate_add_column(&table, "F", "formula", None);
        assert_eq!(report.message("formula"), Some(FORMULA_REQUIRED));

        let report = validate_add_column(&table, "F", "formula", Some("[Label] + 1"));
        assert_eq!(
            report.message("formula"),
            Some("Column 'Label' contains text and cannot be used in a formula: [Label]")
        );

        let report = validate_add_column(&table, "F", "formula", Some("[A.mean] * 2"));
        assert!(report.is_valid());
        assert_eq!(report.field("formula"), Some(&FieldValidation::valid()));
    }

    #[test]
    fn test_edit_column_detects_self_reference() {
        let table = table_with(&[("A", "numerical"), ("F", "formula")]);

        let report = validate_edit_column(&table, 1, "F", Some("[F.mean]"));
        assert_eq!(report.message("formula"), Some(CIRCULAR_DEPENDENCY));

        let report = validate_edit_column(&table, 1, "F", Some("[A] + 1"));
        assert!(report.is_valid());

        // Keeping its own name is fine
        let report = validate_edit_column(&table, 0, "A", None);
        assert!(report.is_valid());

        let report = validate_edit_column(&table, 5, "A", None);
        assert_eq!(report.message("index"), Some(COLUMN_INDEX_OUT_OF_RANGE));
    }

    #[test]
    fn test_edit_cell_messages() {
        let table = table_with(&[("A", "numerical"), ("F", "formula")]);
        let a = table.column_at(0).unwrap().key().clone();
        let f = table.column_at(1).unwrap().key().clone();

        assert!(validate_edit_cell(&table, &a, 0, " 4 ").is_valid());
        assert_eq!(
            validate_edit_cell(&table, &a, 0, "four").message("value"),
            Some(INVALID_CELL_VALUE)
        );
        assert_eq!(
            validate_edit_cell(&table, &a, 3, "4").message("row"),
            Some(ROW_INDEX_OUT_OF_RANGE)
        );
        assert_eq!(
            validate_edit_cell(&table, &f, 0, "4").message("column"),
            Some(COLUMN_READ_ONLY)
        );
        assert_eq!(
            validate_edit_cell(&table, &"zz".into(), 0, "4").message("column"),
            Some(COLUMN_DOES_NOT_EXIST)
        );
    }

    #[test]
    fn test_add_chart_messages() {
        let table = table_with(&[("A", "numerical"), ("Label", "text")]);
        let a = table.column_at(0).unwrap().key().clone();
        let label = table.column_at(1).unwrap().key().clone();

        assert!(validate_add_chart(&table, "Speed", "linear", &[a.clone()]).is_valid());

        let report = validate_add_chart(&table, "Speed!", "pie", &[label]);
        assert_eq!(report.message("name"), Some(CHART_NAME_SPECIAL_CHARS));
        assert_eq!(report.message("kind"), Some(CHART_TYPE_DOES_NOT_EXIST));
        assert_eq!(report.message("columns"), Some(CHART_COLUMN_NOT_NUMERIC));

        let report = validate_add_chart(&table, "Matrix", "correlation", &[a]);
        assert_eq!(
            report.message("columns"),
            Some("Correlation Matrix chart needs at least 2 column(s)")
        );
    }

    #[test]
    fn test_index_messages() {
        let table = table_with(&[("A", "numerical")]);
        assert!(validate_delete_column(&table, 0).is_valid());
        assert!(!validate_delete_column(&table, 1).is_valid());
        assert!(validate_delete_row(&table, 1).is_valid());
        assert!(!validate_delete_row(&table, 2).is_valid());
        assert_eq!(
            validate_delete_chart(&table, 0).message("index"),
            Some(CHART_INDEX_OUT_OF_RANGE)
        );
    }
}
