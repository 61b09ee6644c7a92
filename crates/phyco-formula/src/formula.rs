//! Column formulas
//!
//! Users write formulas against column names: `[Name]` reads the current
//! row's value, `[Name.stat]` reads a whole-column aggregate. Compilation
//! resolves names to stable column keys and rewrites the text to the internal
//! `[key.val]` / `[key.stat]` form consumed by the parser.

use std::sync::OnceLock;

use ahash::AHashMap;
use phyco_core::{parse_value, ColumnType, NodeKey, Row};
use regex::{Captures, Regex};

use crate::ast::{Expr, Variable, VariableAttribute};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{evaluate, VariableSource};
use crate::parser::parse_expression;
use crate::statistics::{numeric_values, StatisticKind, StatisticSet, StatisticStore, StatisticValues};

static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
static VARIABLE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Any bracketed run without nested brackets
fn token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| Regex::new(r"\[[^\[\]]*\]").expect("valid token regex"))
}

/// `[Name]` or `[Name.attribute]`
fn variable_regex() -> &'static Regex {
    VARIABLE_REGEX.get_or_init(|| {
        Regex::new(r"^\[([^\[\].]+)(?:\.([^\[\].]+))?\]$").expect("valid variable regex")
    })
}

/// What a formula needs to know about a column it may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSignature<'a> {
    pub key: &'a NodeKey,
    pub name: &'a str,
    pub column_type: ColumnType,
}

impl<'a> ColumnSignature<'a> {
    pub fn new(key: &'a NodeKey, name: &'a str, column_type: ColumnType) -> Self {
        Self {
            key,
            name,
            column_type,
        }
    }
}

/// A column referenced by a formula and the aggregates it reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaDependency {
    pub key: NodeKey,
    pub name: String,
    pub statistics: StatisticSet,
}

/// A compiled column formula
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFormula {
    raw_expression: String,
    internal_expression: String,
    dependencies: Vec<FormulaDependency>,
    expr: Expr,
}

impl ColumnFormula {
    /// Compile `raw_expression` against the given columns
    ///
    /// # Errors
    ///
    /// Fails on malformed variables, unknown or text columns, unknown
    /// statistics and malformed arithmetic. A formula that compiles never
    /// fails to evaluate.
    pub fn new(raw_expression: &str, columns: &[ColumnSignature<'_>]) -> FormulaResult<Self> {
        let mut dependencies: Vec<FormulaDependency> = Vec::new();
        let mut internal_expression = String::with_capacity(raw_expression.len());
        let mut last = 0;

        for token in token_regex().find_iter(raw_expression) {
            internal_expression.push_str(&raw_expression[last..token.start()]);
            last = token.end();

            let variable = token.as_str();
            let captures = variable_regex()
                .captures(variable)
                .ok_or_else(|| FormulaError::BadVariableSyntax(variable.to_string()))?;
            let name = &captures[1];

            let column = columns
                .iter()
                .find(|c| c.name == name)
                .ok_or_else(|| FormulaError::ColumnDoesNotExist {
                    name: name.to_string(),
                    variable: variable.to_string(),
                })?;

            if !column.column_type.is_numeric() {
                return Err(FormulaError::TextColumnNotAllowed {
                    name: name.to_string(),
                    variable: variable.to_string(),
                });
            }

            let statistic = match captures.get(2) {
                Some(stat) => Some(stat.as_str().parse::<StatisticKind>().map_err(|stat| {
                    FormulaError::NotAStatisticType {
                        stat,
                        variable: variable.to_string(),
                    }
                })?),
                None => None,
            };

            let index = match dependencies.iter().position(|d| d.key == *column.key) {
                Some(index) => index,
                None => {
                    dependencies.push(FormulaDependency {
                        key: column.key.clone(),
                        name: column.name.to_string(),
                        statistics: StatisticSet::new(),
                    });
                    dependencies.len() - 1
                }
            };

            match statistic {
                Some(kind) => {
                    dependencies[index].statistics.insert(kind);
                    internal_expression.push_str(&format!("[{}.{}]", column.key, kind));
                }
                None => internal_expression.push_str(&format!("[{}.val]", column.key)),
            }
        }
        internal_expression.push_str(&raw_expression[last..]);

        let expr = parse_expression(&internal_expression)?;

        Ok(Self {
            raw_expression: raw_expression.to_string(),
            internal_expression,
            dependencies,
            expr,
        })
    }

    /// Formula text as the user wrote it (after renames)
    pub fn raw_expression(&self) -> &str {
        &self.raw_expression
    }

    /// Formula text with names resolved to keys
    pub fn internal_expression(&self) -> &str {
        &self.internal_expression
    }

    /// Referenced columns in order of first appearance
    pub fn dependencies(&self) -> &[FormulaDependency] {
        &self.dependencies
    }

    /// Whether the formula references `key`
    pub fn depends_on(&self, key: &NodeKey) -> bool {
        self.dependencies.iter().any(|d| &d.key == key)
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate for a single set of inputs
    pub fn evaluate(&self, source: &dyn VariableSource) -> f64 {
        evaluate(&self.expr, source)
    }

    /// Evaluate every row
    ///
    /// Referenced aggregates are refreshed once over the full column before
    /// any row is evaluated. Cells that are not numbers read as NaN.
    pub fn evaluate_range(&self, rows: &[Row], statistics: &mut StatisticStore) -> Vec<f64> {
        let mut aggregates: AHashMap<NodeKey, StatisticValues> = AHashMap::new();
        for dependency in &self.dependencies {
            if dependency.statistics.is_empty() {
                continue;
            }
            let key = &dependency.key;
            let values = statistics.ensure(key, &dependency.statistics, || {
                numeric_values(rows.iter().filter_map(|row| row.get(key)))
            });
            aggregates.insert(key.clone(), values);
        }

        rows.iter()
            .map(|row| {
                let source = RowSource {
                    row,
                    aggregates: &aggregates,
                };
                evaluate(&self.expr, &source)
            })
            .collect()
    }

    /// Follow a rename of a referenced column
    ///
    /// Only the user-facing text changes; keys and the compiled expression
    /// stay as they are.
    pub fn rename_dependency(&mut self, old_name: &str, new_name: &str) {
        let Some(dependency) = self.dependencies.iter_mut().find(|d| d.name == old_name) else {
            return;
        };
        dependency.name = new_name.to_string();

        self.raw_expression = token_regex()
            .replace_all(&self.raw_expression, |token: &Captures<'_>| {
                let text = &token[0];
                match variable_regex().captures(text) {
                    Some(variable) if &variable[1] == old_name => match variable.get(2) {
                        Some(stat) => format!("[{}.{}]", new_name, stat.as_str()),
                        None => format!("[{}]", new_name),
                    },
                    _ => text.to_string(),
                }
            })
            .into_owned();
    }
}

/// One row's cells plus precomputed aggregates
struct RowSource<'a> {
    row: &'a Row,
    aggregates: &'a AHashMap<NodeKey, StatisticValues>,
}

impl VariableSource for RowSource<'_> {
    fn resolve(&self, var: &Variable) -> f64 {
        match var.attribute {
            VariableAttribute::Value => self
                .row
                .get(&var.key)
                .and_then(parse_value)
                .unwrap_or(f64::NAN),
            VariableAttribute::Statistic(kind) => self
                .aggregates
                .get(&var.key)
                .and_then(|values| values.get(kind))
                .unwrap_or(f64::NAN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{FormulaInput, VariableInput};
    use phyco_core::RowKey;
    use pretty_assertions::assert_eq;

    struct Fixture {
        keys: Vec<NodeKey>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                keys: vec!["c0".into(), "c1".into(), "c2".into()],
            }
        }

        fn columns(&self) -> Vec<ColumnSignature<'_>> {
            vec![
                ColumnSignature::new(&self.keys[0], "A", ColumnType::Numerical),
                ColumnSignature::new(&self.keys[1], "Label", ColumnType::Text),
                ColumnSignature::new(&self.keys[2], "B", ColumnType::Formula),
            ]
        }
    }

    fn rows(values: &[&str]) -> Vec<Row> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut row = Row::new(RowKey::new(i as u64));
                row.set("c0".into(), *v);
                row
            })
            .collect()
    }

    #[test]
    fn test_compile_rewrites_names() {
        let fixture = Fixture::new();
        let formula = ColumnFormula::new("[A] * 2 + [B.mean] - [A.sum]", &fixture.columns()).unwrap();

        assert_eq!(formula.internal_expression(), "[c0.val] * 2 + [c2.mean] - [c0.sum]");
        assert_eq!(
            formula.dependencies(),
            &[
                FormulaDependency {
                    key: "c0".into(),
                    name: "A".into(),
                    statistics: [StatisticKind::Sum].into_iter().collect(),
                },
                FormulaDependency {
                    key: "c2".into(),
                    name: "B".into(),
                    statistics: [StatisticKind::Mean].into_iter().collect(),
                },
            ]
        );
    }

    #[test]
    fn test_compile_errors() {
        let fixture = Fixture::new();
        let columns = fixture.columns();

        assert_eq!(
            ColumnFormula::new("[A.b.c]", &columns),
            Err(FormulaError::BadVariableSyntax("[A.b.c]".into()))
        );
        assert_eq!(
            ColumnFormula::new("[]", &columns),
            Err(FormulaError::BadVariableSyntax("[]".into()))
        );
        assert_eq!(
            ColumnFormula::new("[Z] + 1", &columns),
            Err(FormulaError::ColumnDoesNotExist {
                name: "Z".into(),
                variable: "[Z]".into()
            })
        );
        assert_eq!(
            ColumnFormula::new("[Label]", &columns),
            Err(FormulaError::TextColumnNotAllowed {
                name: "Label".into(),
                variable: "[Label]".into()
            })
        );
        assert_eq!(
            ColumnFormula::new("[A.avg]", &columns),
            Err(FormulaError::NotAStatisticType {
                stat: "avg".into(),
                variable: "[A.avg]".into()
            })
        );
        assert!(matches!(
            ColumnFormula::new("[A] +", &columns),
            Err(FormulaError::Syntax(_))
        ));
    }

    #[test]
    fn test_names_are_exact() {
        let fixture = Fixture::new();
        assert!(ColumnFormula::new("[a]", &fixture.columns()).is_err());
        assert!(ColumnFormula::new("[ A ]", &fixture.columns()).is_err());
    }

    #[test]
    fn test_evaluate_single() {
        let fixture = Fixture::new();
        let formula = ColumnFormula::new("[A] * 2", &fixture.columns()).unwrap();

        let mut input = FormulaInput::default();
        input.insert("c0".into(), VariableInput::value(4.5));
        assert_eq!(formula.evaluate(&input), 9.0);
    }

    #[test]
    fn test_evaluate_range() {
        let fixture = Fixture::new();
        let formula = ColumnFormula::new("[A] - [A.mean]", &fixture.columns()).unwrap();
        let rows = rows(&["1", "2", "", "6"]);
        let mut statistics = StatisticStore::new();

        let results = formula.evaluate_range(&rows, &mut statistics);
        assert_eq!(results[0], -2.0);
        assert_eq!(results[1], -1.0);
        assert!(results[2].is_nan());
        assert_eq!(results[3], 3.0);

        let cache = statistics.get(&"c0".into()).unwrap();
        assert_eq!(cache.get(StatisticKind::Mean), Some(3.0));
        assert!(!cache.is_stale());
    }

    #[test]
    fn test_rename_dependency() {
        let fixture = Fixture::new();
        let mut formula =
            ColumnFormula::new("[A] + [A.max] + [B] + 1", &fixture.columns()).unwrap();
        let internal = formula.internal_expression().to_string();

        formula.rename_dependency("A", "Length");

        assert_eq!(formula.raw_expression(), "[Length] + [Length.max] + [B] + 1");
        assert_eq!(formula.internal_expression(), internal);
        assert_eq!(formula.dependencies()[0].name, "Length");
        assert_eq!(formula.dependencies()[0].key, NodeKey::from("c0"));
    }
}
