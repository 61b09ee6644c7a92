//! Formula evaluator

use ahash::AHashMap;
use phyco_core::NodeKey;

use crate::ast::{BinaryOperator, Expr, UnaryOperator, Variable, VariableAttribute};
use crate::functions::function_registry;
use crate::statistics::StatisticValues;

/// Supplies values for formula variables
pub trait VariableSource {
    /// Resolve a variable; unknown variables are NaN
    fn resolve(&self, var: &Variable) -> f64;
}

/// Values known for one column while evaluating one row
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VariableInput {
    /// The column's cell in the current row
    pub value: f64,
    /// The column's aggregates
    pub statistics: StatisticValues,
}

impl VariableInput {
    /// Input with a raw value and no aggregates
    pub fn value(value: f64) -> Self {
        Self {
            value,
            statistics: StatisticValues::default(),
        }
    }

    /// Input with a raw value and aggregates
    pub fn with_statistics(value: f64, statistics: StatisticValues) -> Self {
        Self { value, statistics }
    }
}

/// Variable values keyed by column key
pub type FormulaInput = AHashMap<NodeKey, VariableInput>;

impl VariableSource for FormulaInput {
    fn resolve(&self, var: &Variable) -> f64 {
        let Some(input) = self.get(&var.key) else {
            return f64::NAN;
        };
        match var.attribute {
            VariableAttribute::Value => input.value,
            VariableAttribute::Statistic(kind) => input.statistics.get(kind).unwrap_or(f64::NAN),
        }
    }
}

/// Evaluate an expression with IEEE-754 semantics
///
/// Division by zero gives an infinity, invalid operations give NaN.
pub fn evaluate(expr: &Expr, source: &dyn VariableSource) -> f64 {
    match expr {
        Expr::Number(n) => *n,

        Expr::Variable(var) => source.resolve(var),

        Expr::BinaryOp { op, left, right } => {
            let l = evaluate(left, source);
            let r = evaluate(right, source);
            match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide => l / r,
                BinaryOperator::Modulo => l % r,
                BinaryOperator::Power => l.powf(r),
            }
        }

        Expr::UnaryOp { op, operand } => {
            let v = evaluate(operand, source);
            match op {
                UnaryOperator::Negate => -v,
            }
        }

        Expr::Function { name, args } => {
            let values: Vec<f64> = args.iter().map(|arg| evaluate(arg, source)).collect();
            match function_registry().get(name) {
                Some(def) => (def.implementation)(&values),
                None => f64::NAN,
            }
        }
    }
}

/// Render a computed value as cell text
///
/// Integral values print without a fraction, NaN prints as `nan_text` and
/// infinities as `Infinity` / `-Infinity`.
pub fn format_number(value: f64, nan_text: &str) -> String {
    if value.is_nan() {
        return nan_text.to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    format!("{}", value)
}
