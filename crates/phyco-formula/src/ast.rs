//! Formula Abstract Syntax Tree types

use phyco_core::NodeKey;

use crate::statistics::StatisticKind;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),

    /// Column variable, addressed by key
    Variable(Variable),

    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },

    /// Function call (name is lowercase)
    Function { name: String, args: Vec<Expr> },
}

impl Expr {
    /// Visit every variable in the expression, left to right
    pub fn for_each_variable<'a>(&'a self, f: &mut impl FnMut(&'a Variable)) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(var) => f(var),
            Expr::BinaryOp { left, right, .. } => {
                left.for_each_variable(f);
                right.for_each_variable(f);
            }
            Expr::UnaryOp { operand, .. } => operand.for_each_variable(f),
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.for_each_variable(f);
                }
            }
        }
    }
}

/// Reference to a column's raw value or one of its statistics
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub key: NodeKey,
    pub attribute: VariableAttribute,
}

/// Which value of a column a variable reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableAttribute {
    /// The cell in the current row
    Value,
    /// A whole-column aggregate
    Statistic(StatisticKind),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
}
