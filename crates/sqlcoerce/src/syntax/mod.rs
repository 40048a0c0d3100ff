//! Cast expression syntax
//!
//! A small SQL expression language that routes values into the casting
//! engine:
//! - `value::typename` and `CAST(value AS typename)`
//! - `typename 'literal'`, including modifiers such as `varchar(3)`
//! - `ARRAY[...]`, `to_date(text, fmt)` and `to_timestamp(text, fmt)`
//! - `CASE WHEN ... THEN ... ELSE ... END` and `CASE x WHEN v THEN ... END`
//! - `a || b`
//! - `+ - * /` and comparisons, which are resolved but not computed
//!
//! Parsing produces an [`Expr`]; [`Evaluator`] then resolves and executes
//! the casts each node needs. Bare quoted strings keep their raw text, so
//! they are typed by the context they meet.

mod eval;
mod parser;

pub use eval::{Evaluated, Evaluator, Unified};

use sqlcoerce_diagnostics::CastError;
use sqlcoerce_eval::CastEngine;
use sqlcoerce_types::Value;
use std::fmt;
use thiserror::Error;

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        };
        f.write_str(symbol)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
        };
        f.write_str(symbol)
    }
}

/// One `WHEN condition THEN result` arm
#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    pub condition: Expr,
    pub result: Expr,
}

/// Parsed cast expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Bare quoted string, typed by its context
    StringLiteral(String),
    /// Numeric literal text, optionally signed
    Number(String),
    Boolean(bool),
    Null,
    /// `typename 'literal'`
    TypedLiteral { type_name: String, raw: String },
    /// `value::typename` or `CAST(value AS typename)`
    Cast { operand: Box<Expr>, type_name: String },
    /// `ARRAY[a, b, ...]`
    Array(Vec<Expr>),
    /// Function call such as `to_date(text, fmt)`
    Call { function: String, args: Vec<Expr> },
    /// `a || b`
    Concat(Box<Expr>, Box<Expr>),
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Searched CASE, or simple CASE when `operand` is present
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<WhenClause>,
        otherwise: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn string(raw: impl Into<String>) -> Self {
        Self::StringLiteral(raw.into())
    }

    pub fn number(text: impl Into<String>) -> Self {
        Self::Number(text.into())
    }

    pub fn cast(operand: Expr, type_name: impl Into<String>) -> Self {
        Self::Cast {
            operand: Box::new(operand),
            type_name: type_name.into(),
        }
    }

    /// Binary operator or comparison at the root
    pub fn is_operator(&self) -> bool {
        matches!(self, Self::Arithmetic { .. } | Self::Comparison { .. })
    }
}

/// Malformed expression text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at offset {offset}: {message}")]
pub struct SyntaxError {
    /// Byte offset where parsing stopped
    pub offset: usize,
    pub message: String,
}

/// Failure while parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Cast(#[from] CastError),
}

/// Parse expression text, optionally prefixed by `SELECT` and ended by `;`
pub fn parse(text: &str) -> Result<Expr, SyntaxError> {
    parser::parse_statement(text)
}

/// Parse and evaluate expression text against `engine`
pub fn evaluate(engine: &CastEngine, text: &str) -> Result<Value, ExprError> {
    let expr = parse(text)?;
    let evaluated = Evaluator::new(engine).evaluate(&expr)?;
    Ok(evaluated.value)
}

/// Parse an operator expression and unify its operands against `engine`
pub fn unify(engine: &CastEngine, text: &str) -> Result<Unified, ExprError> {
    let expr = parse(text)?;
    Ok(Evaluator::new(engine).unify(&expr)?)
}
