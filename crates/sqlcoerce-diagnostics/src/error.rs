//! Cast errors and diagnostics

use crate::ErrorCode;
use crate::error_code::{
    SQLC0100, SQLC0101, SQLC0102, SQLC0110, SQLC0111, SQLC0112, SQLC0113, SQLC0200, SQLC0201,
    SQLC0202, SQLC0203, SQLC0204, SQLC0210, SQLC0211,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Error - the cast or resolution cannot proceed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A rendered diagnostic record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: ErrorCode,
    /// Stable kind tag
    pub tag: String,
    /// PostgreSQL SQLSTATE
    pub sqlstate: String,
    /// Human-readable message
    pub message: String,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    fn new(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        let info = code.info();
        Self {
            severity,
            code,
            tag: info.tag.to_string(),
            sqlstate: info.sqlstate.to_string(),
            message: message.into(),
            help: info.help.map(str::to_string),
        }
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render with terminal colors
    #[cfg(feature = "colored")]
    pub fn render_colored(&self) -> String {
        use colored::Colorize;

        let head = match self.severity {
            Severity::Error => format!("{}", self.severity).red().bold(),
        };
        let mut out = format!(
            "{}[{}]: {} {}",
            head,
            self.code,
            self.message,
            format!("({}, SQLSTATE {})", self.tag, self.sqlstate).dimmed()
        );
        if let Some(help) = &self.help {
            out.push_str(&format!("\n  {} {}", "help:".cyan(), help));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} ({}, SQLSTATE {})",
            self.severity, self.code, self.message, self.tag, self.sqlstate
        )
    }
}

/// Errors raised by type resolution, literal coercion and cast execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CastError {
    /// Type name not present in the registry
    #[error("type \"{name}\" does not exist")]
    UnknownType { name: String },

    /// Type name or alias already registered
    #[error("type \"{name}\" already exists")]
    DuplicateType { name: String },

    /// Equivalence chain loops back on itself
    #[error("type \"{name}\" has a cyclic equivalence chain")]
    CyclicEquivalence { name: String },

    /// Operands cannot be unified
    #[error("{message}")]
    IncompatibleTypes { message: String },

    /// CASE branches have no common type
    #[error("CASE types {first} and {second} cannot be matched")]
    CaseBranchType { first: String, second: String },

    /// Scalar subquery with a column count other than one
    #[error("subquery must return only one column")]
    ScalarSubqueryCardinality { columns: usize },

    /// No usable cast edge at the requested mode
    #[error("cannot cast type {from} to {to}")]
    NoCastPath { from: String, to: String },

    #[error("invalid input syntax for type boolean: \"{input}\"")]
    InvalidBooleanLiteral { input: String },

    #[error("invalid input syntax for type {type_name}: \"{input}\"")]
    InvalidNumericLiteral { type_name: String, input: String },

    #[error("invalid input syntax for type {type_name}: \"{input}\"")]
    InvalidDateTimeLiteral { type_name: String, input: String },

    #[error("invalid input syntax for type interval: \"{input}\"")]
    InvalidIntervalLiteral { input: String },

    #[error("invalid input syntax for type json: {reason}")]
    InvalidJsonLiteral { input: String, reason: String },

    /// Validator of a custom equivalent type rejected the value
    #[error("value {value} is not valid for type {type_name}")]
    CustomTypeValidation { type_name: String, value: String },

    /// Declared length, precision or range exceeded
    #[error("{message}")]
    ConstraintViolation { message: String },
}

impl CastError {
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    pub fn duplicate_type(name: impl Into<String>) -> Self {
        Self::DuplicateType { name: name.into() }
    }

    pub fn cyclic_equivalence(name: impl Into<String>) -> Self {
        Self::CyclicEquivalence { name: name.into() }
    }

    pub fn incompatible(message: impl Into<String>) -> Self {
        Self::IncompatibleTypes {
            message: message.into(),
        }
    }

    /// `operator does not exist: left op right`
    pub fn operator_mismatch(
        left: impl fmt::Display,
        operator: impl fmt::Display,
        right: impl fmt::Display,
    ) -> Self {
        Self::incompatible(format!("operator does not exist: {left} {operator} {right}"))
    }

    /// Column assignment failure
    pub fn column_mismatch(target: impl fmt::Display, source: impl fmt::Display) -> Self {
        Self::incompatible(format!(
            "column is of type {target} but expression is of type {source}"
        ))
    }

    pub fn case_branch(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self::CaseBranchType {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn subquery_cardinality(columns: usize) -> Self {
        Self::ScalarSubqueryCardinality { columns }
    }

    pub fn no_cast_path(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::NoCastPath {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn invalid_boolean(input: impl Into<String>) -> Self {
        Self::InvalidBooleanLiteral {
            input: input.into(),
        }
    }

    pub fn invalid_numeric(type_name: impl Into<String>, input: impl Into<String>) -> Self {
        Self::InvalidNumericLiteral {
            type_name: type_name.into(),
            input: input.into(),
        }
    }

    pub fn invalid_datetime(type_name: impl Into<String>, input: impl Into<String>) -> Self {
        Self::InvalidDateTimeLiteral {
            type_name: type_name.into(),
            input: input.into(),
        }
    }

    pub fn invalid_interval(input: impl Into<String>) -> Self {
        Self::InvalidIntervalLiteral {
            input: input.into(),
        }
    }

    pub fn invalid_json(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidJsonLiteral {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn custom_validation(type_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::CustomTypeValidation {
            type_name: type_name.into(),
            value: value.into(),
        }
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownType { .. } => SQLC0100,
            Self::DuplicateType { .. } => SQLC0101,
            Self::CyclicEquivalence { .. } => SQLC0102,
            Self::IncompatibleTypes { .. } => SQLC0110,
            Self::CaseBranchType { .. } => SQLC0111,
            Self::ScalarSubqueryCardinality { .. } => SQLC0112,
            Self::NoCastPath { .. } => SQLC0113,
            Self::InvalidBooleanLiteral { .. } => SQLC0200,
            Self::InvalidNumericLiteral { .. } => SQLC0201,
            Self::InvalidDateTimeLiteral { .. } => SQLC0202,
            Self::InvalidIntervalLiteral { .. } => SQLC0203,
            Self::InvalidJsonLiteral { .. } => SQLC0204,
            Self::CustomTypeValidation { .. } => SQLC0210,
            Self::ConstraintViolation { .. } => SQLC0211,
        }
    }

    /// Stable kind tag, e.g. `IncompatibleTypesError`
    pub fn tag(&self) -> &'static str {
        self.code().tag()
    }

    /// PostgreSQL SQLSTATE for this error
    pub fn sqlstate(&self) -> &'static str {
        self.code().sqlstate()
    }

    /// Whether the error comes from parsing a literal value
    pub fn is_literal_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidBooleanLiteral { .. }
                | Self::InvalidNumericLiteral { .. }
                | Self::InvalidDateTimeLiteral { .. }
                | Self::InvalidIntervalLiteral { .. }
                | Self::InvalidJsonLiteral { .. }
        )
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            Self::InvalidJsonLiteral { input, .. } => {
                diag.with_help(format!("input was: {input}"))
            }
            Self::ScalarSubqueryCardinality { columns } => {
                diag.with_help(format!("the subquery projects {columns} columns"))
            }
            _ => diag,
        }
    }
}
