//! Error codes for the casting engine
//!
//! Error code ranges:
//! - SQLC0100-SQLC0199: Type-system errors (registry, resolution, cast paths)
//! - SQLC0200-SQLC0299: Value errors (literal parsing, validation, constraints)
//!
//! Every code carries a stable kind tag (e.g. `IncompatibleTypesError`) that
//! callers can match on, and the SQLSTATE PostgreSQL raises for the same
//! condition.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// Stable kind tag, e.g. `NoCastPathError`
    pub fn tag(&self) -> &'static str {
        self.info().tag
    }

    /// SQLSTATE reported for this code
    pub fn sqlstate(&self) -> &'static str {
        self.info().sqlstate
    }

    /// Check if this is a type-system error (0100-0199)
    pub const fn is_type_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is a value error (0200-0299)
    pub const fn is_value_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SQLC{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Stable kind tag
    pub tag: &'static str,
    /// Short description of the error
    pub description: &'static str,
    /// PostgreSQL SQLSTATE
    pub sqlstate: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(tag: &'static str, description: &'static str, sqlstate: &'static str) -> Self {
        Self {
            tag,
            description,
            sqlstate,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("UnknownError", "Unknown error", "XX000");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Type-system errors (0100-0199)
    map.insert(100, ErrorInfo::new("UnknownTypeError", "Unknown type", "42704"));
    map.insert(
        101,
        ErrorInfo::new("DuplicateTypeError", "Duplicate type name", "42710")
            .with_help("Type names are case-insensitive and cannot be registered twice"),
    );
    map.insert(102, ErrorInfo::new("CyclicEquivalenceError", "Cyclic type equivalence", "42P17"));
    map.insert(
        110,
        ErrorInfo::new("IncompatibleTypesError", "Incompatible operand types", "42804")
            .with_help("Add an explicit cast to one of the operands"),
    );
    map.insert(111, ErrorInfo::new("CaseBranchTypeError", "CASE branches have no common type", "42804"));
    map.insert(
        112,
        ErrorInfo::new(
            "ScalarSubqueryCardinalityError",
            "Scalar subquery projects more than one column",
            "42601",
        ),
    );
    map.insert(113, ErrorInfo::new("NoCastPathError", "No cast path between types", "42846"));

    // Value errors (0200-0299)
    map.insert(200, ErrorInfo::new("InvalidBooleanLiteralError", "Invalid boolean literal", "22P02"));
    map.insert(201, ErrorInfo::new("InvalidNumericLiteralError", "Invalid numeric literal", "22P02"));
    map.insert(202, ErrorInfo::new("InvalidDateTimeLiteralError", "Invalid date/time literal", "22007"));
    map.insert(203, ErrorInfo::new("InvalidIntervalLiteralError", "Invalid interval literal", "22007"));
    map.insert(204, ErrorInfo::new("InvalidJsonLiteralError", "Invalid JSON literal", "22P02"));
    map.insert(
        210,
        ErrorInfo::new("CustomTypeValidationError", "Value rejected by custom type", "23514"),
    );
    map.insert(
        211,
        ErrorInfo::new("ConstraintViolationError", "Value violates a type constraint", "22001"),
    );

    map
});

// Type-system errors
pub const SQLC0100: ErrorCode = ErrorCode::new(100);
pub const SQLC0101: ErrorCode = ErrorCode::new(101);
pub const SQLC0102: ErrorCode = ErrorCode::new(102);
pub const SQLC0110: ErrorCode = ErrorCode::new(110);
pub const SQLC0111: ErrorCode = ErrorCode::new(111);
pub const SQLC0112: ErrorCode = ErrorCode::new(112);
pub const SQLC0113: ErrorCode = ErrorCode::new(113);

// Value errors
pub const SQLC0200: ErrorCode = ErrorCode::new(200);
pub const SQLC0201: ErrorCode = ErrorCode::new(201);
pub const SQLC0202: ErrorCode = ErrorCode::new(202);
pub const SQLC0203: ErrorCode = ErrorCode::new(203);
pub const SQLC0204: ErrorCode = ErrorCode::new(204);
pub const SQLC0210: ErrorCode = ErrorCode::new(210);
pub const SQLC0211: ErrorCode = ErrorCode::new(211);
