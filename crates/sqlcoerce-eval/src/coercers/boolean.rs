//! Boolean literal coercion

use sqlcoerce_diagnostics::{CastError, CastResult};

/// Parse a boolean literal
///
/// Any non-empty, case-insensitive prefix of `true` or `false` is accepted,
/// as are `1` and `0`. Surrounding whitespace is ignored.
pub fn parse_bool(raw: &str) -> CastResult<bool> {
    let text = raw.trim().to_ascii_lowercase();
    match text.as_str() {
        "" => Err(CastError::invalid_boolean(raw)),
        "1" => Ok(true),
        "0" => Ok(false),
        t if "true".starts_with(t) => Ok(true),
        t if "false".starts_with(t) => Ok(false),
        _ => Err(CastError::invalid_boolean(raw)),
    }
}
