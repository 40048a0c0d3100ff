//! Numeric literal coercion and narrowing
//!
//! Integer targets accept only an optional sign followed by digits; text with
//! a decimal point is rejected, never rounded. Narrowing conversions between
//! numeric payloads round half away from zero.

use regex::Regex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlcoerce_diagnostics::{CastError, CastResult};
use std::str::FromStr;
use std::sync::LazyLock;

static INTEGER_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("valid integer regex"));

static DECIMAL_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid decimal regex")
});

pub fn parse_int(raw: &str) -> CastResult<i32> {
    let text = raw.trim();
    if !INTEGER_TEXT.is_match(text) {
        return Err(CastError::invalid_numeric("integer", raw));
    }
    text.parse::<i32>()
        .map_err(|_| CastError::invalid_numeric("integer", raw))
}

pub fn parse_bigint(raw: &str) -> CastResult<i64> {
    let text = raw.trim();
    if !INTEGER_TEXT.is_match(text) {
        return Err(CastError::invalid_numeric("bigint", raw));
    }
    text.parse::<i64>()
        .map_err(|_| CastError::invalid_numeric("bigint", raw))
}

/// Parse a decimal or scientific numeral, keeping the written scale
pub fn parse_decimal(raw: &str) -> CastResult<Decimal> {
    let text = raw.trim();
    if !DECIMAL_TEXT.is_match(text) {
        return Err(CastError::invalid_numeric("numeric", raw));
    }
    let text = with_leading_zero(text);
    let parsed = if text.contains(['e', 'E']) {
        Decimal::from_scientific(&text)
    } else {
        Decimal::from_str(text.strip_suffix('.').unwrap_or(&text))
    };
    parsed.map_err(|_| CastError::invalid_numeric("numeric", raw))
}

/// `.5` -> `0.5`, `-.5` -> `-0.5`
fn with_leading_zero(text: &str) -> String {
    let (sign, digits) = match text.strip_prefix(['+', '-']) {
        Some(rest) => (&text[..1], rest),
        None => ("", text),
    };
    if digits.starts_with('.') {
        format!("{sign}0{digits}")
    } else {
        text.to_string()
    }
}

/// Parse a float numeral, including `NaN`, `Infinity` and `-Infinity`
pub fn parse_float(raw: &str) -> CastResult<f64> {
    let text = raw.trim();
    match text.to_ascii_lowercase().as_str() {
        "nan" => return Ok(f64::NAN),
        "infinity" | "+infinity" | "inf" => return Ok(f64::INFINITY),
        "-infinity" | "-inf" => return Ok(f64::NEG_INFINITY),
        _ => {}
    }
    if !DECIMAL_TEXT.is_match(text) {
        return Err(CastError::invalid_numeric("double precision", raw));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .ok_or_else(|| CastError::invalid_numeric("double precision", raw))
}

// === Narrowing ===

/// Round to an integral value, halves away from zero
pub fn round_half_away(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn out_of_range(type_name: &str) -> CastError {
    CastError::constraint(format!("{type_name} out of range"))
}

pub fn decimal_to_i32(d: Decimal) -> CastResult<i32> {
    round_half_away(d).to_i32().ok_or_else(|| out_of_range("integer"))
}

pub fn decimal_to_i64(d: Decimal) -> CastResult<i64> {
    round_half_away(d).to_i64().ok_or_else(|| out_of_range("bigint"))
}

pub fn decimal_to_f64(d: Decimal) -> CastResult<f64> {
    d.to_f64().ok_or_else(|| out_of_range("double precision"))
}

pub fn float_to_decimal(f: f64) -> CastResult<Decimal> {
    if !f.is_finite() {
        return Err(CastError::no_cast_path(format_special(f), "numeric"));
    }
    Decimal::from_f64(f).ok_or_else(|| out_of_range("numeric"))
}

fn format_special(f: f64) -> String {
    format!("double precision {}", sqlcoerce_types::format_float(f))
}

/// `f64::round` rounds halves away from zero
pub fn float_to_i32(f: f64) -> CastResult<i32> {
    let rounded = f.round();
    if rounded.is_finite() && rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX) {
        Ok(rounded as i32)
    } else {
        Err(out_of_range("integer"))
    }
}

pub fn float_to_i64(f: f64) -> CastResult<i64> {
    let rounded = f.round();
    // i64::MAX is not exactly representable; 2^63 is the first value out of range
    let limit = 9.223_372_036_854_776e18;
    if rounded.is_finite() && rounded >= -limit && rounded < limit {
        Ok(rounded as i64)
    } else {
        Err(out_of_range("bigint"))
    }
}

pub fn i64_to_i32(i: i64) -> CastResult<i32> {
    i32::try_from(i).map_err(|_| out_of_range("integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("42", 42)]
    #[case("-7", -7)]
    #[case(" +3 ", 3)]
    fn test_parse_int(#[case] raw: &str, #[case] expected: i32) {
        assert_eq!(parse_int(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("42.5")]
    #[case("42.0")]
    #[case("1e3")]
    #[case("blah")]
    #[case("")]
    #[case("99999999999")]
    fn test_parse_int_rejects(#[case] raw: &str) {
        assert_eq!(parse_int(raw).unwrap_err().tag(), "InvalidNumericLiteralError");
    }

    #[test]
    fn test_parse_bigint_range() {
        assert_eq!(parse_bigint("99999999999").unwrap(), 99_999_999_999);
    }

    #[rstest]
    #[case("42.5", "42.5")]
    #[case("1.10", "1.10")]
    #[case(".5", "0.5")]
    #[case("1.5e2", "150")]
    #[case("-3", "-3")]
    fn test_parse_decimal(#[case] raw: &str, #[case] expected: &str) {
        let expected: Decimal = expected.parse().unwrap();
        assert_eq!(parse_decimal(raw).unwrap().normalize(), expected.normalize());
    }

    #[test]
    fn test_parse_decimal_keeps_scale() {
        assert_eq!(parse_decimal("1.10").unwrap().to_string(), "1.10");
    }

    #[rstest]
    #[case("blah")]
    #[case("NaN")]
    #[case("1.2.3")]
    #[case("")]
    fn test_parse_decimal_rejects(#[case] raw: &str) {
        assert!(parse_decimal(raw).is_err());
    }

    #[test]
    fn test_parse_float_specials() {
        assert!(parse_float("NaN").unwrap().is_nan());
        assert_eq!(parse_float("Infinity").unwrap(), f64::INFINITY);
        assert_eq!(parse_float("-Infinity").unwrap(), f64::NEG_INFINITY);
        assert_eq!(parse_float("42.3").unwrap(), 42.3);
        assert!(parse_float("forty").is_err());
    }

    #[rstest]
    #[case("42.3", 42)]
    #[case("42.5", 43)]
    #[case("-42.5", -43)]
    #[case("0.49", 0)]
    fn test_round_half_away(#[case] input: &str, #[case] expected: i32) {
        assert_eq!(decimal_to_i32(input.parse().unwrap()).unwrap(), expected);
        assert_eq!(float_to_i32(input.parse().unwrap()).unwrap(), expected);
    }

    #[test]
    fn test_narrowing_out_of_range() {
        assert_eq!(i64_to_i32(i64::MAX).unwrap_err().tag(), "ConstraintViolationError");
        assert!(float_to_i32(1e12).is_err());
        assert!(float_to_i64(f64::NAN).is_err());
    }
}
