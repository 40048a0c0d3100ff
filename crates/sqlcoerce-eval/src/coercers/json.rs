//! JSON literal coercion and jsonb scalar unwrapping

use super::{boolean, numeric};
use serde_json::Value as JsonValue;
use sqlcoerce_diagnostics::{CastError, CastResult};
use sqlcoerce_types::{BaseKind, Datum};

/// Validate JSON text, keeping it verbatim
pub fn parse_json(raw: &str) -> CastResult<String> {
    parse_jsonb(raw)?;
    Ok(raw.to_string())
}

/// Parse JSON text into a tree
pub fn parse_jsonb(raw: &str) -> CastResult<JsonValue> {
    serde_json::from_str(raw).map_err(|e| CastError::invalid_json(raw, e.to_string()))
}

/// Canonical compact text of a tree, object keys ascending
///
/// Numbers keep the digits they were written with.
pub fn canonical_text(tree: &JsonValue) -> String {
    let mut out = String::new();
    write_canonical(tree, &mut out);
    out
}

fn write_canonical(tree: &JsonValue, out: &mut String) {
    match tree {
        JsonValue::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&JsonValue::from(key.as_str()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn kind_name(tree: &JsonValue) -> &'static str {
    match tree {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Unwrap a scalar leaf into a payload of `kind`
///
/// The leaf's textual form goes through the target's literal coercer.
/// Integer targets read the text as a decimal and round half away from
/// zero. A JSON `null` becomes SQL NULL; objects and arrays have no scalar
/// form.
pub fn unwrap_scalar(tree: &JsonValue, kind: BaseKind) -> CastResult<Datum> {
    let text = match tree {
        JsonValue::Null => return Ok(Datum::Null),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            return Err(CastError::no_cast_path(
                format!("jsonb {}", kind_name(tree)),
                kind.to_string(),
            ));
        }
    };
    match kind {
        BaseKind::Bool => boolean::parse_bool(&text).map(Datum::Bool),
        BaseKind::Int => numeric::decimal_to_i32(numeric::parse_decimal(&text)?).map(Datum::Int),
        BaseKind::BigInt => {
            numeric::decimal_to_i64(numeric::parse_decimal(&text)?).map(Datum::BigInt)
        }
        BaseKind::Float => numeric::parse_float(&text).map(Datum::Float),
        BaseKind::Decimal => numeric::parse_decimal(&text).map(Datum::Decimal),
        other => Err(CastError::no_cast_path("jsonb", other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_canonical_text_sorts_keys() {
        let tree = parse_jsonb(r#"{"b":51, "a":42}"#).unwrap();
        assert_eq!(canonical_text(&tree), r#"{"a":42,"b":51}"#);
        assert_eq!(canonical_text(&parse_jsonb(r#""abc""#).unwrap()), r#""abc""#);
    }

    #[test]
    fn test_canonical_text_sorts_unordered_maps() {
        let mut map = serde_json::Map::new();
        map.insert("zeta".into(), json!([{ "y": 1, "x": 2 }]));
        map.insert("alpha".into(), json!("a\"b"));
        assert_eq!(
            canonical_text(&JsonValue::Object(map)),
            r#"{"alpha":"a\"b","zeta":[{"x":2,"y":1}]}"#
        );
    }

    #[rstest]
    #[case("12345678901234567890123", "12345678901234567890123")]
    #[case(r#"{"a":12345678901234567890123}"#, r#"{"a":12345678901234567890123}"#)]
    #[case("1.10", "1.10")]
    fn test_canonical_text_keeps_digits(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(canonical_text(&parse_jsonb(raw).unwrap()), expected);
    }

    #[test]
    fn test_json_keeps_text() {
        assert_eq!(parse_json(r#"{"b": 1, "a": 2}"#).unwrap(), r#"{"b": 1, "a": 2}"#);
        assert_eq!(parse_json("{oops").unwrap_err().tag(), "InvalidJsonLiteralError");
    }

    #[rstest]
    #[case(json!(42.3), BaseKind::Int, Datum::Int(42))]
    #[case(json!(42.5), BaseKind::Int, Datum::Int(43))]
    #[case(json!(-42.5), BaseKind::BigInt, Datum::BigInt(-43))]
    #[case(json!(42.3), BaseKind::Float, Datum::Float(42.3))]
    #[case(json!(true), BaseKind::Bool, Datum::Bool(true))]
    #[case(json!("t"), BaseKind::Bool, Datum::Bool(true))]
    #[case(json!(null), BaseKind::Int, Datum::Null)]
    #[case(json!(null), BaseKind::Float, Datum::Null)]
    #[case(json!(null), BaseKind::Bool, Datum::Null)]
    fn test_unwrap_scalar(#[case] tree: JsonValue, #[case] kind: BaseKind, #[case] expected: Datum) {
        assert_eq!(unwrap_scalar(&tree, kind).unwrap(), expected);
    }

    #[test]
    fn test_unwrap_container_fails() {
        let err = unwrap_scalar(&json!({ "a": 1 }), BaseKind::Int).unwrap_err();
        assert_eq!(err.tag(), "NoCastPathError");
        let err = unwrap_scalar(&json!([1]), BaseKind::Float).unwrap_err();
        assert_eq!(err.tag(), "NoCastPathError");
    }

    #[rstest]
    #[case("1.10", BaseKind::Decimal, "1.10")]
    #[case("12345678901234567890.123", BaseKind::Decimal, "12345678901234567890.123")]
    #[case("9007199254740993", BaseKind::BigInt, "9007199254740993")]
    #[case("12345678901234567.5", BaseKind::BigInt, "12345678901234568")]
    fn test_unwrap_scalar_keeps_precision(#[case] raw: &str, #[case] kind: BaseKind, #[case] expected: &str) {
        let datum = unwrap_scalar(&parse_jsonb(raw).unwrap(), kind).unwrap();
        assert_eq!(datum.to_string(), expected);
    }

    #[test]
    fn test_unwrap_non_numeric_fails() {
        let err = unwrap_scalar(&json!("abc"), BaseKind::Decimal).unwrap_err();
        assert_eq!(err.tag(), "InvalidNumericLiteralError");
    }
}
