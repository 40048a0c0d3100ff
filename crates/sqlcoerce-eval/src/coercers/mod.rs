//! Literal coercers
//!
//! Pure parsers from raw literal text into canonical payloads:
//! - Boolean prefixes and `1`/`0`
//! - Integer, bigint, decimal and float numerals
//! - Dates, times, timestamps and intervals
//! - JSON text and jsonb trees
//! - Array literals, element-wise
//!
//! Each coercer reports its own error kind; nothing is rounded or guessed.

pub mod array;
pub mod boolean;
pub mod json;
pub mod numeric;
pub mod temporal;

use crate::session::SessionSettings;
use array::ArrayItem;
use sqlcoerce_diagnostics::{CastError, CastResult};
use sqlcoerce_types::{BaseKind, Datum, TypeRef};

/// Parse `raw` into a payload of the scalar family `kind`
pub fn coerce_text(raw: &str, kind: BaseKind, session: &SessionSettings) -> CastResult<Datum> {
    let datum = match kind {
        BaseKind::Bool => Datum::Bool(boolean::parse_bool(raw)?),
        BaseKind::Int => Datum::Int(numeric::parse_int(raw)?),
        BaseKind::BigInt => Datum::BigInt(numeric::parse_bigint(raw)?),
        BaseKind::Float => Datum::Float(numeric::parse_float(raw)?),
        BaseKind::Decimal => Datum::Decimal(numeric::parse_decimal(raw)?),
        BaseKind::Text => Datum::Text(raw.to_string()),
        BaseKind::Date => Datum::Date(temporal::parse_date(raw)?),
        BaseKind::Time => Datum::Time(temporal::parse_time(raw)?),
        BaseKind::Timestamp => Datum::Timestamp(temporal::parse_timestamp(raw)?),
        BaseKind::TimestampTz => Datum::TimestampTz(temporal::parse_timestamptz(raw, session)?),
        BaseKind::Interval => Datum::Interval(temporal::parse_interval(raw)?),
        BaseKind::Json => Datum::Json(json::parse_json(raw)?),
        BaseKind::Jsonb => Datum::Jsonb(json::parse_jsonb(raw)?),
        BaseKind::Null | BaseKind::Array | BaseKind::Custom => {
            return Err(CastError::no_cast_path("text", kind.to_string()));
        }
    };
    Ok(datum)
}

/// Parse `raw` into a payload storable under `ty`
///
/// Custom types parse with their physical family; arrays parse an array
/// literal and coerce each element against the element type.
pub fn coerce_literal(raw: &str, ty: &TypeRef, session: &SessionSettings) -> CastResult<Datum> {
    match ty.element() {
        Some(element) if ty.is_array() => {
            let items = array::parse_array(raw)?;
            coerce_items(&items, element, session).map(Datum::Array)
        }
        _ => coerce_text(raw, ty.physical(), session),
    }
}

fn coerce_items(
    items: &[ArrayItem],
    element: &TypeRef,
    session: &SessionSettings,
) -> CastResult<Vec<Datum>> {
    items
        .iter()
        .map(|item| match item {
            ArrayItem::Null => Ok(Datum::Null),
            ArrayItem::Text(text) => coerce_literal(text, element, session),
            ArrayItem::Nested(nested) => match element.element() {
                Some(inner) if element.is_array() => {
                    coerce_items(nested, inner, session).map(Datum::Array)
                }
                _ => Err(CastError::incompatible(format!(
                    "malformed array literal: unexpected nesting for {element}"
                ))),
            },
        })
        .collect()
}
