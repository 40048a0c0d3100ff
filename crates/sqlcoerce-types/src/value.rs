//! Typed values
//!
//! A [`Value`] pairs a type descriptor with a [`Datum`] payload. The payload
//! family always matches the descriptor's physical kind; the only way to
//! build a value is through [`Value::new`], which checks it.

use crate::interval::Interval;
use crate::temporal::{format_time, format_timestamp, format_timestamptz};
use crate::type_system::{BaseKind, TypeRef};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value as JsonValue;
use sqlcoerce_diagnostics::{CastError, CastResult};
use std::fmt;
use std::str::FromStr;

/// Runtime payload of a value
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// SQL NULL, valid for every type
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    /// Absolute instant
    TimestampTz(DateTime<Utc>),
    Interval(Interval),
    /// Validated JSON text, kept verbatim
    Json(String),
    /// Parsed JSON tree; object keys iterate in ascending order
    Jsonb(JsonValue),
    Array(Vec<Datum>),
}

impl Datum {
    /// Check if this is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Payload family of this datum
    pub fn kind(&self) -> BaseKind {
        match self {
            Self::Null => BaseKind::Null,
            Self::Bool(_) => BaseKind::Bool,
            Self::Int(_) => BaseKind::Int,
            Self::BigInt(_) => BaseKind::BigInt,
            Self::Float(_) => BaseKind::Float,
            Self::Decimal(_) => BaseKind::Decimal,
            Self::Text(_) => BaseKind::Text,
            Self::Date(_) => BaseKind::Date,
            Self::Time(_) => BaseKind::Time,
            Self::Timestamp(_) => BaseKind::Timestamp,
            Self::TimestampTz(_) => BaseKind::TimestampTz,
            Self::Interval(_) => BaseKind::Interval,
            Self::Json(_) => BaseKind::Json,
            Self::Jsonb(_) => BaseKind::Jsonb,
            Self::Array(_) => BaseKind::Array,
        }
    }

    /// Check that this payload may be stored under `ty`
    pub fn fits(&self, ty: &TypeRef) -> bool {
        match self {
            Self::Null => true,
            Self::Array(items) => match (ty.physical(), ty.element()) {
                (BaseKind::Array, Some(element)) => items.iter().all(|item| item.fits(element)),
                _ => false,
            },
            other => other.kind() == ty.physical(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric payload as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::BigInt(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// JSON view used by command-line output
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::from(*i),
            Self::BigInt(i) => JsonValue::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(format_float(*f))),
            Self::Decimal(d) => decimal_to_json(*d),
            Self::Interval(interval) => interval.to_json(),
            Self::Json(text) => {
                serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.clone()))
            }
            Self::Jsonb(tree) => tree.clone(),
            Self::Array(items) => JsonValue::Array(items.iter().map(Datum::to_json).collect()),
            other => JsonValue::String(other.to_string()),
        }
    }
}

fn decimal_to_json(d: Decimal) -> JsonValue {
    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return JsonValue::from(i);
        }
    }
    serde_json::Number::from_str(&d.to_string())
        .map(JsonValue::Number)
        .unwrap_or_else(|_| JsonValue::String(d.to_string()))
}

/// PostgreSQL text output for floats
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let text = if f > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else {
        f.to_string()
    }
}

/// Array text form (`{a,"b c",NULL}`) with scalars rendered by `render`
pub fn format_array(items: &[Datum], render: &dyn Fn(&Datum) -> String) -> String {
    let rendered: Vec<String> = items
        .iter()
        .map(|item| match item {
            Datum::Null => "NULL".to_string(),
            Datum::Array(nested) => format_array(nested, render),
            other => quote_array_item(render(other)),
        })
        .collect();
    format!("{{{}}}", rendered.join(","))
}

fn quote_array_item(text: String) -> String {
    let needs_quotes = text.is_empty()
        || text.eq_ignore_ascii_case("null")
        || text
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | ',' | '"' | '\\'));
    if needs_quotes {
        let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        text
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::BigInt(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{}", format_float(*x)),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Time(t) => write!(f, "{}", format_time(*t)),
            Self::Timestamp(dt) => write!(f, "{}", format_timestamp(*dt)),
            Self::TimestampTz(dt) => write!(f, "{}", format_timestamptz(*dt, Utc.fix())),
            Self::Interval(interval) => write!(f, "{interval}"),
            Self::Json(text) => write!(f, "{text}"),
            Self::Jsonb(tree) => write!(f, "{tree}"),
            Self::Array(items) => write!(f, "{}", format_array(items, &|item| item.to_string())),
        }
    }
}

/// A payload together with its type
#[derive(Debug, Clone)]
pub struct Value {
    ty: TypeRef,
    datum: Datum,
}

impl Value {
    /// Build a value, checking the payload against the type
    pub fn new(ty: TypeRef, datum: Datum) -> CastResult<Self> {
        if !datum.fits(&ty) {
            return Err(CastError::incompatible(format!(
                "{} payload cannot be stored as type {}",
                datum.kind(),
                ty
            )));
        }
        Ok(Self { ty, datum })
    }

    /// NULL of type `ty`
    pub fn null(ty: TypeRef) -> Self {
        Self {
            ty,
            datum: Datum::Null,
        }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn datum(&self) -> &Datum {
        &self.datum
    }

    pub fn into_datum(self) -> Datum {
        self.datum
    }

    pub fn is_null(&self) -> bool {
        self.datum.is_null()
    }

    /// JSON view used by command-line output
    pub fn to_json(&self) -> JsonValue {
        self.datum.to_json()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.ty.same_type(&other.ty) && self.datum == other.datum
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datum)
    }
}
