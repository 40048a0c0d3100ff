//! Cast execution
//!
//! Applies cast edges to concrete values. A cast at mode `m` only uses edges
//! whose mode is `<= m`; identity casts return the value unchanged. After the
//! conversion the target's modifier is enforced and the validators of custom
//! types are consulted, so a value either arrives fully converted or not at
//! all.

use crate::coercers;
use crate::graph::{CastMode, render_text};
use crate::registry::TypeCatalog;
use crate::resolver::{CastStep, ResolvedCast};
use crate::session::SessionSettings;
use chrono::SubsecRound;
use rust_decimal::{Decimal, RoundingStrategy};
use sqlcoerce_diagnostics::{CastError, CastResult};
use sqlcoerce_types::temporal::{round_time, round_timestamp};
use sqlcoerce_types::{BaseKind, Datum, TypeModifier, TypeRef, Value};

/// Converts values against one catalog snapshot
pub struct CastExecutor<'a> {
    catalog: &'a TypeCatalog,
    session: &'a SessionSettings,
}

impl<'a> CastExecutor<'a> {
    pub fn new(catalog: &'a TypeCatalog, session: &'a SessionSettings) -> Self {
        Self { catalog, session }
    }

    /// Convert `value` to `target` using edges usable at `mode`
    pub fn cast(&self, value: &Value, target: &TypeRef, mode: CastMode) -> CastResult<Value> {
        if value.ty().same_type(target) {
            return Ok(value.clone());
        }
        let datum = self.convert(value.datum(), value.ty(), target, mode)?;
        self.finish(datum, target, mode)
    }

    /// Parse literal text directly as `target`
    pub fn coerce_literal(&self, raw: &str, target: &TypeRef, mode: CastMode) -> CastResult<Value> {
        let datum = coercers::coerce_literal(raw, target, self.session)?;
        self.finish(datum, target, mode)
    }

    /// Bring each value to the resolved target following its step
    pub fn apply(&self, resolved: &ResolvedCast, values: &[Value]) -> CastResult<Vec<Value>> {
        if values.len() != resolved.steps.len() {
            return Err(CastError::incompatible(format!(
                "expected {} values, got {}",
                resolved.steps.len(),
                values.len()
            )));
        }
        values
            .iter()
            .zip(&resolved.steps)
            .map(|(value, operand)| match &operand.step {
                CastStep::Identity => Ok(value.clone()),
                CastStep::Cast(mode) => self.cast(value, &resolved.target, *mode),
                CastStep::Literal => match value.datum() {
                    Datum::Text(raw) => {
                        self.coerce_literal(raw, &resolved.target, CastMode::Assignment)
                    }
                    Datum::Null => Ok(Value::null(resolved.target.clone())),
                    other => Err(CastError::no_cast_path(
                        other.kind().to_string(),
                        resolved.target.to_string(),
                    )),
                },
            })
            .collect()
    }

    fn finish(&self, datum: Datum, target: &TypeRef, mode: CastMode) -> CastResult<Value> {
        let datum = enforce_modifier(datum, target, mode)?;
        self.catalog.validate(target, &datum)?;
        Value::new(target.clone(), datum)
    }

    fn convert(&self, datum: &Datum, from: &TypeRef, to: &TypeRef, mode: CastMode) -> CastResult<Datum> {
        let no_path = || CastError::no_cast_path(from.to_string(), to.to_string());

        if from.is_null() || (from.same_base_type(to) && !from.is_array()) {
            return Ok(datum.clone());
        }

        match (from.element(), to.element()) {
            (Some(from_elem), Some(to_elem)) if from.is_array() && to.is_array() => {
                if from_elem.is_null() && mode < CastMode::Explicit {
                    return Err(no_path());
                }
                return match datum {
                    Datum::Array(items) => items
                        .iter()
                        .map(|item| self.convert(item, from_elem, to_elem, mode))
                        .collect::<CastResult<_>>()
                        .map(Datum::Array),
                    _ => Ok(datum.clone()),
                };
            }
            (Some(_), None) if from.is_array() => {
                if to.physical() != BaseKind::Text || mode < CastMode::Assignment {
                    return Err(no_path());
                }
                return Ok(match datum {
                    Datum::Null => Datum::Null,
                    other => Datum::Text(render_text(other, self.session)),
                });
            }
            (None, Some(_)) if to.is_array() => {
                if from.physical() != BaseKind::Text || mode < CastMode::Explicit {
                    return Err(no_path());
                }
                return match datum {
                    Datum::Text(raw) => coercers::coerce_literal(raw, to, self.session),
                    _ => Ok(Datum::Null),
                };
            }
            _ => {}
        }

        let edge = self
            .catalog
            .graph()
            .usable(from.name(), to.name(), mode)
            .ok_or_else(no_path)?;
        match datum {
            Datum::Null => Ok(Datum::Null),
            other => edge.apply(other, self.session),
        }
    }
}

/// Text rendering of a value in the session, as a cast to text produces it
pub fn to_text(value: &Value, session: &SessionSettings) -> String {
    render_text(value.datum(), session)
}

/// Apply the target's declared length, precision or scale
pub fn enforce_modifier(datum: Datum, target: &TypeRef, mode: CastMode) -> CastResult<Datum> {
    if let (Some(element), Datum::Array(items)) = (target.element(), &datum) {
        if target.is_array() {
            return items
                .iter()
                .map(|item| enforce_modifier(item.clone(), element, mode))
                .collect::<CastResult<_>>()
                .map(Datum::Array);
        }
    }
    let Some(modifier) = target.modifier() else {
        return Ok(datum);
    };
    match (modifier, datum) {
        (TypeModifier::Length(n), Datum::Text(text)) => {
            let limit = n as usize;
            if text.chars().count() <= limit {
                Ok(Datum::Text(text))
            } else if mode == CastMode::Explicit {
                Ok(Datum::Text(text.chars().take(limit).collect()))
            } else {
                Err(CastError::constraint(format!(
                    "value too long for type character varying({n})"
                )))
            }
        }
        (TypeModifier::Numeric { precision, scale }, Datum::Decimal(d)) => {
            enforce_numeric(d, precision, scale).map(Datum::Decimal)
        }
        (TypeModifier::Precision(p), Datum::Time(t)) => Ok(Datum::Time(round_time(t, p))),
        (TypeModifier::Precision(p), Datum::Timestamp(dt)) => {
            Ok(Datum::Timestamp(round_timestamp(dt, p)))
        }
        (TypeModifier::Precision(p), Datum::TimestampTz(dt)) => {
            Ok(Datum::TimestampTz(dt.round_subsecs(u16::from(p))))
        }
        (_, other) => Ok(other),
    }
}

fn enforce_numeric(d: Decimal, precision: u8, scale: u8) -> CastResult<Decimal> {
    let mut rounded =
        d.round_dp_with_strategy(u32::from(scale), RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(u32::from(scale));
    let limit = Decimal::from_i128_with_scale(10_i128.pow(u32::from(precision - scale)), 0);
    if rounded.abs() >= limit {
        return Err(CastError::constraint(format!(
            "numeric field overflow: a field with precision {precision}, scale {scale} must round to an absolute value less than 10^{}",
            precision - scale
        )));
    }
    Ok(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EquivalentType, TypeRegistry};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use sqlcoerce_types::{
        BOOLEAN, DECIMAL, FLOAT, INTEGER, JSONB, NULL, TEXT, TIMESTAMPTZ, TypeDescriptor,
    };

    fn value(ty: &TypeRef, datum: Datum) -> Value {
        Value::new(ty.clone(), datum).unwrap()
    }

    fn with_executor<R>(f: impl FnOnce(&CastExecutor<'_>, &TypeCatalog) -> R) -> R {
        let catalog = TypeCatalog::builtin();
        let session = SessionSettings::utc();
        f(&CastExecutor::new(&catalog, &session), &catalog)
    }

    #[test]
    fn test_identity_is_noop() {
        with_executor(|exec, _| {
            let v = value(&INTEGER, Datum::Int(7));
            assert_eq!(exec.cast(&v, &INTEGER, CastMode::Implicit).unwrap(), v);
        });
    }

    #[test]
    fn test_implicit_never_uses_explicit_edges() {
        with_executor(|exec, _| {
            let v = value(&TEXT, Datum::Text("42".into()));
            let err = exec.cast(&v, &INTEGER, CastMode::Implicit).unwrap_err();
            assert_eq!(err.tag(), "NoCastPathError");
            assert_eq!(err.to_string(), "cannot cast type text to integer");
            let cast = exec.cast(&v, &INTEGER, CastMode::Explicit).unwrap();
            assert_eq!(cast.datum(), &Datum::Int(42));
        });
    }

    #[rstest]
    #[case(Datum::Bool(true), "integer", Datum::Int(1))]
    #[case(Datum::Bool(true), "text", Datum::Text("true".into()))]
    fn test_boolean_casts(#[case] datum: Datum, #[case] target: &str, #[case] expected: Datum) {
        with_executor(|exec, catalog| {
            let target = catalog.lookup(target).unwrap();
            let cast = exec.cast(&value(&BOOLEAN, datum), &target, CastMode::Explicit).unwrap();
            assert_eq!(cast.into_datum(), expected);
        });
    }

    #[rstest]
    #[case(json!(42.3), "float", Datum::Float(42.3))]
    #[case(json!(42.5), "integer", Datum::Int(43))]
    #[case(json!(null), "integer", Datum::Null)]
    #[case(json!(true), "boolean", Datum::Bool(true))]
    fn test_jsonb_unwrap(#[case] tree: serde_json::Value, #[case] target: &str, #[case] expected: Datum) {
        with_executor(|exec, catalog| {
            let target = catalog.lookup(target).unwrap();
            let cast = exec.cast(&value(&JSONB, Datum::Jsonb(tree)), &target, CastMode::Explicit).unwrap();
            assert_eq!(cast.into_datum(), expected);
        });
    }

    #[test]
    fn test_null_reaches_every_type() {
        with_executor(|exec, _| {
            let cast = exec.cast(&Value::null(NULL.clone()), &JSONB, CastMode::Implicit).unwrap();
            assert!(cast.is_null());
            assert_eq!(cast.ty().name(), "jsonb");
            let cast = exec.cast(&Value::null(INTEGER.clone()), &FLOAT, CastMode::Implicit).unwrap();
            assert!(cast.is_null());
        });
    }

    #[test]
    fn test_varchar_overflow() {
        with_executor(|exec, catalog| {
            let target = catalog.parse_type("varchar(5)").unwrap();
            let err = exec.coerce_literal("abcdef", &target, CastMode::Assignment).unwrap_err();
            assert_eq!(err.tag(), "ConstraintViolationError");
            let ok = exec.coerce_literal("abcde", &target, CastMode::Assignment).unwrap();
            assert_eq!(ok.datum(), &Datum::Text("abcde".into()));
            let truncated = exec.coerce_literal("abcdef", &target, CastMode::Explicit).unwrap();
            assert_eq!(truncated.datum(), &Datum::Text("abcde".into()));
        });
    }

    #[test]
    fn test_numeric_scale_and_overflow() {
        with_executor(|exec, catalog| {
            let target = catalog.parse_type("numeric(5,2)").unwrap();
            let v = exec.coerce_literal("12.345", &target, CastMode::Assignment).unwrap();
            assert_eq!(v.to_string(), "12.35");
            let v = exec.coerce_literal("1", &target, CastMode::Assignment).unwrap();
            assert_eq!(v.to_string(), "1.00");
            let err = exec.coerce_literal("1234.5", &target, CastMode::Assignment).unwrap_err();
            assert_eq!(err.tag(), "ConstraintViolationError");
        });
    }

    #[test]
    fn test_time_precision() {
        with_executor(|exec, catalog| {
            let target = catalog.parse_type("time(1)").unwrap();
            let v = exec.coerce_literal("10:00:00.26", &target, CastMode::Explicit).unwrap();
            assert_eq!(v.to_string(), "10:00:00.3");
        });
    }

    #[test]
    fn test_narrowing_rounds() {
        with_executor(|exec, _| {
            let v = value(&DECIMAL, Datum::Decimal("42.5".parse().unwrap()));
            let cast = exec.cast(&v, &INTEGER, CastMode::Assignment).unwrap();
            assert_eq!(cast.datum(), &Datum::Int(43));
            let err = exec.cast(&v, &INTEGER, CastMode::Implicit).unwrap_err();
            assert_eq!(err.tag(), "NoCastPathError");
        });
    }

    #[test]
    fn test_empty_array_needs_explicit_cast() {
        with_executor(|exec, _| {
            let untyped = value(&TypeDescriptor::array_of(NULL.clone()), Datum::Array(vec![]));
            let text_array = TypeDescriptor::array_of(TEXT.clone());
            let err = exec.cast(&untyped, &text_array, CastMode::Implicit).unwrap_err();
            assert_eq!(err.tag(), "NoCastPathError");
            let cast = exec.cast(&untyped, &text_array, CastMode::Explicit).unwrap();
            assert_eq!(cast.ty().to_string(), "text[]");
            assert_eq!(cast.to_string(), "{}");
        });
    }

    #[test]
    fn test_array_element_wise() {
        with_executor(|exec, _| {
            let ints = value(
                &TypeDescriptor::array_of(INTEGER.clone()),
                Datum::Array(vec![Datum::Int(1), Datum::Null]),
            );
            let cast = exec
                .cast(&ints, &TypeDescriptor::array_of(DECIMAL.clone()), CastMode::Implicit)
                .unwrap();
            assert_eq!(cast.datum(), &Datum::Array(vec![Datum::Decimal(1.into()), Datum::Null]));
            let text = exec.cast(&ints, &TEXT, CastMode::Assignment).unwrap();
            assert_eq!(text.datum(), &Datum::Text("{1,NULL}".into()));
        });
    }

    #[test]
    fn test_array_to_text_in_session_zone() {
        use chrono::{FixedOffset, TimeZone, Utc};

        let catalog = TypeCatalog::builtin();
        let session = SessionSettings::new(FixedOffset::east_opt(2 * 3600).unwrap());
        let exec = CastExecutor::new(&catalog, &session);
        let instant = Utc.with_ymd_and_hms(2021, 9, 18, 8, 0, 0).unwrap();
        let stamps = value(
            &TypeDescriptor::array_of(TIMESTAMPTZ.clone()),
            Datum::Array(vec![Datum::TimestampTz(instant), Datum::Null]),
        );
        let text = exec.cast(&stamps, &TEXT, CastMode::Assignment).unwrap();
        assert_eq!(
            text.datum(),
            &Datum::Text(r#"{"2021-09-18 10:00:00+02",NULL}"#.into())
        );
    }

    #[test]
    fn test_custom_validation() {
        let registry = TypeRegistry::new();
        let float4 = registry
            .register_equivalent(EquivalentType::new("float4", "float").with_validator(|d| {
                d.as_f64().is_some_and(f64::is_finite)
            }))
            .unwrap();
        let catalog = registry.snapshot();
        let session = SessionSettings::utc();
        let exec = CastExecutor::new(&catalog, &session);

        let v = exec
            .cast(&value(&INTEGER, Datum::Int(39)), &float4, CastMode::Assignment)
            .unwrap();
        assert_eq!(v.datum(), &Datum::Float(39.0));
        assert_eq!(v.ty().name(), "float4");

        let err = exec.coerce_literal("NaN", &float4, CastMode::Explicit).unwrap_err();
        assert_eq!(err.tag(), "CustomTypeValidationError");
        assert!(exec.cast(&Value::null(INTEGER.clone()), &float4, CastMode::Implicit).is_ok());
    }
}
