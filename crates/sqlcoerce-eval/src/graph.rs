//! Cast graph
//!
//! Directed conversion edges between registry types, at most one per ordered
//! pair. Each edge carries the least permissive context it may be used in:
//! - `Implicit` edges apply in operators, comparisons and CASE branches
//! - `Assignment` edges additionally apply when storing into a column
//! - `Explicit` edges require cast syntax
//!
//! A request at mode `m` may use every edge whose mode is `<= m`.

use crate::coercers::{self, json, numeric};
use crate::session::SessionSettings;
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Utc};
use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};
use sqlcoerce_diagnostics::{CastError, CastResult};
use sqlcoerce_types::temporal::format_timestamptz;
use sqlcoerce_types::{BaseKind, Datum, Interval, TypeRef, builtin_types, format_array};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Conversion applied along an edge; receives a non-NULL payload
pub type ConvertFn = Arc<dyn Fn(&Datum, &SessionSettings) -> CastResult<Datum> + Send + Sync>;

/// Context a cast is requested in, ordered from least to most permissive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastMode {
    Implicit,
    Assignment,
    Explicit,
}

impl fmt::Display for CastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Implicit => "implicit",
            Self::Assignment => "assignment",
            Self::Explicit => "explicit",
        };
        f.write_str(name)
    }
}

impl FromStr for CastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "implicit" => Ok(Self::Implicit),
            "assignment" => Ok(Self::Assignment),
            "explicit" => Ok(Self::Explicit),
            other => Err(format!("unknown cast mode: {other}")),
        }
    }
}

/// A directed, moded conversion between two registry types
#[derive(Clone)]
pub struct CastEdge {
    pub from: String,
    pub to: String,
    pub mode: CastMode,
    /// Whether the conversion can reject a payload
    pub may_fail: bool,
    pub convert: ConvertFn,
}

impl CastEdge {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        mode: CastMode,
        may_fail: bool,
        convert: ConvertFn,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            mode,
            may_fail,
            convert,
        }
    }

    /// Lossless edge that hands the payload through unchanged
    pub fn identity(from: impl Into<String>, to: impl Into<String>, mode: CastMode) -> Self {
        let convert: ConvertFn =
            Arc::new(|d: &Datum, _: &SessionSettings| -> CastResult<Datum> { Ok(d.clone()) });
        Self::new(from, to, mode, false, convert)
    }

    /// Same conversion between a different pair of types
    fn rebind(&self, from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            ..self.clone()
        }
    }

    pub fn apply(&self, datum: &Datum, session: &SessionSettings) -> CastResult<Datum> {
        (self.convert)(datum, session)
    }
}

impl fmt::Debug for CastEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CastEdge")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("mode", &self.mode)
            .field("may_fail", &self.may_fail)
            .finish_non_exhaustive()
    }
}

/// Edge table keyed by `(from, to)` registry names
#[derive(Debug, Clone, Default)]
pub struct CastGraph {
    edges: IndexMap<(String, String), CastEdge>,
}

impl CastGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph holding every built-in edge
    pub fn with_builtins() -> Self {
        let mut graph = Self::new();
        builtin_edges(&mut graph);
        trace!("cast graph initialized with {} built-in edges", graph.len());
        graph
    }

    /// Insert an edge, replacing any edge for the same pair
    pub fn insert(&mut self, edge: CastEdge) -> Option<CastEdge> {
        self.edges.insert((edge.from.clone(), edge.to.clone()), edge)
    }

    /// Edge for the pair regardless of mode
    pub fn edge(&self, from: &str, to: &str) -> Option<&CastEdge> {
        self.edges.get(&(from.to_string(), to.to_string()))
    }

    /// Edge for the pair if it may be used at `mode`
    pub fn usable(&self, from: &str, to: &str, mode: CastMode) -> Option<&CastEdge> {
        self.edge(from, to).filter(|edge| edge.mode <= mode)
    }

    pub fn edges_from<'a>(&'a self, from: &'a str) -> impl Iterator<Item = &'a CastEdge> + 'a {
        self.edges.values().filter(move |edge| edge.from == from)
    }

    pub fn edges_to<'a>(&'a self, to: &'a str) -> impl Iterator<Item = &'a CastEdge> + 'a {
        self.edges.values().filter(move |edge| edge.to == to)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CastEdge> {
        self.edges.values()
    }

    /// Copy every edge of `base` onto `custom`
    ///
    /// Each `X -> base` yields `X -> custom` and each `base -> Y` yields
    /// `custom -> Y`, with the same mode and conversion. `base` and `custom`
    /// are joined by implicit identity edges in both directions. Existing
    /// edges are kept. Returns the number of edges added.
    pub fn materialize_equivalent(&mut self, custom: &str, base: &str) -> usize {
        let mut added: Vec<CastEdge> = Vec::new();
        for edge in self.edges_to(base) {
            if edge.from != custom {
                added.push(edge.rebind(&edge.from, custom));
            }
        }
        for edge in self.edges_from(base) {
            if edge.to != custom {
                added.push(edge.rebind(custom, &edge.to));
            }
        }
        added.push(CastEdge::identity(base, custom, CastMode::Implicit));
        added.push(CastEdge::identity(custom, base, CastMode::Implicit));

        let mut count = 0;
        for edge in added {
            let key = (edge.from.clone(), edge.to.clone());
            if !self.edges.contains_key(&key) {
                self.edges.insert(key, edge);
                count += 1;
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

// === Built-in edges ===

fn payload_mismatch(datum: &Datum, target: &str) -> CastError {
    CastError::no_cast_path(datum.kind().to_string(), target)
}

fn edge<F>(graph: &mut CastGraph, from: &str, to: &str, mode: CastMode, may_fail: bool, f: F)
where
    F: Fn(&Datum, &SessionSettings) -> CastResult<Datum> + Send + Sync + 'static,
{
    graph.insert(CastEdge::new(from, to, mode, may_fail, Arc::new(f)));
}

fn to_instant(local: NaiveDateTime, session: &SessionSettings) -> CastResult<DateTime<Utc>> {
    session
        .time_zone
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CastError::constraint("timestamp out of range"))
}

fn to_local(instant: &DateTime<Utc>, session: &SessionSettings) -> NaiveDateTime {
    instant.with_timezone(&session.time_zone).naive_local()
}

/// Text output of a scalar payload in the session
pub fn render_text(datum: &Datum, session: &SessionSettings) -> String {
    match datum {
        Datum::TimestampTz(instant) => format_timestamptz(*instant, session.time_zone),
        Datum::Jsonb(tree) => json::canonical_text(tree),
        Datum::Array(items) => format_array(items, &|item| render_text(item, session)),
        other => other.to_string(),
    }
}

fn builtin_edges(graph: &mut CastGraph) {
    use CastMode::{Assignment, Explicit, Implicit};

    // Numeric widening
    edge(graph, "integer", "bigint", Implicit, false, |d, _| match d {
        Datum::Int(i) => Ok(Datum::BigInt(i64::from(*i))),
        other => Err(payload_mismatch(other, "bigint")),
    });
    edge(graph, "integer", "float", Implicit, false, |d, _| match d {
        Datum::Int(i) => Ok(Datum::Float(f64::from(*i))),
        other => Err(payload_mismatch(other, "float")),
    });
    edge(graph, "integer", "decimal", Implicit, false, |d, _| match d {
        Datum::Int(i) => Ok(Datum::Decimal((*i).into())),
        other => Err(payload_mismatch(other, "decimal")),
    });
    edge(graph, "bigint", "float", Implicit, false, |d, _| match d {
        Datum::BigInt(i) => Ok(Datum::Float(*i as f64)),
        other => Err(payload_mismatch(other, "float")),
    });
    edge(graph, "bigint", "decimal", Implicit, false, |d, _| match d {
        Datum::BigInt(i) => Ok(Datum::Decimal((*i).into())),
        other => Err(payload_mismatch(other, "decimal")),
    });
    edge(graph, "float", "decimal", Implicit, true, |d, _| match d {
        Datum::Float(f) => numeric::float_to_decimal(*f).map(Datum::Decimal),
        other => Err(payload_mismatch(other, "decimal")),
    });

    // Numeric narrowing, rounding half away from zero
    edge(graph, "bigint", "integer", Assignment, true, |d, _| match d {
        Datum::BigInt(i) => numeric::i64_to_i32(*i).map(Datum::Int),
        other => Err(payload_mismatch(other, "integer")),
    });
    edge(graph, "float", "integer", Assignment, true, |d, _| match d {
        Datum::Float(f) => numeric::float_to_i32(*f).map(Datum::Int),
        other => Err(payload_mismatch(other, "integer")),
    });
    edge(graph, "float", "bigint", Assignment, true, |d, _| match d {
        Datum::Float(f) => numeric::float_to_i64(*f).map(Datum::BigInt),
        other => Err(payload_mismatch(other, "bigint")),
    });
    edge(graph, "decimal", "integer", Assignment, true, |d, _| match d {
        Datum::Decimal(x) => numeric::decimal_to_i32(*x).map(Datum::Int),
        other => Err(payload_mismatch(other, "integer")),
    });
    edge(graph, "decimal", "bigint", Assignment, true, |d, _| match d {
        Datum::Decimal(x) => numeric::decimal_to_i64(*x).map(Datum::BigInt),
        other => Err(payload_mismatch(other, "bigint")),
    });
    edge(graph, "decimal", "float", Assignment, true, |d, _| match d {
        Datum::Decimal(x) => numeric::decimal_to_f64(*x).map(Datum::Float),
        other => Err(payload_mismatch(other, "float")),
    });

    edge(graph, "boolean", "integer", Explicit, false, |d, _| match d {
        Datum::Bool(b) => Ok(Datum::Int(i32::from(*b))),
        other => Err(payload_mismatch(other, "integer")),
    });
    edge(graph, "integer", "boolean", Explicit, false, |d, _| match d {
        Datum::Int(i) => Ok(Datum::Bool(*i != 0)),
        other => Err(payload_mismatch(other, "boolean")),
    });

    // Text in both directions
    graph.insert(CastEdge::identity("text", "varchar", Implicit));
    graph.insert(CastEdge::identity("varchar", "text", Implicit));
    for ty in builtin_types() {
        let name = ty.name();
        if ty.is_null() || name == "text" || name == "varchar" {
            continue;
        }
        for text in ["text", "varchar"] {
            edge(graph, name, text, Assignment, false, |d, session| {
                Ok(Datum::Text(render_text(d, session)))
            });
            let kind = ty.physical();
            edge(graph, text, name, Explicit, true, move |d, session| match d {
                Datum::Text(raw) => coercers::coerce_text(raw, kind, session),
                other => Err(payload_mismatch(other, &kind.to_string())),
            });
        }
    }

    // Date and time
    edge(graph, "date", "timestamp", Implicit, false, |d, _| match d {
        Datum::Date(date) => Ok(Datum::Timestamp(date.and_time(NaiveTime::MIN))),
        other => Err(payload_mismatch(other, "timestamp")),
    });
    edge(graph, "date", "timestamptz", Implicit, false, |d, session| match d {
        Datum::Date(date) => to_instant(date.and_time(NaiveTime::MIN), session).map(Datum::TimestampTz),
        other => Err(payload_mismatch(other, "timestamptz")),
    });
    edge(graph, "timestamp", "timestamptz", Implicit, false, |d, session| match d {
        Datum::Timestamp(local) => to_instant(*local, session).map(Datum::TimestampTz),
        other => Err(payload_mismatch(other, "timestamptz")),
    });
    edge(graph, "timestamptz", "timestamp", Assignment, false, |d, session| match d {
        Datum::TimestampTz(instant) => Ok(Datum::Timestamp(to_local(instant, session))),
        other => Err(payload_mismatch(other, "timestamp")),
    });
    edge(graph, "timestamp", "date", Assignment, false, |d, _| match d {
        Datum::Timestamp(local) => Ok(Datum::Date(local.date())),
        other => Err(payload_mismatch(other, "date")),
    });
    edge(graph, "timestamptz", "date", Assignment, false, |d, session| match d {
        Datum::TimestampTz(instant) => Ok(Datum::Date(to_local(instant, session).date())),
        other => Err(payload_mismatch(other, "date")),
    });
    edge(graph, "timestamp", "time", Assignment, false, |d, _| match d {
        Datum::Timestamp(local) => Ok(Datum::Time(local.time())),
        other => Err(payload_mismatch(other, "time")),
    });
    edge(graph, "timestamptz", "time", Assignment, false, |d, session| match d {
        Datum::TimestampTz(instant) => Ok(Datum::Time(to_local(instant, session).time())),
        other => Err(payload_mismatch(other, "time")),
    });
    edge(graph, "time", "interval", Implicit, false, |d, _| match d {
        Datum::Time(time) => Ok(Datum::Interval(Interval::from_time(*time))),
        other => Err(payload_mismatch(other, "interval")),
    });
    edge(graph, "interval", "time", Assignment, true, |d, _| match d {
        Datum::Interval(interval) => interval
            .to_time()
            .map(Datum::Time)
            .ok_or_else(|| CastError::constraint(format!("interval {interval} out of range for time"))),
        other => Err(payload_mismatch(other, "time")),
    });

    // JSON
    edge(graph, "json", "jsonb", Assignment, false, |d, _| match d {
        Datum::Json(text) => json::parse_jsonb(text).map(Datum::Jsonb),
        other => Err(payload_mismatch(other, "jsonb")),
    });
    edge(graph, "jsonb", "json", Assignment, false, |d, _| match d {
        Datum::Jsonb(tree) => Ok(Datum::Json(json::canonical_text(tree))),
        other => Err(payload_mismatch(other, "json")),
    });
    for (target, kind) in [
        ("boolean", BaseKind::Bool),
        ("integer", BaseKind::Int),
        ("bigint", BaseKind::BigInt),
        ("float", BaseKind::Float),
        ("decimal", BaseKind::Decimal),
    ] {
        edge(graph, "jsonb", target, Explicit, true, move |d, _| match d {
            Datum::Jsonb(tree) => json::unwrap_scalar(tree, kind),
            other => Err(payload_mismatch(other, &kind.to_string())),
        });
    }

    // The untyped NULL literal reaches every type
    let targets: Vec<&TypeRef> = builtin_types().filter(|ty| !ty.is_null()).collect();
    for ty in targets {
        edge(graph, "null", ty.name(), Implicit, false, |_, _| Ok(Datum::Null));
    }
}
