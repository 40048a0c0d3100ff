//! SQL type coercion and casting
//!
//! This crate decides how values of differing SQL types are reconciled and
//! performs the conversions:
//!
//! - **Registry**: built-in types, aliases and custom equivalent types with
//!   validators, published as immutable snapshots
//! - **Coercers**: text to typed value parsing for every built-in kind
//! - **Cast graph**: directed conversions tagged implicit, assignment or
//!   explicit
//! - **Resolver**: chooses the common type for operators, CASE branches,
//!   column assignments and scalar subqueries
//! - **Executor**: applies conversions, enforces type modifiers and runs
//!   custom validators
//!
//! # Example
//!
//! ```
//! use sqlcoerce_eval::{CastEngine, CastMode, EquivalentType};
//!
//! let engine = CastEngine::new();
//! engine
//!     .register_equivalent(EquivalentType::new("float4", "float"))
//!     .unwrap();
//!
//! let float4 = engine.lookup("float4").unwrap();
//! let value = engine.coerce_literal("1.5", &float4, CastMode::Explicit).unwrap();
//! assert_eq!(value.to_string(), "1.5");
//! ```
//!
//! # Cast modes
//!
//! Modes are ordered `Implicit < Assignment < Explicit`; an edge is usable
//! in any context at least as permissive as its own mode.

pub mod coercers;
pub mod config;
pub mod engine;
pub mod executor;
pub mod graph;
pub mod registry;
pub mod resolver;
pub mod session;

// Re-export main types
pub use config::{ConfigError, EngineConfig, EquivalentTypeConfig, ValidatorSpec};
pub use engine::{CastEngine, CastEngineBuilder};
pub use executor::{CastExecutor, enforce_modifier, to_text};
pub use graph::{CastEdge, CastGraph, CastMode, ConvertFn, render_text};
pub use registry::{EquivalentType, TypeCatalog, TypeRegistry};
pub use resolver::{
    CastContext, CastResolver, CastStep, Operand, OperandCast, OperandOrigin, ResolvedCast, Usage,
};
pub use session::SessionSettings;

pub use sqlcoerce_diagnostics::{CastError, CastResult, Diagnostic, ErrorCode, Severity};
pub use sqlcoerce_types::{Datum, Interval, TypeDescriptor, TypeRef, Value};
