//! SQL type coercion and casting engine
//!
//! This crate bundles the casting engine with a small expression syntax:
//! - A type registry with runtime equivalent types
//! - Literal coercers for every built-in type
//! - A cast graph with implicit, assignment and explicit edges
//! - Context-aware cast resolution and execution
//! - `value::type`, `CAST(...)`, `CASE` and friends on top
//!
//! # Example
//!
//! ```
//! use sqlcoerce::{CastEngine, syntax};
//!
//! let engine = CastEngine::new();
//! let value = syntax::evaluate(&engine, "select '42.5'::jsonb::int").unwrap();
//! assert_eq!(value.to_string(), "43");
//! ```

pub use sqlcoerce_diagnostics as diagnostics;
pub use sqlcoerce_eval as eval;
pub use sqlcoerce_types as types;

pub use sqlcoerce_diagnostics::{CastError, CastResult};
pub use sqlcoerce_eval::{
    CastContext, CastEngine, CastMode, EngineConfig, EquivalentType, Operand, Usage,
};
pub use sqlcoerce_types::{Datum, TypeRef, Value};
pub use syntax::{ExprError, evaluate, parse, unify};

pub mod syntax;

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
