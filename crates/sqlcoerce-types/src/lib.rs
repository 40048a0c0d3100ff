//! SQL type system
//!
//! This crate defines the type system shared by the casting engine:
//! - Type descriptors for built-in, array and custom equivalent types
//! - Type name syntax with modifiers and array suffixes
//! - Typed values and their payloads
//! - Structured intervals and date/time text handling
//! - The numeric promotion ladder

pub mod coercion;
pub mod interval;
pub mod temporal;
pub mod type_name;
pub mod type_system;
pub mod value;

pub use coercion::wider_numeric;
pub use interval::Interval;
pub use type_name::TypeName;
pub use type_system::*;
pub use value::{Datum, Value, format_array, format_float};
