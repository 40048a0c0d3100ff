//! Diagnostics and error handling for sqlcoerce
//!
//! This crate provides the error taxonomy shared by the type registry, the
//! literal coercers, the cast resolver and the cast executor: stable kind
//! tags, numeric error codes, SQLSTATEs and diagnostic records.

mod error;
mod error_code;

pub use error::*;
pub use error_code::*;

/// Result type for casting operations
pub type CastResult<T> = std::result::Result<T, CastError>;
