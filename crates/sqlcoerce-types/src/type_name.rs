//! Type name syntax
//!
//! Splits a written type reference such as `timestamp(4) with time zone`,
//! `numeric(10, 2)` or `text[][]` into its base name, modifier arguments and
//! array depth. Name lookup happens in the registry.

use smallvec::SmallVec;
use sqlcoerce_diagnostics::{CastError, CastResult};
use std::fmt;

/// A parsed type reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Lowercase base name with single spaces between words
    pub name: String,
    /// Modifier arguments in declaration order
    pub args: SmallVec<[u32; 2]>,
    /// Number of `[]` suffixes
    pub array_depth: usize,
}

impl TypeName {
    /// Parse a type reference
    pub fn parse(text: &str) -> CastResult<Self> {
        let invalid = || CastError::unknown_type(text.trim());
        let mut rest = text.trim().to_lowercase();

        let mut array_depth = 0;
        while let Some(stripped) = rest.strip_suffix("[]") {
            rest = stripped.trim_end().to_string();
            array_depth += 1;
        }

        let mut args = SmallVec::new();
        if let Some(open) = rest.find('(') {
            let close = rest[open..].find(')').map(|i| open + i).ok_or_else(invalid)?;
            for arg in rest[open + 1..close].split(',') {
                args.push(arg.trim().parse::<u32>().map_err(|_| invalid())?);
            }
            rest = format!("{} {}", &rest[..open], &rest[close + 1..]);
        }

        let name = rest.split_whitespace().collect::<Vec<_>>().join(" ");
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ');
        if !valid {
            return Err(invalid());
        }

        Ok(Self {
            name,
            args,
            array_depth,
        })
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(u32::to_string).collect();
            write!(f, "({})", args.join(","))?;
        }
        for _ in 0..self.array_depth {
            write!(f, "[]")?;
        }
        Ok(())
    }
}
