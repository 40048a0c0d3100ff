//! SQL Type System
//!
//! This module defines the type descriptors shared by the registry, the cast
//! graph and the executor:
//! - `BaseKind` naming the payload family of a type
//! - `TypeDescriptor` records for built-in, array and custom types
//! - Type modifiers (`varchar(5)`, `numeric(10,2)`, `timestamp(4)`)
//! - The built-in catalog and its aliases
//!
//! Built-in and user-registered types are the same record. A custom type
//! points at the type it is equivalent to and may carry a validator.

use crate::value::Datum;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlcoerce_diagnostics::{CastError, CastResult};
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Shared handle to a type descriptor
pub type TypeRef = Arc<TypeDescriptor>;

/// Predicate consulted before a value of a custom type is accepted
pub type Validator = Arc<dyn Fn(&Datum) -> bool + Send + Sync>;

/// Largest fractional-second precision accepted by `time(p)` and `timestamp(p)`
pub const MAX_TIME_PRECISION: u8 = 6;

/// Largest numeric precision representable by the decimal payload
pub const MAX_NUMERIC_PRECISION: u8 = 28;

/// Payload family of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BaseKind {
    /// Type of the untyped `NULL` literal
    Null,
    Bool,
    Int,
    BigInt,
    Float,
    Decimal,
    Text,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
    Json,
    Jsonb,
    Array,
    /// User-registered type equivalent to another type
    Custom,
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Text => "text",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::Interval => "interval",
            Self::Json => "json",
            Self::Jsonb => "jsonb",
            Self::Array => "array",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Shape of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Scalar,
    Array,
    Composite,
}

/// Declared length or precision attached to a type reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeModifier {
    /// Maximum character length (`varchar(n)`)
    Length(u32),
    /// Fractional-second digits (`time(p)`, `timestamp(p)`)
    Precision(u8),
    /// Total digits and digits after the point (`numeric(p, s)`)
    Numeric { precision: u8, scale: u8 },
}

impl fmt::Display for TypeModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(n) => write!(f, "({n})"),
            Self::Precision(p) => write!(f, "({p})"),
            Self::Numeric { precision, scale } => write!(f, "({precision},{scale})"),
        }
    }
}

/// A type known to the registry, or synthesized from one
#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    kind: TypeKind,
    base: BaseKind,
    physical: BaseKind,
    equivalent_to: Option<String>,
    element: Option<TypeRef>,
    modifier: Option<TypeModifier>,
    validator: Option<Validator>,
}

impl TypeDescriptor {
    fn builtin(name: &str, base: BaseKind) -> Self {
        Self {
            name: name.to_string(),
            kind: TypeKind::Scalar,
            base,
            physical: base,
            equivalent_to: None,
            element: None,
            modifier: None,
            validator: None,
        }
    }

    /// Create a custom type equivalent to `equivalent`
    ///
    /// The new type stores its values with the payload family of the
    /// equivalent type and keeps a reference to it by name, so the registry
    /// can walk the chain.
    pub fn custom(
        name: impl Into<String>,
        equivalent: &TypeDescriptor,
        validator: Option<Validator>,
    ) -> Self {
        Self {
            name: name.into().to_lowercase(),
            kind: equivalent.kind,
            base: BaseKind::Custom,
            physical: equivalent.physical,
            equivalent_to: Some(equivalent.name.clone()),
            element: equivalent.element.clone(),
            modifier: None,
            validator,
        }
    }

    /// Create an array type of `element`
    pub fn array_of(element: TypeRef) -> TypeRef {
        Arc::new(Self {
            name: format!("{}[]", element.name),
            kind: TypeKind::Array,
            base: BaseKind::Array,
            physical: BaseKind::Array,
            equivalent_to: None,
            element: Some(element),
            modifier: None,
            validator: None,
        })
    }

    /// Registry name (lowercase, without modifier)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Declared base kind (`Custom` for registered equivalents)
    pub fn base(&self) -> BaseKind {
        self.base
    }

    /// Payload family used to store values of this type
    pub fn physical(&self) -> BaseKind {
        self.physical
    }

    /// Name of the type this one is equivalent to
    pub fn equivalent_to(&self) -> Option<&str> {
        self.equivalent_to.as_deref()
    }

    /// Element type of an array
    pub fn element(&self) -> Option<&TypeRef> {
        self.element.as_ref()
    }

    pub fn modifier(&self) -> Option<TypeModifier> {
        self.modifier
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    pub fn is_custom(&self) -> bool {
        self.base == BaseKind::Custom
    }

    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    /// Type of the untyped `NULL` literal
    pub fn is_null(&self) -> bool {
        self.physical == BaseKind::Null
    }

    /// Same registry type and same modifier, element-wise for arrays
    pub fn same_type(&self, other: &TypeDescriptor) -> bool {
        self.name == other.name
            && self.modifier == other.modifier
            && match (&self.element, &other.element) {
                (Some(a), Some(b)) => a.same_type(b),
                (None, None) => true,
                _ => false,
            }
    }

    /// Same registry type, ignoring modifiers
    pub fn same_base_type(&self, other: &TypeDescriptor) -> bool {
        self.name == other.name
    }

    /// Copy of this descriptor with `modifier` attached
    pub fn with_modifier(&self, modifier: Option<TypeModifier>) -> TypeRef {
        Arc::new(Self {
            modifier,
            ..self.clone()
        })
    }

    /// Validate modifier arguments for this type
    ///
    /// `varchar` takes a length, `time`/`timestamp`/`timestamptz` a
    /// fractional-second precision and `decimal` a precision with an optional
    /// scale. Every other type rejects modifiers.
    pub fn parse_modifier(&self, args: &[u32]) -> CastResult<Option<TypeModifier>> {
        if args.is_empty() {
            return Ok(None);
        }
        let invalid = || {
            let joined: Vec<String> = args.iter().map(u32::to_string).collect();
            CastError::unknown_type(format!("{}({})", self.name, joined.join(",")))
        };
        if self.is_custom() || self.is_array() {
            return Err(invalid());
        }
        match (self.physical, args) {
            (BaseKind::Text, [n]) if self.name == "varchar" && *n > 0 => {
                Ok(Some(TypeModifier::Length(*n)))
            }
            (BaseKind::Time | BaseKind::Timestamp | BaseKind::TimestampTz, [p])
                if *p <= u32::from(MAX_TIME_PRECISION) =>
            {
                Ok(Some(TypeModifier::Precision(*p as u8)))
            }
            (BaseKind::Decimal, [p]) if (1..=u32::from(MAX_NUMERIC_PRECISION)).contains(p) => {
                Ok(Some(TypeModifier::Numeric {
                    precision: *p as u8,
                    scale: 0,
                }))
            }
            (BaseKind::Decimal, [p, s])
                if (1..=u32::from(MAX_NUMERIC_PRECISION)).contains(p) && s <= p =>
            {
                Ok(Some(TypeModifier::Numeric {
                    precision: *p as u8,
                    scale: *s as u8,
                }))
            }
            _ => Err(invalid()),
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.same_type(other)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base", &self.base)
            .field("physical", &self.physical)
            .field("equivalent_to", &self.equivalent_to)
            .field("element", &self.element)
            .field("modifier", &self.modifier)
            .field("validator", &self.validator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Some(element) if self.is_array() => write!(f, "{element}[]"),
            _ => {
                write!(f, "{}", self.name)?;
                if let Some(modifier) = &self.modifier {
                    write!(f, "{modifier}")?;
                }
                Ok(())
            }
        }
    }
}

// === Built-in catalog ===

macro_rules! builtin_types {
    ($($ident:ident => ($name:literal, $base:ident)),* $(,)?) => {
        $(
            pub static $ident: LazyLock<TypeRef> =
                LazyLock::new(|| Arc::new(TypeDescriptor::builtin($name, BaseKind::$base)));
        )*

        static BUILTINS: LazyLock<IndexMap<&'static str, TypeRef>> = LazyLock::new(|| {
            let mut map = IndexMap::new();
            $( map.insert($name, $ident.clone()); )*
            map
        });
    };
}

builtin_types! {
    NULL => ("null", Null),
    BOOLEAN => ("boolean", Bool),
    INTEGER => ("integer", Int),
    BIGINT => ("bigint", BigInt),
    FLOAT => ("float", Float),
    DECIMAL => ("decimal", Decimal),
    TEXT => ("text", Text),
    VARCHAR => ("varchar", Text),
    DATE => ("date", Date),
    TIME => ("time", Time),
    TIMESTAMP => ("timestamp", Timestamp),
    TIMESTAMPTZ => ("timestamptz", TimestampTz),
    INTERVAL => ("interval", Interval),
    JSON => ("json", Json),
    JSONB => ("jsonb", Jsonb),
}

/// Alternative spellings of built-in types
pub const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("bool", "boolean"),
    ("int", "integer"),
    ("int4", "integer"),
    ("int8", "bigint"),
    ("float8", "float"),
    ("double", "float"),
    ("double precision", "float"),
    ("numeric", "decimal"),
    ("character varying", "varchar"),
    ("time without time zone", "time"),
    ("timestamp without time zone", "timestamp"),
    ("timestamp with time zone", "timestamptz"),
];

/// All built-in types in declaration order
pub fn builtin_types() -> impl Iterator<Item = &'static TypeRef> {
    BUILTINS.values()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers() {
        assert_eq!(VARCHAR.parse_modifier(&[5]).ok().flatten(), Some(TypeModifier::Length(5)));
        assert_eq!(
            DECIMAL.parse_modifier(&[10, 2]).ok().flatten(),
            Some(TypeModifier::Numeric { precision: 10, scale: 2 })
        );
        assert!(TIMESTAMPTZ.parse_modifier(&[7]).is_err());
        assert!(INTEGER.parse_modifier(&[3]).is_err());
        assert!(TEXT.parse_modifier(&[3]).is_err());
    }

    #[test]
    fn test_display() {
        let varchar5 = VARCHAR.with_modifier(Some(TypeModifier::Length(5)));
        assert_eq!(varchar5.to_string(), "varchar(5)");
        assert_eq!(TypeDescriptor::array_of(TEXT.clone()).to_string(), "text[]");
    }

    #[test]
    fn test_custom_descriptor() {
        let float4 = TypeDescriptor::custom("Float4", &FLOAT, None);
        assert_eq!(float4.name(), "float4");
        assert_eq!(float4.base(), BaseKind::Custom);
        assert_eq!(float4.physical(), BaseKind::Float);
        assert_eq!(float4.equivalent_to(), Some("float"));
    }

    #[test]
    fn test_identity_includes_modifier() {
        let v5 = VARCHAR.with_modifier(Some(TypeModifier::Length(5)));
        assert!(!v5.same_type(&VARCHAR));
        assert!(v5.same_base_type(&VARCHAR));
    }
}
