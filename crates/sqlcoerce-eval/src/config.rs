//! Engine configuration
//!
//! An [`EngineConfig`] carries the session time zone and a list of
//! equivalent types with declarative validators. It can be built in code or
//! loaded from JSON:
//!
//! ```json
//! {
//!   "time_zone": "+02:00",
//!   "equivalent_types": [
//!     { "name": "float4", "equivalent_to": "float", "validator": { "kind": "finite" } }
//!   ]
//! }
//! ```

use crate::registry::EquivalentType;
use crate::session::SessionSettings;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use sqlcoerce_diagnostics::CastError;
use sqlcoerce_types::{Datum, Validator};
use sqlcoerce_types::temporal::parse_offset;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while loading or applying a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid time zone: {0}")]
    InvalidTimeZone(String),

    #[error("Invalid validator for type {name}: {message}")]
    InvalidValidator { name: String, message: String },

    #[error(transparent)]
    Registration(#[from] CastError),
}

/// Declarative form of an equivalent type's predicate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidatorSpec {
    /// Accept every value
    #[default]
    Any,
    /// Numeric values other than NaN and the infinities
    Finite,
    /// Text that is not empty
    NonEmpty,
    /// Text matching a regular expression
    Pattern { regex: String },
    /// Numeric values within inclusive bounds
    Range {
        #[serde(default, deserialize_with = "bound")]
        min: Option<f64>,
        #[serde(default, deserialize_with = "bound")]
        max: Option<f64>,
    },
}

/// Range bounds are read through `Number`, the only form arbitrary-precision
/// numbers keep inside a tagged enum
fn bound<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Option::<serde_json::Number>::deserialize(deserializer)?
        .map(|n| {
            n.as_f64()
                .ok_or_else(|| D::Error::custom(format!("range bound {n} is not a number")))
        })
        .transpose()
}

impl ValidatorSpec {
    /// Compile into a predicate; `Any` compiles to no predicate
    ///
    /// Predicates only judge payloads of their own family: a text rule lets
    /// numbers through and the other way round.
    pub fn compile(&self, type_name: &str) -> Result<Option<Validator>, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValidator {
            name: type_name.to_string(),
            message,
        };
        let validator: Validator = match self {
            Self::Any => return Ok(None),
            Self::Finite => Arc::new(|d: &Datum| d.as_f64().is_none_or(f64::is_finite)),
            Self::NonEmpty => Arc::new(|d: &Datum| d.as_text().is_none_or(|s| !s.is_empty())),
            Self::Pattern { regex } => {
                let re = Regex::new(regex).map_err(|e| invalid(e.to_string()))?;
                Arc::new(move |d: &Datum| d.as_text().is_none_or(|s| re.is_match(s)))
            }
            Self::Range { min, max } => {
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(invalid(format!("min {lo} is greater than max {hi}")));
                    }
                }
                let (min, max) = (*min, *max);
                Arc::new(move |d: &Datum| {
                    d.as_f64().is_none_or(|f| {
                        min.is_none_or(|lo| f >= lo) && max.is_none_or(|hi| f <= hi)
                    })
                })
            }
        };
        Ok(Some(validator))
    }
}

/// Declarative equivalent type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalentTypeConfig {
    pub name: String,
    pub equivalent_to: String,
    #[serde(default)]
    pub validator: ValidatorSpec,
}

impl EquivalentTypeConfig {
    pub fn new(name: impl Into<String>, equivalent_to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            equivalent_to: equivalent_to.into(),
            validator: ValidatorSpec::Any,
        }
    }

    pub fn with_validator(mut self, validator: ValidatorSpec) -> Self {
        self.validator = validator;
        self
    }

    /// Compile into a registrable definition
    pub fn to_equivalent(&self) -> Result<EquivalentType, ConfigError> {
        let mut definition = EquivalentType::new(&self.name, &self.equivalent_to);
        definition.is_valid = self.validator.compile(&self.name)?;
        Ok(definition)
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed UTC offset (`+00:00`, `-05`, `Z`)
    pub time_zone: String,
    pub equivalent_types: Vec<EquivalentTypeConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_zone: "+00:00".to_string(),
            equivalent_types: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_json_str(&json)
    }

    /// Session settings described by this configuration
    pub fn session(&self) -> Result<SessionSettings, ConfigError> {
        parse_offset(&self.time_zone)
            .map(SessionSettings::new)
            .ok_or_else(|| ConfigError::InvalidTimeZone(self.time_zone.clone()))
    }
}
