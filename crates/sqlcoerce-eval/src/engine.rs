//! Casting engine
//!
//! [`CastEngine`] ties the registry, resolver and executor together behind
//! one handle. The engine is `Send + Sync`; every call works on the catalog
//! snapshot current when it starts.

use crate::coercers::temporal;
use crate::config::{ConfigError, EngineConfig};
use crate::executor::{CastExecutor, to_text};
use crate::graph::CastMode;
use crate::registry::{EquivalentType, TypeCatalog, TypeRegistry};
use crate::resolver::{CastContext, CastResolver, Operand, ResolvedCast, Usage};
use crate::session::SessionSettings;
use chrono::FixedOffset;
use log::debug;
use sqlcoerce_diagnostics::CastResult;
use sqlcoerce_types::{DATE, Datum, TIMESTAMPTZ, TypeRef, Value};
use std::sync::Arc;

/// The type coercion and casting engine
#[derive(Debug, Default)]
pub struct CastEngine {
    registry: TypeRegistry,
    session: SessionSettings,
}

impl CastEngine {
    /// Engine with the built-in types in UTC
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> CastEngineBuilder {
        CastEngineBuilder::default()
    }

    /// Build an engine from a loaded configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let mut builder = Self::builder().time_zone(config.session()?.time_zone);
        for definition in &config.equivalent_types {
            builder = builder.equivalent_type(definition.to_equivalent()?);
        }
        let engine = builder.build()?;
        debug!(
            "engine configured with time zone {} and {} equivalent types",
            engine.session.time_zone_name(),
            config.equivalent_types.len()
        );
        Ok(engine)
    }

    pub fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> Arc<TypeCatalog> {
        self.registry.snapshot()
    }

    pub fn register_equivalent(&self, definition: EquivalentType) -> CastResult<TypeRef> {
        self.registry.register_equivalent(definition)
    }

    pub fn lookup(&self, name: &str) -> CastResult<TypeRef> {
        self.registry.lookup(name)
    }

    /// Resolve a type reference with modifiers and array suffixes
    pub fn parse_type(&self, text: &str) -> CastResult<TypeRef> {
        self.snapshot().parse_type(text)
    }

    pub fn resolve(&self, context: &CastContext) -> CastResult<ResolvedCast> {
        let catalog = self.snapshot();
        CastResolver::new(&catalog, &self.session).resolve(context)
    }

    pub fn cast(&self, value: &Value, target: &TypeRef, mode: CastMode) -> CastResult<Value> {
        let catalog = self.snapshot();
        CastExecutor::new(&catalog, &self.session).cast(value, target, mode)
    }

    pub fn coerce_literal(&self, raw: &str, target: &TypeRef, mode: CastMode) -> CastResult<Value> {
        let catalog = self.snapshot();
        CastExecutor::new(&catalog, &self.session).coerce_literal(raw, target, mode)
    }

    pub fn apply(&self, resolved: &ResolvedCast, values: &[Value]) -> CastResult<Vec<Value>> {
        let catalog = self.snapshot();
        CastExecutor::new(&catalog, &self.session).apply(resolved, values)
    }

    /// Resolve and apply in one step against a single snapshot
    pub fn unify(&self, usage: Usage, operands: &[(Operand, Value)]) -> CastResult<Vec<Value>> {
        let catalog = self.snapshot();
        let context = CastContext::new(usage, operands.iter().map(|(op, _)| op.clone()).collect());
        let resolved = CastResolver::new(&catalog, &self.session).resolve(&context)?;
        let values: Vec<Value> = operands.iter().map(|(_, value)| value.clone()).collect();
        CastExecutor::new(&catalog, &self.session).apply(&resolved, &values)
    }

    /// Store one value into a column of type `target`
    pub fn assign(&self, target: &TypeRef, operand: Operand, value: &Value) -> CastResult<Value> {
        let mut stored = self.unify(Usage::column(target.clone()), &[(operand, value.clone())])?;
        Ok(stored.remove(0))
    }

    /// `to_date(text, pattern)`
    pub fn to_date(&self, text: &str, pattern: &str) -> CastResult<Value> {
        let date = temporal::to_date(text, pattern)?;
        Value::new(DATE.clone(), Datum::Date(date))
    }

    /// `to_timestamp(text, pattern)`, read in the session time zone
    pub fn to_timestamp(&self, text: &str, pattern: &str) -> CastResult<Value> {
        let instant = temporal::to_timestamp(text, pattern, &self.session)?;
        Value::new(TIMESTAMPTZ.clone(), Datum::TimestampTz(instant))
    }

    /// Text output of a value in the session time zone
    pub fn render(&self, value: &Value) -> String {
        to_text(value, &self.session)
    }
}

/// Builder for [`CastEngine`]
#[derive(Debug, Default)]
pub struct CastEngineBuilder {
    session: SessionSettings,
    equivalent_types: Vec<EquivalentType>,
}

impl CastEngineBuilder {
    /// Session time zone used for zone-less `timestamptz` text and rendering
    pub fn time_zone(mut self, offset: FixedOffset) -> Self {
        self.session.time_zone = offset;
        self
    }

    /// Register an equivalent type when the engine is built
    pub fn equivalent_type(mut self, definition: EquivalentType) -> Self {
        self.equivalent_types.push(definition);
        self
    }

    pub fn build(self) -> CastResult<CastEngine> {
        let engine = CastEngine {
            registry: TypeRegistry::new(),
            session: self.session,
        };
        for definition in self.equivalent_types {
            engine.register_equivalent(definition)?;
        }
        Ok(engine)
    }
}
