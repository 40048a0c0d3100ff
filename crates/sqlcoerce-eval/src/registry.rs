//! Type registry
//!
//! The registry owns the catalog of known types, their aliases and the cast
//! graph. Readers take an immutable [`TypeCatalog`] snapshot; registering an
//! equivalent type swaps in an updated catalog under an exclusive lock, so a
//! snapshot taken earlier keeps a consistent view.

use crate::graph::CastGraph;
use indexmap::IndexMap;
use log::{debug, trace};
use parking_lot::RwLock;
use sqlcoerce_diagnostics::{CastError, CastResult};
use sqlcoerce_types::{
    BUILTIN_ALIASES, Datum, TypeDescriptor, TypeName, TypeRef, Validator, builtin_types,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A user type that behaves like an existing type
#[derive(Clone)]
pub struct EquivalentType {
    pub name: String,
    /// Name or alias of the type this one is equivalent to
    pub equivalent_to: String,
    /// Predicate a value must satisfy; `None` accepts everything
    pub is_valid: Option<Validator>,
}

impl EquivalentType {
    pub fn new(name: impl Into<String>, equivalent_to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            equivalent_to: equivalent_to.into(),
            is_valid: None,
        }
    }

    pub fn with_validator<F>(mut self, is_valid: F) -> Self
    where
        F: Fn(&Datum) -> bool + Send + Sync + 'static,
    {
        self.is_valid = Some(Arc::new(is_valid));
        self
    }
}

impl fmt::Debug for EquivalentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EquivalentType")
            .field("name", &self.name)
            .field("equivalent_to", &self.equivalent_to)
            .field("is_valid", &self.is_valid.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Immutable view of the known types and the cast graph
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    types: IndexMap<String, TypeRef>,
    aliases: HashMap<String, String>,
    graph: CastGraph,
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl TypeCatalog {
    /// Catalog of built-in types and edges
    pub fn builtin() -> Self {
        let types = builtin_types()
            .map(|ty| (ty.name().to_string(), ty.clone()))
            .collect();
        let aliases = BUILTIN_ALIASES
            .iter()
            .map(|(alias, target)| (alias.to_string(), target.to_string()))
            .collect();
        Self {
            types,
            aliases,
            graph: CastGraph::with_builtins(),
        }
    }

    pub fn graph(&self) -> &CastGraph {
        &self.graph
    }

    /// Registered types in registration order, built-ins first
    pub fn types(&self) -> impl Iterator<Item = &TypeRef> {
        self.types.values()
    }

    /// Aliases pointing at `name`
    pub fn aliases_of(&self, name: &str) -> Vec<&str> {
        let mut aliases: Vec<&str> = self
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.as_str())
            .collect();
        aliases.sort_unstable();
        aliases
    }

    /// Check whether a name or alias is taken, case-insensitively
    pub fn contains(&self, name: &str) -> bool {
        let key = normalize(name);
        self.types.contains_key(&key) || self.aliases.contains_key(&key)
    }

    /// Find a type by name or alias
    pub fn lookup(&self, name: &str) -> CastResult<TypeRef> {
        let key = normalize(name);
        let canonical = self.aliases.get(&key).unwrap_or(&key);
        self.types
            .get(canonical)
            .cloned()
            .ok_or_else(|| CastError::unknown_type(name.trim()))
    }

    /// Resolve a full type reference: name, modifiers and array suffixes
    pub fn parse_type(&self, text: &str) -> CastResult<TypeRef> {
        let parsed = TypeName::parse(text)?;
        let base = self.lookup(&parsed.name)?;
        let mut ty = match base.parse_modifier(&parsed.args)? {
            Some(modifier) => base.with_modifier(Some(modifier)),
            None => base,
        };
        for _ in 0..parsed.array_depth {
            ty = TypeDescriptor::array_of(ty);
        }
        Ok(ty)
    }

    /// Types from `ty` to its terminal built-in, following `equivalent_to`
    pub fn equivalence_chain(&self, ty: &TypeDescriptor) -> CastResult<Vec<TypeRef>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = match self.types.get(ty.name()) {
            Some(registered) => registered.clone(),
            None => Arc::new(ty.clone()),
        };
        loop {
            if !seen.insert(current.name().to_string()) {
                return Err(CastError::cyclic_equivalence(ty.name()));
            }
            let next = current.equivalent_to().map(|name| {
                self.types
                    .get(name)
                    .cloned()
                    .ok_or_else(|| CastError::unknown_type(name))
            });
            chain.push(current);
            match next {
                Some(next) => current = next?,
                None => return Ok(chain),
            }
        }
    }

    /// Terminal built-in type that `ty` is equivalent to
    pub fn resolve_equivalence(&self, ty: &TypeDescriptor) -> CastResult<TypeRef> {
        let chain = self.equivalence_chain(ty)?;
        chain
            .last()
            .cloned()
            .ok_or_else(|| CastError::unknown_type(ty.name()))
    }

    /// Run every validator along the equivalence chain of `ty`
    ///
    /// NULL is always valid. Arrays validate element-wise.
    pub fn validate(&self, ty: &TypeRef, datum: &Datum) -> CastResult<()> {
        if datum.is_null() {
            return Ok(());
        }
        if ty.is_array() {
            if let (Some(element), Datum::Array(items)) = (ty.element(), datum) {
                for item in items {
                    self.validate(element, item)?;
                }
            }
            return Ok(());
        }
        if !ty.is_custom() {
            return Ok(());
        }
        for link in self.equivalence_chain(ty)? {
            if let Some(is_valid) = link.validator() {
                if !is_valid(datum) {
                    return Err(CastError::custom_validation(link.name(), datum.to_string()));
                }
            }
        }
        Ok(())
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Shared, thread-safe type registry
pub struct TypeRegistry {
    catalog: RwLock<Arc<TypeCatalog>>,
}

impl TypeRegistry {
    /// Registry holding the built-in types
    pub fn new() -> Self {
        Self {
            catalog: RwLock::new(Arc::new(TypeCatalog::builtin())),
        }
    }

    /// Current catalog; unaffected by later registrations
    pub fn snapshot(&self) -> Arc<TypeCatalog> {
        self.catalog.read().clone()
    }

    pub fn lookup(&self, name: &str) -> CastResult<TypeRef> {
        self.snapshot().lookup(name)
    }

    /// Register an equivalent type
    pub fn register_equivalent(&self, definition: EquivalentType) -> CastResult<TypeRef> {
        let equivalent = self.lookup(&definition.equivalent_to)?;
        let descriptor = TypeDescriptor::custom(definition.name, &equivalent, definition.is_valid);
        self.register(descriptor)
    }

    /// Register a custom descriptor and materialize its cast edges
    pub fn register(&self, descriptor: TypeDescriptor) -> CastResult<TypeRef> {
        let parsed = TypeName::parse(descriptor.name())?;
        if !parsed.args.is_empty() || parsed.array_depth > 0 {
            return Err(CastError::unknown_type(descriptor.name()));
        }
        let base = descriptor
            .equivalent_to()
            .ok_or_else(|| CastError::unknown_type(descriptor.name()))?
            .to_string();

        let mut guard = self.catalog.write();
        if guard.contains(descriptor.name()) {
            return Err(CastError::duplicate_type(descriptor.name()));
        }
        guard.lookup(&base)?;

        let ty = Arc::new(descriptor);
        let name = ty.name().to_string();
        let catalog = Arc::make_mut(&mut guard);
        catalog.types.insert(name.clone(), ty.clone());
        if let Err(err) = catalog.equivalence_chain(&ty) {
            catalog.types.shift_remove(&name);
            return Err(err);
        }
        let added = catalog.graph.materialize_equivalent(&name, &base);

        debug!("registered type {name} equivalent to {base}");
        trace!("materialized {added} cast edges for {name}");
        Ok(ty)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let catalog = self.snapshot();
        f.debug_struct("TypeRegistry")
            .field("types", &catalog.types.len())
            .field("edges", &catalog.graph.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CastMode;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sqlcoerce_types::{BaseKind, FLOAT, TypeModifier};

    fn float4() -> EquivalentType {
        EquivalentType::new("float4", "float").with_validator(|d| match d {
            Datum::Float(f) => f.is_finite(),
            _ => false,
        })
    }

    #[rstest]
    #[case("INT", "integer")]
    #[case("int4", "integer")]
    #[case("Double  Precision", "float")]
    #[case("character varying", "varchar")]
    #[case("numeric", "decimal")]
    #[case("timestamp with time zone", "timestamptz")]
    fn test_lookup_aliases(#[case] name: &str, #[case] canonical: &str) {
        let catalog = TypeCatalog::builtin();
        assert_eq!(catalog.lookup(name).unwrap().name(), canonical);
    }

    #[test]
    fn test_lookup_unknown() {
        let err = TypeCatalog::builtin().lookup("float4").unwrap_err();
        assert_eq!(err.tag(), "UnknownTypeError");
    }

    #[rstest]
    #[case("varchar(5)", "varchar(5)")]
    #[case("numeric(10, 2)", "decimal(10,2)")]
    #[case("timestamp(4) with time zone", "timestamptz(4)")]
    #[case("text[]", "text[]")]
    #[case("int[][]", "integer[][]")]
    fn test_parse_type(#[case] text: &str, #[case] rendered: &str) {
        let ty = TypeCatalog::builtin().parse_type(text).unwrap();
        assert_eq!(ty.to_string(), rendered);
    }

    #[rstest]
    #[case("integer(3)")]
    #[case("time(7)")]
    #[case("varchar(0)")]
    #[case("nosuchtype")]
    fn test_parse_type_rejects(#[case] text: &str) {
        let err = TypeCatalog::builtin().parse_type(text).unwrap_err();
        assert_eq!(err.tag(), "UnknownTypeError");
    }

    #[test]
    fn test_parse_type_modifier() {
        let ty = TypeCatalog::builtin().parse_type("varchar(5)").unwrap();
        assert_eq!(ty.modifier(), Some(TypeModifier::Length(5)));
        assert_eq!(ty.name(), "varchar");
    }

    #[test]
    fn test_register_equivalent() {
        let registry = TypeRegistry::new();
        let ty = registry.register_equivalent(float4()).unwrap();
        assert!(ty.is_custom());
        assert_eq!(ty.physical(), BaseKind::Float);
        assert_eq!(registry.lookup("FLOAT4").unwrap().name(), "float4");

        let catalog = registry.snapshot();
        assert_eq!(catalog.resolve_equivalence(&ty).unwrap().name(), "float");
        assert_eq!(
            catalog.graph().edge("integer", "float4").unwrap().mode,
            CastMode::Implicit
        );
    }

    #[test]
    fn test_register_through_alias() {
        let registry = TypeRegistry::new();
        let ty = registry
            .register_equivalent(EquivalentType::new("real", "double precision"))
            .unwrap();
        assert_eq!(ty.equivalent_to(), Some("float"));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let registry = TypeRegistry::new();
        registry.register_equivalent(float4()).unwrap();
        let err = registry.register_equivalent(float4()).unwrap_err();
        assert_eq!(err.tag(), "DuplicateTypeError");
        let err = registry
            .register_equivalent(EquivalentType::new("Int4", "bigint"))
            .unwrap_err();
        assert_eq!(err.tag(), "DuplicateTypeError");
    }

    #[test]
    fn test_register_unknown_base() {
        let registry = TypeRegistry::new();
        let err = registry
            .register_equivalent(EquivalentType::new("money", "currency"))
            .unwrap_err();
        assert_eq!(err.tag(), "UnknownTypeError");
    }

    #[test]
    fn test_snapshot_isolation() {
        let registry = TypeRegistry::new();
        let before = registry.snapshot();
        registry.register_equivalent(float4()).unwrap();
        assert!(before.lookup("float4").is_err());
        assert!(registry.snapshot().lookup("float4").is_ok());
    }

    #[test]
    fn test_validate_chain() {
        let registry = TypeRegistry::new();
        registry.register_equivalent(float4()).unwrap();
        registry
            .register_equivalent(EquivalentType::new("small_float4", "float4").with_validator(
                |d| d.as_f64().is_some_and(|f| f.abs() < 100.0),
            ))
            .unwrap();
        let catalog = registry.snapshot();
        let ty = catalog.lookup("small_float4").unwrap();
        assert_eq!(catalog.resolve_equivalence(&ty).unwrap().name(), "float");
        assert!(catalog.validate(&ty, &Datum::Float(42.0)).is_ok());
        assert!(catalog.validate(&ty, &Datum::Null).is_ok());
        let err = catalog.validate(&ty, &Datum::Float(f64::NAN)).unwrap_err();
        assert_eq!(err.tag(), "CustomTypeValidationError");
        let err = catalog.validate(&ty, &Datum::Float(420.0)).unwrap_err();
        assert_eq!(err.tag(), "CustomTypeValidationError");
    }

    #[test]
    fn test_cyclic_equivalence() {
        let seed = TypeDescriptor::custom("celsius", &FLOAT, None);
        let kelvin = Arc::new(TypeDescriptor::custom("kelvin", &seed, None));
        let celsius = Arc::new(TypeDescriptor::custom("celsius", &kelvin, None));
        let mut catalog = TypeCatalog::builtin();
        catalog.types.insert("celsius".into(), celsius.clone());
        catalog.types.insert("kelvin".into(), kelvin);

        let err = catalog.resolve_equivalence(&celsius).unwrap_err();
        assert_eq!(err.tag(), "CyclicEquivalenceError");
        let err = catalog.validate(&celsius, &Datum::Float(1.0)).unwrap_err();
        assert_eq!(err.tag(), "CyclicEquivalenceError");
    }

    #[test]
    fn test_validate_builtin_is_noop() {
        let catalog = TypeCatalog::builtin();
        assert!(catalog.validate(&FLOAT, &Datum::Float(f64::NAN)).is_ok());
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeRegistry>();
    }
}
