//! Type registry: resolves a [`TypeId`] to a cached parser.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::TypeError;
use crate::types::{
    BoolMapParser, BoolParser, CollectionParser, EnumDef, EnumParser, NumberParser, StringParser,
    TypeId, TypeParser,
};

/// Thread-safe parser registry.
///
/// Built-in scalars are registered up front; enumerations and lists are
/// derived on first resolution and cached.
pub struct TypeRegistry {
    parsers: RwLock<HashMap<TypeId, Arc<dyn TypeParser>>>,
    enums: RwLock<HashMap<String, Arc<EnumDef>>>,
}

impl TypeRegistry {
    /// Registry with every built-in parser.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.insert(Arc::new(BoolParser));
        registry.insert(Arc::new(NumberParser::<i32>::new()));
        registry.insert(Arc::new(NumberParser::<i64>::new()));
        registry.insert(Arc::new(NumberParser::<u32>::new()));
        registry.insert(Arc::new(NumberParser::<u64>::new()));
        registry.insert(Arc::new(NumberParser::<f64>::new()));
        registry.insert(Arc::new(StringParser));
        registry.insert(Arc::new(BoolMapParser));
        registry
    }

    /// Registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            parsers: RwLock::new(HashMap::new()),
            enums: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, parser: Arc<dyn TypeParser>) {
        self.parsers.write().insert(parser.type_id(), parser);
    }

    /// Register an enumeration; resolvable as `TypeId::enumeration(name)`.
    ///
    /// Re-registering a name replaces the definition and drops cached parsers for it.
    pub fn register_enum(&self, def: EnumDef) -> Result<(), TypeError> {
        if def.members.is_empty() {
            return Err(TypeError::EmptyEnum { name: def.name });
        }
        let name = def.name.clone();
        self.enums.write().insert(name.clone(), Arc::new(def));
        self.parsers
            .write()
            .retain(|id, _| !mentions_enum(id, &name));
        Ok(())
    }

    /// Register a custom parser under `TypeId::Named(name)`.
    pub fn register(&self, name: impl Into<String>, parser: Arc<dyn TypeParser>) {
        let id = TypeId::Named(name.into());
        let mut parsers = self.parsers.write();
        parsers.retain(|cached, _| !contains(cached, &id));
        parsers.insert(id, parser);
    }

    /// Look up (or derive) the parser for `type_id`.
    pub fn resolve(&self, type_id: &TypeId) -> Result<Arc<dyn TypeParser>, TypeError> {
        if let Some(parser) = self.parsers.read().get(type_id) {
            return Ok(Arc::clone(parser));
        }

        let derived = self.derive(type_id)?;
        tracing::debug!(type_id = %type_id, "derived parser");
        self.parsers
            .write()
            .entry(type_id.clone())
            .or_insert_with(|| Arc::clone(&derived));
        Ok(derived)
    }

    pub fn supports(&self, type_id: &TypeId) -> bool {
        self.resolve(type_id).is_ok()
    }

    fn derive(&self, type_id: &TypeId) -> Result<Arc<dyn TypeParser>, TypeError> {
        match type_id {
            TypeId::Enum { name, case } => {
                let def = self
                    .enums
                    .read()
                    .get(name)
                    .cloned()
                    .ok_or_else(|| unsupported(type_id))?;
                Ok(Arc::new(EnumParser::new(def, *case)?))
            }
            // Nested collections have no token form.
            TypeId::List(element) if element.is_collection() => Err(unsupported(type_id)),
            TypeId::List(element) => {
                let element = self.resolve(element)?;
                Ok(Arc::new(CollectionParser::new(element)))
            }
            _ => Err(unsupported(type_id)),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn unsupported(type_id: &TypeId) -> TypeError {
    TypeError::Unsupported {
        type_name: type_id.to_string(),
    }
}

fn mentions_enum(id: &TypeId, name: &str) -> bool {
    match id {
        TypeId::Enum { name: n, .. } => n == name,
        TypeId::List(inner) => mentions_enum(inner, name),
        _ => false,
    }
}

fn contains(id: &TypeId, needle: &TypeId) -> bool {
    id == needle || matches!(id, TypeId::List(inner) if contains(inner, needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CaseMode, Value};

    #[test]
    fn builtins_resolve() {
        let registry = TypeRegistry::new();
        for id in [
            TypeId::Bool,
            TypeId::I32,
            TypeId::I64,
            TypeId::U32,
            TypeId::U64,
            TypeId::F64,
            TypeId::String,
            TypeId::BoolMap,
        ] {
            assert_eq!(registry.resolve(&id).unwrap().type_id(), id);
        }
    }

    #[test]
    fn lists_are_derived_and_cached() {
        let registry = TypeRegistry::new();
        let id = TypeId::list(TypeId::U64);
        let first = registry.resolve(&id).unwrap();
        let second = registry.resolve(&id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.accumulates());
    }

    fn reformat(registry: &TypeRegistry, id: &TypeId, raw: &str) -> String {
        let parser = registry.resolve(id).unwrap();
        let value = parser.parse(raw).unwrap();
        parser.format(&value).unwrap()
    }

    #[test]
    fn canonical_text_round_trips_for_every_builtin() {
        let registry = TypeRegistry::new();
        registry
            .register_enum(EnumDef::new("Color", ["Red", "Green"]))
            .unwrap();

        let cases: Vec<(TypeId, &[&str])> = vec![
            (TypeId::Bool, &["true", "false"][..]),
            (TypeId::I32, &["0", "-2147483648", "2147483647"][..]),
            (TypeId::I64, &["-17", "9223372036854775807"][..]),
            (TypeId::U32, &["0", "4294967295"][..]),
            (TypeId::U64, &["18446744073709551615"][..]),
            (TypeId::F64, &["1.5", "-0.25", "0"][..]),
            (TypeId::String, &["hello world", ""][..]),
            (TypeId::enumeration("Color"), &["Red", "Green"][..]),
            (TypeId::enumeration("Color").ignore_case(), &["Green"][..]),
            (TypeId::list(TypeId::U64), &["1,2,3", "7"][..]),
            (TypeId::list(TypeId::enumeration("Color")), &["Green,Red,Green"][..]),
            (TypeId::list(TypeId::String), &["a,b"][..]),
            (TypeId::BoolMap, &["a=true,b=false"][..]),
        ];
        for (id, raws) in cases {
            for raw in raws {
                assert_eq!(reformat(&registry, &id, raw), *raw, "{} {:?}", id, raw);
            }
        }
    }

    #[test]
    fn non_canonical_spellings_format_canonically() {
        let registry = TypeRegistry::new();
        registry
            .register_enum(EnumDef::new("Color", ["Red", "Green"]))
            .unwrap();

        let cases = [
            (TypeId::Bool, "yes", "true"),
            (TypeId::Bool, "OFF", "false"),
            (TypeId::I32, "+5", "5"),
            (TypeId::I64, "007", "7"),
            (TypeId::F64, "1.50", "1.5"),
            (TypeId::enumeration("Color").ignore_case(), "green", "Green"),
            (TypeId::list(TypeId::U64), "1, 2,,3", "1,2,3"),
            (TypeId::BoolMap, "b,a=off", "a=false,b=true"),
        ];
        for (id, raw, canonical) in cases {
            assert_eq!(reformat(&registry, &id, raw), canonical, "{} {:?}", id, raw);
        }
    }

    #[test]
    fn unknown_enum_is_unsupported() {
        let registry = TypeRegistry::new();
        let err = registry
            .resolve(&TypeId::enumeration("Color"))
            .err()
            .unwrap();
        assert_eq!(
            err,
            TypeError::Unsupported {
                type_name: "Color".into()
            }
        );
    }

    #[test]
    fn enum_case_mode_is_part_of_the_key() {
        let registry = TypeRegistry::new();
        registry
            .register_enum(EnumDef::new("Color", ["Red", "Green"]))
            .unwrap();

        let sensitive = registry.resolve(&TypeId::enumeration("Color")).unwrap();
        let insensitive = registry
            .resolve(&TypeId::enumeration("Color").ignore_case())
            .unwrap();

        assert!(sensitive.parse("red").is_err());
        assert_eq!(insensitive.parse("red").unwrap(), Value::Enum("Red".into()));
        assert_eq!(
            insensitive.type_id(),
            TypeId::Enum {
                name: "Color".into(),
                case: CaseMode::Insensitive
            }
        );
    }

    #[test]
    fn list_of_enum_is_derived() {
        let registry = TypeRegistry::new();
        registry
            .register_enum(EnumDef::new("Color", ["Red", "Green"]))
            .unwrap();
        let parser = registry
            .resolve(&TypeId::list(TypeId::enumeration("Color")))
            .unwrap();
        assert_eq!(parser.choices(), vec!["Red", "Green"]);
    }

    #[test]
    fn nested_collections_are_unsupported() {
        let registry = TypeRegistry::new();
        assert!(!registry.supports(&TypeId::list(TypeId::list(TypeId::I32))));
        assert!(!registry.supports(&TypeId::list(TypeId::BoolMap)));
    }

    #[test]
    fn reregistering_enum_invalidates_cache() {
        let registry = TypeRegistry::new();
        registry
            .register_enum(EnumDef::new("Color", ["Red"]))
            .unwrap();
        let id = TypeId::list(TypeId::enumeration("Color"));
        assert_eq!(registry.resolve(&id).unwrap().choices(), vec!["Red"]);

        registry
            .register_enum(EnumDef::new("Color", ["Blue"]))
            .unwrap();
        assert_eq!(registry.resolve(&id).unwrap().choices(), vec!["Blue"]);
    }

    #[test]
    fn empty_enum_is_rejected() {
        let registry = TypeRegistry::new();
        let def = EnumDef::new("Void", Vec::<String>::new());
        assert!(registry.register_enum(def).is_err());
    }

    #[test]
    fn named_parsers_are_pluggable() {
        let registry = TypeRegistry::new();
        assert!(!registry.supports(&TypeId::named("path")));
        registry.register("path", Arc::new(StringParser));
        assert!(registry.supports(&TypeId::named("path")));
        assert!(registry.supports(&TypeId::list(TypeId::named("path"))));
    }
}
