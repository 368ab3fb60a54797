//! The schema registry: path → schema resolution for decoding.
//!
//! Encoded nodes are tagged with stable type paths; the decoder resolves
//! them through a registry. A process-wide registry is available through
//! [`global`] with defined first-access initialization and no teardown;
//! multiple threads may race to register the same type, the first insert
//! wins.
//!
//! With the `auto_register` feature (default), types deriving `Value` with
//! `#[value(auto_register)]` are collected through the [`inventory`] crate
//! and registered into the global registry on first access.

use core::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::Schematic;
use crate::cell::TypeIdMap;
use crate::schema::TypeSchema;

// -----------------------------------------------------------------------------
// SchemaRegistry

/// A registry of schema'd types, indexed by [`TypeId`], full path and short
/// name.
///
/// Short names are a convenience index; when two registered types share one,
/// the name becomes ambiguous and resolves to neither.
///
/// # Example
///
/// ```
/// use amber_codec::registry::SchemaRegistry;
///
/// let registry = SchemaRegistry::new(); // `new` registers the basic types
///
/// let schema = registry.get_with_name("String").unwrap();
/// assert_eq!(schema.path(), "alloc::string::String");
/// ```
pub struct SchemaRegistry {
    schema_table: TypeIdMap<&'static TypeSchema>,
    path_to_id: HashMap<&'static str, TypeId>,
    name_to_id: HashMap<&'static str, TypeId>,
    ambiguous_names: HashSet<&'static str>,
}

impl Default for SchemaRegistry {
    /// See [`SchemaRegistry::new`].
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[inline]
    pub fn empty() -> Self {
        Self {
            schema_table: TypeIdMap::new(),
            path_to_id: HashMap::new(),
            name_to_id: HashMap::new(),
            ambiguous_names: HashSet::new(),
        }
    }

    /// Creates a registry with the basic types registered:
    ///
    /// - `bool` `char`
    /// - `u8` - `u128`, `usize`
    /// - `i8` - `i128`, `isize`
    /// - `f32` `f64`
    /// - `String`
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<bool>();
        registry.register::<char>();
        registry.register::<u8>();
        registry.register::<u16>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<u128>();
        registry.register::<usize>();
        registry.register::<i8>();
        registry.register::<i16>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<i128>();
        registry.register::<isize>();
        registry.register::<f32>();
        registry.register::<f64>();
        registry.register::<String>();
        registry
    }

    // The schema must not already be present.
    fn add_indices(&mut self, schema: &'static TypeSchema) {
        let name = schema.name();
        if !self.ambiguous_names.contains(name) {
            if self.name_to_id.contains_key(name) {
                self.name_to_id.remove(name);
                self.ambiguous_names.insert(name);
            } else {
                self.name_to_id.insert(name, schema.id());
            }
        }
        self.path_to_id.insert(schema.path(), schema.id());
    }

    /// Registers type `T` if it has not been registered already, then
    /// recursively registers its schema dependencies (members, elements,
    /// keys, values, pointees).
    pub fn register<T: Schematic>(&mut self) {
        let schema = T::schema();
        if self.schema_table.try_insert(schema.id(), || schema) {
            self.add_indices(schema);
            T::register_dependencies(self);
        }
    }

    /// Returns `true` if the given type is registered.
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.schema_table.contains(&type_id)
    }

    /// Returns the schema registered for the given [`TypeId`].
    pub fn get(&self, type_id: TypeId) -> Option<&'static TypeSchema> {
        self.schema_table.get(&type_id).copied()
    }

    /// Returns the schema registered under the given full path.
    pub fn get_with_path(&self, path: &str) -> Option<&'static TypeSchema> {
        self.path_to_id.get(path).and_then(|id| self.get(*id))
    }

    /// Returns the schema registered under the given short name, unless the
    /// name is ambiguous.
    pub fn get_with_name(&self, name: &str) -> Option<&'static TypeSchema> {
        self.name_to_id.get(name).and_then(|id| self.get(*id))
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.schema_table.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.schema_table.is_empty()
    }
}

// -----------------------------------------------------------------------------
// Global registry

static GLOBAL: OnceLock<RwLock<SchemaRegistry>> = OnceLock::new();

/// Returns the process-wide registry, initializing it on first access with
/// the basic types and (with the `auto_register` feature) every type
/// submitted for automatic registration.
pub fn global() -> &'static RwLock<SchemaRegistry> {
    GLOBAL.get_or_init(|| {
        #[cfg_attr(not(feature = "auto_register"), allow(unused_mut))]
        let mut registry = SchemaRegistry::new();
        crate::cfg_auto_register! {
            for registration in inventory::iter::<AutoRegistration> {
                (registration.0)(&mut registry);
            }
        }
        RwLock::new(registry)
    })
}

/// Registers type `T` (and its dependencies) in the global registry.
pub fn register_global<T: Schematic>() {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register::<T>();
}

/// Resolves a full path against the global registry.
pub(crate) fn lookup_path_global(path: &str) -> Option<&'static TypeSchema> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get_with_path(path)
}

// -----------------------------------------------------------------------------
// Auto-registration

crate::cfg_auto_register! {
    /// A registration function submitted by `#[value(auto_register)]`.
    pub struct AutoRegistration(pub fn(&mut SchemaRegistry));

    inventory::collect!(AutoRegistration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_dependencies_recursively() {
        let mut registry = SchemaRegistry::empty();
        registry.register::<Vec<Option<i32>>>();

        assert!(registry.contains(TypeId::of::<Vec<Option<i32>>>()));
        assert!(registry.contains(TypeId::of::<Option<i32>>()));
        assert!(registry.contains(TypeId::of::<i32>()));
    }

    #[test]
    fn resolves_paths_and_names() {
        let registry = SchemaRegistry::new();
        assert!(registry.get_with_path("alloc::string::String").is_some());
        assert_eq!(registry.get_with_name("u8").unwrap().path(), "u8");
        assert!(registry.get_with_name("no_such_type").is_none());
    }
}
