//! Containers for static storage of schema data.
//!
//! Schemas are built lazily, at most once per type for the lifetime of the
//! process. Non-generic types store theirs in a [`SchemaCell`] (an
//! [`OnceLock`], almost no additional expense). For generic types the
//! `static CELL` inside the function is shared by every instantiation, so
//! [`GenericSchemaCell`] and [`GenericPathCell`] key their storage by
//! [`TypeId`] behind an [`RwLock`], leaking each entry to get the `'static`
//! lifetime.

use core::any::TypeId;
use core::fmt::Debug;
use core::hash::{BuildHasher, Hasher};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::schema::TypeSchema;

// -----------------------------------------------------------------------------
// TypeIdMap

/// A hasher for pre-hashed keys such as [`TypeId`].
///
/// [`TypeId`] is already a high-quality hash, so rehashing it buys nothing.
#[derive(Default)]
pub struct NoOpHash(u64);

impl Hasher for NoOpHash {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        // TypeId hashes itself with `write_u64`; anything else means the map
        // is being used with a key it was not designed for.
        debug_assert!(false, "NoOpHash received raw bytes: {bytes:?}");
        for &byte in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(byte);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    #[inline]
    fn write_u128(&mut self, i: u128) {
        self.0 = i as u64;
    }
}

/// [`BuildHasher`] state for [`NoOpHash`].
#[derive(Clone, Copy, Default)]
pub struct NoOpHashState;

impl BuildHasher for NoOpHashState {
    type Hasher = NoOpHash;

    #[inline]
    fn build_hasher(&self) -> NoOpHash {
        NoOpHash::default()
    }
}

/// A specialized map container with [`TypeId`] as the fixed key type.
///
/// The interface is fully abstracted, exposing no [`HashMap`] specific APIs,
/// so the underlying implementation can change without breaking callers.
pub struct TypeIdMap<V>(HashMap<TypeId, V, NoOpHashState>);

impl<V> TypeIdMap<V> {
    /// Creates an empty `TypeIdMap`.
    #[inline]
    pub fn new() -> Self {
        Self(HashMap::with_hasher(NoOpHashState))
    }

    /// Attempts to insert a key-value pair into the map.
    ///
    /// - Returns `true` if the key was not present and the pair was inserted.
    /// - Returns `false` if the key already exists, leaving the map unchanged.
    ///
    /// The closure `f` is only called if the key is not present.
    #[inline]
    pub fn try_insert(&mut self, type_id: TypeId, f: impl FnOnce() -> V) -> bool {
        match self.0.entry(type_id) {
            Entry::Vacant(entry) => {
                entry.insert(f());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Gets a mutable reference to the value associated with the given key,
    /// inserting the result of `f` if the key is not present.
    #[inline]
    pub fn get_or_insert(&mut self, type_id: TypeId, f: impl FnOnce() -> V) -> &mut V {
        match self.0.entry(type_id) {
            Entry::Vacant(entry) => entry.insert(f()),
            Entry::Occupied(entry) => entry.into_mut(),
        }
    }

    /// Returns a reference to the value corresponding to the type.
    pub fn get(&self, type_id: &TypeId) -> Option<&V> {
        self.0.get(type_id)
    }

    /// Returns a reference to the value corresponding to the type.
    #[inline(always)]
    pub fn get_type<T: ?Sized + 'static>(&self) -> Option<&V> {
        self.get(&TypeId::of::<T>())
    }

    /// Inserts a key-value pair into the map.
    pub fn insert(&mut self, type_id: TypeId, v: V) -> Option<V> {
        self.0.insert(type_id, v)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.0.contains_key(type_id)
    }

    /// Clears the map, removing all key-value pairs.
    ///
    /// Keeps the allocated memory for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Returns the number of elements in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for TypeIdMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Debug> Debug for TypeIdMap<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

// -----------------------------------------------------------------------------
// Schema cells

/// Static storage for the schema of a non-generic type.
///
/// ```ignore
/// impl Schematic for Foo {
///     fn schema() -> &'static TypeSchema {
///         static CELL: SchemaCell = SchemaCell::new();
///         CELL.get_or_init(|| TypeSchema::Object(/* ... */))
///     }
/// }
/// ```
pub struct SchemaCell(OnceLock<TypeSchema>);

impl SchemaCell {
    /// Creates an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the stored schema, building it with `f` on first access.
    #[inline]
    pub fn get_or_init<F>(&self, f: F) -> &TypeSchema
    where
        F: FnOnce() -> TypeSchema,
    {
        self.0.get_or_init(f)
    }
}

impl Default for SchemaCell {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Static storage for the schemas of a generic type's instantiations.
///
/// The `static CELL` in a generic function is shared by every instantiation,
/// so entries are keyed by [`TypeId`] and leaked once on first build. Racing
/// first builds resolve with a first-writer-wins entry; losers read.
pub struct GenericSchemaCell(RwLock<TypeIdMap<&'static TypeSchema>>);

impl GenericSchemaCell {
    /// Creates an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(RwLock::new(TypeIdMap(HashMap::with_hasher(NoOpHashState))))
    }

    /// Returns the schema stored for `G`, building it with `f` on first access.
    #[inline(always)]
    pub fn get_or_insert<G: ?Sized + 'static>(
        &self,
        f: impl FnOnce() -> TypeSchema,
    ) -> &'static TypeSchema {
        let type_id = TypeId::of::<G>();
        if let Some(schema) = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return schema;
        }
        let schema = f();
        *self
            .0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(type_id, || Box::leak(Box::new(schema)))
    }
}

impl Default for GenericSchemaCell {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Static storage for the composed type paths of a generic type.
///
/// Non-generic types do not need this; their paths are string literals.
pub struct GenericPathCell(RwLock<TypeIdMap<&'static str>>);

impl GenericPathCell {
    /// Creates an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(RwLock::new(TypeIdMap(HashMap::with_hasher(NoOpHashState))))
    }

    /// Returns the path stored for `G`, composing it with `f` on first access.
    #[inline(always)]
    pub fn get_or_insert<G: ?Sized + 'static>(&self, f: impl FnOnce() -> String) -> &'static str {
        let type_id = TypeId::of::<G>();
        if let Some(path) = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
        {
            return path;
        }
        let path = f();
        *self
            .0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(type_id, || Box::leak(path.into_boxed_str()))
    }
}

impl Default for GenericPathCell {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_id_map_try_insert_keeps_first() {
        let mut map = TypeIdMap::new();
        assert!(map.try_insert(TypeId::of::<u8>(), || 1));
        assert!(!map.try_insert(TypeId::of::<u8>(), || 2));
        assert_eq!(map.get_type::<u8>(), Some(&1));
    }

    #[test]
    fn generic_path_cell_builds_once() {
        static CELL: GenericPathCell = GenericPathCell::new();
        let first = CELL.get_or_insert::<Vec<u8>>(|| String::from("Vec<u8>"));
        let second = CELL.get_or_insert::<Vec<u8>>(|| unreachable!());
        assert!(core::ptr::eq(first, second));
    }
}
