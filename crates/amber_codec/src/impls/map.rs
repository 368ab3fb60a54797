use core::hash::Hash;
use std::collections::{BTreeMap, HashMap};

use crate::cell::{GenericPathCell, GenericSchemaCell};
use crate::registry::SchemaRegistry;
use crate::schema::{MappingSchema, TypeSchema};
use crate::value::{Mapping, Placeholder, Value, impl_value_cast_fn};
use crate::{Schematic, TypePath};

macro_rules! impl_mapping_common {
    ($ty:ident, $module:literal, [$($extra_key_bound:path),*]) => {
        impl<K, V> TypePath for $ty<K, V>
        where
            K: Value + Schematic $(+ $extra_key_bound)*,
            V: Value + Schematic,
        {
            fn type_path() -> &'static str {
                static CELL: GenericPathCell = GenericPathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    format!(
                        concat!($module, "::", stringify!($ty), "<{}, {}>"),
                        K::type_path(),
                        V::type_path()
                    )
                })
            }

            fn type_name() -> &'static str {
                static CELL: GenericPathCell = GenericPathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    format!(
                        concat!(stringify!($ty), "<{}, {}>"),
                        K::type_name(),
                        V::type_name()
                    )
                })
            }
        }

        impl<K, V> Schematic for $ty<K, V>
        where
            K: Value + Schematic $(+ $extra_key_bound)*,
            V: Value + Schematic,
        {
            fn schema() -> &'static TypeSchema {
                static CELL: GenericSchemaCell = GenericSchemaCell::new();
                CELL.get_or_insert::<Self>(|| {
                    TypeSchema::Mapping(MappingSchema::new::<Self>(<K as Schematic>::schema, <V as Schematic>::schema, || {
                        Box::new(<$ty<K, V>>::new())
                    }))
                })
            }

            fn register_dependencies(registry: &mut SchemaRegistry) {
                registry.register::<K>();
                registry.register::<V>();
            }
        }

        impl<K, V> Value for $ty<K, V>
        where
            K: Value + Schematic $(+ $extra_key_bound)*,
            V: Value + Schematic,
        {
            #[inline]
            fn schema(&self) -> &'static TypeSchema {
                <Self as Schematic>::schema()
            }

            impl_value_cast_fn!(Mapping);
        }

        impl<K, V> Mapping for $ty<K, V>
        where
            K: Value + Schematic $(+ $extra_key_bound)*,
            V: Value + Schematic,
        {
            #[inline]
            fn len(&self) -> usize {
                <$ty<K, V>>::len(self)
            }

            #[inline]
            fn iter(&self) -> Box<dyn Iterator<Item = (&dyn Value, &dyn Value)> + '_> {
                Box::new(<$ty<K, V>>::iter(self).map(|(k, v)| (k as &dyn Value, v as &dyn Value)))
            }

            fn insert_boxed(
                &mut self,
                key: Box<dyn Value>,
                value: Box<dyn Value>,
            ) -> Result<Option<Box<dyn Value>>, (Box<dyn Value>, Box<dyn Value>)> {
                let key = match key.take::<K>() {
                    Ok(key) => key,
                    Err(key) => return Err((key, value)),
                };
                let value = match value.take::<V>() {
                    Ok(value) => value,
                    Err(value) => return Err((Box::new(key), value)),
                };
                Ok(<$ty<K, V>>::insert(self, key, value)
                    .map(|displaced| Box::new(displaced) as Box<dyn Value>))
            }
        }

        impl<K, V> Placeholder for $ty<K, V> {
            #[inline]
            fn placeholder() -> Self {
                <$ty<K, V>>::new()
            }
        }
    };
}

impl_mapping_common!(HashMap, "std::collections", [Eq, Hash]);
impl_mapping_common!(BTreeMap, "alloc::collections", [Ord]);
