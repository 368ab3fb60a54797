use crate::cell::{GenericPathCell, GenericSchemaCell};
use crate::registry::SchemaRegistry;
use crate::schema::{ArraySchema, TypeSchema};
use crate::value::{Array, Placeholder, Value, impl_value_cast_fn};
use crate::{Schematic, TypePath};

impl<T: Value + Schematic, const N: usize> TypePath for [T; N] {
    fn type_path() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| format!("[{}; {}]", T::type_path(), N))
    }

    fn type_name() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| format!("[{}; {}]", T::type_name(), N))
    }
}

impl<T: Value + Schematic, const N: usize> Schematic for [T; N] {
    fn schema() -> &'static TypeSchema {
        static CELL: GenericSchemaCell = GenericSchemaCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeSchema::Array(ArraySchema::new::<Self>(<T as Schematic>::schema, N, |items| {
                if items.len() != N {
                    return None;
                }
                let mut typed = Vec::with_capacity(N);
                for item in items {
                    typed.push(item.take::<T>().ok()?);
                }
                let array: [T; N] = typed.try_into().ok()?;
                Some(Box::new(array))
            }))
        })
    }

    fn register_dependencies(registry: &mut SchemaRegistry) {
        registry.register::<T>();
    }
}

impl<T: Value + Schematic, const N: usize> Value for [T; N] {
    #[inline]
    fn schema(&self) -> &'static TypeSchema {
        <Self as Schematic>::schema()
    }

    impl_value_cast_fn!(Array);
}

impl<T: Value + Schematic, const N: usize> Array for [T; N] {
    #[inline]
    fn len(&self) -> usize {
        N
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&dyn Value> {
        self.as_slice().get(index).map(|element| element as _)
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Value> {
        self.as_mut_slice().get_mut(index).map(|element| element as _)
    }
}

impl<T: Placeholder, const N: usize> Placeholder for [T; N] {
    #[inline]
    fn placeholder() -> Self {
        core::array::from_fn(|_| T::placeholder())
    }
}
