use std::collections::VecDeque;

use crate::cell::{GenericPathCell, GenericSchemaCell};
use crate::registry::SchemaRegistry;
use crate::schema::{SequenceSchema, TypeSchema};
use crate::value::{Placeholder, Sequence, Value, impl_value_cast_fn};
use crate::{Schematic, TypePath};

macro_rules! impl_sequence_common {
    ($ty:ident, $module:literal) => {
        impl<T: Value + Schematic> TypePath for $ty<T> {
            fn type_path() -> &'static str {
                static CELL: GenericPathCell = GenericPathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    format!(
                        concat!($module, "::", stringify!($ty), "<{}>"),
                        T::type_path()
                    )
                })
            }

            fn type_name() -> &'static str {
                static CELL: GenericPathCell = GenericPathCell::new();
                CELL.get_or_insert::<Self>(|| {
                    format!(concat!(stringify!($ty), "<{}>"), T::type_name())
                })
            }
        }

        impl<T: Value + Schematic> Schematic for $ty<T> {
            fn schema() -> &'static TypeSchema {
                static CELL: GenericSchemaCell = GenericSchemaCell::new();
                CELL.get_or_insert::<Self>(|| {
                    TypeSchema::Sequence(SequenceSchema::new::<Self>(<T as Schematic>::schema, || {
                        Box::new(<$ty<T>>::new())
                    }))
                })
            }

            fn register_dependencies(registry: &mut SchemaRegistry) {
                registry.register::<T>();
            }
        }

        impl<T: Value + Schematic> Value for $ty<T> {
            #[inline]
            fn schema(&self) -> &'static TypeSchema {
                <Self as Schematic>::schema()
            }

            impl_value_cast_fn!(Sequence);
        }

        impl<T> Placeholder for $ty<T> {
            #[inline]
            fn placeholder() -> Self {
                <$ty<T>>::new()
            }
        }
    };
}

impl_sequence_common!(Vec, "alloc::vec");
impl_sequence_common!(VecDeque, "alloc::collections");

impl<T: Value + Schematic> Sequence for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&dyn Value> {
        self.as_slice().get(index).map(|element| element as _)
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Value> {
        self.as_mut_slice().get_mut(index).map(|element| element as _)
    }

    fn push(&mut self, element: Box<dyn Value>) -> Result<(), Box<dyn Value>> {
        Vec::push(self, element.take::<T>()?);
        Ok(())
    }
}

impl<T: Value + Schematic> Sequence for VecDeque<T> {
    #[inline]
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> Option<&dyn Value> {
        VecDeque::get(self, index).map(|element| element as _)
    }

    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Value> {
        VecDeque::get_mut(self, index).map(|element| element as _)
    }

    fn push(&mut self, element: Box<dyn Value>) -> Result<(), Box<dyn Value>> {
        VecDeque::push_back(self, element.take::<T>()?);
        Ok(())
    }
}
