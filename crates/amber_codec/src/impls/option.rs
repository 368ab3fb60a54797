use crate::cell::{GenericPathCell, GenericSchemaCell};
use crate::registry::SchemaRegistry;
use crate::schema::{NullableSchema, TypeSchema};
use crate::value::{Nullable, Placeholder, Value, impl_value_cast_fn};
use crate::{Schematic, TypePath};

impl<T: Value + Schematic> TypePath for Option<T> {
    fn type_path() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| format!("core::option::Option<{}>", T::type_path()))
    }

    fn type_name() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| format!("Option<{}>", T::type_name()))
    }
}

impl<T: Value + Schematic> Schematic for Option<T> {
    fn schema() -> &'static TypeSchema {
        static CELL: GenericSchemaCell = GenericSchemaCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeSchema::Nullable(NullableSchema::new::<Self>(
                <T as Schematic>::schema,
                || Box::new(None::<T>),
                |inner| {
                    inner
                        .take::<T>()
                        .map(|value| Box::new(Some(value)) as Box<dyn Value>)
                },
            ))
        })
    }

    fn register_dependencies(registry: &mut SchemaRegistry) {
        registry.register::<T>();
    }
}

impl<T: Value + Schematic> Value for Option<T> {
    #[inline]
    fn schema(&self) -> &'static TypeSchema {
        <Self as Schematic>::schema()
    }

    impl_value_cast_fn!(Nullable);
}

impl<T: Value + Schematic> Nullable for Option<T> {
    #[inline]
    fn get(&self) -> Option<&dyn Value> {
        self.as_ref().map(|inner| inner as &dyn Value)
    }

    #[inline]
    fn get_mut(&mut self) -> Option<&mut dyn Value> {
        self.as_mut().map(|inner| inner as &mut dyn Value)
    }

    #[inline]
    fn set_none(&mut self) {
        *self = None;
    }

    fn set_some(&mut self, inner: Box<dyn Value>) -> Result<(), Box<dyn Value>> {
        *self = Some(inner.take::<T>()?);
        Ok(())
    }
}

impl<T> Placeholder for Option<T> {
    #[inline]
    fn placeholder() -> Self {
        None
    }
}
