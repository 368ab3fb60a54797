use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::cell::{GenericPathCell, GenericSchemaCell};
use crate::registry::SchemaRegistry;
use crate::schema::{SharedSchema, TypeSchema};
use crate::value::{Placeholder, Shared, Value, impl_value_cast_fn};
use crate::{Error, Schematic, TypePath};

// -----------------------------------------------------------------------------
// Arc<T>

// The construct-after shared wrapper: its pointee is decoded in full before
// the wrapper exists, so it deduplicates aliases but cannot close a cycle.

impl<T: Value + Schematic> TypePath for Arc<T> {
    fn type_path() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| format!("alloc::sync::Arc<{}>", T::type_path()))
    }

    fn type_name() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| format!("Arc<{}>", T::type_name()))
    }
}

impl<T: Value + Schematic> Schematic for Arc<T> {
    fn schema() -> &'static TypeSchema {
        static CELL: GenericSchemaCell = GenericSchemaCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeSchema::Shared(SharedSchema::new::<Self>(<T as Schematic>::schema, |pointee| {
                pointee
                    .take::<T>()
                    .map(|value| Box::new(Arc::new(value)) as Box<dyn Value>)
            }))
        })
    }

    fn register_dependencies(registry: &mut SchemaRegistry) {
        registry.register::<T>();
    }
}

impl<T: Value + Schematic> Value for Arc<T> {
    #[inline]
    fn schema(&self) -> &'static TypeSchema {
        <Self as Schematic>::schema()
    }

    impl_value_cast_fn!(Shared);
}

impl<T: Value + Schematic> Shared for Arc<T> {
    #[inline]
    fn identity(&self) -> usize {
        Arc::as_ptr(self) as *const () as usize
    }

    #[inline]
    fn clone_shared(&self) -> Box<dyn Value> {
        Box::new(Arc::clone(self))
    }

    fn visit(&self, f: &mut dyn FnMut(&dyn Value) -> Result<(), Error>) -> Result<(), Error> {
        f(&**self)
    }

    fn visit_mut(
        &self,
        _f: &mut dyn FnMut(&mut dyn Value) -> Result<(), Error>,
    ) -> Result<(), Error> {
        Err(Error::format(format!(
            "`{}` has no interior mutability and cannot be patched in place",
            Self::type_path()
        )))
    }
}

// -----------------------------------------------------------------------------
// Rc<RefCell<T>>

// The cycle-capable shared wrapper: a placeholder pointee is allocated and
// registered first, then patched through the cell, so back-references into
// the wrapper's own subtree resolve.

impl<T: Value + Schematic + Placeholder> TypePath for Rc<RefCell<T>> {
    fn type_path() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| {
            format!("alloc::rc::Rc<core::cell::RefCell<{}>>", T::type_path())
        })
    }

    fn type_name() -> &'static str {
        static CELL: GenericPathCell = GenericPathCell::new();
        CELL.get_or_insert::<Self>(|| format!("Rc<RefCell<{}>>", T::type_name()))
    }
}

impl<T: Value + Schematic + Placeholder> Schematic for Rc<RefCell<T>> {
    fn schema() -> &'static TypeSchema {
        static CELL: GenericSchemaCell = GenericSchemaCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeSchema::Shared(
                SharedSchema::new::<Self>(<T as Schematic>::schema, |pointee| {
                    pointee
                        .take::<T>()
                        .map(|value| Box::new(Rc::new(RefCell::new(value))) as Box<dyn Value>)
                })
                .with_allocate(|| Box::new(Rc::new(RefCell::new(T::placeholder())))),
            )
        })
    }

    fn register_dependencies(registry: &mut SchemaRegistry) {
        registry.register::<T>();
    }
}

impl<T: Value + Schematic + Placeholder> Value for Rc<RefCell<T>> {
    #[inline]
    fn schema(&self) -> &'static TypeSchema {
        <Self as Schematic>::schema()
    }

    impl_value_cast_fn!(Shared);
}

impl<T: Value + Schematic + Placeholder> Shared for Rc<RefCell<T>> {
    #[inline]
    fn identity(&self) -> usize {
        Rc::as_ptr(self) as *const () as usize
    }

    #[inline]
    fn clone_shared(&self) -> Box<dyn Value> {
        Box::new(Rc::clone(self))
    }

    fn visit(&self, f: &mut dyn FnMut(&dyn Value) -> Result<(), Error>) -> Result<(), Error> {
        let borrow = self.try_borrow().map_err(|_| Error::SharedBorrow {
            type_path: Self::type_path().into(),
        })?;
        f(&*borrow)
    }

    fn visit_mut(
        &self,
        f: &mut dyn FnMut(&mut dyn Value) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let mut borrow = self.try_borrow_mut().map_err(|_| Error::SharedBorrow {
            type_path: Self::type_path().into(),
        })?;
        f(&mut *borrow)
    }
}
