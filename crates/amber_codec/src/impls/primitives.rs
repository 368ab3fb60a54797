use crate::cell::SchemaCell;
use crate::schema::{PrimKind, PrimitiveSchema, PrimitiveValue, TypeSchema};
use crate::value::{Placeholder, Value, ValueMut, ValueRef};
use crate::{Schematic, TypePath};

macro_rules! impl_primitive {
    ($ty:ty, $kind:ident, $zero:expr) => {
        impl TypePath for $ty {
            #[inline]
            fn type_path() -> &'static str {
                stringify!($ty)
            }

            #[inline]
            fn type_name() -> &'static str {
                stringify!($ty)
            }
        }

        impl Schematic for $ty {
            fn schema() -> &'static TypeSchema {
                static CELL: SchemaCell = SchemaCell::new();
                CELL.get_or_init(|| {
                    TypeSchema::Primitive(PrimitiveSchema::new::<$ty>(
                        PrimKind::$kind,
                        |value| match value {
                            PrimitiveValue::$kind(v) => Some(Box::new(v)),
                            _ => None,
                        },
                    ))
                })
            }
        }

        impl Value for $ty {
            #[inline]
            fn schema(&self) -> &'static TypeSchema {
                <Self as Schematic>::schema()
            }

            fn set(&mut self, value: Box<dyn Value>) -> Result<(), Box<dyn Value>> {
                *self = value.take::<Self>()?;
                Ok(())
            }

            #[inline]
            fn value_ref(&self) -> ValueRef<'_> {
                ValueRef::Primitive(PrimitiveValue::$kind(*self))
            }

            #[inline]
            fn value_mut(&mut self) -> ValueMut<'_> {
                ValueMut::Primitive(self)
            }
        }

        impl Placeholder for $ty {
            #[inline]
            fn placeholder() -> Self {
                $zero
            }
        }
    };
}

impl_primitive!(bool, Bool, false);
impl_primitive!(char, Char, '\0');
impl_primitive!(u8, U8, 0);
impl_primitive!(u16, U16, 0);
impl_primitive!(u32, U32, 0);
impl_primitive!(u64, U64, 0);
impl_primitive!(u128, U128, 0);
impl_primitive!(usize, Usize, 0);
impl_primitive!(i8, I8, 0);
impl_primitive!(i16, I16, 0);
impl_primitive!(i32, I32, 0);
impl_primitive!(i64, I64, 0);
impl_primitive!(i128, I128, 0);
impl_primitive!(isize, Isize, 0);
impl_primitive!(f32, F32, 0.0);
impl_primitive!(f64, F64, 0.0);
