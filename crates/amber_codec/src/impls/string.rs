use crate::cell::SchemaCell;
use crate::schema::{StrSchema, TypeSchema};
use crate::value::{Placeholder, Value, ValueMut, ValueRef};
use crate::{Schematic, TypePath};

impl TypePath for String {
    #[inline]
    fn type_path() -> &'static str {
        "alloc::string::String"
    }

    #[inline]
    fn type_name() -> &'static str {
        "String"
    }
}

impl Schematic for String {
    fn schema() -> &'static TypeSchema {
        static CELL: SchemaCell = SchemaCell::new();
        CELL.get_or_init(|| TypeSchema::Str(StrSchema::new::<String>(|text| Box::new(text))))
    }
}

impl Value for String {
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
        ValueRef::Str(self)
    }

    #[inline]
    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Str(self)
    }
}

impl Placeholder for String {
    #[inline]
    fn placeholder() -> Self {
        String::new()
    }
}
