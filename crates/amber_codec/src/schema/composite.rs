use crate::TypePath;
use crate::schema::{SchemaType, TypeSchema};
use crate::value::Value;

// -----------------------------------------------------------------------------
// NullableSchema

/// Schema of an optional type (`Option<T>`).
///
/// Nullable values have no node of their own on the wire inside a known
/// position: the absent case is a null token, the present case is the inner
/// value directly.
#[derive(Debug)]
pub struct NullableSchema {
    ty: SchemaType,
    inner: fn() -> &'static TypeSchema,
    make_none: fn() -> Box<dyn Value>,
    wrap: fn(Box<dyn Value>) -> Result<Box<dyn Value>, Box<dyn Value>>,
}

impl NullableSchema {
    /// Creates the schema for nullable type `T` with inner schema `inner`.
    pub fn new<T: TypePath>(
        inner: fn() -> &'static TypeSchema,
        make_none: fn() -> Box<dyn Value>,
        wrap: fn(Box<dyn Value>) -> Result<Box<dyn Value>, Box<dyn Value>>,
    ) -> Self {
        Self {
            ty: SchemaType::of::<T>(),
            inner,
            make_none,
            wrap,
        }
    }

    /// Returns the identity header.
    #[inline]
    pub const fn ty(&self) -> &SchemaType {
        &self.ty
    }

    /// Returns the schema of the inner type.
    #[inline]
    pub fn inner(&self) -> &'static TypeSchema {
        (self.inner)()
    }

    /// Builds the absent value.
    #[inline]
    pub fn make_none(&self) -> Box<dyn Value> {
        (self.make_none)()
    }

    /// Wraps a decoded inner value into the present case.
    ///
    /// Returns the input back if it is not of the inner type.
    #[inline]
    pub fn wrap(&self, inner: Box<dyn Value>) -> Result<Box<dyn Value>, Box<dyn Value>> {
        (self.wrap)(inner)
    }
}

// -----------------------------------------------------------------------------
// ArraySchema

/// Schema of a fixed-length array (`[T; N]`).
#[derive(Debug)]
pub struct ArraySchema {
    ty: SchemaType,
    element: fn() -> &'static TypeSchema,
    len: usize,
    from_items: fn(Vec<Box<dyn Value>>) -> Option<Box<dyn Value>>,
}

impl ArraySchema {
    /// Creates the schema for array type `T` with `len` elements.
    pub fn new<T: TypePath>(
        element: fn() -> &'static TypeSchema,
        len: usize,
        from_items: fn(Vec<Box<dyn Value>>) -> Option<Box<dyn Value>>,
    ) -> Self {
        Self {
            ty: SchemaType::of::<T>(),
            element,
            len,
            from_items,
        }
    }

    /// Returns the identity header.
    #[inline]
    pub const fn ty(&self) -> &SchemaType {
        &self.ty
    }

    /// Returns the schema of the element type.
    #[inline]
    pub fn element(&self) -> &'static TypeSchema {
        (self.element)()
    }

    /// Returns the fixed length.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Builds the array from exactly `len` decoded elements.
    ///
    /// Returns `None` on a length or element-type mismatch.
    #[inline]
    pub fn from_items(&self, items: Vec<Box<dyn Value>>) -> Option<Box<dyn Value>> {
        (self.from_items)(items)
    }
}

// -----------------------------------------------------------------------------
// SequenceSchema

/// Schema of a growable sequence (`Vec<T>`, `VecDeque<T>`).
#[derive(Debug)]
pub struct SequenceSchema {
    ty: SchemaType,
    element: fn() -> &'static TypeSchema,
    new_empty: fn() -> Box<dyn Value>,
}

impl SequenceSchema {
    /// Creates the schema for sequence type `T`.
    pub fn new<T: TypePath>(
        element: fn() -> &'static TypeSchema,
        new_empty: fn() -> Box<dyn Value>,
    ) -> Self {
        Self {
            ty: SchemaType::of::<T>(),
            element,
            new_empty,
        }
    }

    /// Returns the identity header.
    #[inline]
    pub const fn ty(&self) -> &SchemaType {
        &self.ty
    }

    /// Returns the schema of the element type.
    #[inline]
    pub fn element(&self) -> &'static TypeSchema {
        (self.element)()
    }

    /// Builds an empty sequence ready for element pushes.
    #[inline]
    pub fn new_empty(&self) -> Box<dyn Value> {
        (self.new_empty)()
    }
}

// -----------------------------------------------------------------------------
// MappingSchema

/// Schema of a keyed mapping (`HashMap<K, V>`, `BTreeMap<K, V>`).
#[derive(Debug)]
pub struct MappingSchema {
    ty: SchemaType,
    key: fn() -> &'static TypeSchema,
    value: fn() -> &'static TypeSchema,
    new_empty: fn() -> Box<dyn Value>,
}

impl MappingSchema {
    /// Creates the schema for mapping type `T`.
    pub fn new<T: TypePath>(
        key: fn() -> &'static TypeSchema,
        value: fn() -> &'static TypeSchema,
        new_empty: fn() -> Box<dyn Value>,
    ) -> Self {
        Self {
            ty: SchemaType::of::<T>(),
            key,
            value,
            new_empty,
        }
    }

    /// Returns the identity header.
    #[inline]
    pub const fn ty(&self) -> &SchemaType {
        &self.ty
    }

    /// Returns the schema of the key type.
    #[inline]
    pub fn key(&self) -> &'static TypeSchema {
        (self.key)()
    }

    /// Returns the schema of the value type.
    #[inline]
    pub fn value(&self) -> &'static TypeSchema {
        (self.value)()
    }

    /// Builds an empty mapping ready for entry inserts.
    #[inline]
    pub fn new_empty(&self) -> Box<dyn Value> {
        (self.new_empty)()
    }
}

// -----------------------------------------------------------------------------
// EnumSchema

/// One variant of a fieldless enum: its name and underlying value.
#[derive(Debug, Clone, Copy)]
pub struct VariantDescriptor {
    name: &'static str,
    underlying: i64,
}

impl VariantDescriptor {
    /// Creates a descriptor.
    #[inline]
    pub const fn new(name: &'static str, underlying: i64) -> Self {
        Self { name, underlying }
    }

    /// Returns the variant name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the underlying value.
    #[inline]
    pub const fn underlying(&self) -> i64 {
        self.underlying
    }
}

/// Schema of a fieldless enum.
///
/// Enums travel as their underlying value; the variant list exists for
/// diagnostics and for adapters that want readable output.
#[derive(Debug)]
pub struct EnumSchema {
    ty: SchemaType,
    variants: Vec<VariantDescriptor>,
    from_underlying: fn(i64) -> Option<Box<dyn Value>>,
}

impl EnumSchema {
    /// Creates the schema for enum type `T`.
    pub fn new<T: TypePath>(
        variants: Vec<VariantDescriptor>,
        from_underlying: fn(i64) -> Option<Box<dyn Value>>,
    ) -> Self {
        Self {
            ty: SchemaType::of::<T>(),
            variants,
            from_underlying,
        }
    }

    /// Returns the identity header.
    #[inline]
    pub const fn ty(&self) -> &SchemaType {
        &self.ty
    }

    /// Returns the variant descriptors in declaration order.
    #[inline]
    pub fn variants(&self) -> &[VariantDescriptor] {
        &self.variants
    }

    /// Rebuilds the variant carrying the given underlying value.
    #[inline]
    pub fn from_underlying(&self, underlying: i64) -> Option<Box<dyn Value>> {
        (self.from_underlying)(underlying)
    }
}

// -----------------------------------------------------------------------------
// SharedSchema

/// Schema of an aliasable shared wrapper (`Rc<T>`, `Arc<T>`,
/// `Rc<RefCell<T>>`).
///
/// `allocate` is the placeholder-allocation capability: it exists only for
/// wrappers whose pointee can be populated after allocation (the `RefCell`
/// form). Wrappers without it decode construct-after via `wrap` and
/// therefore cannot sit on a cycle that back-references them from inside
/// their own subtree.
#[derive(Debug)]
pub struct SharedSchema {
    ty: SchemaType,
    pointee: fn() -> &'static TypeSchema,
    allocate: Option<fn() -> Box<dyn Value>>,
    wrap: fn(Box<dyn Value>) -> Result<Box<dyn Value>, Box<dyn Value>>,
}

impl SharedSchema {
    /// Creates the schema for shared wrapper type `T`.
    pub fn new<T: TypePath>(
        pointee: fn() -> &'static TypeSchema,
        wrap: fn(Box<dyn Value>) -> Result<Box<dyn Value>, Box<dyn Value>>,
    ) -> Self {
        Self {
            ty: SchemaType::of::<T>(),
            pointee,
            allocate: None,
            wrap,
        }
    }

    /// Adds the placeholder-allocation capability.
    pub fn with_allocate(mut self, allocate: fn() -> Box<dyn Value>) -> Self {
        self.allocate = Some(allocate);
        self
    }

    /// Returns the identity header.
    #[inline]
    pub const fn ty(&self) -> &SchemaType {
        &self.ty
    }

    /// Returns the schema of the pointee type.
    #[inline]
    pub fn pointee(&self) -> &'static TypeSchema {
        (self.pointee)()
    }

    /// Returns the placeholder allocator, if the wrapper supports
    /// populate-after-allocation.
    #[inline]
    pub fn allocate(&self) -> Option<fn() -> Box<dyn Value>> {
        self.allocate
    }

    /// Wraps a fully decoded pointee.
    ///
    /// Returns the input back if it is not of the pointee type.
    #[inline]
    pub fn wrap(&self, pointee: Box<dyn Value>) -> Result<Box<dyn Value>, Box<dyn Value>> {
        (self.wrap)(pointee)
    }
}
