use core::fmt;

use crate::schema::SchemaType;
use crate::value::Value;

// -----------------------------------------------------------------------------
// PrimKind

/// The closed set of primitive value kinds the wire formats understand.
///
/// `usize`/`isize` are distinct kinds so decoded values come back with their
/// declared Rust type; adapters transport them as 64-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimKind {
    Bool,
    Char,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    F32,
    F64,
}

impl PrimKind {
    /// Returns the lowercase name adapters use for tagging, e.g. `"i32"`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::Usize => "usize",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
            Self::Isize => "isize",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl fmt::Display for PrimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// -----------------------------------------------------------------------------
// PrimitiveValue

/// A primitive value in transit between a [`Value`] and a wire format.
///
/// Each variant preserves the exact width and signedness of the source, so
/// boundary values (`i64::MIN`, `u128::MAX`, …) round-trip bit-exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveValue {
    Bool(bool),
    Char(char),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    Usize(usize),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    Isize(isize),
    F32(f32),
    F64(f64),
}

impl PrimitiveValue {
    /// Returns the kind of this value.
    pub const fn kind(&self) -> PrimKind {
        match self {
            Self::Bool(_) => PrimKind::Bool,
            Self::Char(_) => PrimKind::Char,
            Self::U8(_) => PrimKind::U8,
            Self::U16(_) => PrimKind::U16,
            Self::U32(_) => PrimKind::U32,
            Self::U64(_) => PrimKind::U64,
            Self::U128(_) => PrimKind::U128,
            Self::Usize(_) => PrimKind::Usize,
            Self::I8(_) => PrimKind::I8,
            Self::I16(_) => PrimKind::I16,
            Self::I32(_) => PrimKind::I32,
            Self::I64(_) => PrimKind::I64,
            Self::I128(_) => PrimKind::I128,
            Self::Isize(_) => PrimKind::Isize,
            Self::F32(_) => PrimKind::F32,
            Self::F64(_) => PrimKind::F64,
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => fmt::Display::fmt(v, f),
            Self::Char(v) => fmt::Display::fmt(v, f),
            Self::U8(v) => fmt::Display::fmt(v, f),
            Self::U16(v) => fmt::Display::fmt(v, f),
            Self::U32(v) => fmt::Display::fmt(v, f),
            Self::U64(v) => fmt::Display::fmt(v, f),
            Self::U128(v) => fmt::Display::fmt(v, f),
            Self::Usize(v) => fmt::Display::fmt(v, f),
            Self::I8(v) => fmt::Display::fmt(v, f),
            Self::I16(v) => fmt::Display::fmt(v, f),
            Self::I32(v) => fmt::Display::fmt(v, f),
            Self::I64(v) => fmt::Display::fmt(v, f),
            Self::I128(v) => fmt::Display::fmt(v, f),
            Self::Isize(v) => fmt::Display::fmt(v, f),
            Self::F32(v) => fmt::Display::fmt(v, f),
            Self::F64(v) => fmt::Display::fmt(v, f),
        }
    }
}

// -----------------------------------------------------------------------------
// PrimitiveSchema

/// Schema of a primitive type.
#[derive(Debug)]
pub struct PrimitiveSchema {
    ty: SchemaType,
    prim: PrimKind,
    from_value: fn(PrimitiveValue) -> Option<Box<dyn Value>>,
}

impl PrimitiveSchema {
    /// Creates the schema for primitive type `T` of kind `prim`.
    ///
    /// `from_value` rebuilds a boxed instance from the matching
    /// [`PrimitiveValue`] variant and rejects every other variant.
    pub fn new<T: crate::TypePath>(
        prim: PrimKind,
        from_value: fn(PrimitiveValue) -> Option<Box<dyn Value>>,
    ) -> Self {
        Self {
            ty: SchemaType::of::<T>(),
            prim,
            from_value,
        }
    }

    /// Returns the identity header.
    #[inline]
    pub const fn ty(&self) -> &SchemaType {
        &self.ty
    }

    /// Returns the primitive kind.
    #[inline]
    pub const fn prim(&self) -> PrimKind {
        self.prim
    }

    /// Rebuilds a boxed instance from a wire value of the matching kind.
    #[inline]
    pub fn from_value(&self, value: PrimitiveValue) -> Option<Box<dyn Value>> {
        (self.from_value)(value)
    }
}

// -----------------------------------------------------------------------------
// StrSchema

/// Schema of the string type.
#[derive(Debug)]
pub struct StrSchema {
    ty: SchemaType,
    from_string: fn(String) -> Box<dyn Value>,
}

impl StrSchema {
    /// Creates the schema for string type `T`.
    pub fn new<T: crate::TypePath>(from_string: fn(String) -> Box<dyn Value>) -> Self {
        Self {
            ty: SchemaType::of::<T>(),
            from_string,
        }
    }

    /// Returns the identity header.
    #[inline]
    pub const fn ty(&self) -> &SchemaType {
        &self.ty
    }

    /// Rebuilds a boxed instance from decoded text.
    #[inline]
    pub fn from_string(&self, value: String) -> Box<dyn Value> {
        (self.from_string)(value)
    }
}
