//! The structural schema model.
//!
//! A [`TypeSchema`] describes one concrete type: its structural kind, its
//! members (for objects), and the capabilities the decoder needs to bring
//! instances of it back to life. Schemas are built lazily and cached
//! process-wide, at most once per type (see [`crate::cell`]).

use core::any::TypeId;
use core::{error, fmt};

mod composite;
mod object;
mod primitive;

pub use composite::{
    ArraySchema, EnumSchema, MappingSchema, NullableSchema, SequenceSchema, SharedSchema,
    VariantDescriptor,
};
pub use object::{CtorArgs, CtorInfo, CtorParam, MemberDescriptor, ObjectSchema};
pub use primitive::{PrimKind, PrimitiveSchema, PrimitiveValue, StrSchema};

use crate::TypePath;
use crate::registry::SchemaRegistry;

// -----------------------------------------------------------------------------
// SchemaKind

/// An enumeration of the structural kinds a type can have.
///
/// The set is closed: the engine dispatches exhaustively over it, and new
/// kinds are a deliberate extension point rather than open-ended dynamic
/// typing. `Shared` is the kind of aliasable wrappers (`Rc`, `Arc`,
/// `Rc<RefCell<_>>`), the only place reference identity exists in Rust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Primitive,
    Str,
    Enum,
    Nullable,
    Array,
    Sequence,
    Mapping,
    Object,
    Shared,
}

impl SchemaKind {
    /// Whether values of this kind are composite ("reference kinds" in the
    /// container rules). Containers intercept value kinds only when they opt
    /// in via [`Container::applies_to_values`].
    ///
    /// [`Container::applies_to_values`]: crate::plugin::Container::applies_to_values
    #[inline]
    pub const fn is_composite(self) -> bool {
        matches!(
            self,
            Self::Array | Self::Sequence | Self::Mapping | Self::Object | Self::Shared
        )
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive => f.pad("Primitive"),
            Self::Str => f.pad("Str"),
            Self::Enum => f.pad("Enum"),
            Self::Nullable => f.pad("Nullable"),
            Self::Array => f.pad("Array"),
            Self::Sequence => f.pad("Sequence"),
            Self::Mapping => f.pad("Mapping"),
            Self::Object => f.pad("Object"),
            Self::Shared => f.pad("Shared"),
        }
    }
}

/// Error returned when a [`TypeSchema`] is not of the expected [`SchemaKind`].
#[derive(Debug)]
pub struct SchemaKindError {
    pub expected: SchemaKind,
    pub received: SchemaKind,
}

impl fmt::Display for SchemaKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "schema kind mismatch: expected {}, received {}",
            self.expected, self.received
        )
    }
}

impl error::Error for SchemaKindError {}

// -----------------------------------------------------------------------------
// SchemaType

/// The identity header every schema variant embeds: the [`TypeId`] plus the
/// stable full path and short name.
#[derive(Debug, Clone, Copy)]
pub struct SchemaType {
    id: TypeId,
    path: &'static str,
    name: &'static str,
}

impl SchemaType {
    /// Builds the header for `T`.
    #[inline]
    pub fn of<T: TypePath + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            path: T::type_path(),
            name: T::type_name(),
        }
    }

    /// Returns the [`TypeId`].
    #[inline]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the full type path.
    #[inline]
    pub const fn path(&self) -> &'static str {
        self.path
    }

    /// Returns the short type name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

// -----------------------------------------------------------------------------
// TypeSchema

/// The structural schema of one concrete type.
///
/// Built once per type (derive macro or std-type impl), cached for the
/// process lifetime, and immutable after the first build. The decoder-facing
/// construction capabilities (allocators, element/entry builders, declared
/// constructors) live inside the kind-specific variants as plain function
/// pointers, so a `&'static TypeSchema` is all the engine ever needs.
#[derive(Debug)]
pub enum TypeSchema {
    Primitive(PrimitiveSchema),
    Str(StrSchema),
    Enum(EnumSchema),
    Nullable(NullableSchema),
    Array(ArraySchema),
    Sequence(SequenceSchema),
    Mapping(MappingSchema),
    Object(ObjectSchema),
    Shared(SharedSchema),
}

// Helper macro that implements type-safe accessor methods like `as_object`.
macro_rules! impl_cast_method {
    ($name:ident : $kind:ident => $schema:ident) => {
        /// Narrows to the kind-specific schema, or reports the mismatch.
        pub const fn $name(&self) -> Result<&$schema, SchemaKindError> {
            match self {
                Self::$kind(schema) => Ok(schema),
                _ => Err(SchemaKindError {
                    expected: SchemaKind::$kind,
                    received: self.kind(),
                }),
            }
        }
    };
}

impl TypeSchema {
    impl_cast_method!(as_primitive: Primitive => PrimitiveSchema);
    impl_cast_method!(as_str: Str => StrSchema);
    impl_cast_method!(as_enum: Enum => EnumSchema);
    impl_cast_method!(as_nullable: Nullable => NullableSchema);
    impl_cast_method!(as_array: Array => ArraySchema);
    impl_cast_method!(as_sequence: Sequence => SequenceSchema);
    impl_cast_method!(as_mapping: Mapping => MappingSchema);
    impl_cast_method!(as_object: Object => ObjectSchema);
    impl_cast_method!(as_shared: Shared => SharedSchema);

    /// Returns the structural kind.
    pub const fn kind(&self) -> SchemaKind {
        match self {
            Self::Primitive(_) => SchemaKind::Primitive,
            Self::Str(_) => SchemaKind::Str,
            Self::Enum(_) => SchemaKind::Enum,
            Self::Nullable(_) => SchemaKind::Nullable,
            Self::Array(_) => SchemaKind::Array,
            Self::Sequence(_) => SchemaKind::Sequence,
            Self::Mapping(_) => SchemaKind::Mapping,
            Self::Object(_) => SchemaKind::Object,
            Self::Shared(_) => SchemaKind::Shared,
        }
    }

    /// Returns the identity header.
    pub const fn ty(&self) -> &SchemaType {
        match self {
            Self::Primitive(schema) => schema.ty(),
            Self::Str(schema) => schema.ty(),
            Self::Enum(schema) => schema.ty(),
            Self::Nullable(schema) => schema.ty(),
            Self::Array(schema) => schema.ty(),
            Self::Sequence(schema) => schema.ty(),
            Self::Mapping(schema) => schema.ty(),
            Self::Object(schema) => schema.ty(),
            Self::Shared(schema) => schema.ty(),
        }
    }

    /// Returns the [`TypeId`] of the described type.
    #[inline]
    pub const fn id(&self) -> TypeId {
        self.ty().id()
    }

    /// Returns the full type path of the described type.
    #[inline]
    pub const fn path(&self) -> &'static str {
        self.ty().path()
    }

    /// Returns the short type name of the described type.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.ty().name()
    }
}

// -----------------------------------------------------------------------------
// Schematic

/// A type with a process-wide cached [`TypeSchema`].
///
/// Implemented by `#[derive(Value)]` and by the built-in std-type impls.
/// `register_dependencies` recursively registers the types a schema refers
/// to (members, elements, keys, values, pointees), so registering a root
/// type makes every type reachable from it resolvable by path.
pub trait Schematic: TypePath {
    /// Returns the schema, building and caching it on first access.
    fn schema() -> &'static TypeSchema;

    /// Registers the types this type's schema depends on.
    fn register_dependencies(registry: &mut SchemaRegistry) {
        let _ = registry;
    }
}
