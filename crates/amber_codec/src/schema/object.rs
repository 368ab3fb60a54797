use core::any::{Any, TypeId};

use crate::Error;
use crate::path::DynTypePath;
use crate::schema::{SchemaType, TypeSchema};
use crate::value::Value;
use crate::TypePath;

// -----------------------------------------------------------------------------
// MemberDescriptor

/// Description of one named member of an object type.
///
/// Members are enumerated in declaration order; the descriptor's position in
/// [`ObjectSchema::members`] is also its index in the `Object` access trait.
/// A skipped member keeps its slot (so filters can force-include it) but
/// does not participate by default.
#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    name: &'static str,
    ty_id: TypeId,
    // The member's schema is created on first access; a function pointer
    // delays the build and keeps the descriptor `const`-friendly.
    schema: fn() -> &'static TypeSchema,
    skipped: bool,
}

impl MemberDescriptor {
    /// Creates a descriptor for member `name` of type `T`.
    #[inline]
    pub fn new<T: crate::Schematic>(name: &'static str) -> Self {
        Self {
            name,
            ty_id: TypeId::of::<T>(),
            schema: T::schema,
            skipped: false,
        }
    }

    /// Marks the member as excluded by default.
    #[inline]
    pub fn skipped(mut self) -> Self {
        self.skipped = true;
        self
    }

    /// Returns the member name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the member's [`TypeId`].
    #[inline]
    pub const fn ty_id(&self) -> TypeId {
        self.ty_id
    }

    /// Returns the member's schema.
    #[inline]
    pub fn schema(&self) -> &'static TypeSchema {
        (self.schema)()
    }

    /// Whether the member is excluded unless a filter force-includes it.
    #[inline]
    pub const fn is_skipped(&self) -> bool {
        self.skipped
    }
}

// -----------------------------------------------------------------------------
// Constructors

/// One declared constructor parameter: a name to match against members, and
/// the exact type required.
#[derive(Debug, Clone)]
pub struct CtorParam {
    name: &'static str,
    ty_id: TypeId,
}

impl CtorParam {
    /// Creates a parameter of type `T` named `name`.
    #[inline]
    pub fn new<T: Any>(name: &'static str) -> Self {
        Self {
            name,
            ty_id: TypeId::of::<T>(),
        }
    }

    /// Returns the parameter name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the parameter's [`TypeId`].
    #[inline]
    pub const fn ty_id(&self) -> TypeId {
        self.ty_id
    }
}

/// The decoded argument values handed to a constructor's `invoke` function,
/// ordered like its parameters.
pub struct CtorArgs {
    slots: Vec<Option<Box<dyn Value>>>,
}

impl CtorArgs {
    /// Wraps decoded argument values.
    #[inline]
    pub fn new(slots: Vec<Box<dyn Value>>) -> Self {
        Self {
            slots: slots.into_iter().map(Some).collect(),
        }
    }

    /// Takes the argument at `index` as a concrete `T`.
    pub fn take<T: Value>(&mut self, index: usize) -> Result<T, Error> {
        let slot = self
            .slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| Error::format(format!("constructor argument {index} is missing")))?;
        slot.take::<T>().map_err(|value| {
            Error::format(format!(
                "constructor argument {index} has type `{}`",
                value.value_type_path()
            ))
        })
    }
}

/// One declared constructor of an object type.
///
/// `invoke` receives the decoded member values mapped to the parameters and
/// must return a finished instance.
#[derive(Debug)]
pub struct CtorInfo {
    name: &'static str,
    params: Vec<CtorParam>,
    invoke: fn(CtorArgs) -> Result<Box<dyn Value>, Error>,
}

impl CtorInfo {
    /// Declares a constructor.
    pub fn new(
        name: &'static str,
        params: Vec<CtorParam>,
        invoke: fn(CtorArgs) -> Result<Box<dyn Value>, Error>,
    ) -> Self {
        Self {
            name,
            params,
            invoke,
        }
    }

    /// Returns the constructor name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the parameters in declaration order.
    #[inline]
    pub fn params(&self) -> &[CtorParam] {
        &self.params
    }

    /// Invokes the constructor with mapped argument values.
    #[inline]
    pub fn invoke(&self, args: CtorArgs) -> Result<Box<dyn Value>, Error> {
        (self.invoke)(args)
    }
}

// -----------------------------------------------------------------------------
// ObjectSchema

/// Schema of a named-member object type (a struct).
#[derive(Debug)]
pub struct ObjectSchema {
    ty: SchemaType,
    members: Vec<MemberDescriptor>,
    default: Option<fn() -> Box<dyn Value>>,
    placeholder: Option<fn() -> Box<dyn Value>>,
    ctors: Vec<CtorInfo>,
}

impl ObjectSchema {
    /// Creates the schema for object type `T` with its members in
    /// declaration order.
    pub fn new<T: TypePath>(members: Vec<MemberDescriptor>) -> Self {
        Self {
            ty: SchemaType::of::<T>(),
            members,
            default: None,
            placeholder: None,
            ctors: Vec::new(),
        }
    }

    /// Adds the default-allocation capability.
    pub fn with_default(mut self, default: fn() -> Box<dyn Value>) -> Self {
        self.default = Some(default);
        self
    }

    /// Adds the placeholder-allocation capability.
    pub fn with_placeholder(mut self, placeholder: fn() -> Box<dyn Value>) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    /// Declares a constructor; declaration order is the tie-break order.
    pub fn with_ctor(mut self, ctor: CtorInfo) -> Self {
        self.ctors.push(ctor);
        self
    }

    /// Returns the identity header.
    #[inline]
    pub const fn ty(&self) -> &SchemaType {
        &self.ty
    }

    /// Returns all members in declaration order, skipped ones included.
    #[inline]
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Returns the member with the given name.
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|member| member.name() == name)
    }

    /// Returns the default allocator, if the type has one.
    #[inline]
    pub fn default_allocator(&self) -> Option<fn() -> Box<dyn Value>> {
        self.default
    }

    /// Returns the placeholder allocator, if the type has one.
    #[inline]
    pub fn placeholder_allocator(&self) -> Option<fn() -> Box<dyn Value>> {
        self.placeholder
    }

    /// Returns the declared constructors in declaration order.
    #[inline]
    pub fn ctors(&self) -> &[CtorInfo] {
        &self.ctors
    }
}
