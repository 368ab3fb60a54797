//! The member-access capability the engine walks graphs with.
//!
//! [`Value`] is the foundational trait: anything implementing it can be
//! serialized and deserialized. It exposes the type's schema and a
//! kind-tagged structural view ([`ValueRef`]/[`ValueMut`]); the per-kind
//! access traits live in [`access`].
//!
//! It's strongly recommended to use `#[derive(Value)]` rather than
//! implementing the trait by hand; the derive also implements the matching
//! access trait and [`Schematic`](crate::Schematic).

use core::any::{Any, TypeId};

mod access;

pub use access::{Array, Enumeration, Mapping, Nullable, Object, Sequence, Shared};

use crate::path::DynTypePath;
use crate::schema::{PrimitiveValue, TypeSchema};

// -----------------------------------------------------------------------------
// Value

/// A value the codec can walk.
///
/// # Type Identification
///
/// [`Any::type_id`] on a `Box<dyn Value>` returns the container's type id,
/// not the inner value's. Use [`Value::ty_id`] instead:
///
/// ```
/// use core::any::{Any, TypeId};
///
/// use amber_codec::Value;
///
/// let x: Box<dyn Value> = 32_i32.into_boxed_value();
///
/// assert!(x.type_id() != TypeId::of::<i32>()); // container id
/// assert!(x.ty_id() == TypeId::of::<i32>()); // inner id
/// ```
///
/// # Manual Implementation
///
/// `set` and the three view methods have one standard shape per kind:
///
/// ```rust, ignore
/// fn set(&mut self, value: Box<dyn Value>) -> Result<(), Box<dyn Value>> {
///     *self = value.take::<Self>()?;
///     Ok(())
/// }
///
/// fn value_ref(&self) -> ValueRef<'_> {
///     ValueRef::Object(self) // the variant matching the type's kind
/// }
/// ```
pub trait Value: DynTypePath + Any {
    /// Returns the schema of the underlying type.
    fn schema(&self) -> &'static TypeSchema;

    /// Returns the [`TypeId`] of the underlying type.
    #[inline]
    fn ty_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    /// Replaces `self` with the given value of the same type.
    ///
    /// Returns the value back unchanged on a type mismatch.
    fn set(&mut self, value: Box<dyn Value>) -> Result<(), Box<dyn Value>>;

    /// Returns the kind-tagged immutable view.
    fn value_ref(&self) -> ValueRef<'_>;

    /// Returns the kind-tagged mutable view.
    fn value_mut(&mut self) -> ValueMut<'_>;

    /// Casts to a fully-erased value reference.
    #[inline(always)]
    fn as_value(&self) -> &dyn Value
    where
        Self: Sized,
    {
        self
    }

    /// Casts to a fully-erased mutable value reference.
    #[inline(always)]
    fn as_value_mut(&mut self) -> &mut dyn Value
    where
        Self: Sized,
    {
        self
    }

    /// Casts a box to a fully-erased boxed value.
    #[inline(always)]
    fn into_value(self: Box<Self>) -> Box<dyn Value>
    where
        Self: Sized,
    {
        self
    }

    /// Boxes and erases in one step.
    #[inline(always)]
    fn into_boxed_value(self) -> Box<dyn Value>
    where
        Self: Sized,
    {
        Box::new(self)
    }
}

impl dyn Value {
    /// Returns `true` if the underlying value is of type `T`.
    #[inline(always)]
    pub fn is<T: Any>(&self) -> bool {
        self.ty_id() == TypeId::of::<T>()
    }

    /// Downcasts the value to type `T` by reference.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        <dyn Any>::downcast_ref(self)
    }

    /// Downcasts the value to type `T` by mutable reference.
    #[inline]
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        <dyn Any>::downcast_mut(self)
    }

    /// Downcasts the value to type `T`, consuming the trait object.
    ///
    /// If the underlying value is not of type `T`, returns `Err(self)`.
    #[inline]
    pub fn downcast<T: Any>(self: Box<dyn Value>) -> Result<Box<T>, Box<dyn Value>> {
        if self.is::<T>() {
            Ok(<Box<dyn Any>>::downcast::<T>(self).expect("type already checked"))
        } else {
            Err(self)
        }
    }

    /// Downcasts the value to type `T`, unboxing and consuming the trait
    /// object.
    ///
    /// If the underlying value is not of type `T`, returns `Err(self)`.
    ///
    /// ```
    /// use amber_codec::Value;
    ///
    /// let x: Box<dyn Value> = 10_i32.into_boxed_value();
    /// assert_eq!(x.take::<i32>().unwrap(), 10);
    /// ```
    #[inline]
    pub fn take<T: Any>(self: Box<dyn Value>) -> Result<T, Box<dyn Value>> {
        self.downcast::<T>().map(|boxed| *boxed)
    }
}

impl core::fmt::Debug for dyn Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Value({})", self.value_type_path())
    }
}

// -----------------------------------------------------------------------------
// Kind views

/// An immutable, kind-tagged view of a [`Value`].
pub enum ValueRef<'a> {
    Primitive(PrimitiveValue),
    Str(&'a str),
    Enum(&'a dyn Enumeration),
    Nullable(&'a dyn Nullable),
    Array(&'a dyn Array),
    Sequence(&'a dyn Sequence),
    Mapping(&'a dyn Mapping),
    Object(&'a dyn Object),
    Shared(&'a dyn Shared),
}

/// A mutable, kind-tagged view of a [`Value`].
///
/// The scalar kinds carry the plain value reference: they are replaced
/// wholesale via [`Value::set`] rather than mutated structurally. `Shared`
/// stays immutable because mutation goes through the wrapper's interior
/// cell.
pub enum ValueMut<'a> {
    Primitive(&'a mut dyn Value),
    Str(&'a mut dyn Value),
    Enum(&'a mut dyn Value),
    Nullable(&'a mut dyn Nullable),
    Array(&'a mut dyn Array),
    Sequence(&'a mut dyn Sequence),
    Mapping(&'a mut dyn Mapping),
    Object(&'a mut dyn Object),
    Shared(&'a dyn Shared),
}

// -----------------------------------------------------------------------------
// Placeholder

/// A patchable stand-in value.
///
/// Placeholder allocation exists for types that must be registered in the
/// reference table before their members are known. It is the allocate half
/// of allocate-then-populate cycle decoding. The placeholder carries no meaningful
/// state; every participating member is overwritten afterwards.
///
/// This is distinct from [`Default`]: a type may deliberately have no public
/// default constructor and still provide a placeholder.
pub trait Placeholder {
    /// Builds the stand-in value.
    fn placeholder() -> Self;
}

// -----------------------------------------------------------------------------
// Macros

/// Implements the `Value` methods shared by every type of one kind.
macro_rules! impl_value_cast_fn {
    ($kind:ident) => {
        fn set(
            &mut self,
            value: ::std::boxed::Box<dyn $crate::Value>,
        ) -> ::core::result::Result<(), ::std::boxed::Box<dyn $crate::Value>> {
            *self = value.take::<Self>()?;
            Ok(())
        }

        #[inline]
        fn value_ref(&self) -> $crate::value::ValueRef<'_> {
            $crate::value::ValueRef::$kind(self)
        }

        #[inline]
        fn value_mut(&mut self) -> $crate::value::ValueMut<'_> {
            $crate::value::ValueMut::$kind(self)
        }
    };
}

pub(crate) use impl_value_cast_fn;
