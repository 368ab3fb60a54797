//! Stable, human-readable type paths.
//!
//! The wire formats tag nodes with these paths, and the registry resolves
//! them back to schemas during decoding, so they must be stable across runs
//! and unique per type. [`core::any::type_name`] guarantees neither, which
//! is why paths are declared explicitly (the derive macro composes them from
//! `module_path!`).

// -----------------------------------------------------------------------------
// TypePath

/// A static accessor for a type's stable path.
///
/// # Example
///
/// ```
/// use amber_codec::TypePath;
///
/// assert_eq!(<Vec<i32>>::type_path(), "alloc::vec::Vec<i32>");
/// assert_eq!(<Vec<i32>>::type_name(), "Vec<i32>");
/// ```
pub trait TypePath: 'static {
    /// The full, unambiguous path of the type, e.g. `alloc::string::String`.
    fn type_path() -> &'static str;

    /// The short name of the type, e.g. `String`.
    fn type_name() -> &'static str;
}

// -----------------------------------------------------------------------------
// DynTypePath

/// The object-safe companion of [`TypePath`].
///
/// Blanket-implemented for every [`TypePath`] type; lets `dyn` values report
/// the path of their underlying type.
pub trait DynTypePath {
    /// See [`TypePath::type_path`].
    fn value_type_path(&self) -> &'static str;

    /// See [`TypePath::type_name`].
    fn value_type_name(&self) -> &'static str;
}

impl<T: TypePath> DynTypePath for T {
    #[inline]
    fn value_type_path(&self) -> &'static str {
        T::type_path()
    }

    #[inline]
    fn value_type_name(&self) -> &'static str {
        T::type_name()
    }
}
