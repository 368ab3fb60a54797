//! Derive support for the amber codec.
//!
//! See [`Value`](macro@Value).

use proc_macro::TokenStream;
use syn::{Data, DeriveInput, parse_macro_input};

mod derive_data;
mod enum_impl;
mod struct_impl;

static VALUE_ATTRIBUTE_NAME: &str = "value";

/// # Codec Derivation
///
/// `#[derive(Value)]` implements the traits a type needs to participate in
/// encoding and decoding:
///
/// - `TypePath`
/// - `Schematic`
/// - `Value`
/// - `Object` (for `struct T { ... }`) or `Enumeration` (for a fieldless
///   `enum T { ... }`)
///
/// Generic types are not supported; implement the traits by hand for those.
///
/// ## Type-level attributes
///
/// - `#[value(default)]`: the type has a usable [`Default`]; decoding may
///   allocate through it and populate members afterwards.
/// - `#[value(placeholder)]`: the type implements `Placeholder` (also
///   generated by this flag); decoding may allocate a patchable stand-in,
///   which is what lets the type sit inside cyclic `Rc<RefCell<_>>` graphs.
///   Every non-skipped member type must implement `Placeholder` too.
/// - `#[value(ctor = "name(param, ...)")]`: declares the associated
///   function `Self::name` as a constructor. Each parameter must name a
///   field; its declared type is taken from that field. Repeatable; the
///   engine picks among declared constructors by matching parameters to
///   members.
/// - `#[value(auto_register)]`: submits the type for automatic global
///   registration (requires the `auto_register` feature).
///
/// ## Field-level attributes
///
/// - `#[value(skip)]`: the member does not participate unless a filter
///   force-includes it.
///
/// ## Example
///
/// ```ignore
/// #[derive(Value)]
/// #[value(ctor = "new(id, label)")]
/// struct Entry {
///     id: u32,
///     label: String,
///     #[value(skip)]
///     cached_hash: u64,
/// }
/// ```
#[proc_macro_derive(Value, attributes(value))]
pub fn derive_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let output = match &input.data {
        Data::Struct(data) => struct_impl::expand(&input, data),
        Data::Enum(data) => enum_impl::expand(&input, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "`#[derive(Value)]` does not support unions",
        )),
    };
    match output {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}
