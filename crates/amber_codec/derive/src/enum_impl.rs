//! Expansion for fieldless enums.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DataEnum, DeriveInput, Fields};

use crate::derive_data::TypeAttrs;
use crate::struct_impl::auto_register;

pub(crate) fn expand(input: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "`#[derive(Value)]` does not support generic types",
        ));
    }
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "`#[derive(Value)]` supports enums with unit variants only; \
                 variants travel as their underlying value",
            ));
        }
    }
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "`#[derive(Value)]` cannot be used on an empty enum",
        ));
    }

    let attrs = TypeAttrs::parse(&input.attrs)?;
    if attrs.default || !attrs.ctors.is_empty() {
        // Enums construct through their underlying value; the object-only
        // attributes would silently do nothing.
        return Err(syn::Error::new_spanned(
            &input.ident,
            "`default`/`ctor` attributes apply to structs only",
        ));
    }

    let ident = &input.ident;
    let ident_str = ident.to_string();
    let variants = data.variants.iter().map(|v| &v.ident).collect::<Vec<_>>();
    let variant_names = variants.iter().map(|v| v.to_string()).collect::<Vec<_>>();
    let first_variant = &variants[0];

    let placeholder_impl = attrs.placeholder.then(|| {
        quote! {
            impl ::amber_codec::Placeholder for #ident {
                #[inline]
                fn placeholder() -> Self {
                    #ident::#first_variant
                }
            }
        }
    });

    let auto_register_impl = auto_register(ident, attrs.auto_register);

    Ok(quote! {
        const _: () = {
            impl ::amber_codec::TypePath for #ident {
                #[inline]
                fn type_path() -> &'static str {
                    ::core::concat!(::core::module_path!(), "::", #ident_str)
                }

                #[inline]
                fn type_name() -> &'static str {
                    #ident_str
                }
            }

            impl ::amber_codec::Schematic for #ident {
                fn schema() -> &'static ::amber_codec::TypeSchema {
                    static CELL: ::amber_codec::__private::SchemaCell =
                        ::amber_codec::__private::SchemaCell::new();
                    CELL.get_or_init(|| {
                        ::amber_codec::TypeSchema::Enum(
                            ::amber_codec::schema::EnumSchema::new::<#ident>(
                                ::std::vec![
                                    #( ::amber_codec::schema::VariantDescriptor::new(
                                        #variant_names,
                                        #ident::#variants as i64,
                                    ) ),*
                                ],
                                |raw| {
                                    #( if raw == #ident::#variants as i64 {
                                        return ::core::option::Option::Some(
                                            ::std::boxed::Box::new(#ident::#variants),
                                        );
                                    } )*
                                    ::core::option::Option::None
                                },
                            ),
                        )
                    })
                }
            }

            impl ::amber_codec::Value for #ident {
                #[inline]
                fn schema(&self) -> &'static ::amber_codec::TypeSchema {
                    <Self as ::amber_codec::Schematic>::schema()
                }

                fn set(
                    &mut self,
                    value: ::std::boxed::Box<dyn ::amber_codec::Value>,
                ) -> ::core::result::Result<(), ::std::boxed::Box<dyn ::amber_codec::Value>> {
                    *self = value.take::<Self>()?;
                    ::core::result::Result::Ok(())
                }

                #[inline]
                fn value_ref(&self) -> ::amber_codec::value::ValueRef<'_> {
                    ::amber_codec::value::ValueRef::Enum(self)
                }

                #[inline]
                fn value_mut(&mut self) -> ::amber_codec::value::ValueMut<'_> {
                    ::amber_codec::value::ValueMut::Enum(self)
                }
            }

            impl ::amber_codec::value::Enumeration for #ident {
                fn underlying(&self) -> i64 {
                    match self {
                        #( #ident::#variants => #ident::#variants as i64, )*
                    }
                }

                fn variant_name(&self) -> &'static str {
                    match self {
                        #( #ident::#variants => #variant_names, )*
                    }
                }
            }

            #placeholder_impl

            #auto_register_impl
        };
    })
}
