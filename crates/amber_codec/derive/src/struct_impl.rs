//! Expansion for named-field structs.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DataStruct, DeriveInput, Fields, Ident, Type};

use crate::derive_data::{FieldAttrs, TypeAttrs};

struct Member {
    ident: Ident,
    name: String,
    ty: Type,
    skip: bool,
}

pub(crate) fn expand(input: &DeriveInput, data: &DataStruct) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "`#[derive(Value)]` does not support generic types",
        ));
    }
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "`#[derive(Value)]` supports structs with named fields and fieldless enums",
        ));
    };

    let attrs = TypeAttrs::parse(&input.attrs)?;
    let mut members = Vec::new();
    for field in &fields.named {
        let field_attrs = FieldAttrs::parse(&field.attrs)?;
        let ident = field.ident.clone().expect("named field");
        members.push(Member {
            name: ident.to_string(),
            ident,
            ty: field.ty.clone(),
            skip: field_attrs.skip,
        });
    }

    let ident = &input.ident;
    let ident_str = ident.to_string();

    let descriptors = members.iter().map(|member| {
        let name = &member.name;
        let ty = &member.ty;
        if member.skip {
            quote! {
                ::amber_codec::schema::MemberDescriptor::new::<#ty>(#name).skipped()
            }
        } else {
            quote! {
                ::amber_codec::schema::MemberDescriptor::new::<#ty>(#name)
            }
        }
    });

    let with_default = attrs.default.then(|| {
        quote! {
            .with_default(|| ::std::boxed::Box::new(
                <#ident as ::core::default::Default>::default()
            ))
        }
    });

    let with_placeholder = attrs.placeholder.then(|| {
        quote! {
            .with_placeholder(|| ::std::boxed::Box::new(
                <#ident as ::amber_codec::Placeholder>::placeholder()
            ))
        }
    });

    let mut with_ctors = Vec::new();
    for ctor in &attrs.ctors {
        let ctor_name = &ctor.name;
        let ctor_name_str = ctor_name.to_string();
        let mut params = Vec::new();
        let mut takes = Vec::new();
        let mut args = Vec::new();
        for (index, param) in ctor.params.iter().enumerate() {
            let member = members
                .iter()
                .find(|member| member.ident == *param)
                .ok_or_else(|| {
                    syn::Error::new(
                        ctor.span,
                        format!("ctor parameter `{param}` does not name a field"),
                    )
                })?;
            let param_str = param.to_string();
            let ty = &member.ty;
            params.push(quote! {
                ::amber_codec::schema::CtorParam::new::<#ty>(#param_str)
            });
            takes.push(quote! {
                let #param = args.take::<#ty>(#index)?;
            });
            args.push(quote! { #param });
        }
        with_ctors.push(quote! {
            .with_ctor(::amber_codec::schema::CtorInfo::new(
                #ctor_name_str,
                ::std::vec![ #( #params ),* ],
                |mut args: ::amber_codec::schema::CtorArgs|
                    -> ::core::result::Result<
                        ::std::boxed::Box<dyn ::amber_codec::Value>,
                        ::amber_codec::Error,
                    >
                {
                    #( #takes )*
                    ::core::result::Result::Ok(
                        ::std::boxed::Box::new(#ident::#ctor_name(#( #args ),*))
                    )
                },
            ))
        });
    }

    let field_types = members.iter().map(|member| &member.ty).collect::<Vec<_>>();
    let member_count = members.len();
    let indices = (0..member_count).collect::<Vec<_>>();
    let field_idents = members
        .iter()
        .map(|member| &member.ident)
        .collect::<Vec<_>>();
    let member_names = members
        .iter()
        .map(|member| member.name.as_str())
        .collect::<Vec<_>>();

    let placeholder_impl = attrs.placeholder.then(|| {
        quote! {
            impl ::amber_codec::Placeholder for #ident {
                fn placeholder() -> Self {
                    Self {
                        #( #field_idents:
                            <#field_types as ::amber_codec::Placeholder>::placeholder(), )*
                    }
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
                        ::amber_codec::TypeSchema::Object(
                            ::amber_codec::schema::ObjectSchema::new::<#ident>(::std::vec![
                                #( #descriptors ),*
                            ])
                            #with_default
                            #with_placeholder
                            #( #with_ctors )*
                        )
                    })
                }

                fn register_dependencies(registry: &mut ::amber_codec::SchemaRegistry) {
                    #( registry.register::<#field_types>(); )*
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
                    ::amber_codec::value::ValueRef::Object(self)
                }

                #[inline]
                fn value_mut(&mut self) -> ::amber_codec::value::ValueMut<'_> {
                    ::amber_codec::value::ValueMut::Object(self)
                }
            }

            impl ::amber_codec::value::Object for #ident {
                #[inline]
                fn member_len(&self) -> usize {
                    #member_count
                }

                fn member_at(
                    &self,
                    index: usize,
                ) -> ::core::option::Option<&dyn ::amber_codec::Value> {
                    match index {
                        #( #indices => ::core::option::Option::Some(&self.#field_idents), )*
                        _ => ::core::option::Option::None,
                    }
                }

                fn member_at_mut(
                    &mut self,
                    index: usize,
                ) -> ::core::option::Option<&mut dyn ::amber_codec::Value> {
                    match index {
                        #( #indices => ::core::option::Option::Some(&mut self.#field_idents), )*
                        _ => ::core::option::Option::None,
                    }
                }

                fn member(&self, name: &str) -> ::core::option::Option<&dyn ::amber_codec::Value> {
                    match name {
                        #( #member_names => ::core::option::Option::Some(&self.#field_idents), )*
                        _ => ::core::option::Option::None,
                    }
                }

                fn member_mut(
                    &mut self,
                    name: &str,
                ) -> ::core::option::Option<&mut dyn ::amber_codec::Value> {
                    match name {
                        #( #member_names => ::core::option::Option::Some(&mut self.#field_idents), )*
                        _ => ::core::option::Option::None,
                    }
                }
            }

            #placeholder_impl

            #auto_register_impl
        };
    })
}

#[cfg(feature = "auto_register")]
pub(crate) fn auto_register(ident: &Ident, requested: bool) -> Option<TokenStream> {
    requested.then(|| {
        quote! {
            ::amber_codec::__private::inventory::submit! {
                ::amber_codec::__private::AutoRegistration(
                    |registry| registry.register::<#ident>(),
                )
            }
        }
    })
}

#[cfg(not(feature = "auto_register"))]
pub(crate) fn auto_register(_ident: &Ident, _requested: bool) -> Option<TokenStream> {
    None
}
