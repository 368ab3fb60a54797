//! Attribute parsing for `#[derive(Value)]`.

use proc_macro2::Span;
use syn::{Attribute, Ident, LitStr};

use crate::VALUE_ATTRIBUTE_NAME;

/// One `#[value(ctor = "name(param, ...)")]` declaration.
pub(crate) struct CtorDecl {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub span: Span,
}

/// Parsed type-level `#[value(...)]` attributes.
#[derive(Default)]
pub(crate) struct TypeAttrs {
    pub default: bool,
    pub placeholder: bool,
    pub auto_register: bool,
    pub ctors: Vec<CtorDecl>,
}

impl TypeAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(VALUE_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    parsed.default = true;
                    Ok(())
                } else if meta.path.is_ident("placeholder") {
                    parsed.placeholder = true;
                    Ok(())
                } else if meta.path.is_ident("auto_register") {
                    parsed.auto_register = true;
                    Ok(())
                } else if meta.path.is_ident("ctor") {
                    let literal: LitStr = meta.value()?.parse()?;
                    parsed.ctors.push(parse_ctor(&literal)?);
                    Ok(())
                } else {
                    Err(meta.error("unknown `value` attribute"))
                }
            })?;
        }
        Ok(parsed)
    }
}

/// Parsed field-level `#[value(...)]` attributes.
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub skip: bool,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs {
            if !attr.path().is_ident(VALUE_ATTRIBUTE_NAME) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    parsed.skip = true;
                    Ok(())
                } else {
                    Err(meta.error("unknown `value` attribute on field"))
                }
            })?;
        }
        Ok(parsed)
    }
}

// Parses `name(param, param, ...)` out of the ctor string literal.
fn parse_ctor(literal: &LitStr) -> syn::Result<CtorDecl> {
    let text = literal.value();
    let span = literal.span();
    let error = |detail: &str| syn::Error::new(span, format!("malformed ctor declaration: {detail}"));

    let open = text.find('(').ok_or_else(|| error("missing `(`"))?;
    let close = text.rfind(')').ok_or_else(|| error("missing `)`"))?;
    if close < open {
        return Err(error("`)` before `(`"));
    }

    let name = text[..open].trim();
    if name.is_empty() {
        return Err(error("missing constructor name"));
    }
    let name = syn::parse_str::<Ident>(name).map_err(|_| error("invalid constructor name"))?;

    let mut params = Vec::new();
    let inside = text[open + 1..close].trim();
    if !inside.is_empty() {
        for param in inside.split(',') {
            let param = param.trim();
            params
                .push(syn::parse_str::<Ident>(param).map_err(|_| error("invalid parameter name"))?);
        }
    }
    Ok(CtorDecl { name, params, span })
}
