//! Session-side schema resolution.
//!
//! The process-wide [`TypeSchema`] records structural facts; what actually
//! participates, and how instances are constructed on decode, depends on
//! the session's registered containers, filters and forced-parametric list.
//! This module resolves that view once per (type, session) and caches it,
//! deterministically for a given plugin configuration.

use std::borrow::Cow;

use crate::Error;
use crate::cell::TypeIdMap;
use crate::plugin::{Container, FilterSet, first_applicable};
use crate::schema::{ObjectSchema, TypeSchema};
use crate::session::SessionParams;

// -----------------------------------------------------------------------------
// Strategy

/// How instances of a type come into existence during decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Strategy {
    /// Non-object kinds whose construction is inherent to their schema
    /// (empty-then-push, `from_items`, `wrap`, …).
    Intrinsic,
    /// Allocate through the default allocator, then populate members.
    DefaultAllocate,
    /// Decode members into a buffer, invoke the declared constructor with
    /// the mapped values, then assign the leftover members.
    ParametricConstruct {
        ctor: usize,
        /// For each constructor parameter, the member index it draws from.
        param_to_member: Vec<usize>,
    },
    /// Travel as the surrogate of the container at this index.
    ContainerSurrogate { container: usize },
    /// Allocate a placeholder, then populate members.
    PlaceholderAllocate,
}

/// The resolved, session-effective view of a type.
#[derive(Debug)]
pub(crate) struct Resolved {
    pub strategy: Strategy,
    /// Participating member indices in declaration order (objects only).
    pub members: Vec<usize>,
}

// Reasons are kept cheap so failed resolutions can be replayed from cache.
type Rejection = (Cow<'static, str>, Cow<'static, str>);

// -----------------------------------------------------------------------------
// Resolver

/// The per-session resolution cache.
#[derive(Default)]
pub(crate) struct Resolver {
    cache: TypeIdMap<Result<Resolved, Rejection>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            cache: TypeIdMap::new(),
        }
    }

    /// Resolves the effective view of `schema` under `params`.
    pub fn resolve(
        &mut self,
        schema: &'static TypeSchema,
        params: &SessionParams,
    ) -> Result<&Resolved, Error> {
        let entry = self
            .cache
            .get_or_insert(schema.id(), || compute(schema, params));
        match entry {
            Ok(resolved) => Ok(resolved),
            Err((type_path, reason)) => Err(Error::TypeNotSerializable {
                type_path: type_path.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

fn compute(schema: &'static TypeSchema, params: &SessionParams) -> Result<Resolved, Rejection> {
    let container = first_applicable(params.containers(), schema);

    // A serializability veto stands unless a container claims the type.
    let vetoed = params
        .filters()
        .iter()
        .any(|filter| !filter.is_type_serializable(schema));
    if vetoed {
        return match container {
            Some(index) => Ok(Resolved {
                strategy: Strategy::ContainerSurrogate { container: index },
                members: Vec::new(),
            }),
            None => Err((
                schema.path().into(),
                "a filter vetoed the type and no container applies".into(),
            )),
        };
    }

    let TypeSchema::Object(object) = schema else {
        let strategy = match container {
            Some(index) => Strategy::ContainerSurrogate { container: index },
            None => Strategy::Intrinsic,
        };
        return Ok(Resolved {
            strategy,
            members: Vec::new(),
        });
    };

    let members = participating_members(schema, object, params);
    let strategy = object_strategy(schema, object, &members, container, params)?;
    tracing::trace!(
        type_path = schema.path(),
        ?strategy,
        "resolved construction strategy"
    );
    Ok(Resolved { strategy, members })
}

fn participating_members(
    schema: &'static TypeSchema,
    object: &ObjectSchema,
    params: &SessionParams,
) -> Vec<usize> {
    let mut forced: Vec<&'static str> = Vec::new();
    for filter in params.filters() {
        if let Some(names) = filter.additional_members(schema) {
            forced.extend(names);
        }
    }
    object
        .members()
        .iter()
        .enumerate()
        .filter(|(_, member)| {
            !member.is_skipped() || forced.iter().any(|name| *name == member.name())
        })
        .map(|(index, _)| index)
        .collect()
}

fn object_strategy(
    schema: &'static TypeSchema,
    object: &ObjectSchema,
    members: &[usize],
    container: Option<usize>,
    params: &SessionParams,
) -> Result<Strategy, Rejection> {
    if let Some(index) = container
        && params.containers()[index].applies_even_with_constructor()
    {
        return Ok(Strategy::ContainerSurrogate { container: index });
    }

    let forced_parametric = params.is_forced_parametric(schema.id());
    if object.default_allocator().is_some() && !forced_parametric {
        return Ok(Strategy::DefaultAllocate);
    }

    if let Some((ctor, param_to_member)) = resolve_ctor(object, members) {
        return Ok(Strategy::ParametricConstruct {
            ctor,
            param_to_member,
        });
    }

    if let Some(index) = container {
        return Ok(Strategy::ContainerSurrogate { container: index });
    }

    if object.placeholder_allocator().is_some() {
        return Ok(Strategy::PlaceholderAllocate);
    }

    Err((
        schema.path().into(),
        if forced_parametric {
            "forced parametric construction, but no constructor matches the members".into()
        } else {
            "no default allocator, no matching constructor, no container, no placeholder".into()
        },
    ))
}

// -----------------------------------------------------------------------------
// Constructor resolution

/// Selects a declared constructor whose every parameter maps to a distinct
/// participating member.
///
/// Parameter names match member names case-insensitively, tolerating one
/// trailing `_` qualifier on the parameter; types must match exactly. The
/// total order is: most matched parameters wins, ties break by declaration
/// order. Candidates with any unmatched parameter are disqualified.
fn resolve_ctor(object: &ObjectSchema, members: &[usize]) -> Option<(usize, Vec<usize>)> {
    let mut best: Option<(usize, Vec<usize>)> = None;
    for (ctor_index, ctor) in object.ctors().iter().enumerate() {
        let mut map = Vec::with_capacity(ctor.params().len());
        let mut complete = true;
        for param in ctor.params() {
            let wanted = normalize(param.name());
            let found = members.iter().copied().find(|&member_index| {
                let member = &object.members()[member_index];
                member.ty_id() == param.ty_id()
                    && normalize(member.name()) == wanted
                    && !map.contains(&member_index)
            });
            match found {
                Some(member_index) => map.push(member_index),
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if complete
            && best
                .as_ref()
                .is_none_or(|(_, best_map)| map.len() > best_map.len())
        {
            best = Some((ctor_index, map));
        }
    }
    best
}

fn normalize(name: &str) -> String {
    name.strip_suffix('_').unwrap_or(name).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CtorInfo, CtorParam, MemberDescriptor};

    fn object_with_ctors(ctors: Vec<CtorInfo>) -> ObjectSchema {
        let mut object = ObjectSchema::new::<String>(vec![
            MemberDescriptor::new::<i32>("id"),
            MemberDescriptor::new::<String>("label"),
        ]);
        for ctor in ctors {
            object = object.with_ctor(ctor);
        }
        object
    }

    #[test]
    fn most_matched_parameters_wins() {
        let object = object_with_ctors(vec![
            CtorInfo::new("short", vec![CtorParam::new::<i32>("id")], |_| {
                Err(Error::format("unused"))
            }),
            CtorInfo::new(
                "full",
                vec![CtorParam::new::<i32>("ID"), CtorParam::new::<String>("label_")],
                |_| Err(Error::format("unused")),
            ),
        ]);
        let (ctor, map) = resolve_ctor(&object, &[0, 1]).unwrap();
        assert_eq!(ctor, 1);
        assert_eq!(map, vec![0, 1]);
    }

    #[test]
    fn ties_break_by_declaration_order() {
        let object = object_with_ctors(vec![
            CtorInfo::new("first", vec![CtorParam::new::<i32>("id")], |_| {
                Err(Error::format("unused"))
            }),
            CtorInfo::new("second", vec![CtorParam::new::<String>("label")], |_| {
                Err(Error::format("unused"))
            }),
        ]);
        let (ctor, _) = resolve_ctor(&object, &[0, 1]).unwrap();
        assert_eq!(ctor, 0);
    }

    #[test]
    fn incomplete_mappings_are_disqualified() {
        let object = object_with_ctors(vec![CtorInfo::new(
            "mismatched",
            vec![CtorParam::new::<bool>("flag")],
            |_| Err(Error::format("unused")),
        )]);
        assert!(resolve_ctor(&object, &[0, 1]).is_none());
    }
}
