//! The graph decoder.
//!
//! Mirrors the encoder, guided by the expected schema at every interior
//! position; tagged positions (the root, container surrogates) resolve
//! their type tag against the global registry. Shared wrappers with a
//! placeholder allocator are allocated and registered in the reference
//! table *before* their pointee is read, so a back-reference into the
//! wrapper's own subtree resolves to the (still unpopulated) instance
//! instead of recursing.

use crate::Error;
use crate::codec::MemberFailure;
use crate::codec::refs::DecodeRefs;
use crate::fmt::{FormatReader, NodeStart};
use crate::path::DynTypePath;
use crate::plugin::{Container, FilterSet};
use crate::registry;
use crate::resolve::{Resolver, Strategy};
use crate::schema::{CtorArgs, ObjectSchema, PrimKind, PrimitiveValue, SchemaKind, TypeSchema};
use crate::session::SessionParams;
use crate::value::{Array, Mapping, Object, Sequence, Shared, Value, ValueMut, ValueRef};

pub(crate) struct GraphDecoder<'a> {
    pub reader: &'a mut (dyn FormatReader + 'a),
    pub params: &'a SessionParams,
    pub resolver: &'a mut Resolver,
    pub refs: &'a mut DecodeRefs,
    /// Armed in best-effort mode; receives per-member substitutions.
    pub failures: Option<&'a mut Vec<MemberFailure>>,
    pub path: Vec<String>,
}

impl<'a> GraphDecoder<'a> {
    /// Decodes one root value from a tagged position.
    pub fn decode_root(&mut self) -> Result<Box<dyn Value>, Error> {
        self.decode_tagged()
    }

    /// Decodes one root value, requiring the tag to match `expected`.
    pub fn decode_root_as(
        &mut self,
        expected: &'static TypeSchema,
    ) -> Result<Box<dyn Value>, Error> {
        match self.reader.read_node_start()? {
            NodeStart::Null => Err(Error::format("unexpected null at the root")),
            NodeStart::BackRef(id) => self.refs.resolve(id),
            NodeStart::Begin { path, id } => {
                if path != expected.path() {
                    return Err(Error::format(format!(
                        "root type mismatch: expected `{}`, found `{path}`",
                        expected.path()
                    )));
                }
                self.decode_node_body(expected, id)
            }
        }
    }

    // A tagged position: the node carries its own type tag, resolved
    // against the global registry.
    fn decode_tagged(&mut self) -> Result<Box<dyn Value>, Error> {
        match self.reader.read_node_start()? {
            NodeStart::Null => Err(Error::format("unexpected null at a tagged position")),
            NodeStart::BackRef(id) => self.refs.resolve(id),
            NodeStart::Begin { path, id } => {
                let schema = registry::lookup_path_global(&path)
                    .ok_or_else(|| Error::format(format!("unknown type tag `{path}`")))?;
                self.decode_node_body(schema, id)
            }
        }
    }

    // A schema-guided position: scalars travel bare, composites as nodes.
    fn decode_value(&mut self, expected: &'static TypeSchema) -> Result<Box<dyn Value>, Error> {
        let strategy = self.resolver.resolve(expected, self.params)?.strategy.clone();
        if matches!(strategy, Strategy::ContainerSurrogate { .. })
            || expected.kind().is_composite()
        {
            return self.decode_node(expected);
        }

        match expected {
            TypeSchema::Primitive(primitive) => {
                let value = self.reader.read_primitive(primitive.prim())?;
                primitive.from_value(value).ok_or_else(|| {
                    Error::format(format!(
                        "value does not fit primitive type `{}`",
                        expected.path()
                    ))
                })
            }
            TypeSchema::Str(string) => Ok(string.from_string(self.reader.read_str()?)),
            TypeSchema::Enum(variants) => {
                let PrimitiveValue::I64(raw) = self.reader.read_primitive(PrimKind::I64)? else {
                    return Err(Error::format("enum value is not an integer"));
                };
                variants.from_underlying(raw).ok_or_else(|| {
                    Error::format(format!(
                        "unknown discriminant {raw} for enum `{}`",
                        expected.path()
                    ))
                })
            }
            TypeSchema::Nullable(nullable) => {
                if self.reader.take_null()? {
                    return Ok(nullable.make_none());
                }
                let inner = self.decode_value(nullable.inner())?;
                nullable
                    .wrap(inner)
                    .map_err(|_| Error::format("nullable inner value has the wrong type"))
            }
            _ => unreachable!("composite kinds are handled above"),
        }
    }

    // An expected node: read its begin token, validate the tag, decode the
    // body.
    fn decode_node(&mut self, expected: &'static TypeSchema) -> Result<Box<dyn Value>, Error> {
        match self.reader.read_node_start()? {
            NodeStart::Null => Err(Error::format(format!(
                "unexpected null where `{}` was expected",
                expected.path()
            ))),
            NodeStart::BackRef(id) => {
                if !matches!(expected, TypeSchema::Shared(_)) {
                    return Err(Error::format(format!(
                        "back-reference where `{}` was expected",
                        expected.path()
                    )));
                }
                self.refs.resolve(id)
            }
            NodeStart::Begin { path, id } => {
                if path != expected.path() {
                    return Err(Error::format(format!(
                        "type tag mismatch: expected `{}`, found `{path}`",
                        expected.path()
                    )));
                }
                self.decode_node_body(expected, id)
            }
        }
    }

    fn decode_node_body(
        &mut self,
        schema: &'static TypeSchema,
        id: Option<u32>,
    ) -> Result<Box<dyn Value>, Error> {
        let resolved = self.resolver.resolve(schema, self.params)?;
        let strategy = resolved.strategy.clone();
        let members = resolved.members.clone();

        if let Strategy::ContainerSurrogate { container } = strategy {
            let surrogate = self.decode_tagged()?;
            let instance = self.params.containers()[container]
                .unpack(surrogate)
                .map_err(|source| Error::ContainerTranscode {
                    type_path: schema.path().into(),
                    source,
                })?;
            if let Some(id) = id {
                self.register_shared(id, &*instance)?;
            }
            self.reader.read_node_end()?;
            return Ok(instance);
        }

        match schema {
            TypeSchema::Shared(shared) => {
                if let Some(allocate) = shared.allocate() {
                    // Two-phase construction: allocate, register under the
                    // stream id, then populate the pointee in place.
                    let handle = allocate();
                    if let Some(id) = id {
                        self.register_shared(id, &*handle)?;
                    }
                    match handle.value_ref() {
                        ValueRef::Shared(access) => {
                            access.visit_mut(&mut |pointee| self.decode_into(pointee))?;
                        }
                        _ => {
                            return Err(Error::format(format!(
                                "`{}` has a shared schema but no shared access",
                                schema.path()
                            )));
                        }
                    }
                    self.reader.read_node_end()?;
                    Ok(handle)
                } else {
                    // Construct-after: such a wrapper cannot sit on a cycle
                    // that back-references it from its own subtree; the
                    // unregistered-id error below is how that surfaces.
                    let pointee = self.decode_value(shared.pointee())?;
                    let handle = shared
                        .wrap(pointee)
                        .map_err(|_| Error::format("shared pointee has the wrong type"))?;
                    if let Some(id) = id {
                        self.register_shared(id, &*handle)?;
                    }
                    self.reader.read_node_end()?;
                    Ok(handle)
                }
            }
            TypeSchema::Sequence(sequence) => {
                let count = self.reader.read_count()?;
                let mut instance = sequence.new_empty();
                for _ in 0..count {
                    let element = self.decode_value(sequence.element())?;
                    let ValueMut::Sequence(access) = instance.value_mut() else {
                        return Err(Error::format(format!(
                            "`{}` has a sequence schema but no sequence access",
                            schema.path()
                        )));
                    };
                    access
                        .push(element)
                        .map_err(|_| Error::format("sequence element has the wrong type"))?;
                }
                self.reader.read_node_end()?;
                Ok(instance)
            }
            TypeSchema::Array(array) => {
                let count = self.reader.read_count()?;
                if count != array.len() {
                    return Err(Error::format(format!(
                        "array `{}` expects {} elements, stream has {count}",
                        schema.path(),
                        array.len()
                    )));
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.decode_value(array.element())?);
                }
                self.reader.read_node_end()?;
                array
                    .from_items(items)
                    .ok_or_else(|| Error::format("array element has the wrong type"))
            }
            TypeSchema::Mapping(mapping) => {
                let count = self.reader.read_count()?;
                let mut instance = mapping.new_empty();
                for _ in 0..count {
                    let key = self.decode_value(mapping.key())?;
                    let value = self.decode_value(mapping.value())?;
                    let ValueMut::Mapping(access) = instance.value_mut() else {
                        return Err(Error::format(format!(
                            "`{}` has a mapping schema but no mapping access",
                            schema.path()
                        )));
                    };
                    access
                        .insert_boxed(key, value)
                        .map_err(|_| Error::format("mapping entry has the wrong type"))?;
                }
                self.reader.read_node_end()?;
                Ok(instance)
            }
            TypeSchema::Object(object) => self.decode_object(schema, object, strategy, &members),
            // Scalars at a tagged position (e.g. the root): the node wraps
            // the bare token.
            _ => {
                let value = self.decode_value(schema)?;
                self.reader.read_node_end()?;
                Ok(value)
            }
        }
    }

    fn decode_object(
        &mut self,
        schema: &'static TypeSchema,
        object: &'static ObjectSchema,
        strategy: Strategy,
        members: &[usize],
    ) -> Result<Box<dyn Value>, Error> {
        match strategy {
            Strategy::DefaultAllocate | Strategy::PlaceholderAllocate => {
                let allocate = match strategy {
                    Strategy::DefaultAllocate => object.default_allocator(),
                    _ => object.placeholder_allocator(),
                }
                .ok_or_else(|| {
                    Error::not_serializable(schema.path(), "allocation capability disappeared")
                })?;
                let mut instance = allocate();
                self.run_post_allocate(&mut *instance);
                {
                    let ValueMut::Object(access) = instance.value_mut() else {
                        return Err(Error::format(format!(
                            "`{}` has an object schema but no object access",
                            schema.path()
                        )));
                    };
                    self.populate_members(access, object, members)?;
                }
                self.reader.read_node_end()?;
                Ok(instance)
            }
            Strategy::ParametricConstruct {
                ctor,
                param_to_member,
            } => {
                // All member values are decoded into a buffer first; the
                // constructor runs only once its arguments exist, so this
                // strategy cannot satisfy a back-reference from inside its
                // own subtree.
                let mut buffered: Vec<(usize, Option<Box<dyn Value>>)> = Vec::new();
                self.read_members(object, members, &mut |index, value| {
                    buffered.push((index, Some(value)));
                })?;
                self.reader.read_node_end()?;

                let info = &object.ctors()[ctor];
                let mut args = Vec::with_capacity(param_to_member.len());
                for &member_index in &param_to_member {
                    let slot = buffered
                        .iter_mut()
                        .find(|(index, _)| *index == member_index)
                        .and_then(|(_, slot)| slot.take());
                    args.push(slot.ok_or_else(|| {
                        Error::format(format!(
                            "constructor `{}` of `{}` is missing member `{}`",
                            info.name(),
                            schema.path(),
                            object.members()[member_index].name()
                        ))
                    })?);
                }
                let mut instance = info.invoke(CtorArgs::new(args))?;

                // Populate whatever the constructor did not consume.
                let ValueMut::Object(access) = instance.value_mut() else {
                    return Err(Error::format(format!(
                        "`{}` has an object schema but no object access",
                        schema.path()
                    )));
                };
                for (index, slot) in buffered {
                    if let Some(value) = slot {
                        let member = access.member_at_mut(index).ok_or_else(|| {
                            Error::format(format!(
                                "member {index} of `{}` is out of range",
                                schema.path()
                            ))
                        })?;
                        member.set(value).map_err(|_| {
                            Error::format(format!(
                                "member `{}` of `{}` has the wrong type",
                                object.members()[index].name(),
                                schema.path()
                            ))
                        })?;
                    }
                }
                Ok(instance)
            }
            _ => Err(Error::not_serializable(
                schema.path(),
                "object type resolved to a non-object construction strategy",
            )),
        }
    }

    // Populates an already-allocated object in place, member by member.
    fn populate_members(
        &mut self,
        access: &mut dyn Object,
        object: &'static ObjectSchema,
        members: &[usize],
    ) -> Result<(), Error> {
        // The sink cannot fail, so assignment errors park here.
        let mut assignment_error: Option<Error> = None;
        self.read_members(object, members, &mut |index, value| {
            if assignment_error.is_some() {
                return;
            }
            match access.member_at_mut(index) {
                Some(member) => {
                    if member.set(value).is_err() {
                        assignment_error = Some(Error::format(format!(
                            "member `{}` has the wrong type",
                            object.members()[index].name()
                        )));
                    }
                }
                None => {
                    assignment_error =
                        Some(Error::format(format!("member {index} is out of range")));
                }
            }
        })?;
        match assignment_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    // Shared member-reading loop; `sink` receives each decoded value.
    //
    // This indirection exists because default/placeholder population writes
    // straight into the instance while parametric construction buffers.
    fn read_members(
        &mut self,
        object: &'static ObjectSchema,
        members: &[usize],
        sink: &mut dyn FnMut(usize, Box<dyn Value>),
    ) -> Result<(), Error> {
        for &index in members {
            let descriptor = &object.members()[index];
            let name = self.reader.read_member_name()?;
            if name != descriptor.name() {
                return Err(Error::format(format!(
                    "member order mismatch: expected `{}`, found `{name}`",
                    descriptor.name()
                )));
            }

            // A null where the member is not nullable means the encoder
            // null-substituted it (best-effort). Record and move on in
            // lenient mode; fail otherwise.
            if descriptor.schema().kind() != SchemaKind::Nullable && self.reader.take_null()? {
                if self.failures.is_some() {
                    self.record_failure(
                        descriptor.name(),
                        "member was null-substituted during encoding",
                    );
                    continue;
                }
                return Err(Error::format(format!(
                    "unexpected null for member `{}`",
                    descriptor.name()
                )));
            }

            self.path.push(String::from(descriptor.name()));
            let result = self.decode_value(descriptor.schema());
            let context = self.path.join(".");
            self.path.pop();
            sink(index, result.map_err(|error| error.with_context(&context))?);
        }
        Ok(())
    }

    fn run_post_allocate(&self, instance: &mut dyn Value) {
        for filter in self.params.filters() {
            if filter.post_allocate(instance) {
                break;
            }
        }
    }

    fn register_shared(&mut self, id: u32, handle: &dyn Value) -> Result<(), Error> {
        match handle.value_ref() {
            ValueRef::Shared(shared) => self.refs.register(id, shared.clone_shared()),
            _ => Err(Error::format(format!(
                "node carried reference id {id} but `{}` is not shared",
                handle.value_type_path()
            ))),
        }
    }

    // Populates an existing allocation in place; used for shared pointees.
    fn decode_into(&mut self, target: &mut dyn Value) -> Result<(), Error> {
        let schema = target.schema();
        let strategy = self.resolver.resolve(schema, self.params)?.strategy.clone();

        // Container-claimed and scalar targets are rebuilt as values and
        // assigned wholesale; only composites need true in-place work.
        if matches!(strategy, Strategy::ContainerSurrogate { .. }) {
            let value = self.decode_value(schema)?;
            return target.set(value).map(|_| ()).map_err(|_| {
                Error::format(format!("`{}` refused its own value", schema.path()))
            });
        }

        match schema {
            TypeSchema::Object(object) => {
                self.expect_begin(schema)?;
                let members = self.resolver.resolve(schema, self.params)?.members.clone();
                let ValueMut::Object(access) = target.value_mut() else {
                    return Err(Error::format(format!(
                        "`{}` has an object schema but no object access",
                        schema.path()
                    )));
                };
                self.populate_members(access, object, &members)?;
                self.reader.read_node_end()
            }
            TypeSchema::Sequence(sequence) => {
                self.expect_begin(schema)?;
                let count = self.reader.read_count()?;
                for _ in 0..count {
                    let element = self.decode_value(sequence.element())?;
                    let ValueMut::Sequence(access) = target.value_mut() else {
                        return Err(Error::format(format!(
                            "`{}` has a sequence schema but no sequence access",
                            schema.path()
                        )));
                    };
                    access
                        .push(element)
                        .map_err(|_| Error::format("sequence element has the wrong type"))?;
                }
                self.reader.read_node_end()
            }
            TypeSchema::Mapping(mapping) => {
                self.expect_begin(schema)?;
                let count = self.reader.read_count()?;
                for _ in 0..count {
                    let key = self.decode_value(mapping.key())?;
                    let value = self.decode_value(mapping.value())?;
                    let ValueMut::Mapping(access) = target.value_mut() else {
                        return Err(Error::format(format!(
                            "`{}` has a mapping schema but no mapping access",
                            schema.path()
                        )));
                    };
                    access
                        .insert_boxed(key, value)
                        .map_err(|_| Error::format("mapping entry has the wrong type"))?;
                }
                self.reader.read_node_end()
            }
            TypeSchema::Array(array) => {
                self.expect_begin(schema)?;
                let count = self.reader.read_count()?;
                if count != array.len() {
                    return Err(Error::format(format!(
                        "array `{}` expects {} elements, stream has {count}",
                        schema.path(),
                        array.len()
                    )));
                }
                for index in 0..count {
                    let element = self.decode_value(array.element())?;
                    let ValueMut::Array(access) = target.value_mut() else {
                        return Err(Error::format(format!(
                            "`{}` has an array schema but no array access",
                            schema.path()
                        )));
                    };
                    let slot = access.get_mut(index).ok_or_else(|| {
                        Error::format(format!("array `{}` lied about its length", schema.path()))
                    })?;
                    slot.set(element)
                        .map_err(|_| Error::format("array element has the wrong type"))?;
                }
                self.reader.read_node_end()
            }
            _ => {
                let value = self.decode_value(schema)?;
                target.set(value).map(|_| ()).map_err(|_| {
                    Error::format(format!("`{}` refused its own value", schema.path()))
                })
            }
        }
    }

    fn expect_begin(&mut self, expected: &'static TypeSchema) -> Result<(), Error> {
        match self.reader.read_node_start()? {
            NodeStart::Begin { path, .. } if path == expected.path() => Ok(()),
            NodeStart::Begin { path, .. } => Err(Error::format(format!(
                "type tag mismatch: expected `{}`, found `{path}`",
                expected.path()
            ))),
            other => Err(Error::format(format!(
                "expected `{}`, found {other:?}",
                expected.path()
            ))),
        }
    }

    fn record_failure(&mut self, member: &str, detail: &str) {
        if let Some(failures) = self.failures.as_deref_mut() {
            let mut path = self.path.join(".");
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(member);
            failures.push(MemberFailure {
                path,
                detail: String::from(detail),
            });
        }
    }
}
