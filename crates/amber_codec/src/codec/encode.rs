//! The graph encoder.
//!
//! Walks an instance graph depth-first and emits the token protocol through
//! a format adapter. Shared wrappers are assigned reference ids in
//! first-visit order; revisiting one emits a back-reference instead of
//! recursing, which is what terminates cycles on the encode side.

use crate::Error;
use crate::codec::MemberFailure;
use crate::codec::refs::EncodeRefs;
use crate::fmt::FormatWriter;
use crate::plugin::Container;
use crate::resolve::{Resolver, Strategy};
use crate::schema::{PrimitiveValue, TypeSchema};
use crate::session::SessionParams;
use crate::value::{
    Array, Enumeration, Mapping, Nullable, Object, Sequence, Shared, Value, ValueRef,
};

/// Whether a position carries its own type tag.
///
/// Interior positions are schema-guided (scalars travel bare); the root and
/// container surrogates are tagged so the stream is self-describing where
/// the decoder has no expectation.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Tagged,
    Bare,
}

pub(crate) struct GraphEncoder<'a> {
    pub writer: &'a mut (dyn FormatWriter + 'a),
    pub params: &'a SessionParams,
    pub resolver: &'a mut Resolver,
    pub refs: &'a mut EncodeRefs,
    /// Armed in best-effort mode; receives per-member substitutions.
    pub failures: Option<&'a mut Vec<MemberFailure>>,
    pub path: Vec<&'static str>,
}

impl<'a> GraphEncoder<'a> {
    /// Encodes one root value as a tagged position.
    pub fn encode_root(&mut self, value: &dyn Value) -> Result<(), Error> {
        self.encode(value, Position::Tagged)
    }

    fn encode(&mut self, value: &dyn Value, position: Position) -> Result<(), Error> {
        let schema = value.schema();
        let resolved = self.resolver.resolve(schema, self.params)?;
        let strategy = resolved.strategy.clone();
        let members = resolved.members.clone();

        if let Strategy::ContainerSurrogate { container } = strategy {
            return self.encode_with_container(value, schema, container);
        }

        match value.value_ref() {
            ValueRef::Shared(shared) => self.encode_shared(shared, schema),
            ValueRef::Nullable(nullable) => {
                if position == Position::Tagged {
                    self.writer.begin_node(schema.path(), None)?;
                }
                match nullable.get() {
                    None => self.writer.write_null()?,
                    Some(inner) => self.encode(inner, Position::Bare)?,
                }
                if position == Position::Tagged {
                    self.writer.end_node()?;
                }
                Ok(())
            }
            ValueRef::Primitive(primitive) => {
                self.encode_scalar(schema, position, |writer| writer.write_primitive(primitive))
            }
            ValueRef::Str(text) => {
                self.encode_scalar(schema, position, |writer| writer.write_str(text))
            }
            ValueRef::Enum(variant) => {
                let underlying = PrimitiveValue::I64(variant.underlying());
                self.encode_scalar(schema, position, |writer| writer.write_primitive(underlying))
            }
            ValueRef::Sequence(sequence) => {
                self.writer.begin_node(schema.path(), None)?;
                let len = sequence.len();
                self.writer.write_count(len)?;
                for index in 0..len {
                    let element = sequence.get(index).ok_or_else(|| {
                        Error::format(format!("sequence `{}` lied about its length", schema.path()))
                    })?;
                    self.encode(element, Position::Bare)?;
                }
                self.writer.end_node()
            }
            ValueRef::Array(array) => {
                self.writer.begin_node(schema.path(), None)?;
                let len = array.len();
                self.writer.write_count(len)?;
                for index in 0..len {
                    let element = array.get(index).ok_or_else(|| {
                        Error::format(format!("array `{}` lied about its length", schema.path()))
                    })?;
                    self.encode(element, Position::Bare)?;
                }
                self.writer.end_node()
            }
            ValueRef::Mapping(mapping) => {
                self.writer.begin_node(schema.path(), None)?;
                self.writer.write_count(mapping.len())?;
                for (key, entry) in mapping.iter() {
                    self.encode(key, Position::Bare)?;
                    self.encode(entry, Position::Bare)?;
                }
                self.writer.end_node()
            }
            ValueRef::Object(object) => self.encode_object(object, schema, &members),
        }
    }

    fn encode_scalar(
        &mut self,
        schema: &'static TypeSchema,
        position: Position,
        write: impl FnOnce(&mut dyn FormatWriter) -> Result<(), Error>,
    ) -> Result<(), Error> {
        if position == Position::Tagged {
            self.writer.begin_node(schema.path(), None)?;
            write(&mut *self.writer)?;
            self.writer.end_node()
        } else {
            write(&mut *self.writer)
        }
    }

    fn encode_shared(
        &mut self,
        shared: &dyn Shared,
        schema: &'static TypeSchema,
    ) -> Result<(), Error> {
        if let Some(id) = self.refs.get(shared.identity()) {
            return self.writer.write_back_ref(id);
        }
        let id = self.refs.assign(shared.identity());
        tracing::trace!(id, type_path = schema.path(), "assigned reference id");
        self.writer.begin_node(schema.path(), Some(id))?;
        shared.visit(&mut |pointee| self.encode(pointee, Position::Bare))?;
        self.writer.end_node()
    }

    // The surrogate travels as a tagged nested node inside a node tagged
    // with the original type, so the decode side can resolve both schemas
    // without expectations.
    fn encode_with_container(
        &mut self,
        value: &dyn Value,
        schema: &'static TypeSchema,
        container: usize,
    ) -> Result<(), Error> {
        // Revisited shared instances short-circuit before `pack`, so a
        // container is invoked exactly once per instance.
        let id = match value.value_ref() {
            ValueRef::Shared(shared) => {
                if let Some(id) = self.refs.get(shared.identity()) {
                    return self.writer.write_back_ref(id);
                }
                Some(self.refs.assign(shared.identity()))
            }
            _ => None,
        };
        let container: &dyn Container = self.params.containers()[container].as_ref();
        let surrogate = container
            .pack(value)
            .map_err(|source| Error::ContainerTranscode {
                type_path: schema.path().into(),
                source,
            })?;
        self.writer.begin_node(schema.path(), id)?;
        self.encode(&*surrogate, Position::Tagged)?;
        self.writer.end_node()
    }

    fn encode_object(
        &mut self,
        object: &dyn Object,
        schema: &'static TypeSchema,
        members: &[usize],
    ) -> Result<(), Error> {
        let object_schema = schema
            .as_object()
            .map_err(|e| Error::format(e.to_string()))?;
        self.writer.begin_node(schema.path(), None)?;
        for &index in members {
            let descriptor = &object_schema.members()[index];

            // In best-effort mode, a member whose type cannot participate is
            // null-substituted and recorded instead of aborting the call.
            if self.failures.is_some()
                && let Err(error) = self.resolver.resolve(descriptor.schema(), self.params)
            {
                self.record_failure(descriptor.name(), &error);
                self.writer.member_name(descriptor.name())?;
                self.writer.write_null()?;
                continue;
            }

            let member = object.member_at(index).ok_or_else(|| {
                Error::format(format!(
                    "member `{}` of `{}` is out of range",
                    descriptor.name(),
                    schema.path()
                ))
            })?;
            self.writer.member_name(descriptor.name())?;
            self.path.push(descriptor.name());
            let result = self.encode(member, Position::Bare);
            self.path.pop();
            result?;
        }
        self.writer.end_node()
    }

    fn record_failure(&mut self, member: &str, error: &Error) {
        if let Some(failures) = self.failures.as_deref_mut() {
            let mut path = self.path.join(".");
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(member);
            failures.push(MemberFailure {
                path,
                detail: error.to_string(),
            });
        }
    }
}
