//! Sessions: the public serialize/deserialize surface.
//!
//! A [`Session`] owns a stream and a configuration, and runs sequential
//! encode/decode calls against it. Each call writes or reads one
//! header-plus-root unit and advances the cursor; reference tables are
//! fresh per call unless the session opts into sharing one.
//!
//! A session is single-threaded: value graphs may contain `Rc` handles,
//! which pin it to one thread. The process-wide schema cells and registry behind it are
//! concurrency-safe, so independent sessions on different threads are fine.

use core::any::TypeId;
use std::io::{Read, Write};

use crate::codec::{DecodeRefs, EncodeRefs, GraphDecoder, GraphEncoder, MemberFailure};
use crate::fmt::Format;
use crate::path::DynTypePath;
use crate::plugin::{Container, FilterSet};
use crate::resolve::Resolver;
use crate::schema::TypeSchema;
use crate::value::Value;
use crate::{Error, Schematic};

// -----------------------------------------------------------------------------
// SessionParams

/// Configuration for a [`Session`]: the wire format, the plugin lists, and
/// the decode/encode policies.
///
/// # Example
///
/// ```
/// use amber_codec::{Format, SessionParams};
///
/// let params = SessionParams::new(Format::Json).share_reference_table(true);
/// assert_eq!(params.format(), Format::Json);
/// ```
pub struct SessionParams {
    format: Format,
    containers: Vec<Box<dyn Container>>,
    filters: Vec<Box<dyn FilterSet>>,
    force_parametric: Vec<TypeId>,
    share_reference_table: bool,
    accept_legacy: bool,
}

impl SessionParams {
    /// Creates a configuration for the given wire format, with no plugins
    /// and default policies.
    pub fn new(format: Format) -> Self {
        Self {
            format,
            containers: Vec::new(),
            filters: Vec::new(),
            force_parametric: Vec::new(),
            share_reference_table: false,
            accept_legacy: false,
        }
    }

    /// Appends a container; registration order is resolution order.
    pub fn with_container(mut self, container: Box<dyn Container>) -> Self {
        self.containers.push(container);
        self
    }

    /// Appends a filter set.
    pub fn with_filter(mut self, filter: Box<dyn FilterSet>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Forces `T` into parametric construction even if it has a default
    /// allocator.
    pub fn with_forced_parametric<T: Schematic>(mut self) -> Self {
        self.force_parametric.push(TypeId::of::<T>());
        self
    }

    /// Keeps one reference table across sequential calls, so later calls
    /// may back-reference instances first encoded earlier. Default: a fresh
    /// table per call.
    pub fn share_reference_table(mut self, share: bool) -> Self {
        self.share_reference_table = share;
        self
    }

    /// Opts into decoding known legacy wire versions instead of failing
    /// with a version mismatch. (No legacy versions exist yet.)
    pub fn accept_legacy(mut self, accept: bool) -> Self {
        self.accept_legacy = accept;
        self
    }

    /// Returns the configured wire format.
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    pub(crate) fn containers(&self) -> &[Box<dyn Container>] {
        &self.containers
    }

    pub(crate) fn filters(&self) -> &[Box<dyn FilterSet>] {
        &self.filters
    }

    pub(crate) fn is_forced_parametric(&self, type_id: TypeId) -> bool {
        self.force_parametric.contains(&type_id)
    }

    pub(crate) fn shares_reference_table(&self) -> bool {
        self.share_reference_table
    }

    pub(crate) fn accepts_legacy(&self) -> bool {
        self.accept_legacy
    }
}

// -----------------------------------------------------------------------------
// Lenient

/// The result of a best-effort deserialize: the value plus whatever was
/// substituted along the way.
#[derive(Debug)]
pub struct Lenient {
    pub value: Box<dyn Value>,
    pub failures: Vec<MemberFailure>,
}

// -----------------------------------------------------------------------------
// Session

/// A stream plus configuration, good for sequential serialize/deserialize
/// calls.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
///
/// use amber_codec::{Format, Session, SessionParams};
///
/// let mut session = Session::new(Cursor::new(Vec::new()), SessionParams::new(Format::Binary));
/// session.serialize(&42_i32).unwrap();
///
/// session.stream_mut().set_position(0);
/// let answer: i32 = session.deserialize_as().unwrap();
/// assert_eq!(answer, 42);
/// ```
pub struct Session<S> {
    stream: S,
    params: SessionParams,
    resolver: Resolver,
    encode_refs: EncodeRefs,
    decode_refs: DecodeRefs,
}

impl<S> Session<S> {
    /// Creates a session over the given stream.
    pub fn new(stream: S, params: SessionParams) -> Self {
        Self {
            stream,
            params,
            resolver: Resolver::new(),
            encode_refs: EncodeRefs::new(),
            decode_refs: DecodeRefs::new(),
        }
    }

    /// Returns the configuration.
    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Returns the underlying stream, e.g. to reposition a cursor between
    /// calls.
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Consumes the session, returning the stream.
    pub fn into_stream(self) -> S {
        self.stream
    }
}

impl<S: Write> Session<S> {
    /// Encodes one value graph onto the stream.
    ///
    /// Any failure aborts the whole call; the cursor is left at an
    /// undefined but monotonically-advanced position.
    pub fn serialize(&mut self, value: &dyn Value) -> Result<(), Error> {
        self.serialize_inner(value, None)?;
        Ok(())
    }

    /// Encodes one value graph in best-effort mode: members whose types
    /// cannot participate are null-substituted and reported instead of
    /// failing the call.
    ///
    /// Failures that surface mid-subtree (stream errors, container pack
    /// errors) still abort.
    pub fn serialize_lenient(&mut self, value: &dyn Value) -> Result<Vec<MemberFailure>, Error> {
        let mut failures = Vec::new();
        self.serialize_inner(value, Some(&mut failures))?;
        Ok(failures)
    }

    fn serialize_inner(
        &mut self,
        value: &dyn Value,
        failures: Option<&mut Vec<MemberFailure>>,
    ) -> Result<(), Error> {
        if !self.params.shares_reference_table() {
            self.encode_refs.clear();
        }
        let format = self.params.format();
        let mut writer = format.writer(&mut self.stream);
        writer.write_header()?;
        let mut encoder = GraphEncoder {
            writer: writer.as_mut(),
            params: &self.params,
            resolver: &mut self.resolver,
            refs: &mut self.encode_refs,
            failures,
            path: Vec::new(),
        };
        encoder.encode_root(value)?;
        writer.finish()?;
        tracing::debug!(
            ?format,
            type_path = value.value_type_path(),
            "serialized one graph"
        );
        Ok(())
    }
}

impl<S: Read> Session<S> {
    /// Decodes one value graph from the stream, resolving the root's type
    /// tag against the global registry.
    pub fn deserialize(&mut self) -> Result<Box<dyn Value>, Error> {
        self.deserialize_inner(None, None)
    }

    /// Decodes one value graph whose root must be `T`.
    pub fn deserialize_as<T: Value + Schematic>(&mut self) -> Result<T, Error> {
        let value = self.deserialize_inner(Some(<T as Schematic>::schema()), None)?;
        value.take::<T>().map_err(|value| {
            Error::format(format!(
                "decoded root has type `{}`",
                value.value_type_path()
            ))
        })
    }

    /// Decodes one value graph in best-effort mode, tolerating
    /// null-substituted members and reporting them.
    pub fn deserialize_lenient(&mut self) -> Result<Lenient, Error> {
        let mut failures = Vec::new();
        let value = self.deserialize_inner(None, Some(&mut failures))?;
        Ok(Lenient { value, failures })
    }

    fn deserialize_inner(
        &mut self,
        expected: Option<&'static TypeSchema>,
        failures: Option<&mut Vec<MemberFailure>>,
    ) -> Result<Box<dyn Value>, Error> {
        if !self.params.shares_reference_table() {
            self.decode_refs.clear();
        }
        let format = self.params.format();
        let accept_legacy = self.params.accepts_legacy();
        let mut reader = format.reader(&mut self.stream);
        reader.read_header(accept_legacy)?;
        let mut decoder = GraphDecoder {
            reader: reader.as_mut(),
            params: &self.params,
            resolver: &mut self.resolver,
            refs: &mut self.decode_refs,
            failures,
            path: Vec::new(),
        };
        let value = match expected {
            Some(schema) => decoder.decode_root_as(schema),
            None => decoder.decode_root(),
        }?;
        tracing::debug!(
            ?format,
            type_path = value.value_type_path(),
            "deserialized one graph"
        );
        Ok(value)
    }
}
