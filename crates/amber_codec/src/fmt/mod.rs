//! The wire-format adapter interface.
//!
//! The engine emits and consumes an abstract token protocol; adapters bind
//! it to one concrete syntax. The engine never depends on wire bytes, so
//! binary, JSON-like and XML-like streams are interchangeable.
//!
//! # Token protocol
//!
//! Every value occupies one *position*. Interior positions (members,
//! elements, keys, values, pointees) are schema-guided, so scalar kinds
//! travel bare; *tagged* positions (the root, container surrogates) always
//! carry a full node so the stream stays self-describing where the decoder
//! has no expectation.
//!
//! - null: `write_null`
//! - back-reference: `write_back_ref(id)`
//! - bare scalar: `write_primitive` / `write_str` (enums travel as their
//!   underlying value)
//! - node: `begin_node(path, id?)`, then content, then `end_node`:
//!   - object: per participating member, `member_name(name)` then its
//!     position
//!   - sequence/array: `write_count(n)`, then `n` element positions
//!   - mapping: `write_count(n)`, then `n` key/value position pairs
//!   - shared wrapper: the single pointee position (the node carries the
//!     reference id)
//!   - container: the single surrogate position, itself tagged
//!   - scalar at a tagged position: the bare token
//!
//! A call writes one header then one tagged position; sequential calls on
//! one stream repeat that unit.

use std::io::{Read, Write};

use crate::Error;
use crate::schema::{PrimKind, PrimitiveValue};

mod binary;
mod json;
mod xml;

pub use binary::{BinaryReader, BinaryWriter};
pub use json::{JsonReader, JsonWriter};
pub use xml::{XmlReader, XmlWriter};

/// The wire version this build writes and reads.
pub const WIRE_VERSION: u16 = 1;

// -----------------------------------------------------------------------------
// Format

/// Selector for the shipped wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Explicit token bytes, little-endian.
    Binary,
    /// One JSON document per call; `$type`/`$id`/`$ref` keys.
    Json,
    /// A minimal XML-like element syntax.
    Xml,
}

impl Format {
    /// Creates a writer for this format over the given sink.
    pub fn writer<'a, W: Write + 'a>(self, sink: W) -> Box<dyn FormatWriter + 'a> {
        match self {
            Self::Binary => Box::new(BinaryWriter::new(sink)),
            Self::Json => Box::new(JsonWriter::new(sink)),
            Self::Xml => Box::new(XmlWriter::new(sink)),
        }
    }

    /// Creates a reader for this format over the given source.
    pub fn reader<'a, R: Read + 'a>(self, source: R) -> Box<dyn FormatReader + 'a> {
        match self {
            Self::Binary => Box::new(BinaryReader::new(source)),
            Self::Json => Box::new(JsonReader::new(source)),
            Self::Xml => Box::new(XmlReader::new(source)),
        }
    }
}

// -----------------------------------------------------------------------------
// NodeStart

/// What a reader finds at a node position.
#[derive(Debug)]
pub enum NodeStart {
    /// A null token.
    Null,
    /// A back-reference to an already-registered id.
    BackRef(u32),
    /// The opening of a node.
    Begin { path: String, id: Option<u32> },
}

// -----------------------------------------------------------------------------
// FormatWriter

/// The encode half of a wire format.
pub trait FormatWriter {
    /// Writes the leading format/version tag.
    fn write_header(&mut self) -> Result<(), Error>;

    /// Opens a node tagged with a type path and, for shared nodes, a
    /// reference id.
    fn begin_node(&mut self, path: &str, id: Option<u32>) -> Result<(), Error>;

    /// Closes the most recently opened node.
    fn end_node(&mut self) -> Result<(), Error>;

    /// Writes a null token.
    fn write_null(&mut self) -> Result<(), Error>;

    /// Writes a back-reference token.
    fn write_back_ref(&mut self, id: u32) -> Result<(), Error>;

    /// Writes an element/entry count.
    fn write_count(&mut self, count: usize) -> Result<(), Error>;

    /// Announces the next member of the open object node.
    fn member_name(&mut self, name: &str) -> Result<(), Error>;

    /// Writes a primitive value token.
    fn write_primitive(&mut self, value: PrimitiveValue) -> Result<(), Error>;

    /// Writes a string value token.
    fn write_str(&mut self, value: &str) -> Result<(), Error>;

    /// Completes the call's output unit and flushes buffered bytes.
    fn finish(&mut self) -> Result<(), Error>;
}

// -----------------------------------------------------------------------------
// FormatReader

/// The decode half of a wire format.
///
/// Reads mirror writes one-to-one; adapters may buffer one call's unit
/// internally but must consume exactly one unit per header-to-finish cycle
/// so sequential calls stay aligned.
pub trait FormatReader {
    /// Reads and validates the leading format/version tag.
    ///
    /// A recognized tag with an unsupported version fails
    /// [`Error::VersionMismatch`]; `accept_legacy` opts into known legacy
    /// versions.
    fn read_header(&mut self, accept_legacy: bool) -> Result<(), Error>;

    /// Reads the token opening a node position.
    fn read_node_start(&mut self) -> Result<NodeStart, Error>;

    /// Reads the token closing the current node.
    fn read_node_end(&mut self) -> Result<(), Error>;

    /// Consumes a null token if one is next; leaves the stream untouched
    /// otherwise.
    fn take_null(&mut self) -> Result<bool, Error>;

    /// Reads an element/entry count.
    fn read_count(&mut self) -> Result<usize, Error>;

    /// Reads the next member name of the open object node.
    fn read_member_name(&mut self) -> Result<String, Error>;

    /// Reads a primitive value of the expected kind.
    fn read_primitive(&mut self, expect: PrimKind) -> Result<PrimitiveValue, Error>;

    /// Reads a string value token.
    fn read_str(&mut self) -> Result<String, Error>;
}
