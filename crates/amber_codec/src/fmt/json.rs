//! The JSON-like wire format.
//!
//! One JSON document per call: `{"amber": <version>, "root": <node>}`.
//! Nodes are objects carrying `$type` and optionally `$id`; back-references
//! are `{"$ref": id}`; object members sit under `$members` (order
//! preserved), sequence/mapping children under `$items`, and a lone nested
//! value (shared pointee, container surrogate) under `$value`. 128-bit
//! integers and non-finite floats travel as strings.

use std::collections::VecDeque;
use std::io::{Read, Write};

use serde_json::{Map, Number, Value as Json};

use crate::Error;
use crate::fmt::{FormatReader, FormatWriter, NodeStart, WIRE_VERSION};
use crate::schema::{PrimKind, PrimitiveValue};

// -----------------------------------------------------------------------------
// JsonWriter

struct Frame {
    node: Map<String, Json>,
    items: Option<Vec<Json>>,
    members: Option<Map<String, Json>>,
    value: Option<Json>,
    pending_member: Option<String>,
}

/// [`FormatWriter`] for the JSON-like format.
///
/// The document is assembled in memory and written on [`finish`]; the
/// stream cursor advances once per call.
///
/// [`finish`]: FormatWriter::finish
pub struct JsonWriter<W> {
    sink: W,
    stack: Vec<Frame>,
    root: Option<Json>,
}

impl<W: Write> JsonWriter<W> {
    /// Creates a writer over the given sink.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            stack: Vec::new(),
            root: None,
        }
    }

    fn attach(&mut self, value: Json) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(frame) => {
                if let Some(name) = frame.pending_member.take() {
                    frame
                        .members
                        .get_or_insert_with(Map::new)
                        .insert(name, value);
                } else if let Some(items) = frame.items.as_mut() {
                    items.push(value);
                } else if frame.value.is_none() {
                    frame.value = Some(value);
                } else {
                    return Err(Error::format("json node received two nested values"));
                }
            }
            None => self.root = Some(value),
        }
        Ok(())
    }
}

fn primitive_to_json(value: PrimitiveValue) -> Json {
    fn float(value: f64) -> Json {
        match Number::from_f64(value) {
            Some(number) => Json::Number(number),
            None if value.is_nan() => Json::String(String::from("NaN")),
            None if value > 0.0 => Json::String(String::from("inf")),
            None => Json::String(String::from("-inf")),
        }
    }

    match value {
        PrimitiveValue::Bool(v) => Json::Bool(v),
        PrimitiveValue::Char(v) => Json::String(v.to_string()),
        PrimitiveValue::U8(v) => Json::from(v),
        PrimitiveValue::U16(v) => Json::from(v),
        PrimitiveValue::U32(v) => Json::from(v),
        PrimitiveValue::U64(v) => Json::from(v),
        PrimitiveValue::U128(v) => Json::String(v.to_string()),
        PrimitiveValue::Usize(v) => Json::from(v as u64),
        PrimitiveValue::I8(v) => Json::from(v),
        PrimitiveValue::I16(v) => Json::from(v),
        PrimitiveValue::I32(v) => Json::from(v),
        PrimitiveValue::I64(v) => Json::from(v),
        PrimitiveValue::I128(v) => Json::String(v.to_string()),
        PrimitiveValue::Isize(v) => Json::from(v as i64),
        PrimitiveValue::F32(v) => float(f64::from(v)),
        PrimitiveValue::F64(v) => float(v),
    }
}

impl<W: Write> FormatWriter for JsonWriter<W> {
    fn write_header(&mut self) -> Result<(), Error> {
        // The version tag is part of the document, written on `finish`.
        Ok(())
    }

    fn begin_node(&mut self, path: &str, id: Option<u32>) -> Result<(), Error> {
        let mut node = Map::new();
        node.insert(String::from("$type"), Json::from(path));
        if let Some(id) = id {
            node.insert(String::from("$id"), Json::from(id));
        }
        self.stack.push(Frame {
            node,
            items: None,
            members: None,
            value: None,
            pending_member: None,
        });
        Ok(())
    }

    fn end_node(&mut self) -> Result<(), Error> {
        let mut frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::format("end of node without an open node"))?;
        if let Some(members) = frame.members.take() {
            frame
                .node
                .insert(String::from("$members"), Json::Object(members));
        }
        if let Some(items) = frame.items.take() {
            frame.node.insert(String::from("$items"), Json::Array(items));
        }
        if let Some(value) = frame.value.take() {
            frame.node.insert(String::from("$value"), value);
        }
        self.attach(Json::Object(frame.node))
    }

    fn write_null(&mut self) -> Result<(), Error> {
        self.attach(Json::Null)
    }

    fn write_back_ref(&mut self, id: u32) -> Result<(), Error> {
        let mut reference = Map::new();
        reference.insert(String::from("$ref"), Json::from(id));
        self.attach(Json::Object(reference))
    }

    fn write_count(&mut self, count: usize) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(frame) => {
                frame.items = Some(Vec::with_capacity(count));
                Ok(())
            }
            None => Err(Error::format("count written outside a node")),
        }
    }

    fn member_name(&mut self, name: &str) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(frame) => {
                frame.pending_member = Some(String::from(name));
                Ok(())
            }
            None => Err(Error::format("member name written outside a node")),
        }
    }

    fn write_primitive(&mut self, value: PrimitiveValue) -> Result<(), Error> {
        self.attach(primitive_to_json(value))
    }

    fn write_str(&mut self, value: &str) -> Result<(), Error> {
        self.attach(Json::from(value))
    }

    fn finish(&mut self) -> Result<(), Error> {
        let root = self
            .root
            .take()
            .ok_or_else(|| Error::format("no root value was written"))?;
        let mut doc = Map::new();
        doc.insert(String::from("amber"), Json::from(WIRE_VERSION));
        doc.insert(String::from("root"), root);
        serde_json::to_writer(&mut self.sink, &Json::Object(doc))
            .map_err(|e| Error::format(format!("json serialization failed: {e}")))?;
        self.sink.write_all(b"\n")?;
        self.sink.flush()?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// JsonReader

#[derive(Debug)]
enum Tok {
    Begin { path: String, id: Option<u32> },
    End,
    Count(usize),
    Member(String),
    Scalar(Json),
    Null,
    BackRef(u32),
}

/// [`FormatReader`] for the JSON-like format.
///
/// One document is parsed per header and flattened into the token order the
/// engine consumes.
pub struct JsonReader<R> {
    source: R,
    tokens: VecDeque<Tok>,
}

impl<R: Read> JsonReader<R> {
    /// Creates a reader over the given source.
    pub fn new(source: R) -> Self {
        Self {
            source,
            tokens: VecDeque::new(),
        }
    }

    fn next_token(&mut self, what: &str) -> Result<Tok, Error> {
        self.tokens
            .pop_front()
            .ok_or_else(|| Error::format(format!("expected {what}, found end of document")))
    }
}

fn read_ref_id(value: &Json) -> Result<u32, Error> {
    value
        .as_u64()
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| Error::format("reference id is not a 32-bit integer"))
}

fn flatten(value: &Json, out: &mut VecDeque<Tok>) -> Result<(), Error> {
    match value {
        Json::Null => out.push_back(Tok::Null),
        Json::Bool(_) | Json::Number(_) | Json::String(_) => {
            out.push_back(Tok::Scalar(value.clone()));
        }
        Json::Object(map) => {
            if let Some(id) = map.get("$ref") {
                out.push_back(Tok::BackRef(read_ref_id(id)?));
                return Ok(());
            }
            let path = map
                .get("$type")
                .and_then(Json::as_str)
                .ok_or_else(|| Error::format("json node is missing its $type tag"))?;
            let id = match map.get("$id") {
                Some(id) => Some(read_ref_id(id)?),
                None => None,
            };
            out.push_back(Tok::Begin {
                path: String::from(path),
                id,
            });
            if let Some(items) = map.get("$items") {
                let items = items
                    .as_array()
                    .ok_or_else(|| Error::format("$items is not an array"))?;
                out.push_back(Tok::Count(items.len()));
                for item in items {
                    flatten(item, out)?;
                }
            } else if let Some(members) = map.get("$members") {
                let members = members
                    .as_object()
                    .ok_or_else(|| Error::format("$members is not an object"))?;
                for (name, member) in members {
                    out.push_back(Tok::Member(name.clone()));
                    flatten(member, out)?;
                }
            } else if let Some(nested) = map.get("$value") {
                flatten(nested, out)?;
            }
            out.push_back(Tok::End);
        }
        Json::Array(_) => {
            return Err(Error::format("unexpected bare array in json document"));
        }
    }
    Ok(())
}

fn scalar_to_primitive(scalar: &Json, expect: PrimKind) -> Result<PrimitiveValue, Error> {
    fn reject(scalar: &Json, expect: PrimKind) -> Error {
        Error::format(format!("expected a {expect} value, found `{scalar}`"))
    }

    fn float(scalar: &Json, expect: PrimKind) -> Result<f64, Error> {
        match scalar {
            Json::Number(number) => number.as_f64().ok_or_else(|| reject(scalar, expect)),
            Json::String(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                _ => Err(reject(scalar, expect)),
            },
            _ => Err(reject(scalar, expect)),
        }
    }

    macro_rules! unsigned {
        ($variant:ident, $ty:ty) => {
            scalar
                .as_u64()
                .and_then(|raw| <$ty>::try_from(raw).ok())
                .map(PrimitiveValue::$variant)
                .ok_or_else(|| reject(scalar, expect))
        };
    }
    macro_rules! signed {
        ($variant:ident, $ty:ty) => {
            scalar
                .as_i64()
                .and_then(|raw| <$ty>::try_from(raw).ok())
                .map(PrimitiveValue::$variant)
                .ok_or_else(|| reject(scalar, expect))
        };
    }

    match expect {
        PrimKind::Bool => scalar
            .as_bool()
            .map(PrimitiveValue::Bool)
            .ok_or_else(|| reject(scalar, expect)),
        PrimKind::Char => {
            let text = scalar.as_str().ok_or_else(|| reject(scalar, expect))?;
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(PrimitiveValue::Char(c)),
                _ => Err(reject(scalar, expect)),
            }
        }
        PrimKind::U8 => unsigned!(U8, u8),
        PrimKind::U16 => unsigned!(U16, u16),
        PrimKind::U32 => unsigned!(U32, u32),
        PrimKind::U64 => unsigned!(U64, u64),
        PrimKind::U128 => scalar
            .as_str()
            .and_then(|text| text.parse().ok())
            .map(PrimitiveValue::U128)
            .ok_or_else(|| reject(scalar, expect)),
        PrimKind::Usize => unsigned!(Usize, usize),
        PrimKind::I8 => signed!(I8, i8),
        PrimKind::I16 => signed!(I16, i16),
        PrimKind::I32 => signed!(I32, i32),
        PrimKind::I64 => signed!(I64, i64),
        PrimKind::I128 => scalar
            .as_str()
            .and_then(|text| text.parse().ok())
            .map(PrimitiveValue::I128)
            .ok_or_else(|| reject(scalar, expect)),
        PrimKind::Isize => signed!(Isize, isize),
        PrimKind::F32 => Ok(PrimitiveValue::F32(float(scalar, expect)? as f32)),
        PrimKind::F64 => Ok(PrimitiveValue::F64(float(scalar, expect)?)),
    }
}

impl<R: Read> FormatReader for JsonReader<R> {
    fn read_header(&mut self, accept_legacy: bool) -> Result<(), Error> {
        // One document per call; the stream may hold more after it.
        let mut stream = serde_json::Deserializer::from_reader(&mut self.source).into_iter::<Json>();
        let doc = match stream.next() {
            Some(Ok(doc)) => doc,
            Some(Err(e)) => return Err(Error::format(format!("invalid json document: {e}"))),
            None => return Err(Error::format("unexpected end of stream")),
        };

        let version = doc
            .get("amber")
            .and_then(Json::as_u64)
            .ok_or_else(|| Error::format("document does not carry the format tag"))?;
        if version != u64::from(WIRE_VERSION) {
            // No legacy json layouts exist yet; see the binary reader.
            let _ = accept_legacy;
            return Err(Error::VersionMismatch {
                found: version.try_into().unwrap_or(u16::MAX),
                supported: WIRE_VERSION,
            });
        }

        let root = doc
            .get("root")
            .ok_or_else(|| Error::format("document has no root value"))?;
        self.tokens.clear();
        flatten(root, &mut self.tokens)
    }

    fn read_node_start(&mut self) -> Result<NodeStart, Error> {
        match self.next_token("a node")? {
            Tok::Null => Ok(NodeStart::Null),
            Tok::BackRef(id) => Ok(NodeStart::BackRef(id)),
            Tok::Begin { path, id } => Ok(NodeStart::Begin { path, id }),
            other => Err(Error::format(format!("expected a node, found {other:?}"))),
        }
    }

    fn read_node_end(&mut self) -> Result<(), Error> {
        match self.next_token("end of node")? {
            Tok::End => Ok(()),
            other => Err(Error::format(format!(
                "expected end of node, found {other:?}"
            ))),
        }
    }

    fn take_null(&mut self) -> Result<bool, Error> {
        if matches!(self.tokens.front(), Some(Tok::Null)) {
            self.tokens.pop_front();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn read_count(&mut self) -> Result<usize, Error> {
        match self.next_token("a count")? {
            Tok::Count(count) => Ok(count),
            other => Err(Error::format(format!("expected a count, found {other:?}"))),
        }
    }

    fn read_member_name(&mut self) -> Result<String, Error> {
        match self.next_token("a member name")? {
            Tok::Member(name) => Ok(name),
            other => Err(Error::format(format!(
                "expected a member name, found {other:?}"
            ))),
        }
    }

    fn read_primitive(&mut self, expect: PrimKind) -> Result<PrimitiveValue, Error> {
        match self.next_token("a primitive value")? {
            Tok::Scalar(scalar) => scalar_to_primitive(&scalar, expect),
            other => Err(Error::format(format!(
                "expected a {expect} value, found {other:?}"
            ))),
        }
    }

    fn read_str(&mut self) -> Result<String, Error> {
        match self.next_token("a string value")? {
            Tok::Scalar(Json::String(text)) => Ok(text),
            other => Err(Error::format(format!(
                "expected a string value, found {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_shape_and_round_trip() {
        let mut bytes = Vec::new();
        {
            let mut writer = JsonWriter::new(&mut bytes);
            writer.write_header().unwrap();
            writer.begin_node("demo::Pair", None).unwrap();
            writer.member_name("left").unwrap();
            writer.write_primitive(PrimitiveValue::I32(-7)).unwrap();
            writer.member_name("right").unwrap();
            writer.write_str("").unwrap();
            writer.end_node().unwrap();
            writer.finish().unwrap();
        }

        let doc: Json = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["amber"], Json::from(WIRE_VERSION));
        assert_eq!(doc["root"]["$type"], Json::from("demo::Pair"));
        assert_eq!(doc["root"]["$members"]["left"], Json::from(-7));

        let mut reader = JsonReader::new(bytes.as_slice());
        reader.read_header(false).unwrap();
        match reader.read_node_start().unwrap() {
            NodeStart::Begin { path, id } => {
                assert_eq!(path, "demo::Pair");
                assert_eq!(id, None);
            }
            other => panic!("unexpected node start: {other:?}"),
        }
        assert_eq!(reader.read_member_name().unwrap(), "left");
        assert_eq!(
            reader.read_primitive(PrimKind::I32).unwrap(),
            PrimitiveValue::I32(-7)
        );
        assert_eq!(reader.read_member_name().unwrap(), "right");
        assert_eq!(reader.read_str().unwrap(), "");
        reader.read_node_end().unwrap();
    }

    #[test]
    fn big_integers_travel_as_strings() {
        let mut bytes = Vec::new();
        {
            let mut writer = JsonWriter::new(&mut bytes);
            writer.write_header().unwrap();
            writer.begin_node("u128", None).unwrap();
            writer.write_primitive(PrimitiveValue::U128(u128::MAX)).unwrap();
            writer.end_node().unwrap();
            writer.finish().unwrap();
        }

        let mut reader = JsonReader::new(bytes.as_slice());
        reader.read_header(false).unwrap();
        reader.read_node_start().unwrap();
        assert_eq!(
            reader.read_primitive(PrimKind::U128).unwrap(),
            PrimitiveValue::U128(u128::MAX)
        );
        reader.read_node_end().unwrap();
    }
}
