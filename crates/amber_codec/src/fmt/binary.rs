//! The binary wire format: explicit token bytes, little-endian payloads.

use std::io::{Read, Write};

use byteorder::{LE, ReadBytesExt, WriteBytesExt};

use crate::Error;
use crate::fmt::{FormatReader, FormatWriter, NodeStart, WIRE_VERSION};
use crate::schema::{PrimKind, PrimitiveValue};

const MAGIC: [u8; 4] = *b"AMBR";

// Token tags.
const TAG_NULL: u8 = 0x00;
const TAG_BACK_REF: u8 = 0x01;
const TAG_BEGIN: u8 = 0x02;
const TAG_END: u8 = 0x03;
const TAG_COUNT: u8 = 0x04;
const TAG_MEMBER: u8 = 0x05;
const TAG_PRIMITIVE: u8 = 0x06;
const TAG_STRING: u8 = 0x07;

const FLAG_HAS_ID: u8 = 0b0000_0001;

fn prim_tag(kind: PrimKind) -> u8 {
    match kind {
        PrimKind::Bool => 0,
        PrimKind::Char => 1,
        PrimKind::U8 => 2,
        PrimKind::U16 => 3,
        PrimKind::U32 => 4,
        PrimKind::U64 => 5,
        PrimKind::U128 => 6,
        PrimKind::Usize => 7,
        PrimKind::I8 => 8,
        PrimKind::I16 => 9,
        PrimKind::I32 => 10,
        PrimKind::I64 => 11,
        PrimKind::I128 => 12,
        PrimKind::Isize => 13,
        PrimKind::F32 => 14,
        PrimKind::F64 => 15,
    }
}

fn prim_kind(tag: u8) -> Option<PrimKind> {
    Some(match tag {
        0 => PrimKind::Bool,
        1 => PrimKind::Char,
        2 => PrimKind::U8,
        3 => PrimKind::U16,
        4 => PrimKind::U32,
        5 => PrimKind::U64,
        6 => PrimKind::U128,
        7 => PrimKind::Usize,
        8 => PrimKind::I8,
        9 => PrimKind::I16,
        10 => PrimKind::I32,
        11 => PrimKind::I64,
        12 => PrimKind::I128,
        13 => PrimKind::Isize,
        14 => PrimKind::F32,
        15 => PrimKind::F64,
        _ => return None,
    })
}

// -----------------------------------------------------------------------------
// BinaryWriter

/// [`FormatWriter`] for the binary format.
pub struct BinaryWriter<W> {
    sink: W,
}

impl<W: Write> BinaryWriter<W> {
    /// Creates a writer over the given sink.
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    fn write_short_str(&mut self, value: &str) -> Result<(), Error> {
        let bytes = value.as_bytes();
        let len = u16::try_from(bytes.len())
            .map_err(|_| Error::format(format!("name too long for wire: {} bytes", bytes.len())))?;
        self.sink.write_u16::<LE>(len)?;
        self.sink.write_all(bytes)?;
        Ok(())
    }
}

impl<W: Write> FormatWriter for BinaryWriter<W> {
    fn write_header(&mut self) -> Result<(), Error> {
        self.sink.write_all(&MAGIC)?;
        self.sink.write_u16::<LE>(WIRE_VERSION)?;
        Ok(())
    }

    fn begin_node(&mut self, path: &str, id: Option<u32>) -> Result<(), Error> {
        self.sink.write_u8(TAG_BEGIN)?;
        self.sink
            .write_u8(if id.is_some() { FLAG_HAS_ID } else { 0 })?;
        self.write_short_str(path)?;
        if let Some(id) = id {
            self.sink.write_u32::<LE>(id)?;
        }
        Ok(())
    }

    fn end_node(&mut self) -> Result<(), Error> {
        self.sink.write_u8(TAG_END)?;
        Ok(())
    }

    fn write_null(&mut self) -> Result<(), Error> {
        self.sink.write_u8(TAG_NULL)?;
        Ok(())
    }

    fn write_back_ref(&mut self, id: u32) -> Result<(), Error> {
        self.sink.write_u8(TAG_BACK_REF)?;
        self.sink.write_u32::<LE>(id)?;
        Ok(())
    }

    fn write_count(&mut self, count: usize) -> Result<(), Error> {
        self.sink.write_u8(TAG_COUNT)?;
        self.sink.write_u64::<LE>(count as u64)?;
        Ok(())
    }

    fn member_name(&mut self, name: &str) -> Result<(), Error> {
        self.sink.write_u8(TAG_MEMBER)?;
        self.write_short_str(name)
    }

    fn write_primitive(&mut self, value: PrimitiveValue) -> Result<(), Error> {
        self.sink.write_u8(TAG_PRIMITIVE)?;
        self.sink.write_u8(prim_tag(value.kind()))?;
        match value {
            PrimitiveValue::Bool(v) => self.sink.write_u8(u8::from(v))?,
            PrimitiveValue::Char(v) => self.sink.write_u32::<LE>(v as u32)?,
            PrimitiveValue::U8(v) => self.sink.write_u8(v)?,
            PrimitiveValue::U16(v) => self.sink.write_u16::<LE>(v)?,
            PrimitiveValue::U32(v) => self.sink.write_u32::<LE>(v)?,
            PrimitiveValue::U64(v) => self.sink.write_u64::<LE>(v)?,
            PrimitiveValue::U128(v) => self.sink.write_u128::<LE>(v)?,
            PrimitiveValue::Usize(v) => self.sink.write_u64::<LE>(v as u64)?,
            PrimitiveValue::I8(v) => self.sink.write_i8(v)?,
            PrimitiveValue::I16(v) => self.sink.write_i16::<LE>(v)?,
            PrimitiveValue::I32(v) => self.sink.write_i32::<LE>(v)?,
            PrimitiveValue::I64(v) => self.sink.write_i64::<LE>(v)?,
            PrimitiveValue::I128(v) => self.sink.write_i128::<LE>(v)?,
            PrimitiveValue::Isize(v) => self.sink.write_i64::<LE>(v as i64)?,
            PrimitiveValue::F32(v) => self.sink.write_f32::<LE>(v)?,
            PrimitiveValue::F64(v) => self.sink.write_f64::<LE>(v)?,
        }
        Ok(())
    }

    fn write_str(&mut self, value: &str) -> Result<(), Error> {
        self.sink.write_u8(TAG_STRING)?;
        let bytes = value.as_bytes();
        self.sink.write_u32::<LE>(bytes.len() as u32)?;
        self.sink.write_all(bytes)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.sink.flush()?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// BinaryReader

/// [`FormatReader`] for the binary format.
pub struct BinaryReader<R> {
    source: R,
    // One-byte lookahead for `take_null`.
    peeked: Option<u8>,
}

impl<R: Read> BinaryReader<R> {
    /// Creates a reader over the given source.
    pub fn new(source: R) -> Self {
        Self {
            source,
            peeked: None,
        }
    }

    fn next_tag(&mut self) -> Result<u8, Error> {
        if let Some(tag) = self.peeked.take() {
            return Ok(tag);
        }
        Ok(self.source.read_u8()?)
    }

    fn peek_tag(&mut self) -> Result<u8, Error> {
        if let Some(tag) = self.peeked {
            return Ok(tag);
        }
        let tag = self.source.read_u8()?;
        self.peeked = Some(tag);
        Ok(tag)
    }

    fn expect_tag(&mut self, expected: u8, what: &str) -> Result<(), Error> {
        let tag = self.next_tag()?;
        if tag != expected {
            return Err(Error::format(format!(
                "expected {what}, found token 0x{tag:02x}"
            )));
        }
        Ok(())
    }

    fn read_short_str(&mut self) -> Result<String, Error> {
        let len = self.source.read_u16::<LE>()? as usize;
        self.read_utf8(len)
    }

    fn read_utf8(&mut self, len: usize) -> Result<String, Error> {
        let mut bytes = vec![0; len];
        self.source.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|_| Error::format("invalid utf-8 in stream"))
    }
}

impl<R: Read> FormatReader for BinaryReader<R> {
    fn read_header(&mut self, accept_legacy: bool) -> Result<(), Error> {
        let mut magic = [0; 4];
        self.source.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::format("stream does not start with the format tag"));
        }
        let version = self.source.read_u16::<LE>()?;
        if version != WIRE_VERSION {
            // No legacy binary layouts exist yet, so the opt-in accepts
            // nothing; the check stays so the contract is enforced in one
            // place once they do.
            let _ = accept_legacy;
            return Err(Error::VersionMismatch {
                found: version,
                supported: WIRE_VERSION,
            });
        }
        Ok(())
    }

    fn read_node_start(&mut self) -> Result<NodeStart, Error> {
        let tag = self.next_tag()?;
        match tag {
            TAG_NULL => Ok(NodeStart::Null),
            TAG_BACK_REF => Ok(NodeStart::BackRef(self.source.read_u32::<LE>()?)),
            TAG_BEGIN => {
                let flags = self.source.read_u8()?;
                let path = self.read_short_str()?;
                let id = if flags & FLAG_HAS_ID != 0 {
                    Some(self.source.read_u32::<LE>()?)
                } else {
                    None
                };
                Ok(NodeStart::Begin { path, id })
            }
            other => Err(Error::format(format!(
                "expected a node, found token 0x{other:02x}"
            ))),
        }
    }

    fn read_node_end(&mut self) -> Result<(), Error> {
        self.expect_tag(TAG_END, "end of node")
    }

    fn take_null(&mut self) -> Result<bool, Error> {
        if self.peek_tag()? == TAG_NULL {
            self.peeked = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn read_count(&mut self) -> Result<usize, Error> {
        self.expect_tag(TAG_COUNT, "a count")?;
        let count = self.source.read_u64::<LE>()?;
        usize::try_from(count).map_err(|_| Error::format("count exceeds address space"))
    }

    fn read_member_name(&mut self) -> Result<String, Error> {
        self.expect_tag(TAG_MEMBER, "a member name")?;
        self.read_short_str()
    }

    fn read_primitive(&mut self, expect: PrimKind) -> Result<PrimitiveValue, Error> {
        self.expect_tag(TAG_PRIMITIVE, "a primitive value")?;
        let tag = self.source.read_u8()?;
        let kind = prim_kind(tag)
            .ok_or_else(|| Error::format(format!("unknown primitive tag 0x{tag:02x}")))?;
        if kind != expect {
            return Err(Error::format(format!(
                "expected a {expect} value, found {kind}"
            )));
        }
        Ok(match kind {
            PrimKind::Bool => PrimitiveValue::Bool(self.source.read_u8()? != 0),
            PrimKind::Char => {
                let raw = self.source.read_u32::<LE>()?;
                PrimitiveValue::Char(
                    char::from_u32(raw)
                        .ok_or_else(|| Error::format("invalid char scalar in stream"))?,
                )
            }
            PrimKind::U8 => PrimitiveValue::U8(self.source.read_u8()?),
            PrimKind::U16 => PrimitiveValue::U16(self.source.read_u16::<LE>()?),
            PrimKind::U32 => PrimitiveValue::U32(self.source.read_u32::<LE>()?),
            PrimKind::U64 => PrimitiveValue::U64(self.source.read_u64::<LE>()?),
            PrimKind::U128 => PrimitiveValue::U128(self.source.read_u128::<LE>()?),
            PrimKind::Usize => {
                let raw = self.source.read_u64::<LE>()?;
                PrimitiveValue::Usize(
                    usize::try_from(raw)
                        .map_err(|_| Error::format("usize value exceeds address space"))?,
                )
            }
            PrimKind::I8 => PrimitiveValue::I8(self.source.read_i8()?),
            PrimKind::I16 => PrimitiveValue::I16(self.source.read_i16::<LE>()?),
            PrimKind::I32 => PrimitiveValue::I32(self.source.read_i32::<LE>()?),
            PrimKind::I64 => PrimitiveValue::I64(self.source.read_i64::<LE>()?),
            PrimKind::I128 => PrimitiveValue::I128(self.source.read_i128::<LE>()?),
            PrimKind::Isize => {
                let raw = self.source.read_i64::<LE>()?;
                PrimitiveValue::Isize(
                    isize::try_from(raw)
                        .map_err(|_| Error::format("isize value exceeds address space"))?,
                )
            }
            PrimKind::F32 => PrimitiveValue::F32(self.source.read_f32::<LE>()?),
            PrimKind::F64 => PrimitiveValue::F64(self.source.read_f64::<LE>()?),
        })
    }

    fn read_str(&mut self) -> Result<String, Error> {
        self.expect_tag(TAG_STRING, "a string value")?;
        let len = self.source.read_u32::<LE>()? as usize;
        self.read_utf8(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        let mut bytes = Vec::new();
        {
            let mut writer = BinaryWriter::new(&mut bytes);
            writer.write_header().unwrap();
            writer.begin_node("demo::Foo", Some(1)).unwrap();
            writer.member_name("id").unwrap();
            writer.write_primitive(PrimitiveValue::I64(i64::MIN)).unwrap();
            writer.member_name("label").unwrap();
            writer.write_str("héllo").unwrap();
            writer.end_node().unwrap();
            writer.finish().unwrap();
        }

        let mut reader = BinaryReader::new(bytes.as_slice());
        reader.read_header(false).unwrap();
        match reader.read_node_start().unwrap() {
            NodeStart::Begin { path, id } => {
                assert_eq!(path, "demo::Foo");
                assert_eq!(id, Some(1));
            }
            other => panic!("unexpected node start: {other:?}"),
        }
        assert_eq!(reader.read_member_name().unwrap(), "id");
        assert!(!reader.take_null().unwrap());
        assert_eq!(
            reader.read_primitive(PrimKind::I64).unwrap(),
            PrimitiveValue::I64(i64::MIN)
        );
        assert_eq!(reader.read_member_name().unwrap(), "label");
        assert_eq!(reader.read_str().unwrap(), "héllo");
        reader.read_node_end().unwrap();
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = Vec::new();
        {
            let mut writer = BinaryWriter::new(&mut bytes);
            writer.write_header().unwrap();
        }
        // Doctor the version.
        bytes[4] = 9;
        let mut reader = BinaryReader::new(bytes.as_slice());
        match reader.read_header(false) {
            Err(Error::VersionMismatch { found, supported }) => {
                assert_eq!(found, 9);
                assert_eq!(supported, WIRE_VERSION);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn truncated_stream_is_a_format_error() {
        let mut bytes = Vec::new();
        {
            let mut writer = BinaryWriter::new(&mut bytes);
            writer.write_header().unwrap();
            writer.write_str("truncate me").unwrap();
        }
        bytes.truncate(bytes.len() - 4);
        let mut reader = BinaryReader::new(bytes.as_slice());
        reader.read_header(false).unwrap();
        assert!(matches!(reader.read_str(), Err(Error::Format { .. })));
    }
}
