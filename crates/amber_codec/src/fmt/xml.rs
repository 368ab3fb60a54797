//! The XML-like wire format.
//!
//! One element tree per call:
//!
//! ```text
//! <amber v="1"><v t="demo::Node" id="1"><m n="id"/><p k="i32">7</p></v></amber>
//! ```
//!
//! Elements: `<v>` node, `<r>` back-reference, `<null/>`, `<c>` count,
//! `<m>` member marker, `<p>` primitive, `<s>` string. The syntax is a
//! deliberate subset (no declarations, comments or namespaces), written
//! and tokenized by hand; member markers are self-closing so the token
//! order mirrors the engine protocol exactly.

use std::io::{Read, Write};

use crate::Error;
use crate::fmt::{FormatReader, FormatWriter, NodeStart, WIRE_VERSION};
use crate::schema::{PrimKind, PrimitiveValue};

// -----------------------------------------------------------------------------
// Escaping

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && c != '\t' && c != '\n' && c != '\r' => {
                out.push_str(&format!("&#x{:x};", c as u32));
            }
            c => out.push(c),
        }
    }
}

fn unescape(text: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let end = rest
            .find(';')
            .ok_or_else(|| Error::format("unterminated entity in xml text"))?;
        let entity = &rest[1..end];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let scalar = entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .and_then(char::from_u32)
                    .ok_or_else(|| Error::format(format!("unknown entity `&{entity};`")))?;
                out.push(scalar);
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

// -----------------------------------------------------------------------------
// XmlWriter

/// [`FormatWriter`] for the XML-like format.
pub struct XmlWriter<W> {
    sink: W,
}

impl<W: Write> XmlWriter<W> {
    /// Creates a writer over the given sink.
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    fn write_raw(&mut self, text: &str) -> Result<(), Error> {
        self.sink.write_all(text.as_bytes())?;
        Ok(())
    }

    fn write_attr_tag(&mut self, element: &str, attrs: &[(&str, &str)], self_closing: bool) -> Result<(), Error> {
        let mut tag = String::from("<");
        tag.push_str(element);
        for (key, value) in attrs {
            tag.push(' ');
            tag.push_str(key);
            tag.push_str("=\"");
            escape_into(&mut tag, value);
            tag.push('"');
        }
        if self_closing {
            tag.push('/');
        }
        tag.push('>');
        self.write_raw(&tag)
    }
}

impl<W: Write> FormatWriter for XmlWriter<W> {
    fn write_header(&mut self) -> Result<(), Error> {
        let version = WIRE_VERSION.to_string();
        self.write_attr_tag("amber", &[("v", &version)], false)
    }

    fn begin_node(&mut self, path: &str, id: Option<u32>) -> Result<(), Error> {
        match id {
            Some(id) => {
                let id = id.to_string();
                self.write_attr_tag("v", &[("t", path), ("id", &id)], false)
            }
            None => self.write_attr_tag("v", &[("t", path)], false),
        }
    }

    fn end_node(&mut self) -> Result<(), Error> {
        self.write_raw("</v>")
    }

    fn write_null(&mut self) -> Result<(), Error> {
        self.write_raw("<null/>")
    }

    fn write_back_ref(&mut self, id: u32) -> Result<(), Error> {
        let id = id.to_string();
        self.write_attr_tag("r", &[("id", &id)], true)
    }

    fn write_count(&mut self, count: usize) -> Result<(), Error> {
        let count = count.to_string();
        self.write_attr_tag("c", &[("n", &count)], true)
    }

    fn member_name(&mut self, name: &str) -> Result<(), Error> {
        self.write_attr_tag("m", &[("n", name)], true)
    }

    fn write_primitive(&mut self, value: PrimitiveValue) -> Result<(), Error> {
        self.write_attr_tag("p", &[("k", value.kind().name())], false)?;
        let mut text = String::new();
        match value {
            PrimitiveValue::Char(c) => escape_into(&mut text, &c.to_string()),
            other => text = other.to_string(),
        }
        self.write_raw(&text)?;
        self.write_raw("</p>")
    }

    fn write_str(&mut self, value: &str) -> Result<(), Error> {
        let mut text = String::new();
        escape_into(&mut text, value);
        self.write_raw("<s>")?;
        self.write_raw(&text)?;
        self.write_raw("</s>")
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.write_raw("</amber>\n")?;
        self.sink.flush()?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tokenizer

#[derive(Debug)]
enum RawTag {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(String),
}

impl RawTag {
    fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
        attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// [`FormatReader`] for the XML-like format.
pub struct XmlReader<R> {
    source: R,
    peeked_byte: Option<u8>,
    peeked_tag: Option<RawTag>,
    // Set once the call's root closes; the wrapper element is consumed by
    // the next header read.
    wrapper_open: bool,
}

impl<R: Read> XmlReader<R> {
    /// Creates a reader over the given source.
    pub fn new(source: R) -> Self {
        Self {
            source,
            peeked_byte: None,
            peeked_tag: None,
            wrapper_open: false,
        }
    }

    fn next_byte(&mut self) -> Result<u8, Error> {
        if let Some(byte) = self.peeked_byte.take() {
            return Ok(byte);
        }
        let mut buf = [0];
        self.source.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn peek_byte(&mut self) -> Result<u8, Error> {
        if let Some(byte) = self.peeked_byte {
            return Ok(byte);
        }
        let byte = self.next_byte()?;
        self.peeked_byte = Some(byte);
        Ok(byte)
    }

    fn skip_whitespace(&mut self) -> Result<(), Error> {
        loop {
            match self.peek_byte() {
                Ok(byte) if byte.is_ascii_whitespace() => {
                    self.peeked_byte = None;
                }
                _ => return Ok(()),
            }
        }
    }

    // Parses one `<...>` tag, assuming the cursor sits at or before `<`.
    fn parse_tag(&mut self) -> Result<RawTag, Error> {
        self.skip_whitespace()?;
        if self.next_byte()? != b'<' {
            return Err(Error::format("expected a tag"));
        }
        let mut raw = Vec::new();
        loop {
            let byte = self.next_byte()?;
            if byte == b'>' {
                break;
            }
            raw.push(byte);
        }
        let inside =
            String::from_utf8(raw).map_err(|_| Error::format("invalid utf-8 in stream"))?;

        if let Some(name) = inside.strip_prefix('/') {
            return Ok(RawTag::Close(String::from(name.trim())));
        }

        let self_closing = inside.ends_with('/');
        let inside = inside.strip_suffix('/').unwrap_or(&inside);

        let mut parts = inside.splitn(2, ' ');
        let name = String::from(parts.next().unwrap_or_default());
        let mut attrs = Vec::new();
        if let Some(mut rest) = parts.next() {
            loop {
                rest = rest.trim_start();
                if rest.is_empty() {
                    break;
                }
                let eq = rest
                    .find("=\"")
                    .ok_or_else(|| Error::format("malformed attribute"))?;
                let key = String::from(&rest[..eq]);
                let value_start = &rest[eq + 2..];
                let quote = value_start
                    .find('"')
                    .ok_or_else(|| Error::format("unterminated attribute value"))?;
                attrs.push((key, unescape(&value_start[..quote])?));
                rest = &value_start[quote + 1..];
            }
        }
        Ok(RawTag::Open {
            name,
            attrs,
            self_closing,
        })
    }

    fn next_tag(&mut self) -> Result<RawTag, Error> {
        if let Some(tag) = self.peeked_tag.take() {
            return Ok(tag);
        }
        self.parse_tag()
    }

    fn peek_tag(&mut self) -> Result<&RawTag, Error> {
        if self.peeked_tag.is_none() {
            let tag = self.parse_tag()?;
            self.peeked_tag = Some(tag);
        }
        Ok(self.peeked_tag.as_ref().expect("just peeked"))
    }

    // Reads element text content up to the closing tag of `element`.
    fn read_text(&mut self, element: &str) -> Result<String, Error> {
        let mut raw = Vec::new();
        loop {
            let byte = self.peek_byte()?;
            if byte == b'<' {
                break;
            }
            self.peeked_byte = None;
            raw.push(byte);
        }
        let text =
            String::from_utf8(raw).map_err(|_| Error::format("invalid utf-8 in stream"))?;
        match self.next_tag()? {
            RawTag::Close(name) if name == element => unescape(&text),
            other => Err(Error::format(format!(
                "expected `</{element}>`, found {other:?}"
            ))),
        }
    }
}

impl<R: Read> FormatReader for XmlReader<R> {
    fn read_header(&mut self, accept_legacy: bool) -> Result<(), Error> {
        if self.wrapper_open {
            // Close out the previous call's wrapper element.
            match self.next_tag()? {
                RawTag::Close(name) if name == "amber" => {}
                other => {
                    return Err(Error::format(format!(
                        "expected `</amber>`, found {other:?}"
                    )));
                }
            }
            self.wrapper_open = false;
        }
        match self.next_tag()? {
            RawTag::Open { name, attrs, .. } if name == "amber" => {
                let version = RawTag::attr(&attrs, "v")
                    .and_then(|v| v.parse::<u16>().ok())
                    .ok_or_else(|| Error::format("document does not carry the format tag"))?;
                if version != WIRE_VERSION {
                    // No legacy xml layouts exist yet; see the binary reader.
                    let _ = accept_legacy;
                    return Err(Error::VersionMismatch {
                        found: version,
                        supported: WIRE_VERSION,
                    });
                }
                self.wrapper_open = true;
                Ok(())
            }
            other => Err(Error::format(format!(
                "stream does not start with the format tag (found {other:?})"
            ))),
        }
    }

    fn read_node_start(&mut self) -> Result<NodeStart, Error> {
        match self.next_tag()? {
            RawTag::Open { name, attrs, .. } if name == "v" => {
                let path = RawTag::attr(&attrs, "t")
                    .ok_or_else(|| Error::format("node is missing its type tag"))?;
                let id = match RawTag::attr(&attrs, "id") {
                    Some(raw) => Some(
                        raw.parse::<u32>()
                            .map_err(|_| Error::format("malformed reference id"))?,
                    ),
                    None => None,
                };
                Ok(NodeStart::Begin {
                    path: String::from(path),
                    id,
                })
            }
            RawTag::Open { name, .. } if name == "null" => Ok(NodeStart::Null),
            RawTag::Open { name, attrs, .. } if name == "r" => {
                let id = RawTag::attr(&attrs, "id")
                    .and_then(|raw| raw.parse::<u32>().ok())
                    .ok_or_else(|| Error::format("malformed reference id"))?;
                Ok(NodeStart::BackRef(id))
            }
            other => Err(Error::format(format!("expected a node, found {other:?}"))),
        }
    }

    fn read_node_end(&mut self) -> Result<(), Error> {
        match self.next_tag()? {
            RawTag::Close(name) if name == "v" => Ok(()),
            other => Err(Error::format(format!(
                "expected end of node, found {other:?}"
            ))),
        }
    }

    fn take_null(&mut self) -> Result<bool, Error> {
        let is_null = matches!(self.peek_tag()?, RawTag::Open { name, .. } if name == "null");
        if is_null {
            self.peeked_tag = None;
        }
        Ok(is_null)
    }

    fn read_count(&mut self) -> Result<usize, Error> {
        match self.next_tag()? {
            RawTag::Open { name, attrs, .. } if name == "c" => RawTag::attr(&attrs, "n")
                .and_then(|raw| raw.parse::<usize>().ok())
                .ok_or_else(|| Error::format("malformed count")),
            other => Err(Error::format(format!("expected a count, found {other:?}"))),
        }
    }

    fn read_member_name(&mut self) -> Result<String, Error> {
        match self.next_tag()? {
            RawTag::Open { name, attrs, .. } if name == "m" => RawTag::attr(&attrs, "n")
                .map(String::from)
                .ok_or_else(|| Error::format("member marker is missing its name")),
            other => Err(Error::format(format!(
                "expected a member name, found {other:?}"
            ))),
        }
    }

    fn read_primitive(&mut self, expect: PrimKind) -> Result<PrimitiveValue, Error> {
        let attrs = match self.next_tag()? {
            RawTag::Open { name, attrs, .. } if name == "p" => attrs,
            other => {
                return Err(Error::format(format!(
                    "expected a {expect} value, found {other:?}"
                )));
            }
        };
        let declared = RawTag::attr(&attrs, "k")
            .ok_or_else(|| Error::format("primitive is missing its kind"))?;
        if declared != expect.name() {
            return Err(Error::format(format!(
                "expected a {expect} value, found {declared}"
            )));
        }
        let text = self.read_text("p")?;

        fn parse<T: core::str::FromStr>(text: &str, expect: PrimKind) -> Result<T, Error> {
            text.parse()
                .map_err(|_| Error::format(format!("malformed {expect} value `{text}`")))
        }

        Ok(match expect {
            PrimKind::Bool => PrimitiveValue::Bool(parse(&text, expect)?),
            PrimKind::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => PrimitiveValue::Char(c),
                    _ => return Err(Error::format("malformed char value")),
                }
            }
            PrimKind::U8 => PrimitiveValue::U8(parse(&text, expect)?),
            PrimKind::U16 => PrimitiveValue::U16(parse(&text, expect)?),
            PrimKind::U32 => PrimitiveValue::U32(parse(&text, expect)?),
            PrimKind::U64 => PrimitiveValue::U64(parse(&text, expect)?),
            PrimKind::U128 => PrimitiveValue::U128(parse(&text, expect)?),
            PrimKind::Usize => PrimitiveValue::Usize(parse(&text, expect)?),
            PrimKind::I8 => PrimitiveValue::I8(parse(&text, expect)?),
            PrimKind::I16 => PrimitiveValue::I16(parse(&text, expect)?),
            PrimKind::I32 => PrimitiveValue::I32(parse(&text, expect)?),
            PrimKind::I64 => PrimitiveValue::I64(parse(&text, expect)?),
            PrimKind::I128 => PrimitiveValue::I128(parse(&text, expect)?),
            PrimKind::Isize => PrimitiveValue::Isize(parse(&text, expect)?),
            PrimKind::F32 => PrimitiveValue::F32(parse(&text, expect)?),
            PrimKind::F64 => PrimitiveValue::F64(parse(&text, expect)?),
        })
    }

    fn read_str(&mut self) -> Result<String, Error> {
        match self.next_tag()? {
            RawTag::Open { name, .. } if name == "s" => self.read_text("s"),
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
    fn tokens_round_trip_with_escaping() {
        let mut bytes = Vec::new();
        {
            let mut writer = XmlWriter::new(&mut bytes);
            writer.write_header().unwrap();
            writer.begin_node("alloc::vec::Vec<i32>", None).unwrap();
            writer.write_count(2).unwrap();
            writer.write_str("a < b & \"c\"").unwrap();
            writer.write_null().unwrap();
            writer.end_node().unwrap();
            writer.finish().unwrap();
        }

        let mut reader = XmlReader::new(bytes.as_slice());
        reader.read_header(false).unwrap();
        match reader.read_node_start().unwrap() {
            NodeStart::Begin { path, .. } => assert_eq!(path, "alloc::vec::Vec<i32>"),
            other => panic!("unexpected node start: {other:?}"),
        }
        assert_eq!(reader.read_count().unwrap(), 2);
        assert!(!reader.take_null().unwrap());
        assert_eq!(reader.read_str().unwrap(), "a < b & \"c\"");
        assert!(reader.take_null().unwrap());
        reader.read_node_end().unwrap();
    }

    #[test]
    fn empty_string_is_not_null() {
        let mut bytes = Vec::new();
        {
            let mut writer = XmlWriter::new(&mut bytes);
            writer.write_header().unwrap();
            writer.write_str("").unwrap();
            writer.finish().unwrap();
        }

        let mut reader = XmlReader::new(bytes.as_slice());
        reader.read_header(false).unwrap();
        assert!(!reader.take_null().unwrap());
        assert_eq!(reader.read_str().unwrap(), "");
    }

    #[test]
    fn sequential_documents_share_one_stream() {
        let mut bytes = Vec::new();
        {
            let mut writer = XmlWriter::new(&mut bytes);
            for text in ["one", "two"] {
                writer.write_header().unwrap();
                writer.write_str(text).unwrap();
                writer.finish().unwrap();
            }
        }

        let mut reader = XmlReader::new(bytes.as_slice());
        reader.read_header(false).unwrap();
        assert_eq!(reader.read_str().unwrap(), "one");
        reader.read_header(false).unwrap();
        assert_eq!(reader.read_str().unwrap(), "two");
    }
}
