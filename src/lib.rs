#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use amber_codec as codec;

pub use amber_codec::derive;
pub use amber_codec::{Error, Format, Session, SessionParams};
pub use amber_codec::{Placeholder, Schematic, Value};
