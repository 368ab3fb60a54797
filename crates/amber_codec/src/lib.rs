//! The amber object-graph codec engine.
//!
//! Encodes arbitrary, possibly cyclic, in-memory object graphs into
//! self-describing streams (binary, JSON-like, or XML-like) and
//! reconstructs the identical graph from them, shared-reference identity
//! and internal cycles included, even for types without a usable default
//! constructor.
//!
//! # Architecture
//!
//! - [`value`]: the member-access capability ([`Value`] and the per-kind
//!   access traits) the engine walks graphs with.
//! - [`schema`]: per-type structural schemas with embedded construction
//!   capabilities, built once and cached process-wide.
//! - [`registry`]: path → schema resolution for decoding, with a global
//!   registry and optional automatic registration.
//! - [`plugin`]: containers (surrogate providers) and filters.
//! - [`fmt`]: the wire-format adapter interface plus the three shipped
//!   adapters.
//! - [`Session`]: the public serialize/deserialize surface.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//!
//! use amber_codec::derive::Value;
//! use amber_codec::{Format, Session, SessionParams};
//!
//! #[derive(Value, Default, PartialEq, Debug)]
//! #[value(default)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let mut session = Session::new(Cursor::new(Vec::new()), SessionParams::new(Format::Binary));
//! session.serialize(&Point { x: 3, y: -4 }).unwrap();
//!
//! session.stream_mut().set_position(0);
//! let point: Point = session.deserialize_as().unwrap();
//! assert_eq!(point, Point { x: 3, y: -4 });
//! ```

// -----------------------------------------------------------------------------
// Extern Self

// The derive macro emits `::amber_codec::...` paths; this alias makes them
// resolve inside the crate itself (its own tests and doctests included).
extern crate self as amber_codec;

// -----------------------------------------------------------------------------
// Compilation config

#[cfg(feature = "auto_register")]
macro_rules! cfg_auto_register {
    ($($tt:tt)*) => { $($tt)* };
}

#[cfg(not(feature = "auto_register"))]
macro_rules! cfg_auto_register {
    ($($tt:tt)*) => {};
}

pub(crate) use cfg_auto_register;

// -----------------------------------------------------------------------------
// Modules

mod codec;
mod error;
mod impls;
mod path;
mod resolve;
mod session;

pub mod cell;
pub mod fmt;
pub mod plugin;
pub mod registry;
pub mod schema;
pub mod value;

// -----------------------------------------------------------------------------
// Top-level exports

pub use codec::MemberFailure;
pub use error::Error;
pub use fmt::{Format, FormatReader, FormatWriter, WIRE_VERSION};
pub use path::{DynTypePath, TypePath};
pub use plugin::{Container, FilterSet};
pub use registry::{SchemaRegistry, register_global};
pub use schema::{Schematic, TypeSchema};
pub use session::{Lenient, Session, SessionParams};
pub use value::{Placeholder, Value};

pub use amber_codec_derive as derive;

/// Support items for the derive macro; not public API.
#[doc(hidden)]
pub mod __private {
    pub use crate::cell::SchemaCell;

    crate::cfg_auto_register! {
        pub use crate::registry::AutoRegistration;
        pub use inventory;
    }
}

#[cfg(test)]
mod tests;
