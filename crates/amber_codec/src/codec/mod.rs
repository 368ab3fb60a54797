//! The graph-walking engine: encoder, decoder, and their reference tables.

mod decode;
mod encode;
mod refs;

pub(crate) use decode::GraphDecoder;
pub(crate) use encode::GraphEncoder;
pub(crate) use refs::{DecodeRefs, EncodeRefs};

// -----------------------------------------------------------------------------
// MemberFailure

/// One member-level failure recorded by a best-effort call.
#[derive(Debug)]
pub struct MemberFailure {
    /// Dotted member path from the root, e.g. `inner.label`.
    pub path: String,
    /// What went wrong.
    pub detail: String,
}
