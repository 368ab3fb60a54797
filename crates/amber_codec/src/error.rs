use core::{error, fmt};
use std::borrow::Cow;
use std::io;

// -----------------------------------------------------------------------------
// Error

/// An enumeration of every failure a serialize or deserialize call can report.
///
/// Errors abort the whole call; the stream cursor is left at an undefined but
/// monotonically-advanced position. Callers needing transactional behavior
/// should encode into a memory buffer before committing to a persistent sink.
#[derive(Debug)]
pub enum Error {
    /// No container, no matching constructor, no default allocator, and no
    /// placeholder capability: the type cannot participate.
    TypeNotSerializable {
        type_path: Cow<'static, str>,
        reason: Cow<'static, str>,
    },
    /// A container's `pack` or `unpack` failed; the inner cause is attached.
    ContainerTranscode {
        type_path: Cow<'static, str>,
        source: Box<dyn error::Error>,
    },
    /// Malformed or truncated token stream: unknown type tag, back-reference
    /// to an unregistered id, member-name mismatch, unexpected token.
    ///
    /// `at` is the member path the decoder had descended into when the
    /// failure surfaced; empty for top-level failures.
    Format { detail: String, at: String },
    /// The stream header carries a recognized format tag with a version this
    /// build does not support.
    VersionMismatch { found: u16, supported: u16 },
    /// A shared cell was already borrowed while the walk tried to traverse it.
    SharedBorrow { type_path: Cow<'static, str> },
    /// The underlying stream failed.
    Io(io::Error),
}

impl Error {
    /// Builds a [`Error::TypeNotSerializable`].
    #[inline]
    pub fn not_serializable(
        type_path: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::TypeNotSerializable {
            type_path: type_path.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`Error::Format`] without path context.
    ///
    /// The decoder attaches its member-path context while the error unwinds.
    #[inline]
    pub fn format(detail: impl Into<String>) -> Self {
        Self::Format {
            detail: detail.into(),
            at: String::new(),
        }
    }

    /// Attaches member-path context to a [`Error::Format`], keeping any
    /// context that was already present.
    pub(crate) fn with_context(self, context: &str) -> Self {
        match self {
            Self::Format { detail, at } if at.is_empty() => Self::Format {
                detail,
                at: String::from(context),
            },
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeNotSerializable { type_path, reason } => {
                write!(f, "type `{type_path}` is not serializable: {reason}")
            }
            Self::ContainerTranscode { type_path, source } => {
                write!(f, "container transcode failed for `{type_path}`: {source}")
            }
            Self::Format { detail, at } => {
                if at.is_empty() {
                    write!(f, "malformed stream: {detail}")
                } else {
                    write!(f, "malformed stream: {detail} (while decoding {at})")
                }
            }
            Self::VersionMismatch { found, supported } => {
                write!(
                    f,
                    "stream version {found} is not supported (this build reads version {supported})"
                )
            }
            Self::SharedBorrow { type_path } => {
                write!(f, "shared cell `{type_path}` is already borrowed")
            }
            Self::Io(source) => write!(f, "stream error: {source}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::ContainerTranscode { source, .. } => Some(source.as_ref()),
            Self::Io(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        // A short read means the token stream ended mid-token.
        if value.kind() == io::ErrorKind::UnexpectedEof {
            Self::format("unexpected end of stream")
        } else {
            Self::Io(value)
        }
    }
}
