//! Wire protocol error types.

use crate::content::ContentKind;
use thiserror::Error;

/// Wire protocol errors
#[derive(Error, Debug)]
pub enum WireError {
    /// Content present without a declared content type
    #[error("missing content type for node {0:?}")]
    MissingContentType(Option<u16>),

    /// Content type tag outside the known set
    #[error("unknown content type {0}")]
    UnknownContentType(u8),

    /// Node carries content or children but no id to frame it with
    #[error("node with content or children has no id")]
    MissingId,

    /// Content failed the range/type/encodability check of its kind
    #[error("invalid {kind:?} value: {reason}")]
    EncodingValue {
        /// Declared content kind
        kind: ContentKind,
        /// What was wrong with the value
        reason: String,
    },

    /// Raw content length does not match a fixed-width kind
    #[error("{kind:?} expects {expected} bytes, got {actual}")]
    ContentWidth {
        /// Requested content kind
        kind: ContentKind,
        /// Wire width of the kind
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Structural bytes do not match the expected marker/field shape
    #[error("malformed stream: {0}")]
    Framing(String),

    /// Byte source ran dry in the middle of a field
    #[error("missing bytes: need {needed}, have {available}")]
    MissingBytes {
        /// Bytes the current field requires
        needed: usize,
        /// Bytes that were available
        available: usize,
    },

    /// Byte source ended with containers still open
    #[error("incomplete tree: {open} container(s) not closed")]
    Incomplete {
        /// Number of containers left open
        open: usize,
    },

    /// Size limit exceeded
    #[error("size limit exceeded: {0}")]
    Size(usize),

    /// I/O failure of the underlying byte source
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Whether the input simply ended too early (mid-field or with open
    /// containers). Streaming callers may wait for more input; fixed-buffer
    /// callers should treat it as a truncated message.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            WireError::MissingBytes { .. } | WireError::Incomplete { .. }
        )
    }

    pub(crate) fn value(kind: ContentKind, reason: impl Into<String>) -> Self {
        WireError::EncodingValue {
            kind,
            reason: reason.into(),
        }
    }
}
