//! Error types for schema construction and data encoding/decoding

use thiserror::Error;

/// Errors raised while turning schema text into a [`Codec`](crate::Codec).
///
/// These are construction-time errors and never retryable: the same input
/// always fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The schema is malformed or violates a constraint
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

impl SchemaError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SchemaError::InvalidSchema(msg.into())
    }
}

/// Errors raised while encoding or decoding a value against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// No union branch (or more than one) accepts the value
    #[error("no matching union branch: {reason}; allowed types: [{}]", .allowed.join(" "))]
    NoMatchingBranch {
        /// Why resolution failed
        reason: String,
        /// Qualified names of every branch of the union
        allowed: Vec<String>,
    },

    /// The value has no valid mapping to the target schema node
    #[error("cannot encode {target}: unsupported native value ({received})")]
    UnsupportedNativeType {
        /// Schema node or logical type being encoded
        target: String,
        /// Description of the offending value
        received: String,
    },

    /// Binary input ended before the value was complete
    #[error("short buffer: needed {needed} bytes, {remaining} remaining")]
    ShortBuffer {
        /// Bytes required by the read that failed
        needed: usize,
        /// Bytes that were still available
        remaining: usize,
    },

    /// Binary input is structurally invalid
    #[error("invalid binary data: {0}")]
    InvalidBinary(String),

    /// Textual input does not have the shape the schema requires
    #[error("invalid textual data: {0}")]
    InvalidTextual(String),

    /// A pattern-constrained string was rejected
    #[error("validation failed: {value:?} does not match pattern {pattern:?}")]
    ValidationFailed {
        /// The rejected string
        value: String,
        /// The pattern it was checked against
        pattern: String,
    },

    /// A logical-type transform failed
    #[error("conversion error: {0}")]
    Conversion(String),
}

impl CodecError {
    pub(crate) fn unsupported(target: impl Into<String>, received: impl Into<String>) -> Self {
        CodecError::UnsupportedNativeType {
            target: target.into(),
            received: received.into(),
        }
    }

    pub(crate) fn short(needed: usize, remaining: usize) -> Self {
        CodecError::ShortBuffer { needed, remaining }
    }

    pub(crate) fn textual(msg: impl Into<String>) -> Self {
        CodecError::InvalidTextual(msg.into())
    }

    pub(crate) fn binary(msg: impl Into<String>) -> Self {
        CodecError::InvalidBinary(msg.into())
    }

    pub(crate) fn conversion(msg: impl Into<String>) -> Self {
        CodecError::Conversion(msg.into())
    }

    /// Returns true when this is a [`CodecError::ShortBuffer`].
    pub fn is_short_buffer(&self) -> bool {
        matches!(self, CodecError::ShortBuffer { .. })
    }
}

/// Top-level error for callers mixing schema construction and data paths
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Schema construction failed
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Encoding or decoding failed
    #[error(transparent)]
    Codec(#[from] CodecError),
}
