//! Compiled codecs.
//!
//! A [`Codec`] is a parsed schema plus the limits used while decoding. It
//! converts native [`Value`]s to and from the binary and textual (JSON) wire
//! formats. Building one is the only step that can fail with a
//! [`SchemaError`]; every data-path call returns a [`CodecError`].
//!
//! # Example
//! ```
//! use avrokit::{Codec, Value};
//! use chrono::{TimeZone, Utc};
//!
//! let codec = Codec::new(r#"["null", {"type": "long", "logicalType": "timestamp-millis"}]"#).unwrap();
//! let when = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
//!
//! let binary = codec
//!     .binary_from_native(&Value::union("long.timestamp-millis", when))
//!     .unwrap();
//! let (decoded, rest) = codec.native_from_binary(&binary).unwrap();
//! assert!(rest.is_empty());
//! assert_eq!(decoded.get("long.timestamp-millis"), Some(&Value::Instant(when)));
//! ```

mod binary;
mod textual;
mod union;
pub mod varint;

use tracing::debug;

use crate::config::CodecConfig;
use crate::error::{CodecError, SchemaError};
use crate::schema::{parse_schema_with_config, rabin_fingerprint, Schema, SchemaRef};
use crate::value::Value;

use binary::{BinaryDecoder, BinaryEncoder};
pub(crate) use textual::default_value;

/// Guards applied while decoding untrusted binary input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DecodeLimits {
    pub max_block_count: usize,
    pub max_allocation_size: usize,
    pub max_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        let config = CodecConfig::default();
        Self::from(&config)
    }
}

impl From<&CodecConfig> for DecodeLimits {
    fn from(config: &CodecConfig) -> Self {
        Self {
            max_block_count: config.max_block_count,
            max_allocation_size: config.max_allocation_size,
            max_depth: config.max_depth,
        }
    }
}

/// Error for a value whose variant the node cannot encode.
pub(crate) fn mismatch(schema: &Schema, r: SchemaRef, value: &Value) -> CodecError {
    let target = schema.qualified_name(r);
    let received = format!("expected {}, received {}", target, value.type_name());
    CodecError::unsupported(target, received)
}

/// An immutable, thread-safe encoder/decoder for one schema.
///
/// Holds no mutable state, so a single instance can be shared (for example
/// behind an `Arc`) by any number of threads.
#[derive(Debug, Clone)]
pub struct Codec {
    schema: Schema,
    limits: DecodeLimits,
    canonical: String,
    fingerprint: u64,
}

impl Codec {
    /// Build a codec from schema text with the default configuration.
    pub fn new(schema: &str) -> Result<Self, SchemaError> {
        Self::with_config(schema, &CodecConfig::default())
    }

    /// Build a codec from schema text.
    ///
    /// # Errors
    /// `SchemaError::InvalidSchema` if the text is not valid JSON, violates
    /// the schema grammar, references an undefined name, or carries invalid
    /// logical type properties.
    pub fn with_config(schema: &str, config: &CodecConfig) -> Result<Self, SchemaError> {
        let schema = parse_schema_with_config(schema, config)?;
        Ok(Self::from_schema(schema, config))
    }

    /// Build a codec around an already parsed schema.
    pub fn from_schema(schema: Schema, config: &CodecConfig) -> Self {
        let canonical = schema.canonical_form();
        let fingerprint = rabin_fingerprint(canonical.as_bytes());

        debug!(
            root = %schema.qualified_name(schema.root()),
            fingerprint = %format!("{:016x}", fingerprint),
            "Built codec"
        );

        Self {
            schema,
            limits: DecodeLimits::from(config),
            canonical,
            fingerprint,
        }
    }

    /// The parsed schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The schema in Parsing Canonical Form.
    pub fn canonical_schema(&self) -> &str {
        &self.canonical
    }

    /// Rabin fingerprint of the canonical schema.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Encode `value` into a new buffer.
    pub fn binary_from_native(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        self.append_binary(&mut buf, value)?;
        Ok(buf)
    }

    /// Append the encoding of `value` to `buf`.
    ///
    /// On error `buf` is truncated back to its length before the call, so
    /// bytes already in it are never corrupted.
    pub fn append_binary(&self, buf: &mut Vec<u8>, value: &Value) -> Result<(), CodecError> {
        let start = buf.len();
        let result = BinaryEncoder::new(&self.schema).encode(buf, self.schema.root(), value);
        if result.is_err() {
            buf.truncate(start);
        }
        result
    }

    /// Decode one value from the front of `data`.
    ///
    /// Returns the value and the bytes that follow it.
    ///
    /// # Errors
    /// `CodecError::ShortBuffer` if `data` ends before the value does.
    pub fn native_from_binary<'a>(&self, data: &'a [u8]) -> Result<(Value, &'a [u8]), CodecError> {
        let mut cursor = data;
        let value = BinaryDecoder::new(&self.schema, self.limits)
            .decode(&mut cursor, self.schema.root())?;
        Ok((value, cursor))
    }

    /// Encode `value` as JSON text.
    pub fn textual_from_native(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let json = textual::to_json(&self.schema, self.schema.root(), value)?;
        serde_json::to_vec(&json).map_err(|e| CodecError::textual(e.to_string()))
    }

    /// Decode the first JSON value in `data`.
    ///
    /// Returns the value and the bytes after the end of that JSON value.
    /// Empty or truncated input fails with `CodecError::ShortBuffer`.
    pub fn native_from_textual<'a>(&self, data: &'a [u8]) -> Result<(Value, &'a [u8]), CodecError> {
        let mut stream =
            serde_json::Deserializer::from_slice(data).into_iter::<serde_json::Value>();
        let json = match stream.next() {
            Some(Ok(json)) => json,
            Some(Err(e)) if e.is_eof() => return Err(CodecError::short(1, 0)),
            Some(Err(e)) => return Err(CodecError::textual(e.to_string())),
            None => return Err(CodecError::short(1, 0)),
        };
        let offset = stream.byte_offset();
        let value = textual::from_json(&self.schema, self.schema.root(), &json)?;
        Ok((value, &data[offset..]))
    }
}
