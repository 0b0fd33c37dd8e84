//! Schema-driven Avro codec with logical types
//!
//! This library converts between native values and the Avro binary and
//! textual (JSON) encodings. Logical types such as timestamps, dates,
//! decimals and pattern-validated strings are mapped onto their primitive
//! wire representations by a pluggable registry.
//!
//! # Example
//! ```
//! use avrokit::{Codec, Value};
//!
//! let codec = Codec::new(r#"{
//!     "type": "record",
//!     "name": "Reading",
//!     "fields": [
//!         {"name": "sensor", "type": "string"},
//!         {"name": "value", "type": {"type": "bytes", "logicalType": "decimal", "precision": 6, "scale": 2}}
//!     ]
//! }"#).unwrap();
//!
//! let reading = Value::record([
//!     ("sensor", Value::from("t1")),
//!     ("value", Value::decimal(2150, 2)),
//! ]);
//!
//! let binary = codec.binary_from_native(&reading).unwrap();
//! let (decoded, _) = codec.native_from_binary(&binary).unwrap();
//! assert_eq!(decoded, reading);
//!
//! let text = codec.textual_from_native(&decoded).unwrap();
//! let (from_text, _) = codec.native_from_textual(&text).unwrap();
//! assert_eq!(from_text, reading);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod logical;
pub mod schema;
pub mod value;

// Re-export main types
pub use codec::Codec;
pub use config::CodecConfig;
pub use error::{CodecError, Error, SchemaError};
pub use logical::{
    float_to_big_scaled, precision_and_scale_from_schema_map, LogicalContext, LogicalType,
    LogicalTypeRegistry,
};
pub use schema::{parse_schema, Schema, SchemaKind, SchemaRef};
pub use value::{zero_instant, Value};
