//! Avro schema types and parsing.
//!
//! This module defines the schema type graph, JSON parsing with named type
//! resolution, and the canonical form used for fingerprinting.

mod canonical;
mod parser;
mod resolution;
mod types;

pub use canonical::rabin_fingerprint;
pub use parser::{parse_schema, parse_schema_with_config, SchemaParser};
pub use types::*;
