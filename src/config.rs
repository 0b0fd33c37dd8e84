//! Codec construction options.
//!
//! `CodecConfig` controls how schema text is parsed and how defensively
//! binary input is decoded. It is consumed once by
//! [`Codec::with_config`](crate::Codec::with_config); the resulting codec
//! keeps only the limits it needs.

use crate::logical::LogicalTypeRegistry;

/// Options for building a [`Codec`](crate::Codec).
///
/// # Example
/// ```
/// use avrokit::CodecConfig;
///
/// let config = CodecConfig::new()
///     .with_strict_names(true)
///     .with_max_block_count(10_000);
/// assert!(config.strict_names);
/// ```
#[derive(Clone, Debug)]
pub struct CodecConfig {
    /// Logical types recognized while parsing (default: the standard set).
    pub registry: LogicalTypeRegistry,

    /// Reject names that break the Avro name grammar (default: false).
    ///
    /// When false, such names are accepted and logged at `warn` level.
    pub strict_names: bool,

    /// Maximum number of items in one decoded array or map, summed over all
    /// of its blocks (default: 16M).
    ///
    /// Larger counts fail decoding instead of attempting the allocation.
    pub max_block_count: usize,

    /// Maximum length prefix of a `bytes` or `string` value (default: 512MB).
    pub max_allocation_size: usize,

    /// Maximum nesting of records, arrays, maps and unions while decoding
    /// binary input (default: 512).
    ///
    /// Recursive schemas otherwise let a small buffer exhaust the stack.
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            registry: LogicalTypeRegistry::default(),
            strict_names: false,
            max_block_count: 16 * 1024 * 1024,
            max_allocation_size: 512 * 1024 * 1024, // 512MB
            max_depth: 512,
        }
    }
}

impl CodecConfig {
    /// Create a new `CodecConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the logical type registry.
    pub fn with_registry(mut self, registry: LogicalTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set strict name validation.
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Set the maximum number of items in a decoded array or map.
    pub fn with_max_block_count(mut self, limit: usize) -> Self {
        self.max_block_count = limit;
        self
    }

    /// Set the maximum `bytes`/`string` length accepted on decode.
    pub fn with_max_allocation_size(mut self, limit: usize) -> Self {
        self.max_allocation_size = limit;
        self
    }

    /// Set the maximum nesting depth accepted on binary decode.
    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_config_default() {
        let config = CodecConfig::default();
        assert!(!config.strict_names);
        assert_eq!(config.max_block_count, 16 * 1024 * 1024);
        assert_eq!(config.max_allocation_size, 512 * 1024 * 1024);
        assert_eq!(config.max_depth, 512);
        assert!(config.registry.contains("long", "timestamp-millis"));
    }

    #[test]
    fn test_codec_config_builder() {
        let config = CodecConfig::new()
            .with_registry(LogicalTypeRegistry::empty())
            .with_strict_names(true)
            .with_max_block_count(4)
            .with_max_allocation_size(64)
            .with_max_depth(8);

        assert!(config.strict_names);
        assert_eq!(config.max_block_count, 4);
        assert_eq!(config.max_allocation_size, 64);
        assert_eq!(config.max_depth, 8);
        assert!(!config.registry.contains("int", "date"));
    }
}
