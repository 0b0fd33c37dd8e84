//! Logical type registry.
//!
//! A logical type remaps the native representation of a node without
//! changing its wire encoding. The [`LogicalTypeRegistry`] maps
//! `(underlying type, logicalType name)` pairs to factories; at parse time a
//! factory validates the node's properties and builds a [`LogicalType`]
//! transformer that the codecs call on every encode and decode.
//!
//! Supported out of the box:
//!
//! | underlying      | logicalType        | native value          |
//! |-----------------|--------------------|-----------------------|
//! | `long`          | `timestamp-millis` | [`Value::Instant`]    |
//! | `long`          | `timestamp-micros` | [`Value::Instant`]    |
//! | `int`           | `time-millis`      | [`Value::Duration`]   |
//! | `long`          | `time-micros`      | [`Value::Duration`]   |
//! | `int`           | `date`             | [`Value::Instant`]    |
//! | `bytes`/`fixed` | `decimal`          | [`Value::Decimal`]    |
//! | `string`        | `validatedString`  | [`Value::String`]     |

mod decimal;
mod temporal;
mod validated;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value as JsonValue};

use crate::error::{CodecError, SchemaError};
use crate::value::Value;

pub use decimal::{
    big_scaled_to_rational, float_to_big_scaled, precision_and_scale_from_schema_map,
    rational_to_big_scaled, DecimalBytes, DecimalFixed,
};
pub use temporal::{Date, TimeMicros, TimeMillis, TimestampMicros, TimestampMillis};
pub use validated::ValidatedString;

/// A native ↔ underlying transformer attached to a schema node.
///
/// Implementations must be immutable after construction; one instance is
/// shared by every encode and decode through the owning codec.
pub trait LogicalType: fmt::Debug + Send + Sync {
    /// The `logicalType` name.
    fn name(&self) -> &str;

    /// Whether an unqualified native value selects this node as a union
    /// branch.
    fn accepts(&self, value: &Value) -> bool;

    /// Convert a native value to the value of the underlying wire type.
    fn to_underlying(&self, value: &Value) -> Result<Value, CodecError>;

    /// Convert a decoded underlying value to its native form.
    fn to_native(&self, value: Value) -> Result<Value, CodecError>;

    /// Extra schema attributes to emit when the schema is rendered back to
    /// JSON (e.g. `precision` and `scale`).
    fn schema_properties(&self) -> Vec<(String, JsonValue)> {
        Vec::new()
    }
}

/// What a factory sees of the node it is annotating.
#[derive(Debug, Clone, Copy)]
pub struct LogicalContext<'a> {
    /// Underlying type name (`"long"`, `"bytes"`, `"fixed"`, ...).
    pub underlying: &'a str,
    /// Every attribute of the schema object carrying the annotation.
    pub properties: &'a Map<String, JsonValue>,
}

/// Builds a transformer for one annotated node.
pub type LogicalTypeFactory =
    Arc<dyn Fn(&LogicalContext<'_>) -> Result<Arc<dyn LogicalType>, SchemaError> + Send + Sync>;

/// Registry of logical type factories keyed by underlying type and name.
///
/// The registry is plain configuration: build one, [`register`](Self::register)
/// extra types, and hand it to the parser through
/// [`CodecConfig`](crate::CodecConfig). There is no global registry.
#[derive(Clone)]
pub struct LogicalTypeRegistry {
    factories: HashMap<(String, String), LogicalTypeFactory>,
}

impl Default for LogicalTypeRegistry {
    /// A registry holding the standard logical types.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("long", "timestamp-millis", |_| {
            Ok(Arc::new(TimestampMillis) as Arc<dyn LogicalType>)
        });
        registry.register("long", "timestamp-micros", |_| {
            Ok(Arc::new(TimestampMicros) as Arc<dyn LogicalType>)
        });
        registry.register("int", "time-millis", |_| {
            Ok(Arc::new(TimeMillis) as Arc<dyn LogicalType>)
        });
        registry.register("long", "time-micros", |_| {
            Ok(Arc::new(TimeMicros) as Arc<dyn LogicalType>)
        });
        registry.register("int", "date", |_| Ok(Arc::new(Date) as Arc<dyn LogicalType>));
        registry.register("bytes", "decimal", |ctx| {
            Ok(Arc::new(DecimalBytes::from_context(ctx)?) as Arc<dyn LogicalType>)
        });
        registry.register("fixed", "decimal", |ctx| {
            Ok(Arc::new(DecimalFixed::from_context(ctx)?) as Arc<dyn LogicalType>)
        });
        registry.register("string", "validatedString", |ctx| {
            Ok(Arc::new(ValidatedString::from_context(ctx)?) as Arc<dyn LogicalType>)
        });
        registry
    }
}

impl LogicalTypeRegistry {
    /// A registry with no logical types; every annotation falls back to the
    /// underlying type.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register (or replace) the factory for `(underlying, name)`.
    pub fn register<F>(&mut self, underlying: &str, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&LogicalContext<'_>) -> Result<Arc<dyn LogicalType>, SchemaError>
            + Send
            + Sync
            + 'static,
    {
        self.factories
            .insert((underlying.to_string(), name.to_string()), Arc::new(factory));
        self
    }

    /// Whether a factory exists for `(underlying, name)`.
    pub fn contains(&self, underlying: &str, name: &str) -> bool {
        self.factories
            .contains_key(&(underlying.to_string(), name.to_string()))
    }

    /// Build the transformer for a node.
    ///
    /// Returns `None` on a lookup miss, which callers treat as "use the
    /// underlying type".
    pub fn build(
        &self,
        ctx: &LogicalContext<'_>,
        name: &str,
    ) -> Option<Result<Arc<dyn LogicalType>, SchemaError>> {
        self.factories
            .get(&(ctx.underlying.to_string(), name.to_string()))
            .map(|factory| factory(ctx))
    }
}

impl fmt::Debug for LogicalTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .factories
            .keys()
            .map(|(underlying, name)| format!("{}.{}", underlying, name))
            .collect();
        keys.sort();
        f.debug_struct("LogicalTypeRegistry")
            .field("types", &keys)
            .finish()
    }
}

/// Error for a native value a transformer cannot handle.
pub(crate) fn unsupported(name: &str, expected: &str, value: &Value) -> CodecError {
    CodecError::unsupported(
        name,
        format!("expected {}, received {}", expected, value.type_name()),
    )
}
