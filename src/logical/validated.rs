//! Pattern-constrained strings (`validatedString`).

use regex::Regex;
use serde_json::Value as JsonValue;

use super::{unsupported, LogicalContext, LogicalType};
use crate::error::{CodecError, SchemaError};
use crate::value::Value;

/// `validatedString` on `string`: values must match the node's `pattern`
/// before they are encoded. Decoding does not re-check.
#[derive(Debug, Clone)]
pub struct ValidatedString {
    pattern: String,
    regex: Regex,
}

impl ValidatedString {
    /// Compile the transformer for `pattern`.
    pub fn new(pattern: &str) -> Result<Self, SchemaError> {
        let regex = Regex::new(pattern).map_err(|e| {
            SchemaError::invalid(format!(
                "validatedString pattern {:?} is not a valid regular expression: {}",
                pattern, e
            ))
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub(crate) fn from_context(ctx: &LogicalContext<'_>) -> Result<Self, SchemaError> {
        match ctx.properties.get("pattern") {
            Some(JsonValue::String(pattern)) => Self::new(pattern),
            Some(other) => Err(SchemaError::invalid(format!(
                "validatedString pattern must be a string, got {}",
                other
            ))),
            None => Err(SchemaError::invalid(
                "validatedString requires a pattern attribute",
            )),
        }
    }

    /// The source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl LogicalType for ValidatedString {
    fn name(&self) -> &str {
        "validatedString"
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, CodecError> {
        match value {
            Value::String(s) if self.regex.is_match(s) => Ok(Value::String(s.clone())),
            Value::String(s) => Err(CodecError::ValidationFailed {
                value: s.clone(),
                pattern: self.pattern.clone(),
            }),
            other => Err(unsupported(self.name(), "string", other)),
        }
    }

    fn to_native(&self, value: Value) -> Result<Value, CodecError> {
        Ok(value)
    }

    fn schema_properties(&self) -> Vec<(String, JsonValue)> {
        vec![(
            "pattern".to_string(),
            JsonValue::String(self.pattern.clone()),
        )]
    }
}
