//! Schema-driven JSON encoding and decoding.
//!
//! The textual form is Avro's JSON encoding: unions other than `null` are
//! wrapped as `{"qualifiedName": value}`, `bytes` and `fixed` are strings of
//! code points 0-255, and non-finite floats are the strings `"NaN"`,
//! `"Infinity"` and `"-Infinity"`.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value as JsonValue};

use super::mismatch;
use super::union::{branch_named, select_branch};
use crate::error::CodecError;
use crate::schema::{RecordSchema, Schema, SchemaKind, SchemaRef};
use crate::value::Value;

// ============================================================================
// Encoding
// ============================================================================

/// Render `value` as node `r`.
pub(crate) fn to_json(schema: &Schema, r: SchemaRef, value: &Value) -> Result<JsonValue, CodecError> {
    let node = schema.node(r);
    let underlying;
    let value = match &node.logical {
        Some(logical) => {
            underlying = logical.transformer.to_underlying(value)?;
            &underlying
        }
        None => value,
    };

    Ok(match (&node.kind, value) {
        (SchemaKind::Null, Value::Null) => JsonValue::Null,
        (SchemaKind::Boolean, Value::Boolean(b)) => JsonValue::Bool(*b),
        (SchemaKind::Int, Value::Int(i)) => {
            let i = i32::try_from(*i).map_err(|_| {
                CodecError::unsupported("int", format!("{} does not fit in 32 bits", i))
            })?;
            JsonValue::from(i)
        }
        (SchemaKind::Long, Value::Int(i)) => JsonValue::from(*i),
        (SchemaKind::Float, Value::Float(f)) => float_to_json(*f)?,
        (SchemaKind::Float, Value::Double(d)) => float_to_json(*d as f32)?,
        (SchemaKind::Float, Value::Int(i)) => float_to_json(*i as f32)?,
        (SchemaKind::Double, Value::Double(d)) => double_to_json(*d),
        (SchemaKind::Double, Value::Float(f)) => double_to_json(*f as f64),
        (SchemaKind::Double, Value::Int(i)) => double_to_json(*i as f64),
        (SchemaKind::Bytes, Value::Bytes(b)) => JsonValue::String(bytes_to_code_points(b)),
        (SchemaKind::String, Value::String(s)) => JsonValue::String(s.clone()),
        (SchemaKind::Fixed(fixed), Value::Bytes(b)) => {
            if b.len() != fixed.size {
                return Err(CodecError::unsupported(
                    fixed.fullname(),
                    format!("expected {} bytes, received {}", fixed.size, b.len()),
                ));
            }
            JsonValue::String(bytes_to_code_points(b))
        }
        (SchemaKind::Enum(e), Value::String(symbol)) => {
            if e.symbol_index(symbol).is_none() {
                return Err(CodecError::unsupported(
                    e.fullname(),
                    format!("{:?} is not one of {:?}", symbol, e.symbols),
                ));
            }
            JsonValue::String(symbol.clone())
        }
        (SchemaKind::Array(items), Value::Array(values)) => JsonValue::Array(
            values
                .iter()
                .map(|v| to_json(schema, *items, v))
                .collect::<Result<_, _>>()?,
        ),
        (SchemaKind::Map(values), Value::Map(entries)) => {
            let mut obj = Map::new();
            for (key, entry) in entries {
                obj.insert(key.clone(), to_json(schema, *values, entry)?);
            }
            JsonValue::Object(obj)
        }
        (SchemaKind::Record(record), Value::Record(fields)) => {
            record_to_json(schema, record, |name| {
                fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
            })?
        }
        (SchemaKind::Record(record), Value::Map(entries)) => {
            record_to_json(schema, record, |name| entries.get(name))?
        }
        (SchemaKind::Union(branches), _) => {
            let selection = select_branch(schema, branches, value)?;
            let inner = to_json(schema, selection.branch, selection.value)?;
            if is_plain_null(schema, selection.branch) {
                JsonValue::Null
            } else {
                let mut obj = Map::new();
                obj.insert(schema.qualified_name(selection.branch), inner);
                JsonValue::Object(obj)
            }
        }
        _ => return Err(mismatch(schema, r, value)),
    })
}

fn record_to_json<'v, F>(
    schema: &Schema,
    record: &RecordSchema,
    lookup: F,
) -> Result<JsonValue, CodecError>
where
    F: Fn(&str) -> Option<&'v Value>,
{
    let mut obj = Map::new();
    for field in &record.fields {
        let json = match (lookup(&field.name), &field.default) {
            (Some(value), _) => to_json(schema, field.schema, value)?,
            (None, Some(default)) => {
                let value = default_value(schema, field.schema, default)?;
                to_json(schema, field.schema, &value)?
            }
            (None, None) => {
                return Err(CodecError::unsupported(
                    record.fullname(),
                    format!("missing field {:?} has no default", field.name),
                ))
            }
        };
        obj.insert(field.name.clone(), json);
    }
    Ok(JsonValue::Object(obj))
}

fn float_to_json(f: f32) -> Result<JsonValue, CodecError> {
    if !f.is_finite() {
        return Ok(non_finite(f as f64));
    }
    // Go through the shortest f32 rendering so 0.1f32 stays 0.1
    f.to_string()
        .parse::<f64>()
        .map(double_to_json)
        .map_err(|e| CodecError::conversion(format!("float {}: {}", f, e)))
}

fn double_to_json(d: f64) -> JsonValue {
    Number::from_f64(d)
        .map(JsonValue::Number)
        .unwrap_or_else(|| non_finite(d))
}

fn non_finite(d: f64) -> JsonValue {
    let text = if d.is_nan() {
        "NaN"
    } else if d > 0.0 {
        "Infinity"
    } else {
        "-Infinity"
    };
    JsonValue::String(text.to_string())
}

fn bytes_to_code_points(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn is_plain_null(schema: &Schema, r: SchemaRef) -> bool {
    let node = schema.node(r);
    node.logical.is_none() && matches!(node.kind, SchemaKind::Null)
}

// ============================================================================
// Decoding
// ============================================================================

/// Read `json` as node `r`.
pub(crate) fn from_json(schema: &Schema, r: SchemaRef, json: &JsonValue) -> Result<Value, CodecError> {
    let node = schema.node(r);
    let value = match (&node.kind, json) {
        (SchemaKind::Null, JsonValue::Null) => Value::Null,
        (SchemaKind::Boolean, JsonValue::Bool(b)) => Value::Boolean(*b),
        (SchemaKind::Int, JsonValue::Number(n)) => {
            let int = n
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(|| CodecError::textual(format!("{} is not a 32-bit integer", n)))?;
            Value::Int(int as i64)
        }
        (SchemaKind::Long, JsonValue::Number(n)) => Value::Int(
            n.as_i64()
                .ok_or_else(|| CodecError::textual(format!("{} is not a 64-bit integer", n)))?,
        ),
        (SchemaKind::Float, _) => Value::Float(json_to_f64(json)? as f32),
        (SchemaKind::Double, _) => Value::Double(json_to_f64(json)?),
        (SchemaKind::Bytes, JsonValue::String(s)) => Value::Bytes(code_points_to_bytes(s)?),
        (SchemaKind::String, JsonValue::String(s)) => Value::String(s.clone()),
        (SchemaKind::Fixed(fixed), JsonValue::String(s)) => {
            let bytes = code_points_to_bytes(s)?;
            if bytes.len() != fixed.size {
                return Err(CodecError::textual(format!(
                    "fixed {} expects {} bytes, received {}",
                    fixed.fullname(),
                    fixed.size,
                    bytes.len()
                )));
            }
            Value::Bytes(bytes)
        }
        (SchemaKind::Enum(e), JsonValue::String(s)) => {
            if e.symbol_index(s).is_none() {
                return Err(CodecError::textual(format!(
                    "{:?} is not a symbol of enum {}",
                    s,
                    e.fullname()
                )));
            }
            Value::String(s.clone())
        }
        (SchemaKind::Array(items), JsonValue::Array(values)) => Value::Array(
            values
                .iter()
                .map(|v| from_json(schema, *items, v))
                .collect::<Result<_, _>>()?,
        ),
        (SchemaKind::Map(values), JsonValue::Object(obj)) => {
            let mut entries = BTreeMap::new();
            for (key, entry) in obj {
                entries.insert(key.clone(), from_json(schema, *values, entry)?);
            }
            Value::Map(entries)
        }
        (SchemaKind::Record(record), JsonValue::Object(obj)) => record_from_json(schema, record, obj)?,
        (SchemaKind::Union(_), JsonValue::Null) if has_null_branch(schema, r) => Value::Null,
        (SchemaKind::Union(branches), JsonValue::Object(obj)) if obj.len() == 1 => {
            match obj.iter().next() {
                Some((name, inner)) => {
                    let branch = branch_named(schema, branches, name)?;
                    let value = from_json(schema, branch, inner)?;
                    if is_plain_null(schema, branch) {
                        value
                    } else {
                        Value::Union(schema.qualified_name(branch), Box::new(value))
                    }
                }
                None => return Err(shape_error(schema, r, json)),
            }
        }
        _ => return Err(shape_error(schema, r, json)),
    };

    match &node.logical {
        Some(logical) => logical.transformer.to_native(value),
        None => Ok(value),
    }
}

fn record_from_json(
    schema: &Schema,
    record: &RecordSchema,
    obj: &Map<String, JsonValue>,
) -> Result<Value, CodecError> {
    if let Some(unknown) = obj.keys().find(|k| record.field(k).is_none()) {
        return Err(CodecError::textual(format!(
            "record {} has no field {:?}",
            record.fullname(),
            unknown
        )));
    }

    let mut fields = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        let value = match (obj.get(&field.name), &field.default) {
            (Some(json), _) => from_json(schema, field.schema, json)?,
            (None, Some(default)) => default_value(schema, field.schema, default)?,
            (None, None) => {
                return Err(CodecError::textual(format!(
                    "record {} is missing field {:?}",
                    record.fullname(),
                    field.name
                )))
            }
        };
        fields.push((field.name.clone(), value));
    }
    Ok(Value::Record(fields))
}

/// Native form of a field default.
///
/// Defaults use the JSON encoding except for unions, whose default is an
/// unwrapped value of the first branch.
pub(crate) fn default_value(
    schema: &Schema,
    r: SchemaRef,
    default: &JsonValue,
) -> Result<Value, CodecError> {
    let node = schema.node(r);
    match (&node.kind, node.logical.is_none()) {
        (SchemaKind::Union(branches), true) => {
            let first = *branches
                .first()
                .ok_or_else(|| CodecError::textual("default for an empty union"))?;
            let value = from_json(schema, first, default)?;
            if is_plain_null(schema, first) {
                Ok(Value::Null)
            } else {
                Ok(Value::Union(schema.qualified_name(first), Box::new(value)))
            }
        }
        _ => from_json(schema, r, default),
    }
}

fn has_null_branch(schema: &Schema, r: SchemaRef) -> bool {
    match schema.kind(r) {
        SchemaKind::Union(branches) => branches.iter().any(|b| is_plain_null(schema, *b)),
        _ => false,
    }
}

fn json_to_f64(json: &JsonValue) -> Result<f64, CodecError> {
    match json {
        JsonValue::Number(n) => n
            .as_f64()
            .ok_or_else(|| CodecError::textual(format!("{} is not a number", n))),
        JsonValue::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => Err(CodecError::textual(format!("{:?} is not a number", s))),
        },
        other => Err(CodecError::textual(format!("{} is not a number", other))),
    }
}

fn code_points_to_bytes(s: &str) -> Result<Vec<u8>, CodecError> {
    s.chars()
        .map(|c| {
            u8::try_from(c).map_err(|_| {
                CodecError::textual(format!(
                    "code point U+{:04X} is out of byte range",
                    c as u32
                ))
            })
        })
        .collect()
}

fn shape_error(schema: &Schema, r: SchemaRef, json: &JsonValue) -> CodecError {
    let expected = match schema.kind(r) {
        SchemaKind::Union(_) => format!(
            "a single-key object naming a branch of {}",
            schema.qualified_name(r)
        ),
        _ => schema.qualified_name(r),
    };
    let received = match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    };
    CodecError::textual(format!("expected {}, received {}", expected, received))
}
