//! Schema-driven binary encoding and decoding.
//!
//! Encoding follows the Avro binary format:
//! - Varints use zigzag encoding for signed integers
//! - Floats and doubles are little-endian IEEE 754
//! - Bytes and strings are length-prefixed
//! - Arrays and maps are written as one counted block and a zero terminator
//! - Unions are a branch index followed by the branch value
//!
//! Logical-type nodes convert through their transformer on the way in and
//! out; the bytes on the wire are those of the underlying type.

use std::collections::BTreeMap;

use bytes::BufMut;

use super::textual::default_value;
use super::union::{branch_at, select_branch};
use super::varint::{decode_zigzag, encode_zigzag};
use super::{mismatch, DecodeLimits};
use crate::error::CodecError;
use crate::schema::{RecordSchema, Schema, SchemaKind, SchemaRef};
use crate::value::Value;

// ============================================================================
// Encoding
// ============================================================================

/// Writes native values in binary form.
pub(crate) struct BinaryEncoder<'s> {
    schema: &'s Schema,
}

impl<'s> BinaryEncoder<'s> {
    pub(crate) fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    /// Append the encoding of `value` as node `r`.
    ///
    /// On error `buf` may hold a partial encoding; callers that share the
    /// buffer truncate it.
    pub(crate) fn encode(
        &self,
        buf: &mut Vec<u8>,
        r: SchemaRef,
        value: &Value,
    ) -> Result<(), CodecError> {
        let node = self.schema.node(r);
        let underlying;
        let value = match &node.logical {
            Some(logical) => {
                underlying = logical.transformer.to_underlying(value)?;
                &underlying
            }
            None => value,
        };

        match (&node.kind, value) {
            (SchemaKind::Null, Value::Null) => {}
            (SchemaKind::Boolean, Value::Boolean(b)) => buf.put_u8(*b as u8),
            (SchemaKind::Int, Value::Int(i)) => {
                let i = i32::try_from(*i).map_err(|_| {
                    CodecError::unsupported("int", format!("{} does not fit in 32 bits", i))
                })?;
                encode_zigzag(buf, i as i64);
            }
            (SchemaKind::Long, Value::Int(i)) => encode_zigzag(buf, *i),
            (SchemaKind::Float, Value::Float(f)) => buf.put_f32_le(*f),
            (SchemaKind::Float, Value::Double(d)) => buf.put_f32_le(*d as f32),
            (SchemaKind::Float, Value::Int(i)) => buf.put_f32_le(*i as f32),
            (SchemaKind::Double, Value::Double(d)) => buf.put_f64_le(*d),
            (SchemaKind::Double, Value::Float(f)) => buf.put_f64_le(*f as f64),
            (SchemaKind::Double, Value::Int(i)) => buf.put_f64_le(*i as f64),
            (SchemaKind::Bytes, Value::Bytes(b)) => put_length_prefixed(buf, b),
            (SchemaKind::String, Value::String(s)) => put_length_prefixed(buf, s.as_bytes()),
            (SchemaKind::Fixed(fixed), Value::Bytes(b)) => {
                if b.len() != fixed.size {
                    return Err(CodecError::unsupported(
                        fixed.fullname(),
                        format!("expected {} bytes, received {}", fixed.size, b.len()),
                    ));
                }
                buf.put_slice(b);
            }
            (SchemaKind::Enum(e), Value::String(symbol)) => {
                let index = e.symbol_index(symbol).ok_or_else(|| {
                    CodecError::unsupported(
                        e.fullname(),
                        format!("{:?} is not one of {:?}", symbol, e.symbols),
                    )
                })?;
                encode_zigzag(buf, index as i64);
            }
            (SchemaKind::Array(items), Value::Array(values)) => {
                if !values.is_empty() {
                    encode_zigzag(buf, values.len() as i64);
                    for item in values {
                        self.encode(buf, *items, item)?;
                    }
                }
                encode_zigzag(buf, 0);
            }
            (SchemaKind::Map(values), Value::Map(entries)) => {
                if !entries.is_empty() {
                    encode_zigzag(buf, entries.len() as i64);
                    for (key, entry) in entries {
                        put_length_prefixed(buf, key.as_bytes());
                        self.encode(buf, *values, entry)?;
                    }
                }
                encode_zigzag(buf, 0);
            }
            (SchemaKind::Record(record), Value::Record(fields)) => {
                self.encode_record(buf, record, |name| {
                    fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
                })?;
            }
            (SchemaKind::Record(record), Value::Map(entries)) => {
                self.encode_record(buf, record, |name| entries.get(name))?;
            }
            (SchemaKind::Union(branches), _) => {
                let selection = select_branch(self.schema, branches, value)?;
                encode_zigzag(buf, selection.index as i64);
                self.encode(buf, selection.branch, selection.value)?;
            }
            _ => return Err(mismatch(self.schema, r, value)),
        }
        Ok(())
    }

    fn encode_record<'v, F>(
        &self,
        buf: &mut Vec<u8>,
        record: &RecordSchema,
        lookup: F,
    ) -> Result<(), CodecError>
    where
        F: Fn(&str) -> Option<&'v Value>,
    {
        for field in &record.fields {
            match (lookup(&field.name), &field.default) {
                (Some(value), _) => self.encode(buf, field.schema, value)?,
                (None, Some(default)) => {
                    let value = default_value(self.schema, field.schema, default)?;
                    self.encode(buf, field.schema, &value)?;
                }
                (None, None) => {
                    return Err(CodecError::unsupported(
                        record.fullname(),
                        format!("missing field {:?} has no default", field.name),
                    ))
                }
            }
        }
        Ok(())
    }
}

fn put_length_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_zigzag(buf, bytes.len() as i64);
    buf.put_slice(bytes);
}

// ============================================================================
// Decoding
// ============================================================================

/// Reads native values from binary form.
pub(crate) struct BinaryDecoder<'s> {
    schema: &'s Schema,
    limits: DecodeLimits,
}

impl<'s> BinaryDecoder<'s> {
    pub(crate) fn new(schema: &'s Schema, limits: DecodeLimits) -> Self {
        Self { schema, limits }
    }

    /// Decode one value of node `r`, advancing `data` past it.
    pub(crate) fn decode(&self, data: &mut &[u8], r: SchemaRef) -> Result<Value, CodecError> {
        self.decode_at(data, r, 0)
    }

    /// `depth` counts the records, arrays, maps and unions enclosing `r`.
    fn decode_at(&self, data: &mut &[u8], r: SchemaRef, depth: usize) -> Result<Value, CodecError> {
        if depth > self.limits.max_depth {
            return Err(CodecError::binary(format!(
                "nesting depth exceeds limit {}",
                self.limits.max_depth
            )));
        }
        let node = self.schema.node(r);
        let value = match &node.kind {
            SchemaKind::Null => Value::Null,
            SchemaKind::Boolean => match take(data, 1)?[0] {
                0 => Value::Boolean(false),
                1 => Value::Boolean(true),
                byte => {
                    return Err(CodecError::binary(format!(
                        "invalid boolean value: {}, expected 0 or 1",
                        byte
                    )))
                }
            },
            SchemaKind::Int => {
                let long = decode_zigzag(data)?;
                let int = i32::try_from(long).map_err(|_| {
                    CodecError::binary(format!("integer overflow: {} does not fit in i32", long))
                })?;
                Value::Int(int as i64)
            }
            SchemaKind::Long => Value::Int(decode_zigzag(data)?),
            SchemaKind::Float => {
                let bytes = take(data, 4)?;
                Value::Float(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            SchemaKind::Double => {
                let bytes = take(data, 8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                Value::Double(f64::from_le_bytes(raw))
            }
            SchemaKind::Bytes => Value::Bytes(self.length_prefixed(data)?.to_vec()),
            SchemaKind::String => Value::String(self.string(data)?),
            SchemaKind::Fixed(fixed) => Value::Bytes(take(data, fixed.size)?.to_vec()),
            SchemaKind::Enum(e) => {
                let index = decode_zigzag(data)?;
                let symbol = usize::try_from(index)
                    .ok()
                    .and_then(|i| e.symbols.get(i))
                    .ok_or_else(|| {
                        CodecError::binary(format!(
                            "enum index {} out of range for enum '{}' with {} symbols",
                            index,
                            e.fullname(),
                            e.symbols.len()
                        ))
                    })?;
                Value::String(symbol.clone())
            }
            SchemaKind::Array(items) => {
                let mut values = Vec::new();
                while let Some(count) = self.block_count(data, values.len())? {
                    values.reserve(count.min(data.len()));
                    for _ in 0..count {
                        values.push(self.decode_at(data, *items, depth + 1)?);
                    }
                }
                Value::Array(values)
            }
            SchemaKind::Map(values) => {
                let mut entries = BTreeMap::new();
                let mut seen = 0;
                while let Some(count) = self.block_count(data, seen)? {
                    seen += count;
                    for _ in 0..count {
                        let key = self.string(data)?;
                        let value = self.decode_at(data, *values, depth + 1)?;
                        entries.insert(key, value);
                    }
                }
                Value::Map(entries)
            }
            SchemaKind::Record(record) => {
                let mut fields = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    fields.push((
                        field.name.clone(),
                        self.decode_at(data, field.schema, depth + 1)?,
                    ));
                }
                Value::Record(fields)
            }
            SchemaKind::Union(branches) => {
                let branch = branch_at(branches, decode_zigzag(data)?)?;
                let value = self.decode_at(data, branch, depth + 1)?;
                if self.is_plain_null(branch) {
                    Value::Null
                } else {
                    Value::Union(self.schema.qualified_name(branch), Box::new(value))
                }
            }
            SchemaKind::Named(name) => {
                return Err(CodecError::binary(format!(
                    "unresolved named type reference '{}'",
                    name
                )))
            }
        };

        match &node.logical {
            Some(logical) => logical.transformer.to_native(value),
            None => Ok(value),
        }
    }

    fn is_plain_null(&self, r: SchemaRef) -> bool {
        let node = self.schema.node(r);
        node.logical.is_none() && matches!(node.kind, SchemaKind::Null)
    }

    /// Item count of the next array/map block, or `None` at the terminator.
    ///
    /// `seen` is the number of items already read from earlier blocks of the
    /// same collection; the running total is held to `max_block_count`.
    /// A negative count is followed by the block's byte size, which is read
    /// and ignored.
    fn block_count(&self, data: &mut &[u8], seen: usize) -> Result<Option<usize>, CodecError> {
        let count = decode_zigzag(data)?;
        if count == 0 {
            return Ok(None);
        }
        if count < 0 {
            let _byte_size = decode_zigzag(data)?;
        }
        let count = count.unsigned_abs();
        let total = count.saturating_add(seen as u64);
        if total > self.limits.max_block_count as u64 {
            return Err(CodecError::binary(format!(
                "collection of {} items exceeds limit {}",
                total, self.limits.max_block_count
            )));
        }
        Ok(Some(count as usize))
    }

    fn length_prefixed<'a>(&self, data: &mut &'a [u8]) -> Result<&'a [u8], CodecError> {
        let len = decode_zigzag(data)?;
        if len < 0 {
            return Err(CodecError::binary(format!("negative length: {}", len)));
        }
        if len as u64 > self.limits.max_allocation_size as u64 {
            return Err(CodecError::binary(format!(
                "length {} exceeds limit {}",
                len, self.limits.max_allocation_size
            )));
        }
        take(data, len as usize)
    }

    fn string(&self, data: &mut &[u8]) -> Result<String, CodecError> {
        let bytes = self.length_prefixed(data)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| CodecError::binary(format!("invalid UTF-8: {}", e)))
    }
}

/// Split `n` bytes off the front of `data`.
fn take<'a>(data: &mut &'a [u8], n: usize) -> Result<&'a [u8], CodecError> {
    if data.len() < n {
        return Err(CodecError::short(n, data.len()));
    }
    let (head, tail) = data.split_at(n);
    *data = tail;
    Ok(head)
}
