//! Union branch resolution.
//!
//! Encoding picks a branch for a native value: an explicit qualified name
//! wins, `Null` goes to the `null` branch, and anything else must satisfy
//! exactly one branch predicate. Decoding maps a discriminant (binary index or
//! textual key) back to a branch.

use tracing::trace;

use crate::error::CodecError;
use crate::schema::{Schema, SchemaKind, SchemaRef};
use crate::value::Value;

const NO_MATCH: &str = "no member schema types support datum";

/// A branch chosen for encoding.
#[derive(Debug)]
pub(crate) struct Selection<'v> {
    /// Zero-based branch index (the binary discriminant).
    pub index: usize,
    /// Schema of the branch.
    pub branch: SchemaRef,
    /// The value to encode with the branch, with any wrapper removed.
    pub value: &'v Value,
}

/// Qualified names of every branch, in declaration order.
pub(crate) fn allowed_names(schema: &Schema, branches: &[SchemaRef]) -> Vec<String> {
    branches.iter().map(|b| schema.qualified_name(*b)).collect()
}

fn no_match(schema: &Schema, branches: &[SchemaRef], reason: impl Into<String>) -> CodecError {
    CodecError::NoMatchingBranch {
        reason: reason.into(),
        allowed: allowed_names(schema, branches),
    }
}

fn by_name(schema: &Schema, branches: &[SchemaRef], name: &str) -> Option<(usize, SchemaRef)> {
    branches
        .iter()
        .enumerate()
        .find(|(_, b)| schema.qualified_name(**b) == name)
        .map(|(i, b)| (i, *b))
}

/// Choose the branch that encodes `value`.
pub(crate) fn select_branch<'v>(
    schema: &Schema,
    branches: &[SchemaRef],
    value: &'v Value,
) -> Result<Selection<'v>, CodecError> {
    match value {
        Value::Union(name, inner) => {
            let (index, branch) = by_name(schema, branches, name).ok_or_else(|| {
                no_match(schema, branches, format!("{} (named {:?})", NO_MATCH, name))
            })?;
            trace!(branch = %name, index, "union branch selected by name");
            return Ok(Selection {
                index,
                branch,
                value: inner,
            });
        }
        Value::Map(entries) if entries.len() == 1 => {
            // A single-entry map keyed by a branch name is a selection; any
            // other single-entry map falls through to the map predicate.
            if let Some((key, inner)) = entries.iter().next() {
                if let Some((index, branch)) = by_name(schema, branches, key) {
                    trace!(branch = %key, index, "union branch selected by map key");
                    return Ok(Selection {
                        index,
                        branch,
                        value: inner,
                    });
                }
            }
        }
        Value::Null => {
            let (index, branch) = by_name(schema, branches, "null")
                .ok_or_else(|| no_match(schema, branches, NO_MATCH))?;
            return Ok(Selection {
                index,
                branch,
                value,
            });
        }
        _ => {}
    }

    let mut matching = branches
        .iter()
        .enumerate()
        .filter(|(_, b)| accepts(schema, **b, value));
    match (matching.next(), matching.next()) {
        (Some((index, branch)), None) => {
            trace!(
                branch = %schema.qualified_name(*branch),
                index,
                value_type = value.type_name(),
                "union branch selected by value type"
            );
            Ok(Selection {
                index,
                branch: *branch,
                value,
            })
        }
        (None, _) => Err(no_match(
            schema,
            branches,
            format!("{} of type {}", NO_MATCH, value.type_name()),
        )),
        (Some(_), Some(_)) => Err(no_match(
            schema,
            branches,
            format!(
                "datum of type {} matches more than one member schema type; select a branch by name",
                value.type_name()
            ),
        )),
    }
}

/// Whether an unqualified `value` can be encoded by `branch`.
///
/// Unlike the widening applied to non-union nodes, each branch accepts only
/// the value variants that map onto it without conversion.
pub(crate) fn accepts(schema: &Schema, branch: SchemaRef, value: &Value) -> bool {
    let node = schema.node(branch);
    if let Some(logical) = &node.logical {
        return logical.transformer.accepts(value);
    }
    match (&node.kind, value) {
        (SchemaKind::Null, Value::Null) => true,
        (SchemaKind::Boolean, Value::Boolean(_)) => true,
        (SchemaKind::Int, Value::Int(i)) => i32::try_from(*i).is_ok(),
        (SchemaKind::Long, Value::Int(_)) => true,
        (SchemaKind::Float, Value::Float(_)) => true,
        (SchemaKind::Double, Value::Double(_)) => true,
        (SchemaKind::Bytes, Value::Bytes(_)) => true,
        (SchemaKind::String, Value::String(_)) => true,
        (SchemaKind::Fixed(fixed), Value::Bytes(b)) => b.len() == fixed.size,
        (SchemaKind::Enum(e), Value::String(s)) => e.symbol_index(s).is_some(),
        (SchemaKind::Array(_), Value::Array(_)) => true,
        (SchemaKind::Map(_), Value::Map(_)) => true,
        (SchemaKind::Record(_), Value::Record(_)) => true,
        _ => false,
    }
}

/// Branch for a decoded binary discriminant.
pub(crate) fn branch_at(branches: &[SchemaRef], index: i64) -> Result<SchemaRef, CodecError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| branches.get(i).copied())
        .ok_or_else(|| {
            CodecError::binary(format!(
                "union index {} out of range (0..{})",
                index,
                branches.len()
            ))
        })
}

/// Branch for a textual union key.
pub(crate) fn branch_named(
    schema: &Schema,
    branches: &[SchemaRef],
    name: &str,
) -> Result<SchemaRef, CodecError> {
    by_name(schema, branches, name)
        .map(|(_, b)| b)
        .ok_or_else(|| {
            CodecError::textual(format!(
                "union key {:?} is not one of [{}]",
                name,
                allowed_names(schema, branches).join(" ")
            ))
        })
}
