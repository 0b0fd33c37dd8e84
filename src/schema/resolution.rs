//! Second parse pass: named type reference resolution.
//!
//! Names used before their definition are parsed as [`SchemaKind::Named`]
//! placeholder nodes. Once the whole document has been read, every edge that
//! points at a placeholder is rewritten to the handle of the definition.
//! Placeholders stay in the arena but become unreachable.

use std::collections::{HashMap, HashSet};

use crate::codec::default_value;
use crate::error::SchemaError;
use crate::schema::{Schema, SchemaKind, SchemaNode, SchemaRef};

/// Rewrite all placeholder edges in `nodes` and return the resolved root.
///
/// Fails if any placeholder names a type that was never defined.
pub(crate) fn resolve_references(
    nodes: &mut [SchemaNode],
    names: &HashMap<String, SchemaRef>,
    root: SchemaRef,
) -> Result<SchemaRef, SchemaError> {
    let mut targets: HashMap<SchemaRef, SchemaRef> = HashMap::new();
    for (i, node) in nodes.iter().enumerate() {
        if let SchemaKind::Named(name) = &node.kind {
            let target = names.get(name).copied().ok_or_else(|| {
                SchemaError::invalid(format!("Unresolved named type reference: '{}'", name))
            })?;
            targets.insert(SchemaRef(i), target);
        }
    }

    if targets.is_empty() {
        return Ok(root);
    }

    let fix = |r: &mut SchemaRef| {
        if let Some(target) = targets.get(r) {
            *r = *target;
        }
    };

    for node in nodes.iter_mut() {
        match &mut node.kind {
            SchemaKind::Record(record) => {
                for field in &mut record.fields {
                    fix(&mut field.schema);
                }
            }
            SchemaKind::Array(items) => fix(items),
            SchemaKind::Map(values) => fix(values),
            SchemaKind::Union(branches) => branches.iter_mut().for_each(fix),
            _ => {}
        }
    }

    let mut root = root;
    fix(&mut root);
    Ok(root)
}

/// Checks that need every reference resolved.
///
/// A branch named by a forward reference only gets its qualified name once
/// the definition is known, and field defaults are read against the field
/// schema, which may itself be a forward reference.
pub(crate) fn validate_resolved(schema: &Schema) -> Result<(), SchemaError> {
    for node in &schema.nodes {
        match &node.kind {
            SchemaKind::Union(branches) => {
                let mut seen = HashSet::new();
                for (i, branch) in branches.iter().enumerate() {
                    let name = schema.qualified_name(*branch);
                    if !seen.insert(name.clone()) {
                        return Err(SchemaError::invalid(format!(
                            "Union contains duplicate type '{}' at position {}",
                            name, i
                        )));
                    }
                }
            }
            SchemaKind::Record(record) => {
                for field in &record.fields {
                    if let Some(default) = &field.default {
                        default_value(schema, field.schema, default).map_err(|e| {
                            SchemaError::invalid(format!(
                                "Field '{}' of record {} has an invalid default: {}",
                                field.name,
                                record.fullname(),
                                e
                            ))
                        })?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}
