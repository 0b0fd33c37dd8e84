//! Avro schema types and representations.
//!
//! A parsed schema is an arena of [`SchemaNode`]s addressed by [`SchemaRef`]
//! handles. Child edges (record fields, array items, map values, union
//! branches) are handles into the same arena, so self- and mutually-recursive
//! named types are plain back-references rather than owned cycles.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value as JsonValue};

use crate::logical::LogicalType;

/// Stable handle to a node in a [`Schema`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaRef(pub(crate) usize);

impl SchemaRef {
    /// Position of the node in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of the schema graph.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    /// The wire type of the node.
    pub kind: SchemaKind,
    /// Recognized logical type, if any. Unrecognized `logicalType` names are
    /// dropped at parse time and leave this empty.
    pub logical: Option<LogicalAnnotation>,
}

impl SchemaNode {
    pub(crate) fn plain(kind: SchemaKind) -> Self {
        Self {
            kind,
            logical: None,
        }
    }
}

/// The wire type of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,
    /// Record type with named fields.
    Record(RecordSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Array of items with a single schema.
    Array(SchemaRef),
    /// Map with string keys and values of a single schema.
    Map(SchemaRef),
    /// Union of multiple schemas.
    Union(Vec<SchemaRef>),
    /// Fixed-size byte array.
    Fixed(FixedSchema),
    /// Forward reference to a named type. Only exists between the two parse
    /// passes; no edge of a finished schema points at one.
    Named(String),
}

impl SchemaKind {
    /// The Avro type name of this kind (`"record"`, `"long"`, ...).
    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Float => "float",
            SchemaKind::Double => "double",
            SchemaKind::Bytes => "bytes",
            SchemaKind::String => "string",
            SchemaKind::Record(_) => "record",
            SchemaKind::Enum(_) => "enum",
            SchemaKind::Array(_) => "array",
            SchemaKind::Map(_) => "map",
            SchemaKind::Union(_) => "union",
            SchemaKind::Fixed(_) => "fixed",
            SchemaKind::Named(_) => "named",
        }
    }

    /// Fully qualified name for named kinds.
    pub fn fullname(&self) -> Option<String> {
        match self {
            SchemaKind::Record(r) => Some(r.fullname()),
            SchemaKind::Enum(e) => Some(e.fullname()),
            SchemaKind::Fixed(f) => Some(f.fullname()),
            SchemaKind::Named(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// Check if this is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            SchemaKind::Null
                | SchemaKind::Boolean
                | SchemaKind::Int
                | SchemaKind::Long
                | SchemaKind::Float
                | SchemaKind::Double
                | SchemaKind::Bytes
                | SchemaKind::String
        )
    }

    /// Check if this is a named type (record, enum, or fixed).
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            SchemaKind::Record(_) | SchemaKind::Enum(_) | SchemaKind::Fixed(_)
        )
    }
}

/// A recognized logical type attached to a node.
#[derive(Clone)]
pub struct LogicalAnnotation {
    /// The `logicalType` name as written in the schema.
    pub name: String,
    /// Transformer built by the registry for this node.
    pub transformer: Arc<dyn LogicalType>,
}

impl fmt::Debug for LogicalAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalAnnotation")
            .field("name", &self.name)
            .field("transformer", &self.transformer)
            .finish()
    }
}

fn join_fullname(namespace: &Option<String>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The name of the record.
    pub name: String,
    /// Optional namespace for the record.
    pub namespace: Option<String>,
    /// The fields of the record.
    pub fields: Vec<FieldSchema>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this record.
    pub aliases: Vec<String>,
}

impl RecordSchema {
    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        join_fullname(&self.namespace, &self.name)
    }

    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The name of the field.
    pub name: String,
    /// The schema of the field's value.
    pub schema: SchemaRef,
    /// Optional default value, in textual (JSON) form.
    pub default: Option<JsonValue>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Field ordering (ascending, descending, ignore).
    pub order: FieldOrder,
    /// Aliases for this field.
    pub aliases: Vec<String>,
}

/// Field ordering for record comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldOrder {
    #[default]
    Ascending,
    Descending,
    Ignore,
}

impl FieldOrder {
    fn as_str(self) -> &'static str {
        match self {
            FieldOrder::Ascending => "ascending",
            FieldOrder::Descending => "descending",
            FieldOrder::Ignore => "ignore",
        }
    }
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The name of the enum.
    pub name: String,
    /// Optional namespace for the enum.
    pub namespace: Option<String>,
    /// The symbols (variants) of the enum.
    pub symbols: Vec<String>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this enum.
    pub aliases: Vec<String>,
    /// Default symbol.
    pub default: Option<String>,
}

impl EnumSchema {
    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        join_fullname(&self.namespace, &self.name)
    }

    /// Get the index of a symbol.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Schema for a fixed-size byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The name of the fixed type.
    pub name: String,
    /// Optional namespace for the fixed type.
    pub namespace: Option<String>,
    /// The size in bytes.
    pub size: usize,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this fixed type.
    pub aliases: Vec<String>,
}

impl FixedSchema {
    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        join_fullname(&self.namespace, &self.name)
    }
}

/// A parsed, fully resolved schema graph.
///
/// Immutable once built; cheap to share behind a reference.
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) root: SchemaRef,
    pub(crate) names: HashMap<String, SchemaRef>,
}

impl Schema {
    /// Handle of the top-level node.
    pub fn root(&self) -> SchemaRef {
        self.root
    }

    /// Look up a node by handle.
    ///
    /// Handles are only produced by the schema that owns them, so indexing
    /// cannot go out of bounds for handles obtained from this schema.
    pub fn node(&self, r: SchemaRef) -> &SchemaNode {
        &self.nodes[r.0]
    }

    /// Shorthand for `self.node(r).kind`.
    pub fn kind(&self, r: SchemaRef) -> &SchemaKind {
        &self.nodes[r.0].kind
    }

    /// Look up a named type by its fully qualified name.
    pub fn lookup(&self, fullname: &str) -> Option<SchemaRef> {
        self.names.get(fullname).copied()
    }

    /// All named types, keyed by fully qualified name.
    pub fn named_types(&self) -> &HashMap<String, SchemaRef> {
        &self.names
    }

    /// Name used to select `r` as a union branch.
    ///
    /// This is the underlying type name (the fully qualified name for named
    /// types), suffixed with `.logicalType` when a recognized logical type is
    /// attached. Logical types on `fixed` use the bare `fixed` prefix.
    pub fn qualified_name(&self, r: SchemaRef) -> String {
        let node = self.node(r);
        match &node.logical {
            Some(logical) => format!("{}.{}", node.kind.type_name(), logical.name),
            None => node
                .kind
                .fullname()
                .unwrap_or_else(|| node.kind.type_name().to_string()),
        }
    }

    /// Serialize the schema to a JSON string.
    ///
    /// ```
    /// use avrokit::schema::parse_schema;
    ///
    /// let schema = parse_schema(r#""string""#).unwrap();
    /// assert_eq!(schema.to_json(), r#""string""#);
    /// ```
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Serialize the schema to a JSON value.
    ///
    /// Each named type is written out in full at its first occurrence and by
    /// name afterwards, which keeps recursive schemas finite.
    pub fn to_json_value(&self) -> JsonValue {
        let mut seen = HashSet::new();
        self.node_to_json(self.root, &mut seen)
    }

    fn node_to_json(&self, r: SchemaRef, seen: &mut HashSet<String>) -> JsonValue {
        let node = self.node(r);
        let mut value = match &node.kind {
            SchemaKind::Record(record) => {
                if !seen.insert(record.fullname()) {
                    return json!(record.fullname());
                }
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("record"));
                obj.insert("name".to_string(), json!(&record.name));
                if let Some(ns) = &record.namespace {
                    obj.insert("namespace".to_string(), json!(ns));
                }
                if let Some(doc) = &record.doc {
                    obj.insert("doc".to_string(), json!(doc));
                }
                if !record.aliases.is_empty() {
                    obj.insert("aliases".to_string(), json!(&record.aliases));
                }
                let fields: Vec<JsonValue> = record
                    .fields
                    .iter()
                    .map(|f| {
                        let mut field = Map::new();
                        field.insert("name".to_string(), json!(&f.name));
                        field.insert("type".to_string(), self.node_to_json(f.schema, seen));
                        if let Some(default) = &f.default {
                            field.insert("default".to_string(), default.clone());
                        }
                        if let Some(doc) = &f.doc {
                            field.insert("doc".to_string(), json!(doc));
                        }
                        if f.order != FieldOrder::Ascending {
                            field.insert("order".to_string(), json!(f.order.as_str()));
                        }
                        if !f.aliases.is_empty() {
                            field.insert("aliases".to_string(), json!(&f.aliases));
                        }
                        JsonValue::Object(field)
                    })
                    .collect();
                obj.insert("fields".to_string(), JsonValue::Array(fields));
                JsonValue::Object(obj)
            }
            SchemaKind::Enum(e) => {
                if !seen.insert(e.fullname()) {
                    return json!(e.fullname());
                }
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("enum"));
                obj.insert("name".to_string(), json!(&e.name));
                if let Some(ns) = &e.namespace {
                    obj.insert("namespace".to_string(), json!(ns));
                }
                if let Some(doc) = &e.doc {
                    obj.insert("doc".to_string(), json!(doc));
                }
                if !e.aliases.is_empty() {
                    obj.insert("aliases".to_string(), json!(&e.aliases));
                }
                obj.insert("symbols".to_string(), json!(&e.symbols));
                if let Some(default) = &e.default {
                    obj.insert("default".to_string(), json!(default));
                }
                JsonValue::Object(obj)
            }
            SchemaKind::Fixed(f) => {
                if !seen.insert(f.fullname()) {
                    return json!(f.fullname());
                }
                let mut obj = Map::new();
                obj.insert("type".to_string(), json!("fixed"));
                obj.insert("name".to_string(), json!(&f.name));
                if let Some(ns) = &f.namespace {
                    obj.insert("namespace".to_string(), json!(ns));
                }
                if let Some(doc) = &f.doc {
                    obj.insert("doc".to_string(), json!(doc));
                }
                if !f.aliases.is_empty() {
                    obj.insert("aliases".to_string(), json!(&f.aliases));
                }
                obj.insert("size".to_string(), json!(f.size));
                JsonValue::Object(obj)
            }
            SchemaKind::Array(items) => {
                json!({ "type": "array", "items": self.node_to_json(*items, seen) })
            }
            SchemaKind::Map(values) => {
                json!({ "type": "map", "values": self.node_to_json(*values, seen) })
            }
            SchemaKind::Union(branches) => JsonValue::Array(
                branches
                    .iter()
                    .map(|b| self.node_to_json(*b, seen))
                    .collect(),
            ),
            SchemaKind::Named(name) => json!(name),
            primitive => json!(primitive.type_name()),
        };

        if let Some(logical) = &node.logical {
            if !value.is_object() {
                value = json!({ "type": value });
            }
            if let JsonValue::Object(obj) = &mut value {
                obj.insert("logicalType".to_string(), json!(&logical.name));
                for (key, prop) in logical.transformer.schema_properties() {
                    obj.insert(key, prop);
                }
            }
        }
        value
    }
}
