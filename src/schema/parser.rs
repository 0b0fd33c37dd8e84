//! JSON schema parser for Avro schemas.
//!
//! Parses Avro schema JSON into a [`Schema`] arena. Parsing is two-pass:
//! the first pass builds nodes, reserving a handle for every named type
//! before its body is parsed so self-references resolve immediately; names
//! used before they are defined become placeholder nodes. The second pass
//! (see [`resolution`](super::resolution)) rewires every placeholder edge to
//! the defined type.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::CodecConfig;
use crate::error::SchemaError;
use crate::logical::{LogicalContext, LogicalTypeRegistry};
use crate::schema::resolution::{resolve_references, validate_resolved};
use crate::schema::{
    EnumSchema, FieldOrder, FieldSchema, FixedSchema, LogicalAnnotation, RecordSchema, Schema,
    SchemaKind, SchemaNode, SchemaRef,
};

/// Parse an Avro schema from a JSON string using the default configuration.
///
/// # Example
/// ```
/// use avrokit::schema::parse_schema;
///
/// let schema = parse_schema(r#"{"type": "long", "logicalType": "timestamp-millis"}"#).unwrap();
/// assert_eq!(schema.qualified_name(schema.root()), "long.timestamp-millis");
/// ```
pub fn parse_schema(json: &str) -> Result<Schema, SchemaError> {
    parse_schema_with_config(json, &CodecConfig::default())
}

/// Parse an Avro schema from a JSON string with an explicit configuration.
///
/// The configuration supplies the logical type registry and whether name
/// grammar violations are errors (strict) or warnings (permissive).
pub fn parse_schema_with_config(json: &str, config: &CodecConfig) -> Result<Schema, SchemaError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SchemaError::invalid(format!("Invalid JSON: {}", e)))?;

    SchemaParser::new(&config.registry)
        .with_strict(config.strict_names)
        .parse(&value)
}

/// Schema parser with named type resolution context.
#[derive(Debug)]
pub struct SchemaParser<'r> {
    registry: &'r LogicalTypeRegistry,
    nodes: Vec<SchemaNode>,
    /// Defined named types by fully qualified name
    names: HashMap<String, SchemaRef>,
    /// Current namespace for resolving unqualified names
    current_namespace: Option<String>,
    strict_schema: bool,
}

impl<'r> SchemaParser<'r> {
    /// Create a parser in permissive mode.
    pub fn new(registry: &'r LogicalTypeRegistry) -> Self {
        Self {
            registry,
            nodes: Vec::new(),
            names: HashMap::new(),
            current_namespace: None,
            strict_schema: false,
        }
    }

    /// Set whether name grammar violations fail parsing.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }

    /// Parse a JSON value into a resolved [`Schema`], consuming the parser.
    pub fn parse(mut self, value: &Value) -> Result<Schema, SchemaError> {
        let root = self.parse_value(value)?;
        let root = resolve_references(&mut self.nodes, &self.names, root)?;

        debug!(
            nodes = self.nodes.len(),
            named_types = self.names.len(),
            "Parsed schema"
        );

        let schema = Schema {
            nodes: self.nodes,
            root,
            names: self.names,
        };
        validate_resolved(&schema)?;
        Ok(schema)
    }

    fn push(&mut self, node: SchemaNode) -> SchemaRef {
        self.nodes.push(node);
        SchemaRef(self.nodes.len() - 1)
    }

    fn parse_value(&mut self, value: &Value) -> Result<SchemaRef, SchemaError> {
        match value {
            Value::String(s) => self.parse_string_schema(s),
            Value::Object(obj) => self.parse_object_schema(obj),
            Value::Array(arr) => self.parse_union_schema(arr),
            _ => Err(SchemaError::invalid(format!(
                "Expected string, object, or array, found: {}",
                value
            ))),
        }
    }

    fn primitive_kind(name: &str) -> Option<SchemaKind> {
        Some(match name {
            "null" => SchemaKind::Null,
            "boolean" => SchemaKind::Boolean,
            "int" => SchemaKind::Int,
            "long" => SchemaKind::Long,
            "float" => SchemaKind::Float,
            "double" => SchemaKind::Double,
            "bytes" => SchemaKind::Bytes,
            "string" => SchemaKind::String,
            _ => return None,
        })
    }

    /// Parse a primitive type or named type reference from a string.
    fn parse_string_schema(&mut self, s: &str) -> Result<SchemaRef, SchemaError> {
        match Self::primitive_kind(s) {
            Some(kind) => Ok(self.push(SchemaNode::plain(kind))),
            None => Ok(self.reference(s)),
        }
    }

    /// Resolve a name to its defined handle, or a placeholder if it has not
    /// been defined yet.
    fn reference(&mut self, name: &str) -> SchemaRef {
        let fullname = self.resolve_name(name);
        match self.names.get(&fullname) {
            Some(r) => *r,
            None => self.push(SchemaNode::plain(SchemaKind::Named(fullname))),
        }
    }

    /// Parse a complex type (or annotated primitive) from a JSON object.
    fn parse_object_schema(&mut self, obj: &Map<String, Value>) -> Result<SchemaRef, SchemaError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::invalid("Missing 'type' field"))?;

        // {"type": [...]} and {"type": {...}} wrap another schema
        let type_str = match type_value {
            Value::String(s) => s.as_str(),
            Value::Array(_) | Value::Object(_) => return self.parse_value(type_value),
            other => {
                return Err(SchemaError::invalid(format!(
                    "'type' must be a string, object, or array, found: {}",
                    other
                )))
            }
        };

        // Logical properties are validated before the type body so that
        // property errors are reported first.
        let logical = match obj.get("logicalType") {
            Some(lt) => self.parse_logical_type(obj, type_str, lt)?,
            None => None,
        };

        let node_ref = match type_str {
            "record" | "error" => self.parse_record_schema(obj)?,
            "enum" => self.parse_enum_schema(obj)?,
            "array" => self.parse_array_schema(obj)?,
            "map" => self.parse_map_schema(obj)?,
            "fixed" => self.parse_fixed_schema(obj)?,
            other => match Self::primitive_kind(other) {
                Some(kind) => self.push(SchemaNode::plain(kind)),
                // A reference to a named type; annotations on a reference
                // would alter the shared definition, so they are dropped.
                None => return Ok(self.reference(other)),
            },
        };

        self.nodes[node_ref.0].logical = logical;
        Ok(node_ref)
    }

    /// Look up a logical type in the registry and build its transformer.
    ///
    /// Returns `Ok(None)` for unrecognized names: the node then behaves as
    /// its plain underlying type.
    fn parse_logical_type(
        &self,
        obj: &Map<String, Value>,
        underlying: &str,
        logical_type_value: &Value,
    ) -> Result<Option<LogicalAnnotation>, SchemaError> {
        let name = logical_type_value
            .as_str()
            .ok_or_else(|| SchemaError::invalid("logicalType must be a string"))?;

        let ctx = LogicalContext {
            underlying,
            properties: obj,
        };
        match self.registry.build(&ctx, name) {
            Some(transformer) => Ok(Some(LogicalAnnotation {
                name: name.to_string(),
                transformer: transformer?,
            })),
            None => {
                debug!(
                    underlying = underlying,
                    logical_type = name,
                    "Unknown logical type, using underlying type"
                );
                Ok(None)
            }
        }
    }

    /// Parse a union schema from a JSON array.
    fn parse_union_schema(&mut self, arr: &[Value]) -> Result<SchemaRef, SchemaError> {
        if arr.is_empty() {
            return Err(SchemaError::invalid("Union schema cannot be empty"));
        }

        let branches = arr
            .iter()
            .map(|v| self.parse_value(v))
            .collect::<Result<Vec<_>, _>>()?;

        self.validate_union(&branches)?;

        Ok(self.push(SchemaNode::plain(SchemaKind::Union(branches))))
    }

    /// Split a possibly dotted name into (namespace, name) and the fullname.
    fn qualify(
        &self,
        name: &str,
        namespace: Option<&str>,
    ) -> (Option<String>, String, String) {
        let (ns, short) = match name.rsplit_once('.') {
            Some((ns, short)) => (Some(ns.to_string()), short.to_string()),
            None => (
                namespace
                    .map(String::from)
                    .or_else(|| self.current_namespace.clone()),
                name.to_string(),
            ),
        };
        let ns = ns.filter(|ns| !ns.is_empty());
        let fullname = match &ns {
            Some(ns) => format!("{}.{}", ns, short),
            None => short.clone(),
        };
        (ns, short, fullname)
    }

    /// Validate and register a named type, reserving its arena slot.
    fn declare(
        &mut self,
        obj: &Map<String, Value>,
        context: &str,
    ) -> Result<(Option<String>, String, String, SchemaRef), SchemaError> {
        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::invalid(format!("{} missing 'name' field", context)))?;

        let namespace = match obj.get("namespace") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                return Err(SchemaError::invalid(format!(
                    "{} namespace must be a string, found: {}",
                    context, other
                )))
            }
        };

        let (ns, short, fullname) = self.qualify(name, namespace);
        self.validate_name(&short, context)?;
        if let Some(ns) = &ns {
            for part in ns.split('.') {
                self.validate_name(part, "Namespace")?;
            }
        }

        if self.names.contains_key(&fullname) {
            return Err(SchemaError::invalid(format!(
                "Duplicate named type: {}",
                fullname
            )));
        }

        let slot = self.push(SchemaNode::plain(SchemaKind::Named(fullname.clone())));
        self.names.insert(fullname.clone(), slot);
        Ok((ns, short, fullname, slot))
    }

    /// Parse a record schema.
    fn parse_record_schema(&mut self, obj: &Map<String, Value>) -> Result<SchemaRef, SchemaError> {
        let (namespace, name, fullname, slot) = self.declare(obj, "Record")?;

        let fields_value = obj
            .get("fields")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::invalid(format!("Record {} missing 'fields' array", fullname))
            })?;

        // Nested types inherit the record's namespace
        let prev_namespace = std::mem::replace(&mut self.current_namespace, namespace.clone());
        let fields: Result<Vec<FieldSchema>, SchemaError> = fields_value
            .iter()
            .map(|f| self.parse_field_schema(f))
            .collect();
        self.current_namespace = prev_namespace;
        let fields = fields?;

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::invalid(format!(
                    "Record {} has duplicate field '{}'",
                    fullname, field.name
                )));
            }
        }

        self.nodes[slot.0] = SchemaNode::plain(SchemaKind::Record(RecordSchema {
            name,
            namespace,
            fields,
            doc: string_attr(obj, "doc"),
            aliases: aliases_attr(obj),
        }));
        Ok(slot)
    }

    /// Parse a field schema within a record.
    fn parse_field_schema(&mut self, value: &Value) -> Result<FieldSchema, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::invalid("Field must be an object"))?;

        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::invalid("Field missing 'name'"))?
            .to_string();

        self.validate_name(&name, "Field")?;

        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::invalid(format!("Field '{}' missing 'type'", name)))?;

        let schema = self.parse_value(type_value)?;

        let order = match obj.get("order").and_then(|v| v.as_str()) {
            None | Some("ascending") => FieldOrder::Ascending,
            Some("descending") => FieldOrder::Descending,
            Some("ignore") => FieldOrder::Ignore,
            Some(other) => {
                return Err(SchemaError::invalid(format!(
                    "Field '{}' has invalid order '{}'",
                    name, other
                )))
            }
        };

        Ok(FieldSchema {
            name,
            schema,
            default: obj.get("default").cloned(),
            doc: string_attr(obj, "doc"),
            order,
            aliases: aliases_attr(obj),
        })
    }

    /// Parse an enum schema.
    fn parse_enum_schema(&mut self, obj: &Map<String, Value>) -> Result<SchemaRef, SchemaError> {
        let (namespace, name, fullname, slot) = self.declare(obj, "Enum")?;

        let symbols = obj
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::invalid(format!("Enum {} missing 'symbols' array", fullname))
            })?
            .iter()
            .map(|v| {
                v.as_str().map(String::from).ok_or_else(|| {
                    SchemaError::invalid(format!("Enum {} symbols must be strings", fullname))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if symbols.is_empty() {
            return Err(SchemaError::invalid(format!(
                "Enum {} must have at least one symbol",
                fullname
            )));
        }

        let mut seen = HashSet::new();
        for symbol in &symbols {
            self.validate_name(symbol, "Enum symbol")?;
            if !seen.insert(symbol.as_str()) {
                return Err(SchemaError::invalid(format!(
                    "Enum {} has duplicate symbol '{}'",
                    fullname, symbol
                )));
            }
        }

        let default = string_attr(obj, "default");
        if let Some(default) = &default {
            if !symbols.contains(default) {
                return Err(SchemaError::invalid(format!(
                    "Enum {} default '{}' is not a symbol",
                    fullname, default
                )));
            }
        }

        self.nodes[slot.0] = SchemaNode::plain(SchemaKind::Enum(EnumSchema {
            name,
            namespace,
            symbols,
            doc: string_attr(obj, "doc"),
            aliases: aliases_attr(obj),
            default,
        }));
        Ok(slot)
    }

    /// Parse an array schema.
    fn parse_array_schema(&mut self, obj: &Map<String, Value>) -> Result<SchemaRef, SchemaError> {
        let items = obj
            .get("items")
            .ok_or_else(|| SchemaError::invalid("Array missing 'items' field"))?;

        let item_schema = self.parse_value(items)?;
        Ok(self.push(SchemaNode::plain(SchemaKind::Array(item_schema))))
    }

    /// Parse a map schema.
    fn parse_map_schema(&mut self, obj: &Map<String, Value>) -> Result<SchemaRef, SchemaError> {
        let values = obj
            .get("values")
            .ok_or_else(|| SchemaError::invalid("Map missing 'values' field"))?;

        let value_schema = self.parse_value(values)?;
        Ok(self.push(SchemaNode::plain(SchemaKind::Map(value_schema))))
    }

    /// Parse a fixed schema.
    fn parse_fixed_schema(&mut self, obj: &Map<String, Value>) -> Result<SchemaRef, SchemaError> {
        let (namespace, name, fullname, slot) = self.declare(obj, "Fixed")?;

        let size = obj.get("size").and_then(|v| v.as_u64()).ok_or_else(|| {
            SchemaError::invalid(format!(
                "Fixed {} 'size' must be a non-negative integer",
                fullname
            ))
        })?;

        self.nodes[slot.0] = SchemaNode::plain(SchemaKind::Fixed(FixedSchema {
            name,
            namespace,
            size: size as usize,
            doc: string_attr(obj, "doc"),
            aliases: aliases_attr(obj),
        }));
        Ok(slot)
    }

    /// Resolve a type name to its fully qualified form.
    fn resolve_name(&self, name: &str) -> String {
        if name.contains('.') {
            name.to_string()
        } else if let Some(ns) = &self.current_namespace {
            let qualified = format!("{}.{}", ns, name);
            // Fall back to the null namespace when only that one defines it
            if !self.names.contains_key(&qualified) && self.names.contains_key(name) {
                name.to_string()
            } else {
                qualified
            }
        } else {
            name.to_string()
        }
    }

    /// Validate that a name follows Avro naming rules.
    ///
    /// Avro names must:
    /// - Start with [A-Za-z_]
    /// - Contain only [A-Za-z0-9_]
    fn validate_name(&self, name: &str, context: &str) -> Result<(), SchemaError> {
        let problem = match name.chars().next() {
            None => Some(format!("{} name cannot be empty", context)),
            Some(first) if !first.is_ascii_alphabetic() && first != '_' => Some(format!(
                "{} name '{}' must start with a letter or underscore",
                context, name
            )),
            Some(_) => name
                .chars()
                .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_')
                .map(|ch| {
                    format!(
                        "{} name '{}' contains invalid character '{}' (only alphanumeric and underscore allowed)",
                        context, name, ch
                    )
                }),
        };

        match problem {
            Some(msg) if self.strict_schema => Err(SchemaError::InvalidSchema(msg)),
            Some(msg) => {
                warn!("{}", msg);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Union branch name as seen while parsing; placeholders report the
    /// name they refer to.
    fn branch_name(&self, r: SchemaRef) -> String {
        let node = &self.nodes[r.0];
        match &node.logical {
            Some(logical) => format!("{}.{}", node.kind.type_name(), logical.name),
            None => node
                .kind
                .fullname()
                .unwrap_or_else(|| node.kind.type_name().to_string()),
        }
    }

    /// Validate union schema rules.
    ///
    /// Avro unions must:
    /// - Not contain nested unions
    /// - Not contain two branches with the same qualified name
    fn validate_union(&self, branches: &[SchemaRef]) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for (i, branch) in branches.iter().enumerate() {
            if matches!(self.nodes[branch.0].kind, SchemaKind::Union(_)) {
                return Err(SchemaError::invalid(format!(
                    "Union contains nested union at position {} (unions cannot be nested)",
                    i
                )));
            }
            let name = self.branch_name(*branch);
            if !seen.insert(name.clone()) {
                return Err(SchemaError::invalid(format!(
                    "Union contains duplicate type '{}' at position {}",
                    name, i
                )));
            }
        }
        Ok(())
    }
}

fn string_attr(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn aliases_attr(obj: &Map<String, Value>) -> Vec<String> {
    obj.get("aliases")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
