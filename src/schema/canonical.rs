//! Parsing Canonical Form and schema fingerprints.
//!
//! The canonical form strips everything that does not affect the wire
//! encoding (docs, aliases, defaults, logical annotations), fully qualifies
//! names, and fixes the attribute order so that two schemas describing the
//! same bytes render to the same string.

use std::collections::HashSet;
use std::fmt::Write;

use crate::schema::{Schema, SchemaKind, SchemaRef};

const RABIN_EMPTY: u64 = 0xc15d_213a_a4d7_a795;

const RABIN_TABLE: [u64; 256] = {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut fp = i as u64;
        let mut j = 0;
        while j < 8 {
            fp = (fp >> 1) ^ (RABIN_EMPTY & (fp & 1).wrapping_neg());
            j += 1;
        }
        table[i] = fp;
        i += 1;
    }
    table
};

/// 64-bit Rabin fingerprint (CRC-64-AVRO) of `data`.
pub fn rabin_fingerprint(data: &[u8]) -> u64 {
    data.iter().fold(RABIN_EMPTY, |fp, &b| {
        (fp >> 8) ^ RABIN_TABLE[((fp ^ b as u64) & 0xff) as usize]
    })
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

impl Schema {
    /// Render the schema in Parsing Canonical Form.
    ///
    /// ```
    /// use avrokit::schema::parse_schema;
    ///
    /// let schema = parse_schema(r#"{"type": "long", "logicalType": "timestamp-millis"}"#).unwrap();
    /// assert_eq!(schema.canonical_form(), r#""long""#);
    /// ```
    pub fn canonical_form(&self) -> String {
        let mut out = String::new();
        let mut seen = HashSet::new();
        self.write_canonical(self.root, &mut out, &mut seen);
        out
    }

    /// Rabin fingerprint of [`canonical_form`](Self::canonical_form).
    pub fn fingerprint(&self) -> u64 {
        rabin_fingerprint(self.canonical_form().as_bytes())
    }

    fn write_canonical(&self, r: SchemaRef, out: &mut String, seen: &mut HashSet<String>) {
        // Writing to a String cannot fail
        match self.kind(r) {
            SchemaKind::Record(record) => {
                let fullname = record.fullname();
                if !seen.insert(fullname.clone()) {
                    out.push_str(&quote(&fullname));
                    return;
                }
                let _ = write!(
                    out,
                    r#"{{"name":{},"type":"record","fields":["#,
                    quote(&fullname)
                );
                for (i, field) in record.fields.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, r#"{{"name":{},"type":"#, quote(&field.name));
                    self.write_canonical(field.schema, out, seen);
                    out.push('}');
                }
                out.push_str("]}");
            }
            SchemaKind::Enum(e) => {
                let fullname = e.fullname();
                if !seen.insert(fullname.clone()) {
                    out.push_str(&quote(&fullname));
                    return;
                }
                let symbols: Vec<String> = e.symbols.iter().map(|s| quote(s)).collect();
                let _ = write!(
                    out,
                    r#"{{"name":{},"type":"enum","symbols":[{}]}}"#,
                    quote(&fullname),
                    symbols.join(",")
                );
            }
            SchemaKind::Fixed(f) => {
                let fullname = f.fullname();
                if !seen.insert(fullname.clone()) {
                    out.push_str(&quote(&fullname));
                    return;
                }
                let _ = write!(
                    out,
                    r#"{{"name":{},"type":"fixed","size":{}}}"#,
                    quote(&fullname),
                    f.size
                );
            }
            SchemaKind::Array(items) => {
                out.push_str(r#"{"type":"array","items":"#);
                self.write_canonical(*items, out, seen);
                out.push('}');
            }
            SchemaKind::Map(values) => {
                out.push_str(r#"{"type":"map","values":"#);
                self.write_canonical(*values, out, seen);
                out.push('}');
            }
            SchemaKind::Union(branches) => {
                out.push('[');
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write_canonical(*branch, out, seen);
                }
                out.push(']');
            }
            SchemaKind::Named(name) => out.push_str(&quote(name)),
            primitive => out.push_str(&quote(primitive.type_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    #[test]
    fn test_rabin_known_values() {
        assert_eq!(rabin_fingerprint(b""), RABIN_EMPTY);
        assert_eq!(rabin_fingerprint(br#""null""#), 7195948357588979594);
        assert_eq!(rabin_fingerprint(br#""int""#), 8247732601305521295);
    }

    #[test]
    fn test_canonical_record_strips_attributes() {
        let schema = parse_schema(
            r#"{
                "type": "record", "name": "User", "namespace": "com.example",
                "doc": "a user", "aliases": ["Person"],
                "fields": [
                    {"name": "id", "type": "long", "default": 0, "doc": "identifier"},
                    {"name": "tags", "type": {"type": "array", "items": "string"}},
                    {"name": "self", "type": ["null", "User"]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(
            schema.canonical_form(),
            r#"{"name":"com.example.User","type":"record","fields":[{"name":"id","type":"long"},{"name":"tags","type":{"type":"array","items":"string"}},{"name":"self","type":["null","com.example.User"]}]}"#
        );
    }

    #[test]
    fn test_fingerprint_ignores_non_wire_attributes() {
        let a = parse_schema(r#"{"type": "fixed", "name": "F", "size": 16, "doc": "x"}"#).unwrap();
        let b = parse_schema(
            r#"{"type": "fixed", "name": "F", "size": 16, "logicalType": "decimal", "precision": 4}"#,
        )
        .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(
            a.canonical_form(),
            r#"{"name":"F","type":"fixed","size":16}"#
        );
    }
}
