//! Native value model.
//!
//! Every encode call takes a [`Value`] and every decode call produces one.
//! Logical-type nodes substitute a domain type (instant, duration, decimal)
//! for the primitive they are carried on.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use num_bigint::BigInt;
use num_rational::BigRational;

/// Seconds between `0001-01-01T00:00:00Z` and the Unix epoch.
const ZERO_INSTANT_UNIX_SECONDS: i64 = -62_135_596_800;

/// The zero instant, `0001-01-01T00:00:00Z`.
///
/// This is the value produced for an unset timestamp by most producers of the
/// wire format; [`Value::is_zero_instant`] recognizes it after a round-trip.
pub fn zero_instant() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(ZERO_INSTANT_UNIX_SECONDS)
}

/// A native value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer in the 64-bit signed range (used for both `int` and `long`)
    Int(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Byte sequence (`bytes` and `fixed`)
    Bytes(Vec<u8>),
    /// Text string (`string`, `enum` symbols, validated strings)
    String(String),
    /// Ordered sequence
    Array(Vec<Value>),
    /// String-keyed mapping
    Map(BTreeMap<String, Value>),
    /// Record fields in declared order
    Record(Vec<(String, Value)>),
    /// Union selection keyed by the branch's qualified name
    Union(String, Box<Value>),
    /// Absolute instant (`timestamp-*`, `date`)
    Instant(DateTime<Utc>),
    /// Signed duration (`time-*`)
    Duration(TimeDelta),
    /// Arbitrary-precision decimal (`decimal`)
    Decimal(BigRational),
}

impl Value {
    /// Wrap a value under a union branch's qualified name.
    ///
    /// ```
    /// use avrokit::Value;
    ///
    /// let v = Value::union("long.timestamp-millis", 0i64);
    /// assert_eq!(v.type_name(), "union");
    /// ```
    pub fn union(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Value::Union(name.into(), Box::new(value.into()))
    }

    /// Build a record from `(field, value)` pairs.
    pub fn record<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a decimal from an unscaled integer and a scale.
    pub fn decimal(unscaled: impl Into<BigInt>, scale: u32) -> Self {
        Value::Decimal(crate::logical::big_scaled_to_rational(unscaled.into(), scale))
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Union(..) => "union",
            Value::Instant(_) => "instant",
            Value::Duration(_) => "duration",
            Value::Decimal(_) => "decimal",
        }
    }

    /// Whether this is the [`zero_instant`].
    pub fn is_zero_instant(&self) -> bool {
        matches!(self, Value::Instant(t) if *t == zero_instant())
    }

    /// Look up a record field or map entry by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            Value::Map(entries) => entries.get(key),
            Value::Union(name, inner) if name == key => Some(inner),
            _ => None,
        }
    }

    /// Strip a union wrapper, returning the selected value.
    pub fn into_unwrapped(self) -> Value {
        match self {
            Value::Union(_, inner) => inner.into_unwrapped(),
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::Bytes(b) => write!(f, "{:?}", b),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => write!(f, "array of {}", items.len()),
            Value::Map(entries) => write!(f, "map of {}", entries.len()),
            Value::Record(fields) => write!(f, "record of {} fields", fields.len()),
            Value::Union(name, inner) => write!(f, "{{{}: {}}}", name, inner),
            Value::Instant(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Duration(d) => write!(f, "{}", d),
            Value::Decimal(r) => write!(f, "{}", r),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_from! {
    bool => |v| Value::Boolean(v),
    i32 => |v| Value::Int(v as i64),
    i64 => |v| Value::Int(v),
    f32 => |v| Value::Float(v),
    f64 => |v| Value::Double(v),
    Vec<u8> => |v| Value::Bytes(v),
    &[u8] => |v| Value::Bytes(v.to_vec()),
    String => |v| Value::String(v),
    &str => |v| Value::String(v.to_string()),
    Vec<Value> => |v| Value::Array(v),
    BTreeMap<String, Value> => |v| Value::Map(v),
    DateTime<Utc> => |v| Value::Instant(v),
    TimeDelta => |v| Value::Duration(v),
    BigRational => |v| Value::Decimal(v),
}
