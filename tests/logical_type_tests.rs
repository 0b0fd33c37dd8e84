//! Tests for logical types through the public codec API.

use std::collections::BTreeMap;
use std::sync::Arc;

use avrokit::{
    float_to_big_scaled, precision_and_scale_from_schema_map, Codec, CodecConfig, CodecError,
    LogicalType, LogicalTypeRegistry, Value,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use num_bigint::BigInt;
use serde_json::{json, Map, Value as JsonValue};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Helpers
// ============================================================================

fn codec(schema: &str) -> Codec {
    init_tracing();
    Codec::new(schema).unwrap_or_else(|e| panic!("schema: {}; {}", schema, e))
}

/// Encode, compare with `expected`, decode, and round-trip through JSON.
fn binary_codec_pass(schema: &str, value: Value, expected: &[u8]) {
    let codec = codec(schema);

    let encoded = codec
        .binary_from_native(&value)
        .unwrap_or_else(|e| panic!("schema: {}; encode: {}", schema, e));
    assert_eq!(encoded, expected, "schema: {}", schema);

    let (decoded, rest) = codec
        .native_from_binary(expected)
        .unwrap_or_else(|e| panic!("schema: {}; decode: {}", schema, e));
    assert!(rest.is_empty(), "schema: {}; remaining: {:?}", schema, rest);
    assert_eq!(decoded, value, "schema: {}", schema);

    let text = codec.textual_from_native(&decoded).unwrap();
    let (from_text, _) = codec.native_from_textual(&text).unwrap();
    assert_eq!(from_text, value, "schema: {}; text: {}", schema, String::from_utf8_lossy(&text));
}

fn binary_encode_fail(schema: &str, value: Value, expected: &str) -> CodecError {
    let err = codec(schema)
        .binary_from_native(&value)
        .expect_err("encode should fail");
    assert!(
        err.to_string().contains(expected),
        "schema: {}; error {:?} does not contain {:?}",
        schema,
        err.to_string(),
        expected
    );
    err
}

fn binary_decode_fails_short(schema: &str) {
    let err = codec(schema).native_from_binary(&[]).expect_err("decode should fail");
    assert!(err.is_short_buffer(), "schema: {}; {:?}", schema, err);
}

fn reference_time_millis() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap() + TimeDelta::milliseconds(565)
}

fn reference_time_micros() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap() + TimeDelta::microseconds(565_283)
}

// ============================================================================
// Schema Tests
// ============================================================================

#[test]
fn test_schema_logical_type() {
    Codec::new(r#"{"type": "long", "logicalType": "timestamp-millis"}"#).unwrap();

    let err = Codec::new(r#"{"type": "bytes", "logicalType": "decimal"}"#).unwrap_err();
    assert!(err.to_string().contains("precision"), "{}", err);

    let err = Codec::new(r#"{"type": "fixed", "size": 16, "logicalType": "decimal"}"#).unwrap_err();
    assert!(err.to_string().contains("precision"), "{}", err);
}

#[test]
fn test_string_logical_type_fallback() {
    let schema = r#"{"type": "string", "logicalType": "this_logical_type_does_not_exist"}"#;
    let parsed = codec(schema);
    assert_eq!(parsed.schema().qualified_name(parsed.schema().root()), "string");
    binary_codec_pass(
        schema,
        Value::from("test string"),
        b"\x16\x74\x65\x73\x74\x20\x73\x74\x72\x69\x6e\x67",
    );
}

#[test]
fn test_long_logical_type_fallback() {
    let schema = r#"{"type": "long", "logicalType": "this_logical_type_does_not_exist"}"#;
    binary_codec_pass(schema, Value::Int(12345), b"\xf2\xc0\x01");
}

#[test]
fn test_fallback_in_union_uses_plain_name() {
    let schema = r#"["null", {"type": "long", "logicalType": "this_logical_type_does_not_exist"}]"#;
    binary_codec_pass(schema, Value::union("long", 12345i64), b"\x02\xf2\xc0\x01");
}

// ============================================================================
// Timestamp Tests
// ============================================================================

#[test]
fn test_timestamp_millis_encode() {
    let schema = r#"{"type": "long", "logicalType": "timestamp-millis"}"#;
    binary_decode_fails_short(schema);
    binary_encode_fail(schema, Value::from("test"), "timestamp-millis");
    binary_codec_pass(
        schema,
        Value::Instant(reference_time_millis()),
        b"\xfa\x82\xac\xba\x91\x42",
    );
}

#[test]
fn test_timestamp_millis_union_encode() {
    let schema = r#"{"type": ["null", {"type": "long", "logicalType": "timestamp-millis"}]}"#;
    binary_encode_fail(
        schema,
        Value::union("string", "test"),
        "allowed types: [null long.timestamp-millis]",
    );
    binary_codec_pass(
        schema,
        Value::union("long.timestamp-millis", reference_time_millis()),
        b"\x02\xfa\x82\xac\xba\x91\x42",
    );
}

#[test]
fn test_timestamp_micros_encode() {
    let schema = r#"{"type": "long", "logicalType": "timestamp-micros"}"#;
    binary_decode_fails_short(schema);
    binary_encode_fail(schema, Value::from("test"), "timestamp-micros");
    binary_codec_pass(
        schema,
        Value::Instant(reference_time_micros()),
        b"\xc6\x8d\xf7\xe7\xaf\xd8\x84\x04",
    );
}

#[test]
fn test_timestamp_micros_union_encode() {
    let schema = r#"{"type": ["null", {"type": "long", "logicalType": "timestamp-micros"}]}"#;
    binary_encode_fail(
        schema,
        Value::union("string", "test"),
        "allowed types: [null long.timestamp-micros]",
    );
    binary_codec_pass(
        schema,
        Value::union("long.timestamp-micros", reference_time_micros()),
        b"\x02\xc6\x8d\xf7\xe7\xaf\xd8\x84\x04",
    );
}

#[test]
fn test_timestamp_accepts_raw_integer() {
    let codec = codec(r#"{"type": "long", "logicalType": "timestamp-millis"}"#);
    let encoded = codec.binary_from_native(&Value::Int(1_136_214_245_565)).unwrap();
    assert_eq!(encoded, b"\xfa\x82\xac\xba\x91\x42");
}

// ============================================================================
// Time of Day Tests
// ============================================================================

#[test]
fn test_time_millis_encode() {
    let schema = r#"{"type": "int", "logicalType": "time-millis"}"#;
    binary_decode_fails_short(schema);
    binary_encode_fail(schema, Value::from("test"), "time-millis");
    binary_codec_pass(
        schema,
        Value::Duration(TimeDelta::milliseconds(66_904_022)),
        b"\xac\xff\xe6\x3f",
    );
}

#[test]
fn test_time_millis_union_encode() {
    let schema = r#"{"type": ["null", {"type": "int", "logicalType": "time-millis"}]}"#;
    binary_encode_fail(
        schema,
        Value::union("string", "test"),
        "allowed types: [null int.time-millis]",
    );
    binary_codec_pass(
        schema,
        Value::union("int.time-millis", TimeDelta::milliseconds(66_904_022)),
        b"\x02\xac\xff\xe6\x3f",
    );
}

#[test]
fn test_time_micros_encode() {
    let schema = r#"{"type": "long", "logicalType": "time-micros"}"#;
    binary_decode_fails_short(schema);
    binary_encode_fail(schema, Value::from("test"), "time-micros");
    binary_codec_pass(
        schema,
        Value::Duration(TimeDelta::microseconds(66_904_022_566)),
        b"\xcc\xf8\xd2\xbc\xf2\x03",
    );
}

#[test]
fn test_time_micros_union_encode() {
    let schema = r#"{"type": ["null", {"type": "long", "logicalType": "time-micros"}]}"#;
    binary_encode_fail(
        schema,
        Value::union("string", "test"),
        "allowed types: [null long.time-micros]",
    );
    binary_codec_pass(
        schema,
        Value::union("long.time-micros", TimeDelta::microseconds(66_904_022_566)),
        b"\x02\xcc\xf8\xd2\xbc\xf2\x03",
    );
}

// ============================================================================
// Date Tests
// ============================================================================

#[test]
fn test_date_encode() {
    let schema = r#"{"type": "int", "logicalType": "date"}"#;
    binary_decode_fails_short(schema);
    let err = binary_encode_fail(schema, Value::from("test"), "date");
    assert!(err.to_string().contains("received string"), "{}", err);
    binary_codec_pass(
        schema,
        Value::Instant(Utc.with_ymd_and_hms(2006, 1, 2, 0, 0, 0).unwrap()),
        b"\xbc\xcd\x01",
    );
}

#[test]
fn test_date_accepts_day_count() {
    let codec = codec(r#"{"type": "int", "logicalType": "date"}"#);
    assert_eq!(codec.binary_from_native(&Value::Int(13150)).unwrap(), b"\xbc\xcd\x01");
}

// ============================================================================
// Zero Instant Tests
// ============================================================================

fn zero_instant_round_trip(schema: &str, expected: &[u8]) {
    let codec = codec(schema);
    let encoded = codec
        .binary_from_native(&Value::Instant(avrokit::zero_instant()))
        .unwrap();
    assert_eq!(encoded, expected, "schema: {}", schema);

    let (value, rest) = codec.native_from_binary(expected).unwrap();
    assert!(rest.is_empty(), "schema: {}", schema);
    assert!(
        value.is_zero_instant(),
        "schema: {}; decoded {:?}",
        schema,
        value
    );
}

#[test]
fn test_date_zero_instant() {
    zero_instant_round_trip(r#"{"type": "int", "logicalType": "date"}"#, &[0xf3, 0xe4, 0x57]);
}

#[test]
fn test_timestamp_millis_zero_instant() {
    zero_instant_round_trip(
        r#"{"type": "long", "logicalType": "timestamp-millis"}"#,
        &[0xff, 0xdf, 0xe6, 0xa2, 0xe2, 0xa0, 0x1c],
    );
}

#[test]
fn test_timestamp_micros_zero_instant() {
    zero_instant_round_trip(
        r#"{"type": "long", "logicalType": "timestamp-micros"}"#,
        &[0xff, 0xff, 0xdd, 0xf2, 0xdf, 0xff, 0xdf, 0xdc, 0x01],
    );
}

// ============================================================================
// Union Selection Tests
// ============================================================================

#[test]
fn test_union_selected_by_single_entry_map() {
    let codec = codec(r#"["null", {"type": "long", "logicalType": "timestamp-millis"}]"#);
    let when = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();

    let mut selection = BTreeMap::new();
    selection.insert("long.timestamp-millis".to_string(), Value::Instant(when));
    let bytes = codec.binary_from_native(&Value::Map(selection)).unwrap();

    let (decoded, _) = codec.native_from_binary(&bytes).unwrap();
    assert_eq!(
        decoded.get("long.timestamp-millis"),
        Some(&Value::Instant(when))
    );
    assert_eq!(
        decoded.into_unwrapped().to_string(),
        "2006-01-02T15:04:05+00:00"
    );
}

#[test]
fn test_union_unqualified_instant_selects_logical_branch() {
    let codec = codec(r#"["null", "string", {"type": "long", "logicalType": "timestamp-millis"}]"#);
    let bytes = codec
        .binary_from_native(&Value::Instant(reference_time_millis()))
        .unwrap();
    assert_eq!(bytes, b"\x04\xfa\x82\xac\xba\x91\x42");
}

#[test]
fn test_union_ambiguous_logical_branches() {
    // Both branches accept an instant
    let codec = codec(
        r#"[{"type": "long", "logicalType": "timestamp-millis"},
            {"type": "long", "logicalType": "timestamp-micros"}]"#,
    );
    let err = codec
        .binary_from_native(&Value::Instant(reference_time_millis()))
        .unwrap_err();
    match err {
        CodecError::NoMatchingBranch { allowed, .. } => {
            assert_eq!(allowed, vec!["long.timestamp-millis", "long.timestamp-micros"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let bytes = codec
        .binary_from_native(&Value::union(
            "long.timestamp-micros",
            reference_time_micros(),
        ))
        .unwrap();
    assert_eq!(bytes, b"\x02\xc6\x8d\xf7\xe7\xaf\xd8\x84\x04");
}

#[test]
fn test_textual_union_uses_qualified_key() {
    let codec = codec(r#"["null", {"type": "int", "logicalType": "time-millis"}]"#);
    let text = codec
        .textual_from_native(&Value::union(
            "int.time-millis",
            TimeDelta::milliseconds(66_904_022),
        ))
        .unwrap();
    assert_eq!(text, br#"{"int.time-millis":66904022}"#);
    assert_eq!(codec.textual_from_native(&Value::Null).unwrap(), b"null");
}

// ============================================================================
// Decimal Tests
// ============================================================================

#[test]
fn test_float_to_big_scaled() {
    let cases = [(50.113, 4, 501130), (50.1113, 4, 501113), (50.13, 2, 5013)];
    for (decimal, scale, expected) in cases {
        assert_eq!(
            float_to_big_scaled(decimal, scale).unwrap(),
            BigInt::from(expected),
            "{} at scale {}",
            decimal,
            scale
        );
    }
    assert!(matches!(
        float_to_big_scaled(f64::NAN, 2),
        Err(CodecError::Conversion(_))
    ));
}

fn schema_map(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

#[test]
fn test_precision_and_scale_from_schema_map_validation() {
    let invalid = [
        (json!({}), "cannot create decimal logical type without precision"),
        (json!({"precision": true}), "wrong precision type"),
        (json!({"precision": 0}), "precision is less than one"),
        (json!({"precision": 2, "scale": true}), "wrong scale type"),
        (json!({"precision": 2, "scale": -1}), "scale is less than zero"),
        (json!({"precision": 2, "scale": 3}), "scale is larger than precision"),
    ];
    for (props, message) in invalid {
        let err = precision_and_scale_from_schema_map(&schema_map(props.clone())).unwrap_err();
        assert!(
            err.to_string().contains(message),
            "{}: {} does not contain {:?}",
            props,
            err,
            message
        );
    }

    let (p, s) =
        precision_and_scale_from_schema_map(&schema_map(json!({"precision": 1, "scale": 1})))
            .unwrap();
    assert_eq!((p, s), (1, 1));

    // Scale defaults to zero
    let (p, s) = precision_and_scale_from_schema_map(&schema_map(json!({"precision": 4}))).unwrap();
    assert_eq!((p, s), (4, 0));
}

#[test]
fn test_bytes_decimal_round_trip() {
    let schema = r#"{"type": "bytes", "logicalType": "decimal", "precision": 4, "scale": 2}"#;
    binary_codec_pass(schema, Value::decimal(1234, 2), b"\x04\x04\xd2");
    binary_codec_pass(schema, Value::decimal(-100, 2), b"\x02\x9c");
    binary_codec_pass(schema, Value::decimal(0, 2), b"\x02\x00");
}

#[test]
fn test_bytes_decimal_from_float() {
    let codec = codec(r#"{"type": "bytes", "logicalType": "decimal", "precision": 4, "scale": 2}"#);
    let bytes = codec.binary_from_native(&Value::Double(50.13)).unwrap();
    assert_eq!(bytes, b"\x04\x13\x95");

    let (decoded, _) = codec.native_from_binary(&bytes).unwrap();
    assert_eq!(decoded, Value::decimal(5013, 2));

    assert!(matches!(
        codec.binary_from_native(&Value::Double(f64::INFINITY)),
        Err(CodecError::Conversion(_))
    ));
}

#[test]
fn test_fixed_decimal_sign_extends() {
    let schema = r#"{"type": "fixed", "name": "Money", "size": 4, "logicalType": "decimal", "precision": 6, "scale": 2}"#;
    binary_codec_pass(schema, Value::decimal(-100, 2), b"\xff\xff\xff\x9c");
    binary_codec_pass(schema, Value::decimal(1234, 2), b"\x00\x00\x04\xd2");

    // 2^40 needs six bytes
    let err = codec(schema)
        .binary_from_native(&Value::decimal(1i64 << 40, 2))
        .unwrap_err();
    assert!(matches!(err, CodecError::Conversion(_)), "{:?}", err);
}

#[test]
fn test_decimal_union_names() {
    let schema = r#"["null",
        {"type": "bytes", "logicalType": "decimal", "precision": 4, "scale": 2},
        {"type": "fixed", "name": "Money", "size": 2, "logicalType": "decimal", "precision": 4, "scale": 1}]"#;
    binary_codec_pass(schema, Value::union("bytes.decimal", Value::decimal(1234, 2)), b"\x02\x04\x04\xd2");
    binary_codec_pass(schema, Value::union("fixed.decimal", Value::decimal(-1, 1)), b"\x04\xff\xff");
}

// ============================================================================
// Validated String Tests
// ============================================================================

const PHONE_SCHEMA: &str = r#"{
    "type": "record",
    "name": "myrecord",
    "fields": [
        {
            "name": "number",
            "doc": "Phone number inside the national network. Length between 4-14",
            "type": {
                "type": "string",
                "logicalType": "validatedString",
                "pattern": "^[\\d]{4,14}$"
            }
        }
    ]
}"#;

#[test]
fn test_validated_string_in_record() {
    let codec = codec(PHONE_SCHEMA);

    let (native, _) = codec.native_from_textual(br#"{"number": "667777777"}"#).unwrap();
    let binary = codec.binary_from_native(&native).unwrap();

    let mut expected = vec![0x12];
    expected.extend_from_slice(b"667777777");
    assert_eq!(binary, expected);

    // A map with the same keys encodes identically
    let mut as_map = BTreeMap::new();
    as_map.insert("number".to_string(), Value::from("667777777"));
    assert_eq!(codec.binary_from_native(&Value::Map(as_map)).unwrap(), expected);

    let (native, _) = codec.native_from_binary(&binary).unwrap();
    let textual = codec.textual_from_native(&native).unwrap();
    assert_eq!(String::from_utf8(textual).unwrap(), r#"{"number":"667777777"}"#);
}

#[test]
fn test_validated_string_rejects_mismatch() {
    let codec = codec(PHONE_SCHEMA);
    let err = codec
        .binary_from_native(&Value::record([("number", "12")]))
        .unwrap_err();
    assert_eq!(
        err,
        CodecError::ValidationFailed {
            value: "12".to_string(),
            pattern: r"^[\d]{4,14}$".to_string(),
        }
    );
    assert!(codec.textual_from_native(&Value::record([("number", "abcd")])).is_err());
}

#[test]
fn test_validated_string_requires_pattern() {
    let err = Codec::new(r#"{"type": "string", "logicalType": "validatedString"}"#).unwrap_err();
    assert!(err.to_string().contains("pattern"), "{}", err);

    let err = Codec::new(
        r#"{"type": "string", "logicalType": "validatedString", "pattern": "("}"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("regular expression"), "{}", err);
}

// ============================================================================
// Registry Tests
// ============================================================================

/// Stores strings reversed on the wire.
#[derive(Debug)]
struct Reversed;

impl Reversed {
    fn reverse(value: &Value) -> Result<Value, CodecError> {
        match value {
            Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
            other => Err(CodecError::UnsupportedNativeType {
                target: "reversed".to_string(),
                received: other.type_name().to_string(),
            }),
        }
    }
}

impl LogicalType for Reversed {
    fn name(&self) -> &str {
        "reversed"
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, CodecError> {
        Self::reverse(value)
    }

    fn to_native(&self, value: Value) -> Result<Value, CodecError> {
        Self::reverse(&value)
    }
}

#[test]
fn test_custom_logical_type() {
    let mut registry = LogicalTypeRegistry::default();
    registry.register("string", "reversed", |_| {
        Ok(Arc::new(Reversed) as Arc<dyn LogicalType>)
    });
    let config = CodecConfig::new().with_registry(registry);

    let schema = r#"["null", {"type": "string", "logicalType": "reversed"}]"#;
    let codec = Codec::with_config(schema, &config).unwrap();
    assert_eq!(codec.schema().qualified_name(codec.schema().root()), "union");

    let bytes = codec.binary_from_native(&Value::from("abc")).unwrap();
    assert_eq!(bytes, b"\x02\x06cba");
    let (decoded, _) = codec.native_from_binary(&bytes).unwrap();
    assert_eq!(decoded, Value::union("string.reversed", "abc"));

    // The default registry does not know the type
    let plain = Codec::new(schema).unwrap();
    let (decoded, _) = plain.native_from_binary(&bytes).unwrap();
    assert_eq!(decoded, Value::union("string", "cba"));
}

#[test]
fn test_empty_registry_falls_back() {
    let config = CodecConfig::new().with_registry(LogicalTypeRegistry::empty());
    let codec = Codec::with_config(r#"{"type": "long", "logicalType": "timestamp-millis"}"#, &config)
        .unwrap();
    let (decoded, _) = codec.native_from_binary(b"\xfa\x82\xac\xba\x91\x42").unwrap();
    assert_eq!(decoded, Value::Int(1_136_214_245_565));
}

#[test]
fn test_schema_json_keeps_logical_properties() {
    let codec = codec(r#"{"type": "bytes", "logicalType": "decimal", "precision": 4, "scale": 2}"#);
    assert_eq!(
        codec.schema().to_json_value(),
        json!({"type": "bytes", "logicalType": "decimal", "precision": 4, "scale": 2})
    );
    assert_eq!(codec.canonical_schema(), r#""bytes""#);
}
