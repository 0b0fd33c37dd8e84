//! Property-based tests for the codecs.
//!
//! These tests use proptest to check round-trip and framing properties across
//! many generated inputs.

use std::collections::BTreeMap;

use chrono::DateTime;
use proptest::prelude::*;

use avrokit::codec::varint::{decode_zigzag, encode_zigzag, MAX_VARINT_LEN};
use avrokit::{Codec, Value};

/// Milliseconds of `0001-01-01T00:00:00Z` and `9999-12-31T23:59:59.999Z`.
const MIN_MILLIS: i64 = -62_135_596_800_000;
const MAX_MILLIS: i64 = 253_402_300_799_999;

fn codec(schema: &str) -> Codec {
    Codec::new(schema).unwrap()
}

fn binary_round_trip(codec: &Codec, value: &Value) -> Value {
    let bytes = codec.binary_from_native(value).unwrap();
    let (decoded, rest) = codec.native_from_binary(&bytes).unwrap();
    assert!(rest.is_empty());
    decoded
}

fn textual_round_trip(codec: &Codec, value: &Value) -> Value {
    let text = codec.textual_from_native(value).unwrap();
    let (decoded, rest) = codec.native_from_textual(&text).unwrap();
    assert!(rest.is_empty());
    decoded
}

// ============================================================================
// Varint Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_zigzag_round_trip(n in any::<i64>()) {
        let mut buf = Vec::new();
        encode_zigzag(&mut buf, n);
        prop_assert!(buf.len() <= MAX_VARINT_LEN);

        let mut cursor: &[u8] = &buf;
        prop_assert_eq!(decode_zigzag(&mut cursor).unwrap(), n);
        prop_assert!(cursor.is_empty());
    }

    #[test]
    fn prop_zigzag_small_magnitudes_are_short(n in -64i64..64) {
        let mut buf = Vec::new();
        encode_zigzag(&mut buf, n);
        prop_assert_eq!(buf.len(), 1);
    }
}

// ============================================================================
// Primitive Round-Trip Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_long_round_trip(n in any::<i64>()) {
        let codec = codec(r#""long""#);
        prop_assert_eq!(binary_round_trip(&codec, &Value::Int(n)), Value::Int(n));
        prop_assert_eq!(textual_round_trip(&codec, &Value::Int(n)), Value::Int(n));
    }

    #[test]
    fn prop_int_range_is_enforced(n in any::<i64>()) {
        let codec = codec(r#""int""#);
        let result = codec.binary_from_native(&Value::Int(n));
        prop_assert_eq!(result.is_ok(), i32::try_from(n).is_ok());
    }

    #[test]
    fn prop_double_binary_round_trip(d in -1e300f64..1e300) {
        let codec = codec(r#""double""#);
        prop_assert_eq!(binary_round_trip(&codec, &Value::Double(d)), Value::Double(d));
    }

    #[test]
    fn prop_string_round_trip(s in any::<String>()) {
        let codec = codec(r#""string""#);
        let value = Value::from(s);
        prop_assert_eq!(binary_round_trip(&codec, &value), value.clone());
        prop_assert_eq!(textual_round_trip(&codec, &value), value);
    }

    #[test]
    fn prop_bytes_round_trip(b in prop::collection::vec(any::<u8>(), 0..64)) {
        let codec = codec(r#""bytes""#);
        let value = Value::from(b);
        prop_assert_eq!(binary_round_trip(&codec, &value), value.clone());
        prop_assert_eq!(textual_round_trip(&codec, &value), value);
    }
}

// ============================================================================
// Container Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_array_of_strings_round_trip(items in prop::collection::vec(".{0,12}", 0..16)) {
        let codec = codec(r#"{"type": "array", "items": "string"}"#);
        let value = Value::Array(items.into_iter().map(Value::from).collect());
        prop_assert_eq!(binary_round_trip(&codec, &value), value.clone());
        prop_assert_eq!(textual_round_trip(&codec, &value), value);
    }

    #[test]
    fn prop_map_of_longs_round_trip(entries in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..16)) {
        let codec = codec(r#"{"type": "map", "values": "long"}"#);
        let value = Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, Value::Int(v)))
                .collect::<BTreeMap<_, _>>(),
        );
        prop_assert_eq!(binary_round_trip(&codec, &value), value.clone());
        prop_assert_eq!(textual_round_trip(&codec, &value), value);
    }

    #[test]
    fn prop_every_strict_prefix_is_short(items in prop::collection::vec(".{0,6}", 1..8)) {
        let codec = codec(r#"{"type": "array", "items": "string"}"#);
        let value = Value::Array(items.into_iter().map(Value::from).collect());
        let bytes = codec.binary_from_native(&value).unwrap();
        for len in 0..bytes.len() {
            let err = codec.native_from_binary(&bytes[..len]).unwrap_err();
            prop_assert!(err.is_short_buffer(), "prefix {} of {:?}: {:?}", len, bytes, err);
        }
    }

    #[test]
    fn prop_concatenated_values_decode_in_order(ns in prop::collection::vec(any::<i64>(), 1..10)) {
        let codec = codec(r#"["null", "long"]"#);
        let mut buf = Vec::new();
        for n in &ns {
            codec.append_binary(&mut buf, &Value::Int(*n)).unwrap();
        }

        let mut rest: &[u8] = &buf;
        for n in &ns {
            let (value, tail) = codec.native_from_binary(rest).unwrap();
            prop_assert_eq!(value, Value::union("long", *n));
            rest = tail;
        }
        prop_assert!(rest.is_empty());
    }
}

// ============================================================================
// Logical Type Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_timestamp_millis_round_trip(ms in MIN_MILLIS..=MAX_MILLIS) {
        let codec = codec(r#"{"type": "long", "logicalType": "timestamp-millis"}"#);
        let when = DateTime::from_timestamp_millis(ms).unwrap();
        let value = Value::Instant(when);

        let bytes = codec.binary_from_native(&value).unwrap();
        prop_assert_eq!(bytes, codec.binary_from_native(&Value::Int(ms)).unwrap());
        prop_assert_eq!(binary_round_trip(&codec, &value), value.clone());
        prop_assert_eq!(textual_round_trip(&codec, &value), value);
    }

    #[test]
    fn prop_timestamp_micros_round_trip(us in (MIN_MILLIS * 1000)..=(MAX_MILLIS * 1000)) {
        let codec = codec(r#"{"type": "long", "logicalType": "timestamp-micros"}"#);
        let when = DateTime::from_timestamp_micros(us).unwrap();
        let value = Value::Instant(when);
        prop_assert_eq!(binary_round_trip(&codec, &value), value);
    }

    #[test]
    fn prop_decimal_bytes_round_trip(unscaled in any::<i64>(), scale in 0u32..12) {
        let codec = codec(&format!(
            r#"{{"type": "bytes", "logicalType": "decimal", "precision": 30, "scale": {}}}"#,
            scale
        ));
        let value = Value::decimal(unscaled, scale);
        prop_assert_eq!(binary_round_trip(&codec, &value), value.clone());
        prop_assert_eq!(textual_round_trip(&codec, &value), value);
    }

    #[test]
    fn prop_decimal_fixed_round_trip(unscaled in any::<i64>(), scale in 0u32..6) {
        let codec = codec(&format!(
            r#"{{"type": "fixed", "name": "D", "size": 8, "logicalType": "decimal", "precision": 18, "scale": {}}}"#,
            scale
        ));
        let value = Value::decimal(unscaled, scale);
        let bytes = codec.binary_from_native(&value).unwrap();
        prop_assert_eq!(bytes.len(), 8);
        prop_assert_eq!(&bytes[..], &unscaled.to_be_bytes()[..]);
        prop_assert_eq!(codec.native_from_binary(&bytes).unwrap().0, value);
    }
}
