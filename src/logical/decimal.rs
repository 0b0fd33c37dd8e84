//! Decimal engine: precision/scale validation and exact scaling.
//!
//! A decimal is carried on the wire as the two's-complement big-endian
//! integer `value × 10^scale`. Floats are scaled through their shortest
//! decimal string so that `50.113` scales to `501130` and not `501129`.

use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use num_traits::{One, Zero};
use serde_json::{json, Map, Value as JsonValue};

use super::{unsupported, LogicalContext, LogicalType};
use crate::error::{CodecError, SchemaError};
use crate::value::Value;

const PRECISION: &str = "precision";
const SCALE: &str = "scale";

/// Read and validate `precision` and `scale` from a decimal schema object.
///
/// `precision` is required and must be a number ≥ 1. `scale` defaults to 0;
/// when present it must be a number between 0 and `precision`.
pub fn precision_and_scale_from_schema_map(
    props: &Map<String, JsonValue>,
) -> Result<(usize, usize), SchemaError> {
    let precision = match props.get(PRECISION) {
        None => {
            return Err(SchemaError::invalid(
                "cannot create decimal logical type without precision",
            ))
        }
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(other) => {
            return Err(SchemaError::invalid(format!(
                "cannot create decimal logical type with wrong precision type; expected number; received: {}",
                other
            )))
        }
    };
    if precision < 1.0 {
        return Err(SchemaError::invalid(format!(
            "cannot create decimal logical type when precision is less than one: {}",
            precision
        )));
    }

    let scale = match props.get(SCALE) {
        None => 0.0,
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(other) => {
            return Err(SchemaError::invalid(format!(
                "cannot create decimal logical type with wrong scale type; expected number; received: {}",
                other
            )))
        }
    };
    if scale < 0.0 {
        return Err(SchemaError::invalid(format!(
            "cannot create decimal logical type when scale is less than zero: {}",
            scale
        )));
    }
    if scale > precision {
        return Err(SchemaError::invalid(format!(
            "cannot create decimal logical type when scale is larger than precision: {} > {}",
            scale, precision
        )));
    }

    Ok((precision as usize, scale as usize))
}

fn pow10(scale: u32) -> BigInt {
    num_traits::pow(BigInt::from(10), scale as usize)
}

/// Compute `round(value × 10^scale)` exactly.
///
/// The float is first rendered as its shortest round-trip decimal string,
/// the decimal point is shifted `scale` places, and the digits are parsed as
/// an integer. Digits beyond `scale` round half away from zero.
///
/// # Errors
/// `CodecError::Conversion` for NaN and infinities.
///
/// # Example
/// ```
/// use avrokit::logical::float_to_big_scaled;
/// use num_bigint::BigInt;
///
/// assert_eq!(float_to_big_scaled(50.113, 4).unwrap(), BigInt::from(501130));
/// ```
pub fn float_to_big_scaled(value: f64, scale: u32) -> Result<BigInt, CodecError> {
    if !value.is_finite() {
        return Err(CodecError::conversion(format!(
            "cannot scale non-finite value {} to a decimal",
            value
        )));
    }

    // Display for f64 is the shortest round-trip form and never uses an
    // exponent.
    let text = value.to_string();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

    let scale = scale as usize;
    let mut shifted = String::with_capacity(int_part.len() + scale);
    shifted.push_str(int_part);
    let round_up = if frac_part.len() <= scale {
        shifted.push_str(frac_part);
        shifted.extend(std::iter::repeat('0').take(scale - frac_part.len()));
        false
    } else {
        shifted.push_str(&frac_part[..scale]);
        frac_part.as_bytes()[scale] >= b'5'
    };

    let mut magnitude: BigInt = shifted.parse().map_err(|e| {
        CodecError::conversion(format!("cannot parse scaled digits {:?}: {}", shifted, e))
    })?;
    if round_up {
        magnitude += BigInt::one();
    }
    Ok(if negative { -magnitude } else { magnitude })
}

/// `unscaled / 10^scale` as a rational.
pub fn big_scaled_to_rational(unscaled: BigInt, scale: u32) -> BigRational {
    BigRational::new(unscaled, pow10(scale))
}

/// `round(value × 10^scale)`, rounding half away from zero.
pub fn rational_to_big_scaled(value: &BigRational, scale: u32) -> BigInt {
    let scaled = value * BigRational::from_integer(pow10(scale));
    scaled.round().to_integer()
}

/// Decimal node parameters shared by the bytes and fixed transformers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DecimalParams {
    precision: usize,
    scale: u32,
}

impl DecimalParams {
    fn from_context(ctx: &LogicalContext<'_>) -> Result<Self, SchemaError> {
        let (precision, scale) = precision_and_scale_from_schema_map(ctx.properties)?;
        Ok(Self {
            precision,
            scale: scale as u32,
        })
    }

    fn accepts(value: &Value) -> bool {
        matches!(value, Value::Decimal(_))
    }

    fn scaled(&self, name: &str, value: &Value) -> Result<BigInt, CodecError> {
        match value {
            Value::Decimal(r) => Ok(rational_to_big_scaled(r, self.scale)),
            Value::Double(x) => float_to_big_scaled(*x, self.scale),
            Value::Float(x) => float_to_big_scaled(*x as f64, self.scale),
            Value::Int(i) => Ok(BigInt::from(*i) * pow10(self.scale)),
            other => Err(unsupported(name, "decimal or number", other)),
        }
    }

    fn native(&self, unscaled: &[u8]) -> Value {
        let n = if unscaled.is_empty() {
            BigInt::zero()
        } else {
            BigInt::from_signed_bytes_be(unscaled)
        };
        Value::Decimal(big_scaled_to_rational(n, self.scale))
    }

    fn properties(&self) -> Vec<(String, JsonValue)> {
        vec![
            (PRECISION.to_string(), json!(self.precision)),
            (SCALE.to_string(), json!(self.scale)),
        ]
    }
}

/// `decimal` on `bytes`: minimal-length two's-complement big-endian.
#[derive(Debug, Clone)]
pub struct DecimalBytes {
    params: DecimalParams,
}

impl DecimalBytes {
    /// Build from the annotated schema object.
    pub fn from_context(ctx: &LogicalContext<'_>) -> Result<Self, SchemaError> {
        Ok(Self {
            params: DecimalParams::from_context(ctx)?,
        })
    }

    /// Declared precision.
    pub fn precision(&self) -> usize {
        self.params.precision
    }

    /// Declared scale.
    pub fn scale(&self) -> u32 {
        self.params.scale
    }
}

impl LogicalType for DecimalBytes {
    fn name(&self) -> &str {
        "decimal"
    }

    fn accepts(&self, value: &Value) -> bool {
        DecimalParams::accepts(value)
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, CodecError> {
        let n = self.params.scaled("bytes.decimal", value)?;
        Ok(Value::Bytes(n.to_signed_bytes_be()))
    }

    fn to_native(&self, value: Value) -> Result<Value, CodecError> {
        match value {
            Value::Bytes(b) => Ok(self.params.native(&b)),
            other => Err(unsupported("bytes.decimal", "bytes", &other)),
        }
    }

    fn schema_properties(&self) -> Vec<(String, JsonValue)> {
        self.params.properties()
    }
}

/// `decimal` on `fixed`: two's-complement big-endian, sign-extended to the
/// fixed size.
#[derive(Debug, Clone)]
pub struct DecimalFixed {
    params: DecimalParams,
    size: usize,
}

impl DecimalFixed {
    /// Build from the annotated schema object, which must carry `size`.
    pub fn from_context(ctx: &LogicalContext<'_>) -> Result<Self, SchemaError> {
        let params = DecimalParams::from_context(ctx)?;
        let size = ctx
            .properties
            .get("size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                SchemaError::invalid("cannot create fixed decimal logical type without size")
            })?;
        Ok(Self {
            params,
            size: size as usize,
        })
    }

    /// Width of the encoded value in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl LogicalType for DecimalFixed {
    fn name(&self) -> &str {
        "decimal"
    }

    fn accepts(&self, value: &Value) -> bool {
        DecimalParams::accepts(value)
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, CodecError> {
        let n = self.params.scaled("fixed.decimal", value)?;
        let minimal = n.to_signed_bytes_be();
        if minimal.len() > self.size {
            return Err(CodecError::conversion(format!(
                "decimal {} needs {} bytes, fixed size is {}",
                n,
                minimal.len(),
                self.size
            )));
        }
        let fill = if n.sign() == Sign::Minus { 0xFF } else { 0x00 };
        let mut out = vec![fill; self.size - minimal.len()];
        out.extend_from_slice(&minimal);
        Ok(Value::Bytes(out))
    }

    fn to_native(&self, value: Value) -> Result<Value, CodecError> {
        match value {
            Value::Bytes(b) => Ok(self.params.native(&b)),
            other => Err(unsupported("fixed.decimal", "bytes", &other)),
        }
    }

    fn schema_properties(&self) -> Vec<(String, JsonValue)> {
        self.params.properties()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_float_to_big_scaled() {
        let cases = [
            (50.113, 4, "501130"),
            (50.1113, 4, "501113"),
            (50.13, 2, "5013"),
            (-50.13, 2, "-5013"),
            (0.0, 3, "0"),
            (1.005, 2, "101"),
            (2.5, 0, "3"),
            (-2.5, 0, "-3"),
            (1e-7, 2, "0"),
            (123.0, 0, "123"),
        ];
        for (value, scale, expected) in cases {
            let expected: BigInt = expected.parse().unwrap();
            assert_eq!(
                float_to_big_scaled(value, scale).unwrap(),
                expected,
                "float_to_big_scaled({}, {})",
                value,
                scale
            );
        }
    }

    #[test]
    fn test_float_to_big_scaled_non_finite() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                float_to_big_scaled(value, 2),
                Err(CodecError::Conversion(_))
            ));
        }
    }

    #[test]
    fn test_precision_and_scale_validation() {
        let invalid = [
            (json!({}), "cannot create decimal logical type without precision"),
            (json!({"precision": true}), "wrong precision type"),
            (json!({"precision": 0.0}), "precision is less than one"),
            (json!({"precision": 2.0, "scale": true}), "wrong scale type"),
            (json!({"precision": 2.0, "scale": -1.0}), "scale is less than zero"),
            (json!({"precision": 2.0, "scale": 3.0}), "scale is larger than precision"),
        ];
        for (props, expected) in invalid {
            let err = precision_and_scale_from_schema_map(&map(props.clone())).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "{} should fail with {:?}, got {:?}",
                props,
                expected,
                err.to_string()
            );
        }

        assert_eq!(
            precision_and_scale_from_schema_map(&map(json!({"precision": 1.0, "scale": 1.0})))
                .unwrap(),
            (1, 1)
        );
        // Absent scale defaults to zero
        assert_eq!(
            precision_and_scale_from_schema_map(&map(json!({"precision": 9}))).unwrap(),
            (9, 0)
        );
    }

    #[test]
    fn test_rational_scaling_rounds_half_away_from_zero() {
        let r = BigRational::new(BigInt::from(1), BigInt::from(8)); // 0.125
        assert_eq!(rational_to_big_scaled(&r, 2), BigInt::from(13));
        assert_eq!(rational_to_big_scaled(&-r, 2), BigInt::from(-13));
        let exact = BigRational::new(BigInt::from(12345), BigInt::from(100));
        assert_eq!(rational_to_big_scaled(&exact, 2), BigInt::from(12345));
    }

    #[test]
    fn test_bytes_decimal_minimal_twos_complement() {
        let props = map(json!({"type": "bytes", "precision": 10, "scale": 2}));
        let ctx = LogicalContext {
            underlying: "bytes",
            properties: &props,
        };
        let decimal = DecimalBytes::from_context(&ctx).unwrap();
        assert_eq!(decimal.precision(), 10);
        assert_eq!(decimal.scale(), 2);

        // 1.27 -> 127 -> 0x7F; 1.28 -> 128 -> 0x00 0x80; -1.28 -> -128 -> 0x80
        assert_eq!(
            decimal.to_underlying(&Value::decimal(127, 2)).unwrap(),
            Value::Bytes(vec![0x7F])
        );
        assert_eq!(
            decimal.to_underlying(&Value::decimal(128, 2)).unwrap(),
            Value::Bytes(vec![0x00, 0x80])
        );
        assert_eq!(
            decimal.to_underlying(&Value::decimal(-128, 2)).unwrap(),
            Value::Bytes(vec![0x80])
        );
        assert_eq!(
            decimal.to_native(Value::Bytes(vec![0xFF, 0x7F])).unwrap(),
            Value::decimal(-129, 2)
        );
        assert_eq!(
            decimal.to_native(Value::Bytes(vec![])).unwrap(),
            Value::decimal(0, 2)
        );
    }

    #[test]
    fn test_fixed_decimal_sign_extension_and_overflow() {
        let props = map(json!({"type": "fixed", "name": "D", "size": 3, "precision": 6, "scale": 1}));
        let ctx = LogicalContext {
            underlying: "fixed",
            properties: &props,
        };
        let decimal = DecimalFixed::from_context(&ctx).unwrap();
        assert_eq!(decimal.size(), 3);

        assert_eq!(
            decimal.to_underlying(&Value::decimal(-1, 1)).unwrap(),
            Value::Bytes(vec![0xFF, 0xFF, 0xFF])
        );
        assert_eq!(
            decimal.to_underlying(&Value::Double(1.5)).unwrap(),
            Value::Bytes(vec![0x00, 0x00, 0x0F])
        );
        let err = decimal
            .to_underlying(&Value::decimal(1i64 << 40, 1))
            .unwrap_err();
        assert!(matches!(err, CodecError::Conversion(_)));
    }

    #[test]
    fn test_fixed_decimal_requires_size() {
        let props = map(json!({"type": "fixed", "precision": 4}));
        let ctx = LogicalContext {
            underlying: "fixed",
            properties: &props,
        };
        assert!(DecimalFixed::from_context(&ctx).is_err());
    }
}
