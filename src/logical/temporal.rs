//! Date, time and timestamp logical types.
//!
//! All counts are relative to the Unix epoch (or midnight, for times of day)
//! and carried as zigzag varints by the underlying `int`/`long` node.

use chrono::{DateTime, TimeDelta, Utc};

use super::{unsupported, LogicalType};
use crate::error::CodecError;
use crate::value::Value;

const SECONDS_PER_DAY: i64 = 86_400;

/// Instant `count / units_per_second` seconds after the epoch.
fn instant_from_units(name: &str, count: i64, units_per_second: i64) -> Result<Value, CodecError> {
    let secs = count.div_euclid(units_per_second);
    let nanos = count.rem_euclid(units_per_second) * (1_000_000_000 / units_per_second);
    DateTime::<Utc>::from_timestamp(secs, nanos as u32)
        .map(Value::Instant)
        .ok_or_else(|| CodecError::conversion(format!("{} {} is out of range", name, count)))
}

fn expect_int(name: &str, value: Value) -> Result<i64, CodecError> {
    match value {
        Value::Int(i) => Ok(i),
        other => Err(unsupported(name, "integer", &other)),
    }
}

/// `timestamp-millis` on `long`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampMillis;

impl LogicalType for TimestampMillis {
    fn name(&self) -> &str {
        "timestamp-millis"
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Instant(_))
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, CodecError> {
        match value {
            Value::Instant(t) => Ok(Value::Int(t.timestamp_millis())),
            Value::Int(i) => Ok(Value::Int(*i)),
            other => Err(unsupported(self.name(), "instant or integer", other)),
        }
    }

    fn to_native(&self, value: Value) -> Result<Value, CodecError> {
        let millis = expect_int(self.name(), value)?;
        instant_from_units(self.name(), millis, 1_000)
    }
}

/// `timestamp-micros` on `long`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampMicros;

impl LogicalType for TimestampMicros {
    fn name(&self) -> &str {
        "timestamp-micros"
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Instant(_))
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, CodecError> {
        match value {
            Value::Instant(t) => Ok(Value::Int(t.timestamp_micros())),
            Value::Int(i) => Ok(Value::Int(*i)),
            other => Err(unsupported(self.name(), "instant or integer", other)),
        }
    }

    fn to_native(&self, value: Value) -> Result<Value, CodecError> {
        let micros = expect_int(self.name(), value)?;
        instant_from_units(self.name(), micros, 1_000_000)
    }
}

/// `time-millis` on `int`: milliseconds after midnight, 32-bit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeMillis;

impl LogicalType for TimeMillis {
    fn name(&self) -> &str {
        "time-millis"
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Duration(_))
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, CodecError> {
        match value {
            Value::Duration(d) => {
                let millis = d.num_milliseconds();
                i32::try_from(millis).map(|m| Value::Int(m as i64)).map_err(|_| {
                    CodecError::conversion(format!(
                        "time-millis {}ms does not fit in 32 bits",
                        millis
                    ))
                })
            }
            other => Err(unsupported(self.name(), "duration", other)),
        }
    }

    fn to_native(&self, value: Value) -> Result<Value, CodecError> {
        let millis = expect_int(self.name(), value)?;
        TimeDelta::try_milliseconds(millis)
            .map(Value::Duration)
            .ok_or_else(|| CodecError::conversion(format!("time-millis {} is out of range", millis)))
    }
}

/// `time-micros` on `long`: microseconds after midnight.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeMicros;

impl LogicalType for TimeMicros {
    fn name(&self) -> &str {
        "time-micros"
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Duration(_))
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, CodecError> {
        match value {
            Value::Duration(d) => d.num_microseconds().map(Value::Int).ok_or_else(|| {
                CodecError::conversion(format!("time-micros {} does not fit in 64 bits", d))
            }),
            other => Err(unsupported(self.name(), "duration", other)),
        }
    }

    fn to_native(&self, value: Value) -> Result<Value, CodecError> {
        let micros = expect_int(self.name(), value)?;
        Ok(Value::Duration(TimeDelta::microseconds(micros)))
    }
}

/// `date` on `int`: days since the epoch. Decodes to an instant at UTC
/// midnight.
#[derive(Debug, Clone, Copy, Default)]
pub struct Date;

impl LogicalType for Date {
    fn name(&self) -> &str {
        "date"
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Instant(_))
    }

    fn to_underlying(&self, value: &Value) -> Result<Value, CodecError> {
        match value {
            Value::Instant(t) => Ok(Value::Int(t.timestamp().div_euclid(SECONDS_PER_DAY))),
            Value::Int(days) => Ok(Value::Int(*days)),
            other => Err(unsupported(self.name(), "instant or integer", other)),
        }
    }

    fn to_native(&self, value: Value) -> Result<Value, CodecError> {
        let days = expect_int(self.name(), value)?;
        let secs = days.checked_mul(SECONDS_PER_DAY).ok_or_else(|| {
            CodecError::conversion(format!("date {} is out of range", days))
        })?;
        instant_from_units(self.name(), secs, 1)
    }
}
