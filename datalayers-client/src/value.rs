//! Strict decoding of Arrow columns into scalar values.
//!
//! Each column is interpreted according to its declared type only. A type
//! without a rule here is reported as [`Error::UnsupportedType`] rather
//! than coerced.

use std::fmt;
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::timezone::Tz;
use arrow_array::types::{
    Date32Type, Date64Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_array::{Array, RecordBatch};
use arrow_schema::{DataType, TimeUnit};
use chrono::{DateTime, NaiveDate, Offset, TimeDelta, TimeZone, Utc};

use crate::error::{Error, Result};

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Utf8(String),
    Binary(Vec<u8>),
    /// Days since the UNIX epoch.
    Date32(i32),
    /// Milliseconds since the UNIX epoch.
    Date64(i64),
    Timestamp {
        unit: TimeUnit,
        value: i64,
        timezone: Option<Arc<str>>,
    },
}

/// Returns true if [`Value::decode`] has a rule for `data_type`.
pub fn is_supported(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Utf8
            | DataType::LargeUtf8
            | DataType::Binary
            | DataType::LargeBinary
            | DataType::Date32
            | DataType::Date64
            | DataType::Timestamp(_, _)
    )
}

macro_rules! primitive {
    ($column:expr, $row:expr, $arrow_type:ty, $variant:ident) => {
        $column
            .as_primitive_opt::<$arrow_type>()
            .map(|array| Value::$variant(array.value($row)))
    };
}

impl Value {
    /// Decodes the cell at `row` of `column`.
    pub fn decode(column: &dyn Array, row: usize) -> Result<Value> {
        let data_type = column.data_type();
        if !is_supported(data_type) {
            return Err(Error::UnsupportedType(data_type.clone()));
        }
        if row >= column.len() {
            return Err(Error::InvalidResponse(format!(
                "row {row} out of bounds for column of length {}",
                column.len()
            )));
        }
        if column.is_null(row) {
            return Ok(Value::Null);
        }

        let value = match data_type {
            DataType::Boolean => column
                .as_boolean_opt()
                .map(|array| Value::Boolean(array.value(row))),
            DataType::Int8 => primitive!(column, row, Int8Type, Int8),
            DataType::Int16 => primitive!(column, row, Int16Type, Int16),
            DataType::Int32 => primitive!(column, row, Int32Type, Int32),
            DataType::Int64 => primitive!(column, row, Int64Type, Int64),
            DataType::UInt8 => primitive!(column, row, UInt8Type, UInt8),
            DataType::UInt16 => primitive!(column, row, UInt16Type, UInt16),
            DataType::UInt32 => primitive!(column, row, UInt32Type, UInt32),
            DataType::UInt64 => primitive!(column, row, UInt64Type, UInt64),
            DataType::Float32 => primitive!(column, row, Float32Type, Float32),
            DataType::Float64 => primitive!(column, row, Float64Type, Float64),
            DataType::Date32 => primitive!(column, row, Date32Type, Date32),
            DataType::Date64 => primitive!(column, row, Date64Type, Date64),
            DataType::Utf8 => column
                .as_string_opt::<i32>()
                .map(|array| Value::Utf8(array.value(row).to_string())),
            DataType::LargeUtf8 => column
                .as_string_opt::<i64>()
                .map(|array| Value::Utf8(array.value(row).to_string())),
            DataType::Binary => column
                .as_binary_opt::<i32>()
                .map(|array| Value::Binary(array.value(row).to_vec())),
            DataType::LargeBinary => column
                .as_binary_opt::<i64>()
                .map(|array| Value::Binary(array.value(row).to_vec())),
            DataType::Timestamp(unit, timezone) => {
                let raw = match unit {
                    TimeUnit::Second => column
                        .as_primitive_opt::<TimestampSecondType>()
                        .map(|array| array.value(row)),
                    TimeUnit::Millisecond => column
                        .as_primitive_opt::<TimestampMillisecondType>()
                        .map(|array| array.value(row)),
                    TimeUnit::Microsecond => column
                        .as_primitive_opt::<TimestampMicrosecondType>()
                        .map(|array| array.value(row)),
                    TimeUnit::Nanosecond => column
                        .as_primitive_opt::<TimestampNanosecondType>()
                        .map(|array| array.value(row)),
                };
                raw.map(|value| Value::Timestamp {
                    unit: *unit,
                    value,
                    timezone: timezone.clone(),
                })
            }
            _ => None,
        };
        value.ok_or_else(|| Error::UnsupportedType(data_type.clone()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interprets integer values as i64. Unsigned values above `i64::MAX`
    /// and non-integer values yield `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::UInt8(v) => Some(i64::from(*v)),
            Value::UInt16(v) => Some(i64::from(*v)),
            Value::UInt32(v) => Some(i64::from(*v)),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

/// Decodes every cell of one row.
pub fn decode_row(batch: &RecordBatch, row: usize) -> Result<Vec<Value>> {
    batch
        .columns()
        .iter()
        .map(|column| Value::decode(column.as_ref(), row))
        .collect()
}

fn epoch_parts(unit: TimeUnit, value: i64) -> (i64, u32) {
    let per_second: i64 = match unit {
        TimeUnit::Second => 1,
        TimeUnit::Millisecond => 1_000,
        TimeUnit::Microsecond => 1_000_000,
        TimeUnit::Nanosecond => 1_000_000_000,
    };
    let nanos_per_tick = 1_000_000_000 / per_second;
    let secs = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * nanos_per_tick;
    (secs, nanos as u32)
}

fn format_timestamp(unit: TimeUnit, value: i64, timezone: Option<&str>) -> String {
    let (secs, nanos) = epoch_parts(unit, value);
    let Some(utc) = DateTime::<Utc>::from_timestamp(secs, nanos) else {
        return value.to_string();
    };
    match timezone.map(str::parse::<Tz>) {
        Some(Ok(tz)) => {
            let offset = tz.offset_from_utc_datetime(&utc.naive_utc()).fix();
            utc.with_timezone(&offset).to_rfc3339()
        }
        Some(Err(_)) => utc.to_rfc3339(),
        None => utc.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Utf8(v) => f.write_str(v),
            Value::Binary(v) => write!(f, "{v:?}"),
            Value::Date32(days) => {
                let date = NaiveDate::from_ymd_opt(1970, 1, 1).and_then(|epoch| {
                    TimeDelta::try_days(i64::from(*days))
                        .and_then(|delta| epoch.checked_add_signed(delta))
                });
                match date {
                    Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
                    None => write!(f, "{days}"),
                }
            }
            Value::Date64(millis) => match DateTime::<Utc>::from_timestamp_millis(*millis) {
                Some(datetime) => write!(f, "{}", datetime.date_naive().format("%Y-%m-%d")),
                None => write!(f, "{millis}"),
            },
            Value::Timestamp {
                unit,
                value,
                timezone,
            } => f.write_str(&format_timestamp(*unit, *value, timezone.as_deref())),
        }
    }
}
