//! Value representation for FHIRPath evaluation
//!
//! Values are immutable and cheap to clone (`Arc`). Nodes coming from a navigator are
//! converted to values lazily, only when an operation needs a scalar.

use crate::error::{Error, Result};
use crate::temporal_parse::{parse_date_value, parse_datetime_value_lenient, parse_time_value};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use phf::phf_map;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Time precision levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimePrecision {
    Hour,        // T10
    Minute,      // T10:30
    Second,      // T10:30:00
    Millisecond, // T10:30:00.000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatePrecision {
    Year,  // 2014
    Month, // 2014-01
    Day,   // 2014-01-01
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DateTimePrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

/// Primitive type tag carried by constants and produced by lexical parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Integer,
    Decimal,
    String,
    Date,
    DateTime,
    Time,
    Quantity,
}

impl PrimitiveType {
    /// FHIRPath system type name (`System.Boolean` without the namespace).
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::Integer => "Integer",
            PrimitiveType::Decimal => "Decimal",
            PrimitiveType::String => "String",
            PrimitiveType::Date => "Date",
            PrimitiveType::DateTime => "DateTime",
            PrimitiveType::Time => "Time",
            PrimitiveType::Quantity => "Quantity",
        }
    }
}

/// FHIR primitive types whose lexical form is not plain text.
/// Every other primitive (`code`, `uri`, `id`, `markdown`, ...) maps to String.
static FHIR_PRIMITIVES: phf::Map<&'static str, PrimitiveType> = phf_map! {
    "boolean" => PrimitiveType::Boolean,
    "integer" => PrimitiveType::Integer,
    "integer64" => PrimitiveType::Integer,
    "positiveInt" => PrimitiveType::Integer,
    "unsignedInt" => PrimitiveType::Integer,
    "decimal" => PrimitiveType::Decimal,
    "date" => PrimitiveType::Date,
    "dateTime" => PrimitiveType::DateTime,
    "instant" => PrimitiveType::DateTime,
    "time" => PrimitiveType::Time,
};

/// A FHIRPath value - cheap to clone via Arc
#[derive(Clone, Debug)]
pub struct Value(Arc<ValueData>);

#[derive(Debug, Clone, PartialEq)]
pub enum ValueData {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(Arc<str>),
    Date {
        value: NaiveDate,
        precision: DatePrecision,
    },
    DateTime {
        /// Normalized to UTC.
        value: DateTime<Utc>,
        precision: DateTimePrecision,
        /// Seconds east of UTC; `None` when the lexical form carried no offset.
        timezone_offset: Option<i32>,
    },
    Time {
        value: NaiveTime,
        precision: TimePrecision,
    },
    Quantity {
        value: Decimal,
        unit: Arc<str>,
    },
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.data() == other.data()
    }
}

impl Value {
    pub fn data(&self) -> &ValueData {
        &self.0
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn boolean(b: bool) -> Self {
        Self(Arc::new(ValueData::Boolean(b)))
    }

    pub fn integer(i: i64) -> Self {
        Self(Arc::new(ValueData::Integer(i)))
    }

    pub fn decimal(d: Decimal) -> Self {
        Self(Arc::new(ValueData::Decimal(d)))
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self(Arc::new(ValueData::String(s.into())))
    }

    pub fn date_with_precision(d: NaiveDate, precision: DatePrecision) -> Self {
        Self(Arc::new(ValueData::Date {
            value: d,
            precision,
        }))
    }

    pub fn datetime_with_precision_and_offset(
        dt: DateTime<Utc>,
        precision: DateTimePrecision,
        offset_seconds: Option<i32>,
    ) -> Self {
        Self(Arc::new(ValueData::DateTime {
            value: dt,
            precision,
            timezone_offset: offset_seconds,
        }))
    }

    pub fn time_with_precision(t: NaiveTime, precision: TimePrecision) -> Self {
        Self(Arc::new(ValueData::Time {
            value: t,
            precision,
        }))
    }

    pub fn quantity(value: Decimal, unit: impl Into<Arc<str>>) -> Self {
        Self(Arc::new(ValueData::Quantity {
            value,
            unit: unit.into(),
        }))
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        match self.data() {
            ValueData::Boolean(_) => PrimitiveType::Boolean,
            ValueData::Integer(_) => PrimitiveType::Integer,
            ValueData::Decimal(_) => PrimitiveType::Decimal,
            ValueData::String(_) => PrimitiveType::String,
            ValueData::Date { .. } => PrimitiveType::Date,
            ValueData::DateTime { .. } => PrimitiveType::DateTime,
            ValueData::Time { .. } => PrimitiveType::Time,
            ValueData::Quantity { .. } => PrimitiveType::Quantity,
        }
    }

    /// Parse a lexical form according to a primitive type tag.
    pub fn parse(tag: PrimitiveType, text: &str) -> Result<Value> {
        let invalid = || Error::TypeError(format!("'{}' is not a valid {}", text, tag.name()));

        match tag {
            PrimitiveType::Boolean => match text {
                "true" => Ok(Value::boolean(true)),
                "false" => Ok(Value::boolean(false)),
                _ => Err(invalid()),
            },
            PrimitiveType::Integer => text
                .trim()
                .parse::<i64>()
                .map(Value::integer)
                .map_err(|_| invalid()),
            PrimitiveType::Decimal => Decimal::from_str(text.trim())
                .map(Value::decimal)
                .map_err(|_| invalid()),
            PrimitiveType::String => Ok(Value::string(text)),
            PrimitiveType::Date => parse_date_value(text).ok_or_else(invalid),
            PrimitiveType::DateTime => parse_datetime_value_lenient(text).ok_or_else(invalid),
            PrimitiveType::Time => parse_time_value(text).ok_or_else(invalid),
            PrimitiveType::Quantity => {
                let text = text.trim();
                let (number, unit) = match text.split_once(' ') {
                    Some((number, unit)) => (number, unit.trim().trim_matches('\'')),
                    None => (text, "1"),
                };
                let value = Decimal::from_str(number).map_err(|_| invalid())?;
                Ok(Value::quantity(value, unit))
            }
        }
    }

    /// Convert the lexical value of a FHIR primitive element into a FHIRPath value.
    pub fn from_fhir_primitive(type_name: &str, lexical: &str) -> Result<Value> {
        let type_name = type_name.strip_prefix("FHIR.").unwrap_or(type_name);
        match FHIR_PRIMITIVES.get(type_name) {
            Some(tag) => Value::parse(*tag, lexical),
            None => Ok(Value::string(lexical)),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.data() {
            ValueData::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.data() {
            ValueData::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self.data() {
            ValueData::Decimal(d) => Some(*d),
            ValueData::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.data() {
            ValueData::String(s) => Some(s),
            _ => None,
        }
    }

    /// FHIRPath equality (`=`).
    ///
    /// Returns `None` when the result is unknown: temporal values whose precisions
    /// differ but agree on every shared component, or quantities in different units.
    pub fn equals(&self, other: &Value) -> Option<bool> {
        match (self.data(), other.data()) {
            (ValueData::Boolean(l), ValueData::Boolean(r)) => Some(l == r),
            (ValueData::Integer(l), ValueData::Integer(r)) => Some(l == r),
            (ValueData::Integer(l), ValueData::Decimal(r)) => Some(Decimal::from(*l) == *r),
            (ValueData::Decimal(l), ValueData::Integer(r)) => Some(*l == Decimal::from(*r)),
            (ValueData::Decimal(l), ValueData::Decimal(r)) => Some(l == r),
            (ValueData::String(l), ValueData::String(r)) => Some(l == r),
            (
                ValueData::Date {
                    value: lv,
                    precision: lp,
                },
                ValueData::Date {
                    value: rv,
                    precision: rp,
                },
            ) => compare_components(
                &date_components(lv),
                *lp as usize,
                &date_components(rv),
                *rp as usize,
            ),
            (
                ValueData::DateTime {
                    value: lv,
                    precision: lp,
                    ..
                },
                ValueData::DateTime {
                    value: rv,
                    precision: rp,
                    ..
                },
            ) => compare_components(
                &datetime_components(lv),
                datetime_level(*lp),
                &datetime_components(rv),
                datetime_level(*rp),
            ),
            (
                ValueData::Time {
                    value: lv,
                    precision: lp,
                },
                ValueData::Time {
                    value: rv,
                    precision: rp,
                },
            ) => compare_components(
                &time_components(lv),
                time_level(*lp),
                &time_components(rv),
                time_level(*rp),
            ),
            (
                ValueData::Quantity {
                    value: lv,
                    unit: lu,
                },
                ValueData::Quantity {
                    value: rv,
                    unit: ru,
                },
            ) => (lu == ru).then_some(lv == rv),
            _ => Some(false),
        }
    }
}

fn date_components(date: &NaiveDate) -> [i64; 3] {
    [date.year() as i64, date.month() as i64, date.day() as i64]
}

fn datetime_components(dt: &DateTime<Utc>) -> [i64; 7] {
    [
        dt.year() as i64,
        dt.month() as i64,
        dt.day() as i64,
        dt.hour() as i64,
        dt.minute() as i64,
        dt.second() as i64,
        dt.timestamp_subsec_millis() as i64,
    ]
}

fn time_components(time: &NaiveTime) -> [i64; 4] {
    [
        time.hour() as i64,
        time.minute() as i64,
        time.second() as i64,
        (time.nanosecond() / 1_000_000) as i64,
    ]
}

/// Seconds and milliseconds count as one precision level.
fn datetime_level(precision: DateTimePrecision) -> usize {
    match precision {
        DateTimePrecision::Second | DateTimePrecision::Millisecond => {
            DateTimePrecision::Millisecond as usize
        }
        other => other as usize,
    }
}

fn time_level(precision: TimePrecision) -> usize {
    match precision {
        TimePrecision::Second | TimePrecision::Millisecond => TimePrecision::Millisecond as usize,
        other => other as usize,
    }
}

/// Compare component arrays up to the shared precision level (inclusive index).
fn compare_components(
    left: &[i64],
    left_level: usize,
    right: &[i64],
    right_level: usize,
) -> Option<bool> {
    let shared = left_level.min(right_level);
    let last = (shared + 1).min(left.len()).min(right.len());
    if left[..last] != right[..last] {
        return Some(false);
    }
    (left_level == right_level).then_some(true)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            ValueData::Boolean(b) => write!(f, "{}", b),
            ValueData::Integer(i) => write!(f, "{}", i),
            ValueData::Decimal(d) => write!(f, "{}", d),
            ValueData::String(s) => f.write_str(s),
            ValueData::Date { value, precision } => {
                let pattern = match precision {
                    DatePrecision::Year => "%Y",
                    DatePrecision::Month => "%Y-%m",
                    DatePrecision::Day => "%Y-%m-%d",
                };
                write!(f, "{}", value.format(pattern))
            }
            ValueData::DateTime {
                value,
                precision,
                timezone_offset,
            } => {
                let pattern = match precision {
                    DateTimePrecision::Year => "%Y",
                    DateTimePrecision::Month => "%Y-%m",
                    DateTimePrecision::Day => "%Y-%m-%d",
                    DateTimePrecision::Hour => "%Y-%m-%dT%H",
                    DateTimePrecision::Minute => "%Y-%m-%dT%H:%M",
                    DateTimePrecision::Second => "%Y-%m-%dT%H:%M:%S",
                    DateTimePrecision::Millisecond => "%Y-%m-%dT%H:%M:%S%.3f",
                };
                let has_time = *precision >= DateTimePrecision::Hour;
                match timezone_offset.and_then(FixedOffset::east_opt) {
                    Some(offset) if has_time => {
                        let local = value.with_timezone(&offset);
                        write!(f, "{}", local.format(pattern))?;
                        if offset.local_minus_utc() == 0 {
                            f.write_str("Z")
                        } else {
                            write!(f, "{}", local.format("%:z"))
                        }
                    }
                    _ => write!(f, "{}", value.format(pattern)),
                }
            }
            ValueData::Time { value, precision } => {
                let pattern = match precision {
                    TimePrecision::Hour => "%H",
                    TimePrecision::Minute => "%H:%M",
                    TimePrecision::Second => "%H:%M:%S",
                    TimePrecision::Millisecond => "%H:%M:%S%.3f",
                };
                write!(f, "{}", value.format(pattern))
            }
            ValueData::Quantity { value, unit } => write!(f, "{} '{}'", value, unit),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::integer(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::string(value)
    }
}
