use std::{
    cmp::Ordering,
    fmt::Display,
    sync::atomic::{AtomicI64, Ordering as AtomicOrdering},
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported SQL data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Integer,
    Float,
    Text,
    Timestamp,
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::Text => "TEXT",
            DataType::Timestamp => "TIMESTAMP",
        })
    }
}

/// Runtime value type
#[derive(Debug, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the data type of the value, or None if it's Null
    pub fn datatype(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Integer(_) => Some(DataType::Integer),
            Self::Float(_) => Some(DataType::Float),
            Self::Text(_) => Some(DataType::Text),
            Self::Timestamp(_) => Some(DataType::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness of a value used directly as a predicate (e.g. `WHERE 1`)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Timestamp(_) => true,
        }
    }

    /// Converts the value so it can be stored in a column of `datatype`.
    ///
    /// Integers widen into floats, and text is parsed into timestamps.
    pub fn coerce(self, datatype: DataType) -> Result<Value> {
        Ok(match (self, datatype) {
            (Value::Null, _) => Value::Null,
            (Value::Integer(i), DataType::Float) => Value::Float(i as f64),
            (Value::Text(s), DataType::Timestamp) => Value::Timestamp(parse_timestamp(&s)?),
            (Value::Integer(i), DataType::Boolean) if i == 0 || i == 1 => Value::Boolean(i == 1),
            (v, dt) if v.datatype() == Some(dt) => v,
            (v, dt) => {
                return Err(Error::Schema(format!(
                    "cannot store value {} in a {} column",
                    v, dt
                )));
            }
        })
    }

    /// SQL comparison. Returns None when either side is NULL, which makes
    /// every comparison operator other than IS [NOT] NULL evaluate to false.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Text(s), Value::Timestamp(t)) => parse_timestamp(s).ok().map(|s| s.cmp(t)),
            (Value::Timestamp(t), Value::Text(s)) => parse_timestamp(s).ok().map(|s| t.cmp(&s)),
            (Value::Text(s), n @ (Value::Integer(_) | Value::Float(_))) => match s.parse::<f64>() {
                Ok(f) => Value::Float(f).compare(n),
                Err(_) => Some(s.as_str().cmp(n.to_string().as_str())),
            },
            (n @ (Value::Integer(_) | Value::Float(_)), Value::Text(_)) => {
                other.compare(n).map(Ordering::reverse)
            }
            (a, b) => Some(a.to_string().cmp(&b.to_string())),
        }
    }

    /// Total ordering used by ORDER BY. NULLs sort first and NaN sorts after
    /// every other number; values that do not compare fall back to their type
    /// and then their text.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).total_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (a, b) => a.compare(b).unwrap_or_else(|| {
                a.rank()
                    .cmp(&b.rank())
                    .then_with(|| a.to_string().cmp(&b.to_string()))
            }),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::Timestamp(_) => 4,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) if *b => write!(f, "TRUE"),
            Value::Boolean(_) => write!(f, "FALSE"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A row is a vector of values
pub type Row = Vec<Value>;

/// Parses RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]` and `YYYY-MM-DD` forms
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&ts));
    }
    if let Some(ts) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&ts));
    }
    Err(Error::Schema(format!("invalid timestamp '{}'", s)))
}

static LAST_STAMP: AtomicI64 = AtomicI64::new(i64::MIN);

/// Current instant for CURRENT_TIMESTAMP.
///
/// Never hands out the same instant twice in a process, so a row re-stamped
/// by ON UPDATE always moves strictly forward.
pub fn current_timestamp() -> DateTime<Utc> {
    let now = Utc::now().timestamp_micros();
    let mut last = LAST_STAMP.load(AtomicOrdering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        let exchanged = LAST_STAMP.compare_exchange_weak(
            last,
            next,
            AtomicOrdering::AcqRel,
            AtomicOrdering::Relaxed,
        );
        match exchanged {
            Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
            Err(actual) => last = actual,
        }
    }
}
