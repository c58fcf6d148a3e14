//! Logical type system: the closed set of value categories the engine
//! understands, a coercion lattice over them, and text-literal inference.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;

/// A mapping from column name to value, in column order. Within one result
/// stream, all rows share the same key set (up to trailing nulls for columns
/// a given reader/operator didn't populate).
pub type Row = IndexMap<String, Value>;

/// Closed sum over the value categories the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Integer,
    Float,
    Decimal,
    String,
    Json,
    Boolean,
    Date,
    Time,
    DateTime,
    Null,
}

impl LogicalType {
    pub fn is_numeric(self) -> bool {
        matches!(self, LogicalType::Integer | LogicalType::Float | LogicalType::Decimal)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, LogicalType::Date | LogicalType::Time | LogicalType::DateTime)
    }

    /// Numeric precedence within the numeric lattice: INTEGER(1) < FLOAT(2) < DECIMAL(3).
    fn numeric_rank(self) -> Option<u8> {
        match self {
            LogicalType::Integer => Some(1),
            LogicalType::Float => Some(2),
            LogicalType::Decimal => Some(3),
            _ => None,
        }
    }

    pub fn is_comparable(self, other: LogicalType) -> bool {
        if self == other {
            return true;
        }
        if self == LogicalType::Null || other == LogicalType::Null {
            return true;
        }
        if self.is_numeric() && other.is_numeric() {
            return true;
        }
        if self.is_temporal() && other.is_temporal() {
            return true;
        }
        false
    }

    /// Widen `self` and `other` to their common type, per the coercion lattice:
    /// NULL coerces to anything; INTEGER ≺ FLOAT ≺ DECIMAL; DATE/TIME ≺ DATETIME
    /// (promoted to DATETIME only when one side already is DATETIME); JSON↔JSON
    /// stays JSON, JSON↔anything-else becomes STRING; disjoint categories fall
    /// back to STRING.
    pub fn coerce_to(self, other: LogicalType) -> LogicalType {
        if self == other {
            return self;
        }
        if self == LogicalType::Null {
            return other;
        }
        if other == LogicalType::Null {
            return self;
        }
        if let (Some(a), Some(b)) = (self.numeric_rank(), other.numeric_rank()) {
            return if a >= b { self } else { other };
        }
        if self.is_temporal() && other.is_temporal() {
            if self == LogicalType::DateTime || other == LogicalType::DateTime {
                return LogicalType::DateTime;
            }
            return LogicalType::String;
        }
        if self == LogicalType::Json || other == LogicalType::Json {
            return LogicalType::String;
        }
        LogicalType::String
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalType::Integer => "INTEGER",
            LogicalType::Float => "FLOAT",
            LogicalType::Decimal => "DECIMAL",
            LogicalType::String => "STRING",
            LogicalType::Json => "JSON",
            LogicalType::Boolean => "BOOLEAN",
            LogicalType::Date => "DATE",
            LogicalType::Time => "TIME",
            LogicalType::DateTime => "DATETIME",
            LogicalType::Null => "NULL",
        };
        f.write_str(name)
    }
}

/// A dynamically-typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Str(String),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Json(String),
    Null,
}

impl Value {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Value::Integer(_) => LogicalType::Integer,
            Value::Float(_) => LogicalType::Float,
            Value::Decimal(_) => LogicalType::Decimal,
            Value::Str(_) => LogicalType::String,
            Value::Boolean(_) => LogicalType::Boolean,
            Value::Date(_) => LogicalType::Date,
            Value::Time(_) => LogicalType::Time,
            Value::DateTime(_) => LogicalType::DateTime,
            Value::Json(_) => LogicalType::Json,
            Value::Null => LogicalType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.to_string().parse().ok(),
            _ => None,
        }
    }

    /// Compare two values for ordering purposes (used by ORDER BY / MIN / MAX).
    /// Returns `None` when the two values are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (Value::Date(a), Value::Date(b)) => a.partial_cmp(b),
            (Value::Time(a), Value::Time(b)) => a.partial_cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.partial_cmp(b),
            (Value::Json(a), Value::Json(b)) => a.partial_cmp(b),
            _ => {
                if self.logical_type().is_numeric() && other.logical_type().is_numeric() {
                    self.as_f64()?.partial_cmp(&other.as_f64()?)
                } else {
                    None
                }
            }
        }
    }

    pub fn equals(&self, other: &Value) -> bool {
        matches!(self.compare(other), Some(Ordering::Equal))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Str(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Json(s) => f.write_str(s),
            Value::Null => f.write_str(""),
        }
    }
}

/// Classify a native value into its `LogicalType`. For text, defers to
/// `infer_type_from_string`.
pub fn infer_type(value: &Value) -> LogicalType {
    value.logical_type()
}

/// Parse a text literal into the most specific native `Value`.
///
/// The match order below is load-bearing: empty/whitespace, then boolean,
/// then JSON, then integer, then float/decimal, then datetime, then date,
/// then time, and only then a plain string. Pinned from the original
/// `infer_type_from_string` implementation.
pub fn infer_type_from_string(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower == "true" {
        return Value::Boolean(true);
    }
    if lower == "false" {
        return Value::Boolean(false);
    }

    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed)
            .map(|v| v.is_object() || v.is_array())
            .unwrap_or(false)
    {
        return Value::Json(trimmed.to_string());
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Integer(i);
    }

    if is_plain_decimal_literal(trimmed) {
        if let Ok(f) = trimmed.parse::<f64>() {
            if decimal_needs_precision(trimmed) {
                if let Ok(d) = trimmed.parse::<Decimal>() {
                    return Value::Decimal(d);
                }
            }
            return Value::Float(f);
        }
    }

    if let Some(dt) = parse_datetime(trimmed) {
        return Value::DateTime(dt);
    }
    if let Some(d) = parse_date(trimmed) {
        return Value::Date(d);
    }
    if let Some(t) = parse_time(trimmed) {
        return Value::Time(t);
    }

    Value::Str(trimmed.to_string())
}

/// A bare, optionally-signed decimal number with exactly one `.` and digits
/// on at least one side — excludes things that merely look numeric, like
/// dates (`2024-01-01`) or version-ish strings, which are handled downstream.
fn is_plain_decimal_literal(s: &str) -> bool {
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let mut parts = s.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = match parts.next() {
        Some(p) => p,
        None => return false,
    };
    !int_part.is_empty() && int_part.chars().all(|c| c.is_ascii_digit())
        && !frac_part.is_empty() && frac_part.chars().all(|c| c.is_ascii_digit())
}

/// DECIMAL when more than six significant digits remain in the fractional
/// part after stripping trailing zeros; otherwise FLOAT.
fn decimal_needs_precision(s: &str) -> bool {
    let frac = match s.split_once('.') {
        Some((_, f)) => f,
        None => return false,
    };
    let trimmed = frac.trim_end_matches('0');
    trimmed.len() > 6
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y%m%d%H%M%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y%m%d",
    "%d-%m-%Y",
    "%m-%d-%Y",
];

const TIME_FORMATS: &[&str] = &[
    "%H:%M:%S%.f",
    "%H:%M:%S",
    "%H:%M",
    "%I:%M:%S %p",
    "%I:%M %p",
];

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS.iter().find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Fold `coerce_to` over the inferred types of every non-null sample value.
pub fn infer_common_type<'a, I: IntoIterator<Item = &'a Value>>(values: I) -> LogicalType {
    let mut acc: Option<LogicalType> = None;
    for v in values {
        if v.is_null() {
            continue;
        }
        let t = infer_type(v);
        acc = Some(match acc {
            None => t,
            Some(prev) => prev.coerce_to(t),
        });
    }
    acc.unwrap_or(LogicalType::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_numeric_lattice() {
        assert_eq!(LogicalType::Integer.coerce_to(LogicalType::Float), LogicalType::Float);
        assert_eq!(LogicalType::Float.coerce_to(LogicalType::Decimal), LogicalType::Decimal);
        assert_eq!(LogicalType::Decimal.coerce_to(LogicalType::Integer), LogicalType::Decimal);
    }

    #[test]
    fn coerce_null_is_absorbing_identity() {
        assert_eq!(LogicalType::Null.coerce_to(LogicalType::String), LogicalType::String);
        assert_eq!(LogicalType::Boolean.coerce_to(LogicalType::Null), LogicalType::Boolean);
    }

    #[test]
    fn coerce_temporal_requires_datetime_present() {
        assert_eq!(LogicalType::Date.coerce_to(LogicalType::DateTime), LogicalType::DateTime);
        assert_eq!(LogicalType::Date.coerce_to(LogicalType::Time), LogicalType::String);
    }

    #[test]
    fn infer_integer_and_float() {
        assert!(matches!(infer_type_from_string("42"), Value::Integer(42)));
        assert!(matches!(infer_type_from_string("3.5"), Value::Float(_)));
    }

    #[test]
    fn infer_decimal_for_high_precision_fraction() {
        match infer_type_from_string("1.1234567") {
            Value::Decimal(_) => {}
            other => panic!("expected Decimal, got {other:?}"),
        }
    }

    #[test]
    fn infer_boolean_and_null() {
        assert!(matches!(infer_type_from_string("TRUE"), Value::Boolean(true)));
        assert!(matches!(infer_type_from_string(""), Value::Null));
        assert!(matches!(infer_type_from_string("   "), Value::Null));
    }

    #[test]
    fn infer_date_and_datetime() {
        assert!(matches!(infer_type_from_string("2024-01-15"), Value::Date(_)));
        assert!(matches!(infer_type_from_string("2024-01-15T10:30:00"), Value::DateTime(_)));
    }

    #[test]
    fn infer_json_object() {
        assert!(matches!(infer_type_from_string("{\"a\": 1}"), Value::Json(_)));
    }

    #[test]
    fn infer_plain_string_fallback() {
        assert!(matches!(infer_type_from_string("hello world"), Value::Str(_)));
    }

    #[test]
    fn infer_common_type_widens_across_sample() {
        let values = vec![Value::Integer(1), Value::Float(2.5), Value::Null];
        assert_eq!(infer_common_type(&values), LogicalType::Float);
    }
}
