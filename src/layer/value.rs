use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use serde_json::{json, Value as Json};

/// A single attribute value as read from a source file.
///
/// Only the first five variants are safe to hand to the map renderer; the
/// sanitizer rewrites everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Duration(TimeDelta),
    /// A value drawn from an enumerated domain: stored code plus display label.
    Category { code: String, label: Option<String> },
    /// Nested JSON (arrays or objects in GeoJSON properties).
    Nested(Json),
    Blob(Vec<u8>),
}

/// Column kinds the sanitizer knows how to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Primitive,
    Temporal,
    Duration,
    Categorical,
    Opaque,
}

impl Value {
    #[inline] pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    /// String, number, boolean or null.
    #[inline]
    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_))
    }

    /// Primitive and representable in JSON (no NaN or infinities).
    #[inline]
    pub fn is_json_safe(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            other => other.is_primitive(),
        }
    }

    /// Convert a JSON-safe value to `serde_json`, or `None` if it isn't one.
    pub fn to_json(&self) -> Option<Json> {
        match self {
            Value::Null => Some(Json::Null),
            Value::Bool(b) => Some(json!(b)),
            Value::Int(i) => Some(json!(i)),
            Value::Float(f) => serde_json::Number::from_f64(*f).map(Json::Number),
            Value::Text(s) => Some(json!(s)),
            _ => None,
        }
    }

    /// Parse `YYYY-MM-DD`, RFC 3339 (converted to UTC), or a naive
    /// `YYYY-MM-DD[T ]HH:MM:SS[.f]` into a temporal value.
    pub fn parse_temporal(s: &str) -> Option<Value> {
        let s = s.trim();
        if s.len() < 10 || !s.as_bytes()[0].is_ascii_digit() { return None }

        if s.len() == 10 {
            return NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(Value::Date);
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Some(Value::Timestamp(ts.naive_utc()));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"].iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(Value::Timestamp)
    }

    /// Value kind used for column inference; `None` for nulls.
    fn kind(&self) -> Option<ColumnKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_) => Some(ColumnKind::Primitive),
            Value::Timestamp(_) | Value::Date(_) => Some(ColumnKind::Temporal),
            Value::Duration(_) => Some(ColumnKind::Duration),
            Value::Category { .. } => Some(ColumnKind::Categorical),
            Value::Nested(_) | Value::Blob(_) => Some(ColumnKind::Opaque),
        }
    }
}

impl ColumnKind {
    /// Infer the kind of a column from its non-null values.
    /// All-null and empty columns are primitive; mixed columns are opaque.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut kinds = values.into_iter().filter_map(Value::kind);
        let Some(first) = kinds.next() else { return ColumnKind::Primitive };
        if kinds.all(|kind| kind == first) { first } else { ColumnKind::Opaque }
    }
}

/// Render a duration as `D days HH:MM:SS[.ffffff]`.
pub(crate) fn format_duration(delta: &TimeDelta) -> String {
    let negative = *delta < TimeDelta::zero();
    let total_micros = delta.num_microseconds().unwrap_or(i64::MAX).unsigned_abs();
    let micros = total_micros % 1_000_000;
    let total_secs = total_micros / 1_000_000;
    let (days, rem) = (total_secs / 86_400, total_secs % 86_400);
    let (hours, minutes, seconds) = (rem / 3600, (rem % 3600) / 60, rem % 60);

    let sign = if negative { "-" } else { "" };
    let mut out = format!("{sign}{days} days {hours:02}:{minutes:02}:{seconds:02}");
    if micros > 0 { out.push_str(&format!(".{micros:06}")) }
    out
}

/// ISO-8601 with microseconds only when present.
pub(crate) fn format_iso(ts: &NaiveDateTime) -> String {
    if ts.and_utc().timestamp_subsec_micros() == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

impl fmt::Display for Value {
    /// Plain string form, used when a column falls back to text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => f.write_str(&format_iso(ts)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Duration(delta) => f.write_str(&format_duration(delta)),
            Value::Category { code, label } => f.write_str(label.as_deref().unwrap_or(code)),
            Value::Nested(json) => write!(f, "{json}"),
            Value::Blob(bytes) => write!(f, "0x{}", hex::encode(bytes)),
        }
    }
}
