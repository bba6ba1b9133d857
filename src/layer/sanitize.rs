use anyhow::{bail, Result};
use chrono::NaiveTime;
use serde_json::Value as Json;
use tracing::debug;

use crate::layer::{value::{format_duration, format_iso}, ColumnKind, Layer, Value};

const TEMPORAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rewrite every attribute column into strings, numbers, booleans and nulls.
///
/// Each column is converted according to its kind. If any value does not fit
/// that kind, the whole column is converted to text instead.
pub fn sanitize(layer: &mut Layer) {
    for idx in 0..layer.fields().len() {
        let kind = layer.fields()[idx].kind;

        let converted = layer.column(idx)
            .map(|value| convert(kind, value))
            .collect::<Result<Vec<_>>>();

        let values = converted.unwrap_or_else(|e| {
            debug!("Column {} of layer {} falls back to text: {e}", layer.fields()[idx].name, layer.name());
            layer.column(idx).map(|value| Value::Text(value.to_string())).collect()
        });

        for (feature, value) in layer.features_mut().iter_mut().zip(values) {
            if feature.properties.len() <= idx {
                feature.properties.resize(idx + 1, Value::Null);
            }
            feature.properties[idx] = value;
        }
        layer.fields_mut()[idx].kind = ColumnKind::Primitive;
    }
}

/// Convert one value of a column of the given kind.
fn convert(kind: ColumnKind, value: &Value) -> Result<Value> {
    match kind {
        ColumnKind::Primitive => primitive(value),
        ColumnKind::Temporal => temporal(value),
        ColumnKind::Duration => match value {
            Value::Null => Ok(Value::Null),
            Value::Duration(delta) => Ok(Value::Text(format_duration(delta))),
            other => bail!("expected a duration, found {other:?}"),
        },
        ColumnKind::Categorical => match value {
            Value::Null => Ok(Value::Null),
            Value::Category { code, label } => Ok(Value::Text(label.clone().unwrap_or_else(|| code.clone()))),
            other => bail!("expected a category, found {other:?}"),
        },
        ColumnKind::Opaque => Ok(opaque(value)),
    }
}

fn primitive(value: &Value) -> Result<Value> {
    match value {
        Value::Float(f) if !f.is_finite() => Ok(Value::Null),
        v if v.is_primitive() => Ok(v.clone()),
        other => bail!("expected a primitive, found {other:?}"),
    }
}

/// Timestamps and dates become `YYYY-MM-DD HH:MM:SS`; missing values become empty text.
fn temporal(value: &Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Text(String::new())),
        Value::Timestamp(ts) => Ok(Value::Text(ts.format(TEMPORAL_FORMAT).to_string())),
        Value::Date(date) => Ok(Value::Text(date.and_time(NaiveTime::MIN).format(TEMPORAL_FORMAT).to_string())),
        other => bail!("expected a date or timestamp, found {other:?}"),
    }
}

/// Values of a mixed column, one at a time: ISO text for temporal values,
/// unwrapped scalars for nested JSON, the string form for everything else.
fn opaque(value: &Value) -> Value {
    match value {
        Value::Float(f) if !f.is_finite() => Value::Null,
        v if v.is_primitive() => v.clone(),
        Value::Timestamp(ts) => Value::Text(format_iso(ts)),
        Value::Date(date) => Value::Text(date.format("%Y-%m-%d").to_string()),
        Value::Nested(json) => match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => n.as_i64().map(Value::Int)
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(Value::Float))
                .unwrap_or(Value::Null),
            Json::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        },
        other => Value::Text(other.to_string()),
    }
}
