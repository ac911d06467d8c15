//! Field lookups on decoded upstream bodies.
//!
//! Bodies decoded from XML carry every scalar as a string, so numeric lookups
//! accept numbers and numeric strings alike.

use serde_json::Value;

use crate::error::{MetricsError, Result};

/// Walk `path` from `value`; `null` counts as missing.
pub fn field<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut current = value;
    for (depth, key) in path.iter().enumerate() {
        current = match current.get(*key) {
            Some(Value::Null) | None => {
                return Err(MetricsError::missing(path[..=depth].join(".")));
            }
            Some(next) => next,
        };
    }
    Ok(current)
}

/// String at `path`.
pub fn str_field<'a>(value: &'a Value, path: &[&str]) -> Result<&'a str> {
    field(value, path)?.as_str().ok_or_else(|| MetricsError::UnexpectedShape {
        context: format!("field '{}' (expected a string)", path.join(".")),
        url: None,
    })
}

/// Non-negative integer at `path`.
pub fn u64_field(value: &Value, path: &[&str]) -> Result<u64> {
    as_u64(field(value, path)?).ok_or_else(|| MetricsError::UnexpectedShape {
        context: format!("field '{}' (expected an integer)", path.join(".")),
        url: None,
    })
}

/// Signed integer at `path`.
pub fn i64_field(value: &Value, path: &[&str]) -> Result<i64> {
    as_i64(field(value, path)?).ok_or_else(|| MetricsError::UnexpectedShape {
        context: format!("field '{}' (expected an integer)", path.join(".")),
        url: None,
    })
}

pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Entries of a value that may be a single map or a list of maps.
pub fn entries(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        single => vec![single],
    }
}
