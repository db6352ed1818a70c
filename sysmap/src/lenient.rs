// Copyright 2025 the Sysmap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tolerant field decoders for backend payloads.
//!
//! The backend serializes most numbers as strings (`"12"`), ids as either
//! strings or numbers, and flags as `0`/`1`. These helpers accept all of them.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    if !f.is_finite() || f.abs() >= 9.0e15 {
        return None;
    }
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Range checked above."
    )]
    let n = f.trunc() as i64;
    Some(n)
}

pub(crate) fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(d)?;
    to_int(&value).ok_or_else(|| D::Error::custom(format!("expected an integer, got {value}")))
}

pub(crate) fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(d)?;
    if value.is_null() {
        return Ok(None);
    }
    to_int(&value)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("expected an integer, got {value}")))
}

pub(crate) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(d)?;
    match &value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        other => to_int(other)
            .map(|n| n != 0)
            .ok_or_else(|| D::Error::custom(format!("expected a flag, got {value}"))),
    }
}

pub(crate) fn opt_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let value = Value::deserialize(d)?;
    match &value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => to_int(other)
            .map(|n| Some(n != 0))
            .ok_or_else(|| D::Error::custom(format!("expected a flag, got {value}"))),
    }
}

pub(crate) fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected an id, got {other}"))),
    }
}

pub(crate) fn opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(D::Error::custom(format!("expected an id, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_and_floats_become_integers() {
        assert_eq!(to_int(&json!("12")), Some(12));
        assert_eq!(to_int(&json!(" -3 ")), Some(-3));
        assert_eq!(to_int(&json!("7.9")), Some(7));
        assert_eq!(to_int(&json!(7.9)), Some(7));
        assert_eq!(to_int(&json!("abc")), None);
        assert_eq!(to_int(&json!(null)), None);
    }

    #[derive(Deserialize)]
    struct Fields {
        #[serde(deserialize_with = "flag")]
        on: bool,
        #[serde(default, deserialize_with = "opt_int")]
        width: Option<i64>,
        #[serde(deserialize_with = "id")]
        key: String,
    }

    #[test]
    fn accepts_backend_encodings() {
        let p: Fields = serde_json::from_value(json!({"on": "1", "width": "32", "key": 5})).unwrap();
        assert!(p.on);
        assert_eq!(p.width, Some(32));
        assert_eq!(p.key, "5");

        let p: Fields = serde_json::from_value(json!({"on": 0, "key": "new0"})).unwrap();
        assert!(!p.on);
        assert_eq!(p.width, None);
        assert_eq!(p.key, "new0");

        assert!(serde_json::from_value::<Fields>(json!({"on": "x", "key": "a"})).is_err());
    }
}
