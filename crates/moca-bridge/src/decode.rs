// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoders for success values, for use with `PendingCall::map`.
//
// The native plugins are loose about scalar types: booleans arrive as `true`
// or as `0`/`1`, and numbers sometimes arrive as strings.

use serde::de::DeserializeOwned;
use serde_json::Value;

use moca_core::{MocaError, Result};

pub fn string(action: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(MocaError::unexpected(action, format!("expected a string, got {other}"))),
    }
}

pub fn boolean(action: &str, value: Value) -> Result<bool> {
    match &value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(MocaError::unexpected(action, format!("expected 0 or 1, got {n}"))),
        },
        Value::String(s) if s == "true" || s == "1" => Ok(true),
        Value::String(s) if s == "false" || s == "0" => Ok(false),
        other => Err(MocaError::unexpected(action, format!("expected a boolean, got {other}"))),
    }
}

pub fn integer(action: &str, value: Value) -> Result<i64> {
    match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| MocaError::unexpected(action, format!("number out of range: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| MocaError::unexpected(action, format!("expected an integer, got {s:?}"))),
        other => Err(MocaError::unexpected(action, format!("expected an integer, got {other}"))),
    }
}

/// Any serde-decodable record.
pub fn json<T: DeserializeOwned>(action: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| MocaError::unexpected(action, e.to_string()))
}

/// Like [`json`], but `null` decodes to `T::default()`.
pub fn json_or_default<T: DeserializeOwned + Default>(action: &str, value: Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    json(action, value)
}

/// The value stored under `key` in a `{ key: value }` reply, or the reply
/// itself when the native side returned a bare value.
pub fn keyed(key: &str, value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}
