//! Every place that turns user-entered text (or a response body) into JSON
//! goes through this module, so a malformed value degrades the same way
//! everywhere.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};

/// Parses user-entered JSON text. Blank input yields `Ok(None)`.
pub fn parse_json_text(field: &'static str, raw: &str) -> Result<Option<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| Error::Json { field, source })
}

/// Guarded body parse for persisted snapshots: JSON when the text is valid
/// JSON, the raw text as a string otherwise, `null` when blank.
///
/// The second element is the original text, returned only in the fallback
/// case so it can be told apart from a JSON string literal.
pub fn parse_or_string(raw: &str) -> (Value, Option<String>) {
    match parse_json_text("body", raw) {
        Ok(Some(value)) => (value, None),
        Ok(None) => (Value::Null, None),
        Err(_) => (Value::String(raw.to_string()), Some(raw.to_string())),
    }
}

/// Parses the headers editor. The text must be a JSON object whose values are
/// scalars; numbers and booleans are sent in their JSON spelling.
pub fn parse_headers_text(raw: &str) -> Result<BTreeMap<String, String>> {
    let Some(value) = parse_json_text("headers", raw)? else {
        return Ok(BTreeMap::new());
    };

    let Value::Object(map) = value else {
        return Err(Error::HeadersNotObject);
    };

    let mut headers = BTreeMap::new();
    for (name, value) in map {
        let value = match value {
            Value::String(value) => value,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => return Err(Error::HeaderValueType(name)),
        };
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Response bodies are shown as JSON when they parse, otherwise as the
/// literal text. This never fails.
pub fn interpret_body(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Text to put back into an editor: `{}` for null, pretty JSON for everything
/// else. String values keep their quotes; text that never was JSON is
/// restored from the raw copy instead.
pub fn editor_text(value: &Value) -> String {
    match value {
        Value::Null => "{}".to_string(),
        other => pretty(other),
    }
}
