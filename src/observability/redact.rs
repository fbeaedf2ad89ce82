use serde_json::Value;

use crate::JsonObject;

/// Replacement text for secret header values.
pub const REDACTION_MASK: &str = "***";

const SECRET_HEADERS: &[&str] = &["authorization"];

#[inline]
fn is_secret_header(name: &str) -> bool {
    SECRET_HEADERS
        .iter()
        .any(|secret| name.eq_ignore_ascii_case(secret))
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::String(_) => Value::String(REDACTION_MASK.to_string()),
                    other => other.clone(),
                })
                .collect(),
        ),
        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
            Value::String(REDACTION_MASK.to_string())
        }
        Value::Null | Value::Object(_) => value.clone(),
    }
}

/// Mask secret header values in a JSON rendering of a header set.
///
/// Scalars become [`REDACTION_MASK`]; for list values each string element is
/// masked and other elements are kept.
#[must_use]
pub fn redact_header_values(headers: &JsonObject) -> JsonObject {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if is_secret_header(name) {
                mask_value(value)
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

/// Render a header map as JSON for logging, with secrets masked.
///
/// Headers that occur more than once become arrays.
#[must_use]
pub fn redact_headers(headers: &http::HeaderMap) -> JsonObject {
    let mut rendered = JsonObject::new();
    for name in headers.keys() {
        let mut values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let value = if values.len() == 1 {
            values.pop().unwrap_or(Value::Null)
        } else {
            Value::Array(values)
        };
        rendered.insert(name.as_str().to_string(), value);
    }
    redact_header_values(&rendered)
}
