use serde_json::Value;

use crate::error::ClientError;
use crate::JsonObject;

/// Parse a complete response body that must be a JSON object.
///
/// # Errors
///
/// Returns [`ClientError::Decode`] when the body is not valid JSON or is not
/// an object.
pub fn decode_object(body: &[u8]) -> Result<JsonObject, ClientError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ClientError::Decode(format!("Invalid JSON response: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ClientError::Decode(format!(
            "Expected a JSON object response, got {}",
            json_kind(&other)
        ))),
    }
}

/// Fail unless `key` holds a JSON array.
///
/// # Errors
///
/// Returns [`ClientError::Decode`] naming the missing field.
pub fn require_list(object: &JsonObject, key: &str) -> Result<(), ClientError> {
    match object.get(key) {
        Some(Value::Array(_)) => Ok(()),
        Some(other) => Err(ClientError::Decode(format!(
            "Response field '{key}' must be a list, got {}",
            json_kind(other)
        ))),
        None => Err(ClientError::Decode(format!(
            "Response is missing the '{key}' list"
        ))),
    }
}

/// Fail unless `key` is present with a non-null value.
///
/// # Errors
///
/// Returns [`ClientError::Decode`] naming the missing field.
pub fn require_present(object: &JsonObject, key: &str) -> Result<(), ClientError> {
    match object.get(key) {
        Some(value) if !value.is_null() => Ok(()),
        _ => Err(ClientError::Decode(format!(
            "Response is missing the '{key}' field"
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
