use std::time::Duration;

use serde_json::Value;
use tracing::info;

use crate::JsonObject;

/// Token counts found in a normalized response, whichever dialect produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageSummary {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Read token usage from a response map.
///
/// Understands both `prompt_tokens`/`completion_tokens`/`total_tokens` and
/// `input_tokens`/`output_tokens`; a missing total is derived from the parts.
#[must_use]
pub fn usage_summary(response: &JsonObject) -> Option<UsageSummary> {
    let usage = response.get("usage")?.as_object()?;
    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| usage.get(*key).and_then(Value::as_u64))
    };
    let input_tokens = field(&["prompt_tokens", "input_tokens"]).unwrap_or(0);
    let output_tokens = field(&["completion_tokens", "output_tokens"]).unwrap_or(0);
    let total_tokens = field(&["total_tokens"]).unwrap_or(input_tokens + output_tokens);
    Some(UsageSummary {
        input_tokens,
        output_tokens,
        total_tokens,
    })
}

/// Log token usage for a completed call.
pub fn log_response_usage(path: &str, response: &JsonObject, duration: Duration) {
    let usage = usage_summary(response).unwrap_or_default();
    let model = response.get("model").and_then(Value::as_str).unwrap_or("");
    info!(
        path = path,
        model = model,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        total_tokens = usage.total_tokens,
        duration_seconds = duration.as_secs_f64(),
        "request completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_choice_delta_usage() {
        let response = object(json!({
            "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
        }));
        assert_eq!(
            usage_summary(&response),
            Some(UsageSummary {
                input_tokens: 3,
                output_tokens: 4,
                total_tokens: 7
            })
        );
    }

    #[test]
    fn test_content_block_usage_derives_total() {
        let response = object(json!({
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }));
        let usage = usage_summary(&response).unwrap();
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn test_missing_or_null_usage() {
        assert!(usage_summary(&object(json!({"id": "x"}))).is_none());
        assert!(usage_summary(&object(json!({"usage": null}))).is_none());
    }
}
