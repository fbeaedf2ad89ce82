use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::stream::StreamDialect;
use crate::JsonObject;

use super::descriptor::{
    check_option_min, check_option_range, merge_options, require_non_blank, Endpoint,
};

/// Object tag of an aggregated chat completion.
pub const CHAT_COMPLETION_OBJECT: &str = "chat.completion";

/// Chat message wire type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Value,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", Value::String(content.into()))
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", Value::String(content.into()))
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", Value::String(content.into()))
    }
}

/// Check a message list: non-empty, each entry with a role and content.
pub(crate) fn validate_messages(messages: &[ChatMessage]) -> Result<(), ClientError> {
    if messages.is_empty() {
        return Err(ClientError::Validation(
            "messages cannot be empty".to_string(),
        ));
    }
    for (idx, message) in messages.iter().enumerate() {
        if message.role.trim().is_empty() {
            return Err(ClientError::Validation(format!(
                "messages[{idx}] is missing a role"
            )));
        }
        let missing_content = match &message.content {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(parts) => parts.is_empty(),
            _ => false,
        };
        if missing_content {
            return Err(ClientError::Validation(format!(
                "messages[{idx}] is missing content"
            )));
        }
    }
    Ok(())
}

/// `POST /chat/completions`.
#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: JsonObject,
}

impl ChatCompletionRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: JsonObject::new(),
        }
    }

    /// Set an optional request field (`temperature`, `max_tokens`, ...).
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_stream(self, stream: bool) -> Self {
        self.with_option("stream", Value::Bool(stream))
    }
}

impl Endpoint for ChatCompletionRequest {
    fn path(&self) -> Cow<'_, str> {
        Cow::Borrowed("/chat/completions")
    }

    fn build_body(&self) -> Option<JsonObject> {
        let mut body = JsonObject::new();
        body.insert("model".into(), Value::String(self.model.clone()));
        body.insert(
            "messages".into(),
            serde_json::to_value(&self.messages).unwrap_or(Value::Array(Vec::new())),
        );
        merge_options(&mut body, &self.options);
        Some(body)
    }

    fn options(&self) -> Option<&JsonObject> {
        Some(&self.options)
    }

    fn validate(&self) -> Result<(), ClientError> {
        require_non_blank(&self.model, "model")?;
        validate_messages(&self.messages)?;
        check_option_range(&self.options, "temperature", 0.0, 2.0)?;
        check_option_range(&self.options, "top_p", 0.0, 1.0)?;
        check_option_min(&self.options, "max_tokens", 1.0)?;
        check_option_min(&self.options, "n", 1.0)?;
        Ok(())
    }

    fn stream_dialect(&self) -> Option<StreamDialect> {
        Some(StreamDialect::ChoiceDelta)
    }
}

// ---------------------------------------------------------------------------
// Aggregated response
// ---------------------------------------------------------------------------

/// Chat completion as produced by folding a choice-delta stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletion {
    pub id: Option<String>,
    object: &'static str,
    pub created: Option<i64>,
    pub model: Option<String>,
    pub choices: Vec<Choice>,
    pub usage: ChatUsage,
}

impl Default for ChatCompletion {
    fn default() -> Self {
        Self {
            id: None,
            object: CHAT_COMPLETION_OBJECT,
            created: None,
            model: None,
            choices: Vec::new(),
            usage: ChatUsage::default(),
        }
    }
}

impl ChatCompletion {
    #[must_use]
    pub fn object(&self) -> &'static str {
        self.object
    }

    /// Content of the choice at `index`, if that choice exists.
    #[must_use]
    pub fn content(&self, index: u64) -> Option<&str> {
        self.choices
            .iter()
            .find(|choice| choice.index == index)
            .map(|choice| choice.message.content.as_str())
    }
}

/// One parallel completion, keyed by its stable `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub index: u64,
    pub message: ChoiceMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceMessage {
    pub role: String,
    pub content: String,
}

/// Token usage; only these three counters are ever tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl ChatUsage {
    /// Overwrite counters present in `incoming`; absent or non-integer
    /// fields keep their current value and unknown keys are ignored.
    pub fn merge(&mut self, incoming: &JsonObject) {
        let fields = [
            ("prompt_tokens", &mut self.prompt_tokens),
            ("completion_tokens", &mut self.completion_tokens),
            ("total_tokens", &mut self.total_tokens),
        ];
        for (key, slot) in fields {
            if let Some(value) = incoming.get(key).and_then(Value::as_u64) {
                *slot = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_required_fields() {
        let ok = ChatCompletionRequest::new("m", vec![ChatMessage::user("hi")]);
        assert!(ok.validate().is_ok());

        let blank_model = ChatCompletionRequest::new(" ", vec![ChatMessage::user("hi")]);
        assert!(blank_model.validate().is_err());

        let empty = ChatCompletionRequest::new("m", Vec::new());
        let err = empty.validate().unwrap_err();
        assert!(err.to_string().contains("messages cannot be empty"));

        let no_role = ChatCompletionRequest::new("m", vec![ChatMessage::new("", "hi")]);
        assert!(no_role.validate().unwrap_err().to_string().contains("role"));

        let no_content = ChatCompletionRequest::new("m", vec![ChatMessage::new("user", Value::Null)]);
        assert!(no_content
            .validate()
            .unwrap_err()
            .to_string()
            .contains("content"));
    }

    #[test]
    fn test_validate_option_ranges() {
        let hot = ChatCompletionRequest::new("m", vec![ChatMessage::user("hi")])
            .with_option("temperature", json!(2.5));
        assert!(hot.validate().is_err());

        let zero_tokens = ChatCompletionRequest::new("m", vec![ChatMessage::user("hi")])
            .with_option("max_tokens", json!(0));
        assert!(zero_tokens.validate().is_err());
    }

    #[test]
    fn test_multimodal_content_accepted() {
        let message = ChatMessage::new(
            "user",
            json!([{"type": "image_url", "image_url": {"url": "https://x/y.png"}}]),
        );
        let request = ChatCompletionRequest::new("m", vec![message]);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_build_body_shape() {
        let request = ChatCompletionRequest::new("m", vec![ChatMessage::user("hi")])
            .with_stream(true)
            .with_option("max_tokens", json!(64));
        let body = request.build_body().unwrap();
        assert_eq!(
            Value::Object(body),
            json!({
                "model": "m",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true,
                "max_tokens": 64
            })
        );
    }

    #[test]
    fn test_usage_merge_whitelist() {
        let mut usage = ChatUsage::default();
        usage.merge(json!({"prompt_tokens": 5, "cached_tokens": 9}).as_object().unwrap());
        usage.merge(json!({"completion_tokens": 2, "total_tokens": 7}).as_object().unwrap());
        usage.merge(json!({"prompt_tokens": null}).as_object().unwrap());
        assert_eq!(
            usage,
            ChatUsage {
                prompt_tokens: 5,
                completion_tokens: 2,
                total_tokens: 7
            }
        );
        let rendered = serde_json::to_value(usage).unwrap();
        assert_eq!(rendered.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_default_completion_serializes_with_tag() {
        let rendered = serde_json::to_value(ChatCompletion::default()).unwrap();
        assert_eq!(
            rendered,
            json!({
                "id": null,
                "object": "chat.completion",
                "created": null,
                "model": null,
                "choices": [],
                "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0}
            })
        );
    }
}
