use std::borrow::Cow;

use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::stream::StreamDialect;
use crate::JsonObject;

use super::chat::{validate_messages, ChatMessage};
use super::descriptor::{check_option_range, merge_options, require_non_blank, Endpoint};

/// Object tag of an aggregated message.
pub const MESSAGE_OBJECT: &str = "message";

const DEFAULT_MAX_TOKENS: u64 = 1024;

/// `POST /messages`, the content-block dialect.
#[derive(Debug, Clone)]
pub struct MessagesRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u64,
    pub options: JsonObject,
}

impl MessagesRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            options: JsonObject::new(),
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the top-level system prompt.
    #[must_use]
    pub fn with_system(self, system: impl Into<String>) -> Self {
        self.with_option("system", Value::String(system.into()))
    }

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

impl Endpoint for MessagesRequest {
    fn path(&self) -> Cow<'_, str> {
        Cow::Borrowed("/messages")
    }

    fn build_body(&self) -> Option<JsonObject> {
        let mut body = JsonObject::new();
        body.insert("model".into(), Value::String(self.model.clone()));
        body.insert(
            "messages".into(),
            serde_json::to_value(&self.messages).unwrap_or(Value::Array(Vec::new())),
        );
        body.insert("max_tokens".into(), Value::from(self.max_tokens));
        merge_options(&mut body, &self.options);
        Some(body)
    }

    fn options(&self) -> Option<&JsonObject> {
        Some(&self.options)
    }

    fn validate(&self) -> Result<(), ClientError> {
        require_non_blank(&self.model, "model")?;
        validate_messages(&self.messages)?;
        if self.max_tokens == 0 {
            return Err(ClientError::Validation(
                "max_tokens must be at least 1".to_string(),
            ));
        }
        check_option_range(&self.options, "temperature", 0.0, 1.0)?;
        check_option_range(&self.options, "top_p", 0.0, 1.0)?;
        Ok(())
    }

    fn stream_dialect(&self) -> Option<StreamDialect> {
        Some(StreamDialect::ContentBlock)
    }
}

// ---------------------------------------------------------------------------
// Aggregated response
// ---------------------------------------------------------------------------

/// Message as produced by folding a content-block stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Option<String>,
    #[serde(rename = "type")]
    object: &'static str,
    pub role: String,
    pub model: Option<String>,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub stop_sequence: Option<String>,
    pub usage: Option<JsonObject>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            id: None,
            object: MESSAGE_OBJECT,
            role: "assistant".to_string(),
            model: None,
            content: Vec::new(),
            stop_reason: None,
            stop_sequence: None,
            usage: None,
        }
    }
}

impl Message {
    #[must_use]
    pub fn object(&self) -> &'static str {
        self.object
    }

    /// Concatenated text of all text blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect()
    }
}

/// A typed unit of message content.
///
/// Text blocks are accumulated; every other block type is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Text(TextBlock),
    Other(JsonObject),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "text")]
pub struct TextBlock {
    pub text: String,
}

impl ContentBlock {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(TextBlock { text: text.into() })
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(block) => Some(&block.text),
            ContentBlock::Other(_) => None,
        }
    }

    /// The block's `type` tag.
    #[must_use]
    pub fn block_type(&self) -> &str {
        match self {
            ContentBlock::Text(_) => "text",
            ContentBlock::Other(map) => map.get("type").and_then(Value::as_str).unwrap_or(""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_includes_max_tokens_and_system() {
        let request = MessagesRequest::new("claude-like", vec![ChatMessage::user("hi")])
            .with_max_tokens(256)
            .with_system("be brief");
        assert_eq!(
            Value::Object(request.build_body().unwrap()),
            json!({
                "model": "claude-like",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 256,
                "system": "be brief"
            })
        );
        assert_eq!(request.path(), "/messages");
    }

    #[test]
    fn test_validate_rejects_zero_max_tokens() {
        let request =
            MessagesRequest::new("m", vec![ChatMessage::user("hi")]).with_max_tokens(0);
        assert!(matches!(
            request.validate(),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_message_without_content() {
        let request = MessagesRequest::new("m", vec![ChatMessage::new("user", "")]);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_message_serializes_flat() {
        let message = Message {
            id: Some("msg_1".into()),
            content: vec![
                ContentBlock::text("Hello"),
                ContentBlock::Other(
                    json!({"type": "tool_use", "id": "t1", "name": "f", "input": {}})
                        .as_object()
                        .cloned()
                        .unwrap(),
                ),
            ],
            ..Message::default()
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "model": null,
                "content": [
                    {"type": "text", "text": "Hello"},
                    {"type": "tool_use", "id": "t1", "name": "f", "input": {}}
                ],
                "stop_reason": null,
                "stop_sequence": null,
                "usage": null
            })
        );
        assert_eq!(message.text(), "Hello");
        assert_eq!(message.content[1].block_type(), "tool_use");
    }
}
