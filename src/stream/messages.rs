//! Content-block fold: typed content fragments into one message.

use serde_json::Value;

use crate::protocol::messages::{ContentBlock, Message, TextBlock};
use crate::util::{identifier_string, non_empty_str, scalar_to_string};
use crate::JsonObject;

use super::sse::sse_events;

const STOP_FIELDS: [&str; 2] = ["stop_reason", "stop_sequence"];

/// Sequential accumulator for one content-block stream.
#[derive(Debug, Default)]
pub struct ContentBlockAggregator {
    message: Message,
}

impl ContentBlockAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decoded event.
    ///
    /// Text arrives either as `text` entries under `content` (top level or
    /// inside `delta`) or as native `text_delta` events. Non-text blocks are
    /// kept as first seen: `input_json_delta` fragments for a `tool_use`
    /// block are not accumulated into its `input`.
    pub fn push(&mut self, event: &JsonObject) {
        let nested = event.get("message").and_then(Value::as_object);
        let delta = event.get("delta").and_then(Value::as_object);
        let scopes = [Some(event), nested];

        for scope in scopes.into_iter().flatten() {
            self.absorb_identity(scope);
        }

        // Explicitly present stop fields overwrite, null included.
        for scope in [Some(event), nested, delta].into_iter().flatten() {
            for field in STOP_FIELDS {
                if let Some(value) = scope.get(field) {
                    let value = match value {
                        Value::Null => None,
                        other => Some(scalar_to_string(other)),
                    };
                    if field == "stop_reason" {
                        self.message.stop_reason = value;
                    } else {
                        self.message.stop_sequence = value;
                    }
                }
            }
        }

        for scope in [nested, Some(event)].into_iter().flatten() {
            if let Some(Value::Object(usage)) = scope.get("usage") {
                self.message.usage = Some(usage.clone());
            }
        }

        let content = event
            .get("content")
            .filter(|v| !v.is_null())
            .or_else(|| delta.and_then(|d| d.get("content")));
        if let Some(Value::Array(entries)) = content {
            for entry in entries {
                self.push_entry(entry);
            }
        }
        if let Some(block) = event.get("content_block").filter(|v| v.is_object()) {
            self.push_entry(block);
        }
        if let Some(delta) = delta {
            if delta.get("type").and_then(Value::as_str) == Some("text_delta") {
                let text = delta.get("text").map(scalar_to_string).unwrap_or_default();
                self.push_text(text);
            }
        }
    }

    fn absorb_identity(&mut self, scope: &JsonObject) {
        let message = &mut self.message;
        if message.id.is_none() {
            message.id = scope.get("id").and_then(identifier_string);
        }
        if message.model.is_none() {
            message.model = scope.get("model").and_then(identifier_string);
        }
        if let Some(role) = non_empty_str(scope.get("role")) {
            message.role = role.to_string();
        }
    }

    fn push_entry(&mut self, entry: &Value) {
        let Some(object) = entry.as_object() else {
            return;
        };
        match object.get("type") {
            None => {}
            Some(Value::String(kind)) if kind == "text" => {
                let text = object.get("text").map(scalar_to_string).unwrap_or_default();
                self.push_text(text);
            }
            Some(_) => self.message.content.push(ContentBlock::Other(object.clone())),
        }
    }

    /// Extend the last block when it is text, otherwise open a new one.
    fn push_text(&mut self, text: String) {
        match self.message.content.last_mut() {
            Some(ContentBlock::Text(block)) => block.text.push_str(&text),
            _ => self.message.content.push(ContentBlock::Text(TextBlock { text })),
        }
    }

    #[must_use]
    pub fn finish(self) -> Message {
        self.message
    }
}

/// Aggregate a fully buffered content-block SSE body.
#[must_use]
pub fn aggregate_message_stream(body: &str) -> Message {
    let mut aggregator = ContentBlockAggregator::new();
    for event in sse_events(body) {
        aggregator.push(&event);
    }
    aggregator.finish()
}
