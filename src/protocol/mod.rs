//! Request descriptors for each upstream operation and the normalized
//! shapes a streamed reply folds into.

use serde::Serialize;

use crate::JsonObject;

pub mod chat;
pub mod decode;
pub mod descriptor;
pub mod images;
pub mod messages;
pub mod models;
pub mod video;

pub use chat::{ChatCompletion, ChatCompletionRequest, ChatMessage, Choice, ChoiceMessage, ChatUsage};
pub use descriptor::{Endpoint, RequestDescriptor};
pub use images::ImageGenerationRequest;
pub use messages::{ContentBlock, Message, MessagesRequest, TextBlock};
pub use models::ListModelsRequest;
pub use video::{VideoStatusRequest, VideoSubmitRequest};

/// The single response a stream aggregates into, one variant per dialect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedResponse {
    ChatCompletion(ChatCompletion),
    Message(Message),
}

impl NormalizedResponse {
    /// The `object`/`type` tag of the aggregate.
    #[must_use]
    pub fn object(&self) -> &'static str {
        match self {
            NormalizedResponse::ChatCompletion(completion) => completion.object(),
            NormalizedResponse::Message(message) => message.object(),
        }
    }

    /// Render as a JSON map in declaration field order.
    #[must_use]
    pub fn into_object(self) -> JsonObject {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => JsonObject::new(),
        }
    }
}

impl From<ChatCompletion> for NormalizedResponse {
    fn from(value: ChatCompletion) -> Self {
        NormalizedResponse::ChatCompletion(value)
    }
}

impl From<Message> for NormalizedResponse {
    fn from(value: Message) -> Self {
        NormalizedResponse::Message(value)
    }
}
