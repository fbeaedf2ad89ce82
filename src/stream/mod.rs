//! Folding fully buffered SSE bodies into a single normalized response.
//!
//! Both dialects share the same front half: split on `\r?\n`, keep `data:`
//! lines, drop `[DONE]` and anything that is not a JSON object. The fold
//! itself never fails; noise is skipped and an empty body yields defaults.

pub mod chat;
pub mod lines;
pub mod messages;
pub mod sse;

pub use chat::{aggregate_chat_stream, ChoiceDeltaAggregator};
pub use lines::{line_stream, LineBuffer};
pub use messages::{aggregate_message_stream, ContentBlockAggregator};
pub use sse::{parse_event_line, sse_events};

use crate::protocol::NormalizedResponse;

/// Wire shape of an upstream event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDialect {
    /// `choices[].delta` fragments keyed by choice index.
    ChoiceDelta,
    /// Typed content blocks with text coalescing.
    ContentBlock,
}

/// Fold a buffered SSE body with the given dialect.
#[must_use]
pub fn aggregate(dialect: StreamDialect, body: &str) -> NormalizedResponse {
    match dialect {
        StreamDialect::ChoiceDelta => aggregate_chat_stream(body).into(),
        StreamDialect::ContentBlock => aggregate_message_stream(body).into(),
    }
}
