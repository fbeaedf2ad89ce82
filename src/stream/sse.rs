//! `data:` line extraction for fully buffered SSE bodies.

use serde_json::Value;

use crate::util::extract_sse_data_payload;
use crate::JsonObject;

/// Decode one SSE line into an event object.
///
/// Non-data lines, the `[DONE]` sentinel, invalid JSON and non-object
/// payloads all yield `None`.
#[must_use]
pub fn parse_event_line(line: &str) -> Option<JsonObject> {
    let payload = extract_sse_data_payload(line)?;
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Lazily decoded event objects of a buffered body, in arrival order.
///
/// The iterator is `Clone`, so the sequence can be restarted without
/// re-reading the body.
pub fn sse_events(body: &str) -> impl Iterator<Item = JsonObject> + Clone + '_ {
    body.lines().filter_map(parse_event_line)
}
