//! Choice-delta fold: `choices[].delta` fragments into one chat completion.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::protocol::chat::{ChatCompletion, Choice, ChoiceMessage};
use crate::util::{identifier_string, non_empty_str, scalar_to_string};
use crate::JsonObject;

use super::sse::sse_events;

const DEFAULT_ROLE: &str = "assistant";

/// Sequential accumulator for one choice-delta stream.
#[derive(Debug, Default)]
pub struct ChoiceDeltaAggregator {
    completion: ChatCompletion,
    choices: BTreeMap<u64, Choice>,
}

impl ChoiceDeltaAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decoded event.
    pub fn push(&mut self, event: &JsonObject) {
        let completion = &mut self.completion;
        if completion.id.is_none() {
            completion.id = event.get("id").and_then(identifier_string);
        }
        if completion.model.is_none() {
            completion.model = event.get("model").and_then(identifier_string);
        }
        if completion.created.is_none() {
            completion.created = event.get("created").and_then(Value::as_i64);
        }
        if let Some(Value::Object(usage)) = event.get("usage") {
            completion.usage.merge(usage);
        }

        let Some(Value::Array(entries)) = event.get("choices") else {
            return;
        };
        for entry in entries.iter().filter_map(Value::as_object) {
            self.push_choice(entry);
        }
    }

    fn push_choice(&mut self, entry: &JsonObject) {
        let index = entry.get("index").and_then(Value::as_u64).unwrap_or(0);
        let delta = entry.get("delta").and_then(Value::as_object);
        let role = delta.and_then(|d| non_empty_str(d.get("role")));

        let choice = self.choices.entry(index).or_insert_with(|| Choice {
            index,
            message: ChoiceMessage {
                role: role.unwrap_or(DEFAULT_ROLE).to_string(),
                content: String::new(),
            },
            finish_reason: None,
        });

        if let Some(role) = role {
            if choice.message.role != role {
                choice.message.role = role.to_string();
            }
        }
        if let Some(content) = delta.and_then(|d| d.get("content")) {
            choice.message.content.push_str(&scalar_to_string(content));
        }
        if let Some(reason) = entry.get("finish_reason").filter(|v| !v.is_null()) {
            choice.finish_reason = Some(scalar_to_string(reason));
        }
    }

    /// Complete the fold; choices come out in ascending index order.
    #[must_use]
    pub fn finish(self) -> ChatCompletion {
        let mut completion = self.completion;
        completion.choices = self.choices.into_values().collect();
        completion
    }
}

/// Aggregate a fully buffered choice-delta SSE body.
#[must_use]
pub fn aggregate_chat_stream(body: &str) -> ChatCompletion {
    let mut aggregator = ChoiceDeltaAggregator::new();
    for event in sse_events(body) {
        aggregator.push(&event);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_choice_concatenation() {
        let body = concat!(
            "data: {\"id\":\"x\",\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let completion = aggregate_chat_stream(body);
        assert_eq!(
            serde_json::to_value(&completion).unwrap(),
            json!({
                "id": "x",
                "object": "chat.completion",
                "created": null,
                "model": "m",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Hello"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0}
            })
        );
    }

    #[test]
    fn test_interleaved_indices_sorted() {
        let body = concat!(
            "data: {\"choices\":[{\"index\":1,\"delta\":{\"content\":\"B\"}}]}\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"A\"}}]}\n",
        );
        let completion = aggregate_chat_stream(body);
        let indices: Vec<u64> = completion.choices.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(completion.content(0), Some("A"));
        assert_eq!(completion.content(1), Some("B"));
    }

    #[test]
    fn test_malformed_line_dropped() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "data: {not json\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        );
        assert_eq!(aggregate_chat_stream(body).content(0), Some("ab"));
    }

    #[test]
    fn test_empty_and_garbage_bodies_yield_defaults() {
        assert_eq!(aggregate_chat_stream(""), ChatCompletion::default());
        assert_eq!(
            aggregate_chat_stream("data: nope\nrandom\ndata: [DONE]\n"),
            ChatCompletion::default()
        );
    }

    #[test]
    fn test_done_lines_do_not_change_result() {
        let events = [
            "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"x\"}}]}",
            "data: {\"choices\":[{\"delta\":{\"content\":\"y\"},\"finish_reason\":\"length\"}]}",
        ];
        let plain = aggregate_chat_stream(&events.join("\n"));
        let noisy = format!(
            "data: [DONE]\n{}\ndata: [DONE]\n{}\ndata: [DONE]\ndata: [DONE]\n",
            events[0], events[1]
        );
        assert_eq!(aggregate_chat_stream(&noisy), plain);
    }

    #[test]
    fn test_first_identity_wins_and_usage_whitelisted() {
        let body = concat!(
            "data: {\"id\":\"first\",\"created\":1700000000,\"choices\":[]}\n",
            "data: {\"id\":\"second\",\"model\":\"late\",\"created\":1,\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":4,\"total_tokens\":7,\"prompt_cache_hit_tokens\":2}}\n",
        );
        let completion = aggregate_chat_stream(body);
        assert_eq!(completion.id.as_deref(), Some("first"));
        assert_eq!(completion.model.as_deref(), Some("late"));
        assert_eq!(completion.created, Some(1_700_000_000));
        let usage = serde_json::to_value(completion.usage).unwrap();
        assert_eq!(
            usage,
            json!({"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7})
        );
    }

    #[test]
    fn test_finish_reason_last_non_null_wins() {
        let body = concat!(
            "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"length\"}]}\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":null}]}\n",
        );
        let completion = aggregate_chat_stream(body);
        assert_eq!(completion.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_content_coercion_and_role_handling() {
        let body = concat!(
            "data: {\"choices\":[{\"index\":\"two\",\"delta\":{\"role\":\"\",\"content\":42}}]}\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":[\"x\"]}}]}\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"tool\",\"content\":true}}]}\n",
        );
        let completion = aggregate_chat_stream(body);
        assert_eq!(completion.choices.len(), 1);
        let message = &completion.choices[0].message;
        assert_eq!(message.role, "tool");
        assert_eq!(message.content, "42true");
    }

    #[test]
    fn test_role_seeded_from_first_delta() {
        let mut aggregator = ChoiceDeltaAggregator::new();
        aggregator.push(
            json!({"choices": [{"index": 2, "delta": {"role": "system", "content": "s"}}]})
                .as_object()
                .unwrap(),
        );
        let completion = aggregator.finish();
        assert_eq!(completion.choices[0].index, 2);
        assert_eq!(completion.choices[0].message.role, "system");
    }
}
