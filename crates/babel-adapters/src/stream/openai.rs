//! Stream adapter for the `OpenAI` dialect
//!
//! Serves `OpenAI`, Zhipu, vLLM, Ollama, and Mistral. Both completion
//! topologies flow through the same transitions: finality is reached on
//! whichever chunk carries usage — the trailing usage-only chunk for
//! `OpenAI` with `include_usage`, or the bundled finish+usage chunk for
//! Zhipu.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use babel_core::{Provider, TokenUsage};

use crate::protocol::openai::{
    OpenAiChoice, OpenAiFunctionCall, OpenAiResponse, OpenAiResponseMessage, OpenAiStreamChunk, OpenAiToolCall,
    OpenAiUsage,
};

use super::{ChunkProcessingResult, StreamAccumulator, StreamAdapter, frame_data};

/// Stream sentinel closing an `OpenAI`-dialect stream
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental parser over `OpenAI`-dialect `chat.completion.chunk` events
pub struct OpenAiStreamAdapter {
    provider: Provider,
    acc: StreamAccumulator,
}

impl OpenAiStreamAdapter {
    /// Fresh adapter for one streamed call
    pub fn new(provider: Provider, model: &str) -> Self {
        Self {
            provider,
            acc: StreamAccumulator::new(model),
        }
    }
}

impl StreamAdapter for OpenAiStreamAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn process_chunk(&mut self, data: &str) -> ChunkProcessingResult {
        self.acc.note_chunk();

        if data.trim() == DONE_SENTINEL {
            // The sentinel never carries usage, so it never sets finality
            return ChunkProcessingResult {
                sse_data: Some(frame_data(DONE_SENTINEL)),
                ..Default::default()
            };
        }

        let Ok(chunk) = serde_json::from_str::<OpenAiStreamChunk>(data) else {
            tracing::debug!(provider = %self.provider, "forwarding unparseable stream chunk");
            return ChunkProcessingResult {
                sse_data: Some(frame_data(data)),
                ..Default::default()
            };
        };

        if self.acc.response_id.is_none() && !chunk.id.is_empty() {
            self.acc.response_id = Some(chunk.id.clone());
        }
        if !chunk.model.is_empty() {
            self.acc.model = chunk.model.clone();
        }

        let mut is_tool_call_chunk = false;
        for choice in &chunk.choices {
            if let Some(text) = &choice.delta.content {
                self.acc.append_text(text);
            }
            if let Some(tool_calls) = &choice.delta.tool_calls {
                is_tool_call_chunk = !tool_calls.is_empty();
                for tc in tool_calls {
                    let name = tc.function.as_ref().and_then(|f| f.name.as_deref());
                    self.acc.begin_tool_call(tc.index, tc.id.as_deref(), name);
                    if let Some(fragment) = tc.function.as_ref().and_then(|f| f.arguments.as_deref()) {
                        self.acc.append_tool_arguments(tc.index, fragment);
                    }
                }
            }
            if let Some(reason) = &choice.finish_reason {
                self.acc.mark_awaiting_usage(Some(reason));
            }
        }

        if is_tool_call_chunk {
            self.acc.raw_tool_events.push(data.to_owned());
        }

        let is_final = chunk.usage.is_some_and(|usage| {
            self.acc.finish_with_usage(TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            })
        });

        ChunkProcessingResult {
            sse_data: Some(frame_data(data)),
            is_tool_call_chunk,
            is_final,
        }
    }

    fn accumulator(&self) -> &StreamAccumulator {
        &self.acc
    }

    fn to_provider_response(&self) -> Value {
        let tool_calls: Vec<OpenAiToolCall> = self
            .acc
            .tool_calls()
            .map(|tc| OpenAiToolCall {
                id: tc.id.clone(),
                tool_type: "function".to_owned(),
                function: OpenAiFunctionCall {
                    name: tc.name.clone(),
                    arguments: tc.arguments.clone(),
                },
            })
            .collect();

        let finish_reason = self.acc.stop_reason.clone().or_else(|| {
            if tool_calls.is_empty() {
                None
            } else {
                Some("tool_calls".to_owned())
            }
        });

        let response = OpenAiResponse {
            id: self
                .acc
                .response_id
                .clone()
                .unwrap_or_else(|| format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())),
            object: "chat.completion".to_owned(),
            created: unix_now(),
            model: self.acc.model.clone(),
            choices: vec![OpenAiChoice {
                index: 0,
                message: OpenAiResponseMessage {
                    role: "assistant".to_owned(),
                    content: if self.acc.text.is_empty() && !tool_calls.is_empty() {
                        None
                    } else {
                        Some(self.acc.text.clone())
                    },
                    tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
                },
                finish_reason,
            }],
            usage: self.acc.usage.map(|u| OpenAiUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.total(),
            }),
        };

        serde_json::to_value(response).unwrap_or_else(|_| Value::Null)
    }
}

/// Seconds since the Unix epoch
pub(crate) fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use babel_core::Provider;

    use super::*;
    use crate::stream::StreamPhase;

    fn content_chunk(text: &str) -> String {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1,
            "model": "gpt-test",
            "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}],
        })
        .to_string()
    }

    #[test]
    fn accumulates_text_across_chunks() {
        let mut adapter = OpenAiStreamAdapter::new(Provider::OpenAi, "gpt-test");
        adapter.process_chunk(&content_chunk("Hello, "));
        adapter.process_chunk(&content_chunk("world!"));
        assert_eq!(adapter.accumulator().text, "Hello, world!");
    }

    #[test]
    fn trailing_usage_topology_finalizes_on_third_chunk() {
        let mut adapter = OpenAiStreamAdapter::new(Provider::OpenAi, "gpt-test");

        let first = adapter.process_chunk(&content_chunk("hi"));
        assert!(!first.is_final);

        let finish = serde_json::json!({
            "id": "chatcmpl-1", "object": "chat.completion.chunk", "created": 1, "model": "gpt-test",
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
        });
        let second = adapter.process_chunk(&finish.to_string());
        assert!(!second.is_final);
        assert_eq!(adapter.accumulator().phase(), StreamPhase::AwaitingUsage);

        let usage_only = serde_json::json!({
            "id": "chatcmpl-1", "object": "chat.completion.chunk", "created": 1, "model": "gpt-test",
            "choices": [],
            "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10},
        });
        let third = adapter.process_chunk(&usage_only.to_string());
        assert!(third.is_final);
        assert_eq!(
            adapter.accumulator().usage,
            Some(TokenUsage {
                input_tokens: 7,
                output_tokens: 3
            })
        );
    }

    #[test]
    fn bundled_usage_topology_finalizes_immediately() {
        // Zhipu sends finish_reason and usage on the same chunk
        let mut adapter = OpenAiStreamAdapter::new(Provider::Zhipu, "glm-test");
        let bundled = serde_json::json!({
            "id": "zhipu-1", "object": "chat.completion.chunk", "created": 1, "model": "glm-test",
            "choices": [{"index": 0, "delta": {"content": "done"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6},
        });
        let result = adapter.process_chunk(&bundled.to_string());
        assert!(result.is_final);
        assert_eq!(adapter.accumulator().stop_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn tool_call_deltas_accumulate_by_index() {
        let mut adapter = OpenAiStreamAdapter::new(Provider::OpenAi, "gpt-test");
        let start = serde_json::json!({
            "id": "c", "object": "chat.completion.chunk", "created": 1, "model": "m",
            "choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_a", "type": "function", "function": {"name": "search", "arguments": "{\"q\":"}}
            ]}, "finish_reason": null}],
        });
        let more = serde_json::json!({
            "id": "c", "object": "chat.completion.chunk", "created": 1, "model": "m",
            "choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "\"x\"}"}}
            ]}, "finish_reason": null}],
        });
        let first = adapter.process_chunk(&start.to_string());
        assert!(first.is_tool_call_chunk);
        adapter.process_chunk(&more.to_string());

        let calls: Vec<_> = adapter.accumulator().tool_calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].arguments, "{\"q\":\"x\"}");
        assert_eq!(adapter.accumulator().raw_tool_events.len(), 2);
    }

    #[test]
    fn done_sentinel_passes_through_without_finality() {
        let mut adapter = OpenAiStreamAdapter::new(Provider::OpenAi, "gpt-test");
        let result = adapter.process_chunk("[DONE]");
        assert!(!result.is_final);
        assert_eq!(result.sse_data.as_deref(), Some("data: [DONE]\n\n"));
    }

    #[test]
    fn rebuilds_response_after_disconnect_without_usage() {
        let mut adapter = OpenAiStreamAdapter::new(Provider::OpenAi, "gpt-test");
        adapter.process_chunk(&content_chunk("partial"));
        // Client disconnected; no finish or usage ever arrived
        let response = adapter.to_provider_response();
        assert_eq!(response["choices"][0]["message"]["content"], "partial");
        assert!(response.get("usage").is_none_or(Value::is_null));
    }
}
