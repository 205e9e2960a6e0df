//! Stream adapter for the Anthropic messages API
//!
//! Anthropic's content-block index is shared across block types, so a tool
//! use following a text block arrives with block index 1+. Tool calls get
//! their own sequential slot index to avoid phantom entries in consumers
//! that index by position.

use std::collections::HashMap;

use serde_json::Value;

use babel_core::{Provider, TokenUsage};

use crate::protocol::anthropic::{
    AnthropicContentBlock, AnthropicResponse, AnthropicStreamDelta, AnthropicStreamEvent, AnthropicUsage,
};

use super::{ChunkProcessingResult, StreamAccumulator, StreamAdapter, frame_event};

/// Incremental parser over Anthropic stream events
pub struct AnthropicStreamAdapter {
    acc: StreamAccumulator,
    /// Content-block index → tool slot index
    block_to_slot: HashMap<u32, u32>,
    next_slot: u32,
    /// Input tokens reported by `message_start`, held until output usage
    /// arrives on `message_delta`
    pending_input_tokens: u32,
}

impl AnthropicStreamAdapter {
    /// Fresh adapter for one streamed call
    pub fn new(model: &str) -> Self {
        Self {
            acc: StreamAccumulator::new(model),
            block_to_slot: HashMap::new(),
            next_slot: 0,
            pending_input_tokens: 0,
        }
    }

    /// Wire event name for pass-through framing
    fn event_name(event: &AnthropicStreamEvent) -> &'static str {
        match event {
            AnthropicStreamEvent::MessageStart { .. } => "message_start",
            AnthropicStreamEvent::ContentBlockStart { .. } => "content_block_start",
            AnthropicStreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            AnthropicStreamEvent::ContentBlockStop { .. } => "content_block_stop",
            AnthropicStreamEvent::MessageDelta { .. } => "message_delta",
            AnthropicStreamEvent::MessageStop => "message_stop",
            AnthropicStreamEvent::Ping => "ping",
            AnthropicStreamEvent::Error { .. } => "error",
        }
    }
}

impl StreamAdapter for AnthropicStreamAdapter {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn process_chunk(&mut self, data: &str) -> ChunkProcessingResult {
        self.acc.note_chunk();

        let Ok(event) = serde_json::from_str::<AnthropicStreamEvent>(data) else {
            tracing::debug!(provider = "anthropic", "forwarding unparseable stream event");
            return ChunkProcessingResult {
                sse_data: Some(frame_event("message_delta", data)),
                ..Default::default()
            };
        };

        let sse_data = Some(frame_event(Self::event_name(&event), data));
        let mut is_tool_call_chunk = false;
        let mut is_final = false;

        match &event {
            AnthropicStreamEvent::MessageStart { message } => {
                if !message.id.is_empty() {
                    self.acc.response_id = Some(message.id.clone());
                }
                if !message.model.is_empty() {
                    self.acc.model = message.model.clone();
                }
                self.pending_input_tokens = message.usage.input_tokens;
            }

            AnthropicStreamEvent::ContentBlockStart { index, content_block } => {
                if let AnthropicContentBlock::ToolUse { id, name, .. } = content_block {
                    let slot = self.next_slot;
                    self.next_slot += 1;
                    self.block_to_slot.insert(*index, slot);
                    self.acc.begin_tool_call(slot, Some(id), Some(name));
                    self.acc.raw_tool_events.push(data.to_owned());
                    is_tool_call_chunk = true;
                }
            }

            AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
                AnthropicStreamDelta::TextDelta { text } => self.acc.append_text(text),
                AnthropicStreamDelta::InputJsonDelta { partial_json } => {
                    let slot = self.block_to_slot.get(index).copied().unwrap_or_else(|| {
                        // Delta for a block we never saw open; give it a slot anyway
                        let slot = self.next_slot;
                        self.next_slot += 1;
                        self.block_to_slot.insert(*index, slot);
                        slot
                    });
                    self.acc.append_tool_arguments(slot, partial_json);
                    self.acc.raw_tool_events.push(data.to_owned());
                    is_tool_call_chunk = true;
                }
            },

            AnthropicStreamEvent::ContentBlockStop { index } => {
                self.block_to_slot.remove(index);
            }

            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                if let Some(reason) = &delta.stop_reason {
                    self.acc.mark_awaiting_usage(Some(reason));
                }
                // Anthropic bundles output usage with the stop reason here
                if let Some(usage) = usage {
                    is_final = self.acc.finish_with_usage(TokenUsage {
                        input_tokens: self.pending_input_tokens,
                        output_tokens: usage.output_tokens,
                    });
                }
            }

            AnthropicStreamEvent::MessageStop | AnthropicStreamEvent::Ping | AnthropicStreamEvent::Error { .. } => {}
        }

        ChunkProcessingResult {
            sse_data,
            is_tool_call_chunk,
            is_final,
        }
    }

    fn accumulator(&self) -> &StreamAccumulator {
        &self.acc
    }

    fn to_provider_response(&self) -> Value {
        let mut content = Vec::new();
        if !self.acc.text.is_empty() {
            content.push(AnthropicContentBlock::Text {
                text: self.acc.text.clone(),
            });
        }
        for tc in self.acc.tool_calls() {
            let input = serde_json::from_str(&tc.arguments).unwrap_or_else(|_| serde_json::json!({}));
            content.push(AnthropicContentBlock::ToolUse {
                id: tc.id.clone(),
                name: tc.name.clone(),
                input,
            });
        }

        let usage = self.acc.usage.unwrap_or_default();
        let response = AnthropicResponse {
            id: self
                .acc
                .response_id
                .clone()
                .unwrap_or_else(|| format!("msg_{}", uuid::Uuid::new_v4().simple())),
            response_type: "message".to_owned(),
            role: "assistant".to_owned(),
            model: self.acc.model.clone(),
            content,
            stop_reason: self.acc.stop_reason.clone(),
            stop_sequence: None,
            usage: AnthropicUsage {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
            },
        };

        serde_json::to_value(response).unwrap_or_else(|_| Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamPhase;

    #[test]
    fn tool_use_after_text_gets_sequential_slot() {
        let mut adapter = AnthropicStreamAdapter::new("claude-test");

        adapter.process_chunk(
            &serde_json::json!({"type": "content_block_start", "index": 0,
                "content_block": {"type": "text", "text": ""}})
            .to_string(),
        );
        adapter.process_chunk(
            &serde_json::json!({"type": "content_block_delta", "index": 0,
                "delta": {"type": "text_delta", "text": "calling a tool"}})
            .to_string(),
        );
        let start = adapter.process_chunk(
            &serde_json::json!({"type": "content_block_start", "index": 1,
                "content_block": {"type": "tool_use", "id": "toolu_1", "name": "search", "input": {}}})
            .to_string(),
        );
        assert!(start.is_tool_call_chunk);
        adapter.process_chunk(
            &serde_json::json!({"type": "content_block_delta", "index": 1,
                "delta": {"type": "input_json_delta", "partial_json": "{\"q\":\"a\"}"}})
            .to_string(),
        );

        let calls: Vec<_> = adapter.accumulator().tool_calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "toolu_1");
        assert_eq!(calls[0].arguments, "{\"q\":\"a\"}");
        assert_eq!(adapter.accumulator().text, "calling a tool");
    }

    #[test]
    fn message_delta_bundles_stop_and_usage() {
        let mut adapter = AnthropicStreamAdapter::new("claude-test");
        adapter.process_chunk(
            &serde_json::json!({"type": "message_start", "message": {
                "id": "msg_1", "type": "message", "role": "assistant", "model": "claude-test",
                "content": [], "usage": {"input_tokens": 12, "output_tokens": 0}}})
            .to_string(),
        );
        let result = adapter.process_chunk(
            &serde_json::json!({"type": "message_delta",
                "delta": {"stop_reason": "end_turn"},
                "usage": {"input_tokens": 0, "output_tokens": 9}})
            .to_string(),
        );
        assert!(result.is_final);
        assert_eq!(
            adapter.accumulator().usage,
            Some(TokenUsage {
                input_tokens: 12,
                output_tokens: 9
            })
        );

        // message_stop after finality is forwarded but not final again
        let stop = adapter.process_chunk(&serde_json::json!({"type": "message_stop"}).to_string());
        assert!(!stop.is_final);
        assert_eq!(adapter.accumulator().phase(), StreamPhase::Final);
    }

    #[test]
    fn passthrough_keeps_native_event_framing() {
        let mut adapter = AnthropicStreamAdapter::new("claude-test");
        let data = serde_json::json!({"type": "ping"}).to_string();
        let result = adapter.process_chunk(&data);
        assert_eq!(result.sse_data.unwrap(), format!("event: ping\ndata: {data}\n\n"));
    }
}
