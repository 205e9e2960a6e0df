//! Stream adapter for the Bedrock `ConverseStream` API
//!
//! Usage arrives on a trailing `metadata` event after `messageStop`, so
//! the stop reason parks the stream in `AwaitingUsage` and finality lands
//! on the metadata event.

use std::collections::HashMap;

use serde_json::Value;

use babel_core::{Provider, TokenUsage};

use crate::protocol::bedrock::{
    BedrockContentBlock, BedrockMessage, BedrockOutput, BedrockResponse, BedrockStreamEvent, BedrockToolUse,
    BedrockUsage,
};

use super::{ChunkProcessingResult, StreamAccumulator, StreamAdapter, frame_data};

/// Incremental parser over re-framed `ConverseStream` events
pub struct BedrockStreamAdapter {
    acc: StreamAccumulator,
    /// Content-block index → tool slot index
    block_to_slot: HashMap<u32, u32>,
    next_slot: u32,
}

impl BedrockStreamAdapter {
    /// Fresh adapter for one streamed call
    pub fn new(model: &str) -> Self {
        Self {
            acc: StreamAccumulator::new(model),
            block_to_slot: HashMap::new(),
            next_slot: 0,
        }
    }
}

impl StreamAdapter for BedrockStreamAdapter {
    fn provider(&self) -> Provider {
        Provider::Bedrock
    }

    fn process_chunk(&mut self, data: &str) -> ChunkProcessingResult {
        self.acc.note_chunk();

        let Ok(event) = serde_json::from_str::<BedrockStreamEvent>(data) else {
            tracing::debug!(provider = "bedrock", "forwarding unparseable stream event");
            return ChunkProcessingResult {
                sse_data: Some(frame_data(data)),
                ..Default::default()
            };
        };

        let mut is_tool_call_chunk = false;
        let mut is_final = false;

        if let Some(start) = &event.content_block_start {
            if let Some(tool) = start.start.as_ref().and_then(|s| s.tool_use.as_ref()) {
                let slot = self.next_slot;
                self.next_slot += 1;
                self.block_to_slot.insert(start.content_block_index, slot);
                self.acc
                    .begin_tool_call(slot, tool.tool_use_id.as_deref(), tool.name.as_deref());
                self.acc.raw_tool_events.push(data.to_owned());
                is_tool_call_chunk = true;
            }
        }

        if let Some(delta) = &event.content_block_delta {
            if let Some(text) = &delta.delta.text {
                self.acc.append_text(text);
            }
            if let Some(tool) = &delta.delta.tool_use {
                let slot = self
                    .block_to_slot
                    .get(&delta.content_block_index)
                    .copied()
                    .unwrap_or_else(|| {
                        let slot = self.next_slot;
                        self.next_slot += 1;
                        self.block_to_slot.insert(delta.content_block_index, slot);
                        slot
                    });
                self.acc.append_tool_arguments(slot, &tool.input);
                self.acc.raw_tool_events.push(data.to_owned());
                is_tool_call_chunk = true;
            }
        }

        if let Some(stop) = &event.content_block_stop {
            self.block_to_slot.remove(&stop.content_block_index);
        }

        if let Some(stop) = &event.message_stop {
            // Usage has not arrived yet; it trails in the metadata event
            self.acc.mark_awaiting_usage(stop.stop_reason.as_deref());
        }

        if let Some(metadata) = &event.metadata {
            if let Some(usage) = metadata.usage {
                is_final = self.acc.finish_with_usage(TokenUsage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                });
            }
        }

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
        let mut content = Vec::new();
        if !self.acc.text.is_empty() {
            content.push(BedrockContentBlock {
                text: Some(self.acc.text.clone()),
                ..Default::default()
            });
        }
        for tc in self.acc.tool_calls() {
            let input = serde_json::from_str(&tc.arguments).unwrap_or_else(|_| serde_json::json!({}));
            content.push(BedrockContentBlock {
                tool_use: Some(BedrockToolUse {
                    tool_use_id: tc.id.clone(),
                    name: tc.name.clone(),
                    input,
                }),
                ..Default::default()
            });
        }

        let response = BedrockResponse {
            output: BedrockOutput {
                message: BedrockMessage {
                    role: "assistant".to_owned(),
                    content,
                },
            },
            stop_reason: self.acc.stop_reason.clone(),
            usage: self.acc.usage.map(|u| BedrockUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
                total_tokens: u.total(),
            }),
        };

        serde_json::to_value(response).unwrap_or_else(|_| Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamPhase;

    #[test]
    fn usage_trails_message_stop() {
        let mut adapter = BedrockStreamAdapter::new("bedrock-test");

        adapter.process_chunk(
            &serde_json::json!({"contentBlockDelta": {"contentBlockIndex": 0, "delta": {"text": "hello"}}})
                .to_string(),
        );
        let stop = adapter
            .process_chunk(&serde_json::json!({"messageStop": {"stopReason": "end_turn"}}).to_string());
        assert!(!stop.is_final);
        assert_eq!(adapter.accumulator().phase(), StreamPhase::AwaitingUsage);

        let metadata = adapter.process_chunk(
            &serde_json::json!({"metadata": {"usage": {"inputTokens": 6, "outputTokens": 4, "totalTokens": 10}}})
                .to_string(),
        );
        assert!(metadata.is_final);
        assert_eq!(
            adapter.accumulator().usage,
            Some(TokenUsage {
                input_tokens: 6,
                output_tokens: 4
            })
        );
    }

    #[test]
    fn tool_input_fragments_accumulate() {
        let mut adapter = BedrockStreamAdapter::new("bedrock-test");
        adapter.process_chunk(
            &serde_json::json!({"contentBlockStart": {"contentBlockIndex": 1,
                "start": {"toolUse": {"toolUseId": "tooluse_1", "name": "query"}}}})
            .to_string(),
        );
        adapter.process_chunk(
            &serde_json::json!({"contentBlockDelta": {"contentBlockIndex": 1,
                "delta": {"toolUse": {"input": "{\"sql\":"}}}})
            .to_string(),
        );
        adapter.process_chunk(
            &serde_json::json!({"contentBlockDelta": {"contentBlockIndex": 1,
                "delta": {"toolUse": {"input": "\"select 1\"}"}}}})
            .to_string(),
        );

        let calls: Vec<_> = adapter.accumulator().tool_calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "tooluse_1");
        assert_eq!(calls[0].arguments, "{\"sql\":\"select 1\"}");
    }
}
