//! Stream adapter for the Cohere v2 chat API
//!
//! Typed kebab-case events; the finish reason and usage arrive together
//! in `message-end`.

use serde_json::Value;

use babel_core::{Provider, TokenUsage};

use crate::protocol::cohere::{
    CohereContentBlock, CohereFunctionCall, CohereResponse, CohereResponseMessage, CohereStreamEvent, CohereToolCall,
    CohereTokenCounts, CohereUsage,
};

use super::{ChunkProcessingResult, StreamAccumulator, StreamAdapter, frame_event};

/// Incremental parser over Cohere v2 stream events
pub struct CohereStreamAdapter {
    acc: StreamAccumulator,
}

impl CohereStreamAdapter {
    /// Fresh adapter for one streamed call
    pub fn new(model: &str) -> Self {
        Self {
            acc: StreamAccumulator::new(model),
        }
    }

    /// Wire event name for pass-through framing
    fn event_name(event: &CohereStreamEvent) -> &'static str {
        match event {
            CohereStreamEvent::MessageStart { .. } => "message-start",
            CohereStreamEvent::ContentStart { .. } => "content-start",
            CohereStreamEvent::ContentDelta { .. } => "content-delta",
            CohereStreamEvent::ContentEnd { .. } => "content-end",
            CohereStreamEvent::ToolPlanDelta { .. } => "tool-plan-delta",
            CohereStreamEvent::ToolCallStart { .. } => "tool-call-start",
            CohereStreamEvent::ToolCallDelta { .. } => "tool-call-delta",
            CohereStreamEvent::ToolCallEnd { .. } => "tool-call-end",
            CohereStreamEvent::MessageEnd { .. } => "message-end",
        }
    }
}

/// Tool-call fragment buried in a stream delta, if any
fn delta_tool_call(delta: Option<&crate::protocol::cohere::CohereStreamDelta>) -> Option<&CohereToolCall> {
    delta?.message.as_ref()?.tool_calls.as_ref()
}

impl StreamAdapter for CohereStreamAdapter {
    fn provider(&self) -> Provider {
        Provider::Cohere
    }

    fn process_chunk(&mut self, data: &str) -> ChunkProcessingResult {
        self.acc.note_chunk();

        let Ok(event) = serde_json::from_str::<CohereStreamEvent>(data) else {
            tracing::debug!(provider = "cohere", "forwarding unparseable stream event");
            return ChunkProcessingResult {
                sse_data: Some(frame_event("content-delta", data)),
                ..Default::default()
            };
        };

        let sse_data = Some(frame_event(Self::event_name(&event), data));
        let mut is_tool_call_chunk = false;
        let mut is_final = false;

        match &event {
            CohereStreamEvent::MessageStart { id } => {
                if let Some(id) = id {
                    self.acc.response_id = Some(id.clone());
                }
            }

            CohereStreamEvent::ContentDelta { delta, .. } => {
                let text = delta
                    .as_ref()
                    .and_then(|d| d.message.as_ref())
                    .and_then(|m| m.content.as_ref())
                    .map(|c| c.text.as_str());
                if let Some(text) = text {
                    self.acc.append_text(text);
                }
            }

            CohereStreamEvent::ToolCallStart { index, delta } => {
                if let Some(tc) = delta_tool_call(delta.as_ref()) {
                    self.acc
                        .begin_tool_call(*index, tc.id.as_deref(), tc.function.name.as_deref());
                    if let Some(args) = tc.function.arguments.as_deref() {
                        self.acc.append_tool_arguments(*index, args);
                    }
                    self.acc.raw_tool_events.push(data.to_owned());
                    is_tool_call_chunk = true;
                }
            }

            CohereStreamEvent::ToolCallDelta { index, delta } => {
                if let Some(tc) = delta_tool_call(delta.as_ref()) {
                    if let Some(args) = tc.function.arguments.as_deref() {
                        self.acc.append_tool_arguments(*index, args);
                    }
                    self.acc.raw_tool_events.push(data.to_owned());
                    is_tool_call_chunk = true;
                }
            }

            CohereStreamEvent::MessageEnd { delta } => {
                if let Some(end) = delta {
                    self.acc.mark_awaiting_usage(end.finish_reason.as_deref());
                    let counts = end
                        .usage
                        .and_then(|u| u.billed_units.or(u.tokens));
                    if let Some(counts) = counts {
                        is_final = self.acc.finish_with_usage(TokenUsage {
                            input_tokens: counts.input_tokens,
                            output_tokens: counts.output_tokens,
                        });
                    }
                }
            }

            CohereStreamEvent::ContentStart { .. }
            | CohereStreamEvent::ContentEnd { .. }
            | CohereStreamEvent::ToolPlanDelta { .. }
            | CohereStreamEvent::ToolCallEnd { .. } => {}
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
        let tool_calls: Vec<CohereToolCall> = self
            .acc
            .tool_calls()
            .map(|tc| CohereToolCall {
                id: Some(tc.id.clone()),
                tool_type: Some("function".to_owned()),
                function: CohereFunctionCall {
                    name: Some(tc.name.clone()),
                    arguments: Some(tc.arguments.clone()),
                },
            })
            .collect();

        let response = CohereResponse {
            id: self
                .acc
                .response_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            message: CohereResponseMessage {
                role: "assistant".to_owned(),
                content: if self.acc.text.is_empty() {
                    None
                } else {
                    Some(vec![CohereContentBlock {
                        block_type: "text".to_owned(),
                        text: self.acc.text.clone(),
                    }])
                },
                tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
                tool_plan: None,
            },
            finish_reason: self.acc.stop_reason.clone(),
            usage: self.acc.usage.map(|u| CohereUsage {
                billed_units: Some(CohereTokenCounts {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                }),
                tokens: None,
            }),
        };

        serde_json::to_value(response).unwrap_or_else(|_| Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_end_bundles_finish_and_usage() {
        let mut adapter = CohereStreamAdapter::new("command-test");
        adapter.process_chunk(
            &serde_json::json!({"type": "content-delta", "index": 0,
                "delta": {"message": {"content": {"text": "hei"}}}})
            .to_string(),
        );
        let end = adapter.process_chunk(
            &serde_json::json!({"type": "message-end", "delta": {
                "finish_reason": "COMPLETE",
                "usage": {"billed_units": {"input_tokens": 3, "output_tokens": 1}}}})
            .to_string(),
        );
        assert!(end.is_final);
        assert_eq!(adapter.accumulator().text, "hei");
        assert_eq!(adapter.accumulator().stop_reason.as_deref(), Some("COMPLETE"));
    }

    #[test]
    fn tool_call_start_and_delta_accumulate() {
        let mut adapter = CohereStreamAdapter::new("command-test");
        let start = adapter.process_chunk(
            &serde_json::json!({"type": "tool-call-start", "index": 0,
                "delta": {"message": {"tool_calls": {
                    "id": "tc_1", "type": "function",
                    "function": {"name": "lookup", "arguments": ""}}}}})
            .to_string(),
        );
        assert!(start.is_tool_call_chunk);
        adapter.process_chunk(
            &serde_json::json!({"type": "tool-call-delta", "index": 0,
                "delta": {"message": {"tool_calls": {"function": {"arguments": "{\"k\":1}"}}}}})
            .to_string(),
        );

        let calls: Vec<_> = adapter.accumulator().tool_calls().collect();
        assert_eq!(calls[0].id, "tc_1");
        assert_eq!(calls[0].name, "lookup");
        assert_eq!(calls[0].arguments, "{\"k\":1}");
    }
}
