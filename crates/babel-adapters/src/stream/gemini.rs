//! Stream adapter for the Gemini `streamGenerateContent` API
//!
//! Each SSE payload is a complete `GenerateContentResponse` fragment.
//! Function-call parts arrive whole (name plus complete arguments) and
//! carry no id, so one is synthesized per call. The finish reason and
//! usage metadata normally arrive bundled on the last fragment.

use serde_json::Value;

use babel_core::{Provider, TokenUsage};

use crate::protocol::gemini::{
    GeminiCandidate, GeminiContent, GeminiPart, GeminiResponse, GeminiUsageMetadata,
};

use super::{ChunkProcessingResult, StreamAccumulator, StreamAdapter, frame_data};

/// Incremental parser over Gemini response fragments
pub struct GeminiStreamAdapter {
    acc: StreamAccumulator,
    next_slot: u32,
    /// Latest usage metadata seen; Gemini repeats cumulative counts
    latest_usage: Option<TokenUsage>,
}

impl GeminiStreamAdapter {
    /// Fresh adapter for one streamed call
    pub fn new(model: &str) -> Self {
        Self {
            acc: StreamAccumulator::new(model),
            next_slot: 0,
            latest_usage: None,
        }
    }
}

impl StreamAdapter for GeminiStreamAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn process_chunk(&mut self, data: &str) -> ChunkProcessingResult {
        self.acc.note_chunk();

        let Ok(fragment) = serde_json::from_str::<GeminiResponse>(data) else {
            tracing::debug!(provider = "gemini", "forwarding unparseable stream fragment");
            return ChunkProcessingResult {
                sse_data: Some(frame_data(data)),
                ..Default::default()
            };
        };

        if let Some(id) = &fragment.response_id {
            self.acc.response_id.get_or_insert_with(|| id.clone());
        }
        if let Some(version) = &fragment.model_version {
            self.acc.model = version.clone();
        }

        let mut is_tool_call_chunk = false;
        let mut finish_seen = false;

        for candidate in &fragment.candidates {
            if let Some(content) = &candidate.content {
                for part in &content.parts {
                    match part {
                        GeminiPart::Text(text) => self.acc.append_text(text),
                        GeminiPart::FunctionCall(call) => {
                            // No vendor id; a synthesized one is assigned
                            let slot = self.next_slot;
                            self.next_slot += 1;
                            self.acc.begin_tool_call(slot, None, Some(&call.name));
                            let args = serde_json::to_string(&call.args).unwrap_or_else(|_| "{}".to_owned());
                            self.acc.append_tool_arguments(slot, &args);
                            self.acc.raw_tool_events.push(data.to_owned());
                            is_tool_call_chunk = true;
                        }
                        GeminiPart::InlineData(_) | GeminiPart::FunctionResponse(_) => {}
                    }
                }
            }
            if let Some(reason) = &candidate.finish_reason {
                self.acc.mark_awaiting_usage(Some(reason));
                finish_seen = true;
            }
        }

        if let Some(meta) = fragment.usage_metadata {
            self.latest_usage = Some(TokenUsage {
                input_tokens: meta.prompt_token_count,
                output_tokens: meta.candidates_token_count,
            });
        }

        // Finality requires both the finish reason and usage; they usually
        // share the last fragment but either may trail the other.
        let mut is_final = false;
        if finish_seen || self.acc.stop_reason.is_some() {
            if let Some(usage) = self.latest_usage {
                is_final = self.acc.finish_with_usage(usage);
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
        let mut parts = Vec::new();
        if !self.acc.text.is_empty() {
            parts.push(GeminiPart::Text(self.acc.text.clone()));
        }
        for tc in self.acc.tool_calls() {
            let args = serde_json::from_str(&tc.arguments).unwrap_or_else(|_| serde_json::json!({}));
            parts.push(GeminiPart::FunctionCall(crate::protocol::gemini::GeminiFunctionCall {
                name: tc.name.clone(),
                args,
            }));
        }

        let response = GeminiResponse {
            candidates: vec![GeminiCandidate {
                content: Some(GeminiContent {
                    role: Some("model".to_owned()),
                    parts,
                }),
                finish_reason: self.acc.stop_reason.clone(),
                index: 0,
            }],
            usage_metadata: self.acc.usage.map(|u| GeminiUsageMetadata {
                prompt_token_count: u.input_tokens,
                candidates_token_count: u.output_tokens,
                total_token_count: u.total(),
            }),
            model_version: Some(self.acc.model.clone()),
            response_id: self.acc.response_id.clone(),
        };

        serde_json::to_value(response).unwrap_or_else(|_| Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_call_without_id_gets_synthesized_id() {
        let mut adapter = GeminiStreamAdapter::new("gemini-test");
        let chunk = serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"functionCall": {"name": "get_weather", "args": {"city": "Oslo"}}}
            ]}, "index": 0}],
        });
        let result = adapter.process_chunk(&chunk.to_string());
        assert!(result.is_tool_call_chunk);

        let calls: Vec<_> = adapter.accumulator().tool_calls().collect();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].id.is_empty());
        assert!(calls[0].id.starts_with("call_"));
        assert_eq!(calls[0].name, "get_weather");
    }

    #[test]
    fn bundled_finish_and_usage_finalizes() {
        let mut adapter = GeminiStreamAdapter::new("gemini-test");
        adapter.process_chunk(
            &serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Hei"}]}, "index": 0}],
            })
            .to_string(),
        );
        let last = serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "!"}]},
                "finishReason": "STOP", "index": 0}],
            "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 2, "totalTokenCount": 7},
        });
        let result = adapter.process_chunk(&last.to_string());
        assert!(result.is_final);
        assert_eq!(adapter.accumulator().text, "Hei!");
        assert_eq!(adapter.accumulator().stop_reason.as_deref(), Some("STOP"));
    }
}
