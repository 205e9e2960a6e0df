//! Streaming accumulator state machines
//!
//! One [`StreamAdapter`] instance exists per streamed call and is owned
//! exclusively by that call's task, so no synchronization is needed.
//! [`StreamAdapter::process_chunk`] is the sole transition function; the
//! generic phase progression is `Streaming` → `AwaitingUsage` (terminal
//! signal seen, token counts still unknown) → `Final` (usage known;
//! `is_final` reported exactly once, on the chunk that supplied usage).
//!
//! Content-bearing chunks are forwarded to the caller in the exact wire
//! shape received — callers' own client libraries expect native framing.
//! New wire chunks are synthesized only when simulating a stream from a
//! buffered response ([`simulate`]) and for final sentinel frames.

use std::time::Instant;

use serde_json::Value;
use uuid::Uuid;

use babel_core::{Provider, TokenUsage};

pub mod anthropic;
pub mod bedrock;
pub mod cohere;
pub mod gemini;
pub mod openai;
pub mod simulate;
pub mod sse;

pub use sse::{SseFrame, SseFrameDecoder};

/// Where a stream currently sits in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Text and tool-call deltas are arriving
    Streaming,
    /// A finish reason was seen but token counts are not yet known
    AwaitingUsage,
    /// Usage is known; no further content may be appended
    Final,
}

/// Per-chunk processing output
///
/// Ephemeral; the gateway forwards `sse_data` (when present) and inspects
/// the flags, then drops the value.
#[derive(Debug, Clone, Default)]
pub struct ChunkProcessingResult {
    /// Wire-format block to forward to the caller, already SSE-framed
    pub sse_data: Option<String>,
    /// Whether this chunk carried tool-call data
    pub is_tool_call_chunk: bool,
    /// Whether this chunk completed the stream (reported exactly once)
    pub is_final: bool,
}

/// One in-progress tool call inside the accumulator
#[derive(Debug, Clone)]
pub struct StreamingToolCall {
    /// Tool call id; synthesized when the vendor never supplies one
    pub id: String,
    /// Tool name, backfilled from whichever delta first supplies it
    pub name: String,
    /// Argument string, appended fragment by fragment in arrival order
    pub arguments: String,
    synthesized_id: bool,
}

/// Accumulated state for one streamed request
///
/// Owned by exactly one [`StreamAdapter`] for the lifetime of one call. On
/// client disconnect the accumulator keeps whatever it gathered; a
/// best-effort provider response can still be rebuilt for logging, with
/// absent usage meaning "unknown", not an error.
#[derive(Debug)]
pub struct StreamAccumulator {
    /// Upstream response id, once seen
    pub response_id: Option<String>,
    /// Model name reported by the upstream (or the requested model)
    pub model: String,
    /// Cumulative text
    pub text: String,
    /// Raw pass-through tool-call wire events, for replay
    pub raw_tool_events: Vec<String>,
    /// Token usage, once known
    pub usage: Option<TokenUsage>,
    /// Stop reason, once known
    pub stop_reason: Option<String>,
    /// When the stream adapter was created
    pub started_at: Instant,
    /// When the first chunk arrived
    pub first_chunk_at: Option<Instant>,
    /// Tool-call slots keyed by provider positional index, in first-seen order
    slots: Vec<(u32, StreamingToolCall)>,
    phase: StreamPhase,
    final_reported: bool,
}

impl StreamAccumulator {
    /// Fresh accumulator for one streamed call against `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            response_id: None,
            model: model.into(),
            text: String::new(),
            raw_tool_events: Vec::new(),
            usage: None,
            stop_reason: None,
            started_at: Instant::now(),
            first_chunk_at: None,
            slots: Vec::new(),
            phase: StreamPhase::Streaming,
            final_reported: false,
        }
    }

    /// Current lifecycle phase
    pub const fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Record that a chunk arrived (captures time-to-first-chunk)
    pub fn note_chunk(&mut self) {
        if self.first_chunk_at.is_none() {
            self.first_chunk_at = Some(Instant::now());
        }
    }

    /// Append a text fragment; ignored after finality
    pub fn append_text(&mut self, fragment: &str) {
        if self.phase == StreamPhase::Final {
            tracing::debug!(model = %self.model, "dropping text fragment after final chunk");
            return;
        }
        self.text.push_str(fragment);
    }

    /// Ensure a tool-call slot exists for the provider-supplied `index`
    ///
    /// The slot is assigned on first sight and kept stable afterwards. A
    /// missing id is synthesized immediately so an empty string never
    /// reaches downstream id matching; a vendor id arriving later replaces
    /// the synthesized one.
    pub fn begin_tool_call(&mut self, index: u32, id: Option<&str>, name: Option<&str>) {
        if let Some((_, slot)) = self.slots.iter_mut().find(|(i, _)| *i == index) {
            if let Some(id) = id {
                if !id.is_empty() && slot.synthesized_id {
                    slot.id = id.to_owned();
                    slot.synthesized_id = false;
                }
            }
            if let Some(name) = name {
                if slot.name.is_empty() {
                    slot.name = name.to_owned();
                }
            }
            return;
        }

        let (slot_id, synthesized) = match id {
            Some(id) if !id.is_empty() => (id.to_owned(), false),
            _ => (synthesize_tool_call_id(), true),
        };
        self.slots.push((
            index,
            StreamingToolCall {
                id: slot_id,
                name: name.unwrap_or_default().to_owned(),
                arguments: String::new(),
                synthesized_id: synthesized,
            },
        ));
    }

    /// Append an argument-string fragment to the slot at `index`
    ///
    /// Fragments are concatenated in arrival order, never overwritten. A
    /// fragment for an unseen index opens the slot first.
    pub fn append_tool_arguments(&mut self, index: u32, fragment: &str) {
        if self.slots.iter().all(|(i, _)| *i != index) {
            self.begin_tool_call(index, None, None);
        }
        if let Some((_, slot)) = self.slots.iter_mut().find(|(i, _)| *i == index) {
            slot.arguments.push_str(fragment);
        }
    }

    /// Accumulated tool calls in first-seen order
    pub fn tool_calls(&self) -> impl Iterator<Item = &StreamingToolCall> {
        self.slots.iter().map(|(_, slot)| slot)
    }

    /// Whether any tool call has been seen
    pub fn has_tool_calls(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Record the terminal signal when usage has not arrived yet
    pub fn mark_awaiting_usage(&mut self, stop_reason: Option<&str>) {
        if let Some(reason) = stop_reason {
            self.stop_reason = Some(reason.to_owned());
        }
        if self.phase == StreamPhase::Streaming {
            self.phase = StreamPhase::AwaitingUsage;
        }
    }

    /// Record usage and move to `Final`
    ///
    /// Returns `true` the first time finality is reached — the caller
    /// reports `is_final` on exactly that chunk.
    pub fn finish_with_usage(&mut self, usage: TokenUsage) -> bool {
        self.usage = Some(usage);
        self.phase = StreamPhase::Final;
        let first = !self.final_reported;
        self.final_reported = true;
        first
    }
}

/// Synthesize a unique tool-call id for vendors that omit them
fn synthesize_tool_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Stateful incremental parser over one provider's event stream
///
/// Fed one decoded SSE payload at a time, in arrival order; use
/// [`SseFrameDecoder`] to frame raw transport bytes first.
pub trait StreamAdapter: Send {
    /// Provider this adapter fronts
    fn provider(&self) -> Provider;

    /// Process one wire event; the sole state-transition path
    fn process_chunk(&mut self, data: &str) -> ChunkProcessingResult;

    /// Accumulated state so far
    fn accumulator(&self) -> &StreamAccumulator;

    /// Rebuild a complete provider-shaped response from accumulated state
    ///
    /// Used for billing/interaction logging after the stream ends, whether
    /// or not the client stayed connected to the end.
    fn to_provider_response(&self) -> Value;
}

/// Build a fresh stream adapter for one call against `provider`
pub fn for_provider(provider: Provider, model: &str) -> Box<dyn StreamAdapter> {
    match provider {
        Provider::OpenAi | Provider::Zhipu | Provider::Vllm | Provider::Ollama | Provider::Mistral => {
            Box::new(openai::OpenAiStreamAdapter::new(provider, model))
        }
        Provider::Anthropic => Box::new(anthropic::AnthropicStreamAdapter::new(model)),
        Provider::Gemini => Box::new(gemini::GeminiStreamAdapter::new(model)),
        Provider::Bedrock => Box::new(bedrock::BedrockStreamAdapter::new(model)),
        Provider::Cohere => Box::new(cohere::CohereStreamAdapter::new(model)),
    }
}

/// Re-frame a wire payload as an SSE data block
pub(crate) fn frame_data(payload: &str) -> String {
    format!("data: {payload}\n\n")
}

/// Frame a typed SSE event block (`event:` + `data:`)
pub(crate) fn frame_event(event: &str, payload: &str) -> String {
    format!("event: {event}\ndata: {payload}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_accumulates_in_order() {
        let mut acc = StreamAccumulator::new("test-model");
        acc.append_text("Hello, ");
        acc.append_text("world!");
        assert_eq!(acc.text, "Hello, world!");
    }

    #[test]
    fn text_after_finality_is_dropped() {
        let mut acc = StreamAccumulator::new("test-model");
        acc.append_text("kept");
        assert!(acc.finish_with_usage(TokenUsage {
            input_tokens: 1,
            output_tokens: 2,
        }));
        acc.append_text(" dropped");
        assert_eq!(acc.text, "kept");
    }

    #[test]
    fn finality_reported_once() {
        let mut acc = StreamAccumulator::new("test-model");
        let usage = TokenUsage::default();
        assert!(acc.finish_with_usage(usage));
        assert!(!acc.finish_with_usage(usage));
        assert_eq!(acc.phase(), StreamPhase::Final);
    }

    #[test]
    fn tool_fragments_concatenate_per_index() {
        let mut acc = StreamAccumulator::new("test-model");
        acc.begin_tool_call(0, Some("call_1"), Some("search"));
        acc.append_tool_arguments(0, "{\"query\":");
        acc.append_tool_arguments(0, "\"rust\"}");
        let calls: Vec<_> = acc.tool_calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].arguments, "{\"query\":\"rust\"}");
    }

    #[test]
    fn missing_id_is_synthesized_unique() {
        let mut acc = StreamAccumulator::new("test-model");
        acc.begin_tool_call(0, None, Some("lookup"));
        acc.begin_tool_call(1, None, Some("lookup"));
        let calls: Vec<_> = acc.tool_calls().collect();
        assert!(!calls[0].id.is_empty());
        assert!(!calls[1].id.is_empty());
        assert_ne!(calls[0].id, calls[1].id);
    }

    #[test]
    fn late_vendor_id_replaces_synthesized() {
        let mut acc = StreamAccumulator::new("test-model");
        acc.append_tool_arguments(2, "{}");
        acc.begin_tool_call(2, Some("call_real"), Some("fetch"));
        let calls: Vec<_> = acc.tool_calls().collect();
        assert_eq!(calls[0].id, "call_real");
        assert_eq!(calls[0].name, "fetch");
        assert_eq!(calls[0].arguments, "{}");
    }

    #[test]
    fn awaiting_usage_then_final() {
        let mut acc = StreamAccumulator::new("test-model");
        acc.mark_awaiting_usage(Some("stop"));
        assert_eq!(acc.phase(), StreamPhase::AwaitingUsage);
        acc.finish_with_usage(TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        });
        assert_eq!(acc.phase(), StreamPhase::Final);
        assert_eq!(acc.stop_reason.as_deref(), Some("stop"));
    }
}
