//! Response adapters: common accessors over one complete upstream response
//!
//! Accessors degrade instead of failing: missing text reads as an empty
//! string, unparseable tool-call arguments read as `{}`, and absent usage
//! reads as zero-filled counts.

mod anthropic;
mod bedrock;
mod cohere;
mod gemini;
mod openai;

pub use anthropic::AnthropicResponseAdapter;
pub use bedrock::BedrockResponseAdapter;
pub use cohere::CohereResponseAdapter;
pub use gemini::GeminiResponseAdapter;
pub use openai::OpenAiResponseAdapter;

use serde_json::Value;

use babel_core::{CommonToolCall, Provider, TokenUsage};

use crate::request::AdapterError;

/// Common surface over one complete (non-streaming) response
pub trait ResponseAdapter: Send + Sync {
    /// Provider that produced the response
    fn provider(&self) -> Provider;

    /// Response identifier, empty when the vendor omits one
    fn id(&self) -> String;

    /// Model that produced the response
    fn model(&self) -> String;

    /// Assistant text, empty when the response carries none
    fn text(&self) -> String;

    /// Tool calls requested by the model
    fn tool_calls(&self) -> Vec<CommonToolCall>;

    /// Whether the model requested any tool calls
    fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    /// Token usage, zero-filled when the vendor omits it
    fn usage(&self) -> TokenUsage;

    /// Provider-shaped response whose content is `user_facing_text`
    ///
    /// Used when a policy layer withholds the model's actual output. The
    /// substitute keeps the original id/model/usage, drops tool calls, and
    /// carries the provider's natural end-of-turn stop reason.
    /// `internal_reason` is logged, never sent to the caller.
    fn to_refusal_response(&self, internal_reason: &str, user_facing_text: &str) -> Value;
}

/// Build the response adapter for `provider` over `body`
pub fn for_provider(provider: Provider, body: &Value) -> Result<Box<dyn ResponseAdapter>, AdapterError> {
    Ok(match provider {
        Provider::OpenAi | Provider::Zhipu | Provider::Vllm | Provider::Ollama | Provider::Mistral => {
            Box::new(OpenAiResponseAdapter::new(provider, body)?)
        }
        Provider::Anthropic => Box::new(AnthropicResponseAdapter::new(body)?),
        Provider::Gemini => Box::new(GeminiResponseAdapter::new(body)?),
        Provider::Bedrock => Box::new(BedrockResponseAdapter::new(body)?),
        Provider::Cohere => Box::new(CohereResponseAdapter::new(body)?),
    })
}

/// Log the withheld reason for a refusal substitution
pub(crate) fn log_refusal(provider: Provider, internal_reason: &str) {
    tracing::warn!(%provider, reason = internal_reason, "substituting refusal response");
}
