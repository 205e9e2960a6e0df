//! Request adapters: one inbound wire dialect each
//!
//! An adapter wraps one parsed inbound request, exposes read accessors in
//! the common vocabulary, and collects mutations (model override,
//! tool-result rewrites, image policy) that [`RequestAdapter::to_provider_request`]
//! applies when rendering the outbound body. Rendering is side-effect-free
//! and applies mutations in a fixed order: tool-result rewrites first,
//! then the image/size policy.
//!
//! Malformed vendor content inside a parsed request never surfaces as an
//! error from this module: unparseable tool arguments degrade to `{}`,
//! unmatched tool results get the `"unknown"` name, and string content
//! that fails to parse as JSON is carried as a raw string.

mod anthropic;
mod bedrock;
mod cohere;
mod gemini;
mod openai;

pub use anthropic::AnthropicRequestAdapter;
pub use bedrock::BedrockRequestAdapter;
pub use cohere::CohereRequestAdapter;
pub use gemini::GeminiRequestAdapter;
pub use openai::OpenAiRequestAdapter;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use babel_core::{
    CommonMessage, CommonToolDefinition, CommonToolResult, ModelCapabilities, PriceLookup, Provider, Tokenizer,
    ToolCompressionStats,
};

use crate::transform;

/// Failure to wrap an inbound request
///
/// The one error this surface produces: the body did not parse as the
/// dialect's request shape. Everything after construction is infallible.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Body did not deserialize as the provider's request shape
    #[error("malformed {provider} request body")]
    Parse {
        /// Dialect being parsed
        provider: Provider,
        /// Underlying deserialization error
        #[source]
        source: serde_json::Error,
    },
}

/// Common surface over one inbound chat request
#[async_trait]
pub trait RequestAdapter: Send + Sync {
    /// Provider this request targets
    fn provider(&self) -> Provider;

    /// Effective model, honoring any override
    fn model(&self) -> &str;

    /// Whether the caller asked for a streamed response
    fn is_streaming(&self) -> bool;

    /// Messages in common form
    fn messages(&self) -> Vec<CommonMessage>;

    /// Tool results carried by the request
    fn tool_results(&self) -> Vec<CommonToolResult>;

    /// Tool definitions declared on the request
    fn tools(&self) -> Vec<CommonToolDefinition>;

    /// Whether the request declares any tools
    fn has_tools(&self) -> bool {
        !self.tools().is_empty()
    }

    /// Override the model for the outbound request
    fn set_model(&mut self, model: &str);

    /// Queue a content rewrite for the tool result answering `id`
    fn update_tool_result(&mut self, id: &str, content: Value);

    /// Queue a batch of tool-result rewrites
    fn apply_tool_result_updates(&mut self, updates: HashMap<String, Value>) {
        for (id, content) in updates {
            self.update_tool_result(&id, content);
        }
    }

    /// Compress tool results where the re-encoding is strictly smaller
    ///
    /// `model` keys the price lookup for the savings estimate; results
    /// where compression would not pay off are silently left alone.
    async fn apply_toon_compression(
        &mut self,
        model: &str,
        tokenizer: &dyn Tokenizer,
        prices: &dyn PriceLookup,
    ) -> ToolCompressionStats {
        let results = self.tool_results();
        let (updates, stats) = transform::compress_tool_results(&results, model, tokenizer, prices).await;
        self.apply_tool_result_updates(updates);
        stats
    }

    /// Record the image-capability decision for rendering
    fn convert_tool_result_content(&mut self, capabilities: &dyn ModelCapabilities);

    /// Render the outbound provider-shaped request body
    fn to_provider_request(&self) -> Value;
}

impl std::fmt::Debug for dyn RequestAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAdapter").field("provider", &self.provider()).finish_non_exhaustive()
    }
}

/// Build the request adapter for `provider` over `payload`
pub fn for_provider(provider: Provider, payload: &Value) -> Result<Box<dyn RequestAdapter>, AdapterError> {
    Ok(match provider {
        Provider::OpenAi | Provider::Zhipu | Provider::Vllm | Provider::Ollama | Provider::Mistral => {
            Box::new(OpenAiRequestAdapter::new(provider, payload)?)
        }
        Provider::Anthropic => Box::new(AnthropicRequestAdapter::new(payload)?),
        Provider::Gemini => Box::new(GeminiRequestAdapter::new(payload)?),
        Provider::Bedrock => Box::new(BedrockRequestAdapter::new(payload)?),
        Provider::Cohere => Box::new(CohereRequestAdapter::new(payload)?),
    })
}

/// Parse a JSON-encoded argument string, degrading to an empty object
pub(crate) fn parse_arguments(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

/// Tool-result content: parsed JSON when possible, else the raw string
pub(crate) fn parse_content(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

/// Text form of a rewritten content value
pub(crate) fn content_to_string(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Map a wire role string to the common role; unrecognized roles read as
/// user content rather than failing
pub(crate) fn parse_role(role: &str) -> babel_core::CommonRole {
    use babel_core::CommonRole;
    match role {
        "system" | "developer" => CommonRole::System,
        "assistant" | "model" => CommonRole::Assistant,
        "tool" => CommonRole::Tool,
        _ => CommonRole::User,
    }
}
