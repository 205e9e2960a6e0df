//! Response adapter for the Cohere v2 chat API

use serde_json::Value;

use babel_core::{CommonToolCall, Provider, TokenUsage, UNKNOWN_TOOL_NAME};

use crate::protocol::cohere::{CohereContentBlock, CohereResponse};
use crate::request::{AdapterError, parse_arguments};

use super::{ResponseAdapter, log_refusal};

/// Adapter over one v2 chat response
pub struct CohereResponseAdapter {
    response: CohereResponse,
}

impl CohereResponseAdapter {
    /// Wrap a parsed response body
    pub fn new(body: &Value) -> Result<Self, AdapterError> {
        let response = serde_json::from_value(body.clone()).map_err(|source| AdapterError::Parse {
            provider: Provider::Cohere,
            source,
        })?;
        Ok(Self { response })
    }
}

impl ResponseAdapter for CohereResponseAdapter {
    fn provider(&self) -> Provider {
        Provider::Cohere
    }

    fn id(&self) -> String {
        self.response.id.clone()
    }

    fn model(&self) -> String {
        // The v2 body does not echo the model name back
        String::new()
    }

    fn text(&self) -> String {
        self.response
            .message
            .content
            .iter()
            .flatten()
            .map(|b| b.text.as_str())
            .collect()
    }

    fn tool_calls(&self) -> Vec<CommonToolCall> {
        self.response
            .message
            .tool_calls
            .iter()
            .flatten()
            .map(|call| CommonToolCall {
                id: call.id.clone().unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                name: call.function.name.clone().unwrap_or_else(|| UNKNOWN_TOOL_NAME.to_owned()),
                arguments: parse_arguments(call.function.arguments.as_deref().unwrap_or("{}")),
            })
            .collect()
    }

    fn usage(&self) -> TokenUsage {
        self.response
            .usage
            .and_then(|u| u.billed_units.or(u.tokens))
            .map_or_else(TokenUsage::default, |counts| TokenUsage {
                input_tokens: counts.input_tokens,
                output_tokens: counts.output_tokens,
            })
    }

    fn to_refusal_response(&self, internal_reason: &str, user_facing_text: &str) -> Value {
        log_refusal(Provider::Cohere, internal_reason);
        let mut response = self.response.clone();
        response.message.content = Some(vec![CohereContentBlock {
            block_type: "text".to_owned(),
            text: user_facing_text.to_owned(),
        }]);
        response.message.tool_calls = None;
        response.message.tool_plan = None;
        response.finish_reason = Some("COMPLETE".to_owned());
        serde_json::to_value(&response).unwrap_or(Value::Null)
    }
}
