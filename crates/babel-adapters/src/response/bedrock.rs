//! Response adapter for the Bedrock Converse API

use serde_json::Value;

use babel_core::{CommonToolCall, Provider, TokenUsage};

use crate::protocol::bedrock::{BedrockContentBlock, BedrockResponse};
use crate::request::AdapterError;

use super::{ResponseAdapter, log_refusal};

/// Adapter over one Converse response
pub struct BedrockResponseAdapter {
    response: BedrockResponse,
}

impl BedrockResponseAdapter {
    /// Wrap a parsed response body
    pub fn new(body: &Value) -> Result<Self, AdapterError> {
        let response = serde_json::from_value(body.clone()).map_err(|source| AdapterError::Parse {
            provider: Provider::Bedrock,
            source,
        })?;
        Ok(Self { response })
    }
}

impl ResponseAdapter for BedrockResponseAdapter {
    fn provider(&self) -> Provider {
        Provider::Bedrock
    }

    fn id(&self) -> String {
        // The Converse body carries no response id; it rides in an HTTP
        // header the transport owns
        String::new()
    }

    fn model(&self) -> String {
        String::new()
    }

    fn text(&self) -> String {
        self.response
            .output
            .message
            .content
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect()
    }

    fn tool_calls(&self) -> Vec<CommonToolCall> {
        self.response
            .output
            .message
            .content
            .iter()
            .filter_map(|b| b.tool_use.as_ref())
            .map(|tool| CommonToolCall {
                id: tool.tool_use_id.clone(),
                name: tool.name.clone(),
                arguments: tool.input.clone(),
            })
            .collect()
    }

    fn usage(&self) -> TokenUsage {
        self.response.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        })
    }

    fn to_refusal_response(&self, internal_reason: &str, user_facing_text: &str) -> Value {
        log_refusal(Provider::Bedrock, internal_reason);
        let mut response = self.response.clone();
        response.output.message.content = vec![BedrockContentBlock {
            text: Some(user_facing_text.to_owned()),
            ..Default::default()
        }];
        response.stop_reason = Some("end_turn".to_owned());
        serde_json::to_value(&response).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body() -> Value {
        json!({
            "output": {"message": {"role": "assistant", "content": [
                {"text": "running"},
                {"toolUse": {"toolUseId": "tooluse_1", "name": "query", "input": {"n": 1}}},
            ]}},
            "stopReason": "tool_use",
            "usage": {"inputTokens": 4, "outputTokens": 2, "totalTokens": 6},
        })
    }

    #[test]
    fn reads_content_blocks() {
        let adapter = BedrockResponseAdapter::new(&body()).unwrap();
        assert_eq!(adapter.text(), "running");
        assert_eq!(adapter.tool_calls()[0].id, "tooluse_1");
        assert_eq!(adapter.usage().total(), 6);
    }

    #[test]
    fn refusal_replaces_content_and_stop_reason() {
        let adapter = BedrockResponseAdapter::new(&body()).unwrap();
        let refusal = adapter.to_refusal_response("policy", "Declined.");
        assert_eq!(refusal["output"]["message"]["content"][0]["text"], "Declined.");
        assert_eq!(refusal["stopReason"], "end_turn");
    }
}
