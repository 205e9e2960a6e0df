//! Response adapter for the Anthropic messages API

use serde_json::Value;

use babel_core::{CommonToolCall, Provider, TokenUsage};

use crate::protocol::anthropic::{AnthropicContentBlock, AnthropicResponse};
use crate::request::AdapterError;

use super::{ResponseAdapter, log_refusal};

/// Adapter over one messages API response
pub struct AnthropicResponseAdapter {
    response: AnthropicResponse,
}

impl AnthropicResponseAdapter {
    /// Wrap a parsed response body
    pub fn new(body: &Value) -> Result<Self, AdapterError> {
        let response = serde_json::from_value(body.clone()).map_err(|source| AdapterError::Parse {
            provider: Provider::Anthropic,
            source,
        })?;
        Ok(Self { response })
    }
}

impl ResponseAdapter for AnthropicResponseAdapter {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn id(&self) -> String {
        self.response.id.clone()
    }

    fn model(&self) -> String {
        self.response.model.clone()
    }

    fn text(&self) -> String {
        self.response
            .content
            .iter()
            .filter_map(|b| match b {
                AnthropicContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn tool_calls(&self) -> Vec<CommonToolCall> {
        self.response
            .content
            .iter()
            .filter_map(|b| match b {
                AnthropicContentBlock::ToolUse { id, name, input } => Some(CommonToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    fn usage(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.response.usage.input_tokens,
            output_tokens: self.response.usage.output_tokens,
        }
    }

    fn to_refusal_response(&self, internal_reason: &str, user_facing_text: &str) -> Value {
        log_refusal(Provider::Anthropic, internal_reason);
        let mut response = self.response.clone();
        response.content = vec![AnthropicContentBlock::Text {
            text: user_facing_text.to_owned(),
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
            "id": "msg_1", "type": "message", "role": "assistant", "model": "claude-test",
            "content": [
                {"type": "text", "text": "Looking that up."},
                {"type": "tool_use", "id": "toolu_1", "name": "lookup", "input": {"q": "x"}},
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 8, "output_tokens": 3},
        })
    }

    #[test]
    fn reads_text_and_tool_use_blocks() {
        let adapter = AnthropicResponseAdapter::new(&body()).unwrap();
        assert_eq!(adapter.text(), "Looking that up.");
        assert_eq!(adapter.tool_calls()[0].name, "lookup");
        assert_eq!(adapter.usage().output_tokens, 3);
    }

    #[test]
    fn refusal_replaces_content_and_stop_reason() {
        let adapter = AnthropicResponseAdapter::new(&body()).unwrap();
        let refusal = adapter.to_refusal_response("policy", "Declined.");
        assert_eq!(refusal["content"].as_array().unwrap().len(), 1);
        assert_eq!(refusal["content"][0]["text"], "Declined.");
        assert_eq!(refusal["stop_reason"], "end_turn");
    }
}
