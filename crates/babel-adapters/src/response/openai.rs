//! Response adapter for the `OpenAI` chat completion dialect

use serde_json::Value;

use babel_core::{CommonToolCall, Provider, TokenUsage};

use crate::protocol::openai::{OpenAiChoice, OpenAiResponse, OpenAiResponseMessage};
use crate::request::{AdapterError, parse_arguments};

use super::{ResponseAdapter, log_refusal};

/// Adapter over one chat completion response
pub struct OpenAiResponseAdapter {
    provider: Provider,
    response: OpenAiResponse,
}

impl OpenAiResponseAdapter {
    /// Wrap a parsed response body for `provider`
    pub fn new(provider: Provider, body: &Value) -> Result<Self, AdapterError> {
        let response =
            serde_json::from_value(body.clone()).map_err(|source| AdapterError::Parse { provider, source })?;
        Ok(Self { provider, response })
    }
}

impl ResponseAdapter for OpenAiResponseAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn id(&self) -> String {
        self.response.id.clone()
    }

    fn model(&self) -> String {
        self.response.model.clone()
    }

    fn text(&self) -> String {
        self.response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }

    fn tool_calls(&self) -> Vec<CommonToolCall> {
        self.response
            .choices
            .first()
            .and_then(|c| c.message.tool_calls.as_ref())
            .into_iter()
            .flatten()
            .map(|call| CommonToolCall {
                id: call.id.clone(),
                name: call.function.name.clone(),
                arguments: parse_arguments(&call.function.arguments),
            })
            .collect()
    }

    fn usage(&self) -> TokenUsage {
        self.response.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
    }

    fn to_refusal_response(&self, internal_reason: &str, user_facing_text: &str) -> Value {
        log_refusal(self.provider, internal_reason);
        let mut response = self.response.clone();
        response.choices = vec![OpenAiChoice {
            index: 0,
            message: OpenAiResponseMessage {
                role: "assistant".to_owned(),
                content: Some(user_facing_text.to_owned()),
                tool_calls: None,
            },
            finish_reason: Some("stop".to_owned()),
        }];
        serde_json::to_value(&response).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body() -> Value {
        json!({
            "id": "chatcmpl-1", "object": "chat.completion", "created": 1, "model": "gpt-test",
            "choices": [{"index": 0, "message": {
                "role": "assistant", "content": null,
                "tool_calls": [{"id": "call_1", "type": "function",
                    "function": {"name": "lookup", "arguments": "{broken"}}],
            }, "finish_reason": "tool_calls"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
        })
    }

    #[test]
    fn absent_text_reads_empty_and_bad_arguments_read_empty_object() {
        let adapter = OpenAiResponseAdapter::new(Provider::OpenAi, &body()).unwrap();
        assert_eq!(adapter.text(), "");
        assert!(adapter.has_tool_calls());
        assert_eq!(adapter.tool_calls()[0].arguments, json!({}));
        assert_eq!(adapter.usage().input_tokens, 10);
    }

    #[test]
    fn refusal_keeps_envelope_and_drops_tool_calls() {
        let adapter = OpenAiResponseAdapter::new(Provider::OpenAi, &body()).unwrap();
        let refusal = adapter.to_refusal_response("policy", "I can't help with that.");
        assert_eq!(refusal["id"], "chatcmpl-1");
        assert_eq!(refusal["choices"][0]["message"]["content"], "I can't help with that.");
        assert_eq!(refusal["choices"][0]["finish_reason"], "stop");
        assert!(refusal["choices"][0]["message"].get("tool_calls").is_none());
        assert_eq!(refusal["usage"]["prompt_tokens"], 10);
    }
}
