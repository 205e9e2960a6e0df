//! Response adapter for the Gemini `generateContent` API
//!
//! The wire carries no tool-call ids, so each accessor call synthesizes
//! fresh `call_` ids; callers that need stable ids cache the first read.

use serde_json::Value;

use babel_core::{CommonToolCall, Provider, TokenUsage};

use crate::protocol::gemini::{GeminiContent, GeminiPart, GeminiResponse};
use crate::request::AdapterError;

use super::{ResponseAdapter, log_refusal};

/// Adapter over one `generateContent` response
pub struct GeminiResponseAdapter {
    response: GeminiResponse,
}

impl GeminiResponseAdapter {
    /// Wrap a parsed response body
    pub fn new(body: &Value) -> Result<Self, AdapterError> {
        let response = serde_json::from_value(body.clone()).map_err(|source| AdapterError::Parse {
            provider: Provider::Gemini,
            source,
        })?;
        Ok(Self { response })
    }

    fn parts(&self) -> &[GeminiPart] {
        self.response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map_or(&[], |content| content.parts.as_slice())
    }
}

impl ResponseAdapter for GeminiResponseAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn id(&self) -> String {
        self.response.response_id.clone().unwrap_or_default()
    }

    fn model(&self) -> String {
        self.response.model_version.clone().unwrap_or_default()
    }

    fn text(&self) -> String {
        self.parts()
            .iter()
            .filter_map(|p| match p {
                GeminiPart::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    fn tool_calls(&self) -> Vec<CommonToolCall> {
        self.parts()
            .iter()
            .filter_map(|p| match p {
                GeminiPart::FunctionCall(call) => Some(CommonToolCall {
                    id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                    name: call.name.clone(),
                    arguments: call.args.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    fn usage(&self) -> TokenUsage {
        self.response
            .usage_metadata
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
    }

    fn to_refusal_response(&self, internal_reason: &str, user_facing_text: &str) -> Value {
        log_refusal(Provider::Gemini, internal_reason);
        let mut response = self.response.clone();
        response.candidates = vec![crate::protocol::gemini::GeminiCandidate {
            content: Some(GeminiContent {
                role: Some("model".to_owned()),
                parts: vec![GeminiPart::Text(user_facing_text.to_owned())],
            }),
            finish_reason: Some("STOP".to_owned()),
            index: 0,
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
            "candidates": [{"content": {"role": "model", "parts": [
                {"text": "done"},
                {"functionCall": {"name": "query", "args": {"sql": "select 1"}}},
            ]}, "finishReason": "STOP", "index": 0}],
            "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 2, "totalTokenCount": 7},
            "modelVersion": "gemini-test",
        })
    }

    #[test]
    fn synthesizes_tool_call_ids() {
        let adapter = GeminiResponseAdapter::new(&body()).unwrap();
        let calls = adapter.tool_calls();
        assert!(calls[0].id.starts_with("call_"));
        assert_eq!(calls[0].name, "query");
        assert_eq!(adapter.text(), "done");
    }

    #[test]
    fn refusal_replaces_the_candidate() {
        let adapter = GeminiResponseAdapter::new(&body()).unwrap();
        let refusal = adapter.to_refusal_response("policy", "No.");
        assert_eq!(refusal["candidates"][0]["content"]["parts"][0]["text"], "No.");
        assert_eq!(refusal["candidates"][0]["finishReason"], "STOP");
        assert_eq!(refusal["usageMetadata"]["promptTokenCount"], 5);
    }
}
