//! Request adapter for the `OpenAI` chat completion dialect
//!
//! Also fronts Zhipu, vLLM, Ollama, and Mistral; the adapter remembers
//! which provider it serves so attribution survives into errors and logs.

use std::collections::HashMap;

use serde_json::Value;

use babel_core::{
    CommonMessage, CommonToolCall, CommonToolDefinition, CommonToolResult, McpContentBlock, ModelCapabilities,
    Provider, UNKNOWN_TOOL_NAME,
};

use crate::protocol::openai::{OpenAiMessage, OpenAiRequest};
use crate::transform::{self, PolicyBlock};

use super::{AdapterError, RequestAdapter, content_to_string, parse_arguments, parse_content, parse_role};

/// Adapter over one chat completion request
pub struct OpenAiRequestAdapter {
    provider: Provider,
    request: OpenAiRequest,
    model_override: Option<String>,
    updates: HashMap<String, Value>,
    image_support: Option<bool>,
}

impl OpenAiRequestAdapter {
    /// Wrap a parsed request body for `provider`
    pub fn new(provider: Provider, payload: &Value) -> Result<Self, AdapterError> {
        let request =
            serde_json::from_value(payload.clone()).map_err(|source| AdapterError::Parse { provider, source })?;
        Ok(Self {
            provider,
            request,
            model_override: None,
            updates: HashMap::new(),
            image_support: None,
        })
    }

    /// Tool-call id → tool name, from the assistant turns seen so far
    fn call_names(&self) -> HashMap<&str, &str> {
        let mut names = HashMap::new();
        for message in &self.request.messages {
            if let Some(calls) = &message.tool_calls {
                for call in calls {
                    names.insert(call.id.as_str(), call.function.name.as_str());
                }
            }
        }
        names
    }
}

/// Flatten message content (string or content-part array) to plain text
fn flatten_content(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect(),
        _ => String::new(),
    }
}

/// Apply the image policy to one tool message's content
///
/// Content that is not an MCP block array passes through untouched.
fn render_tool_content(content: &Value, supports_images: bool) -> Value {
    let parsed;
    let candidate = if let Value::String(s) = content {
        parsed = parse_content(s);
        &parsed
    } else {
        content
    };
    let Some(blocks) = McpContentBlock::parse_blocks(candidate) else {
        return content.clone();
    };

    let filtered = transform::apply_image_policy(&blocks, supports_images);
    if filtered.iter().all(|b| matches!(b, PolicyBlock::Text(_))) {
        let text: Vec<&str> = filtered
            .iter()
            .filter_map(|b| match b {
                PolicyBlock::Text(t) => Some(t.as_str()),
                PolicyBlock::Image { .. } => None,
            })
            .collect();
        return Value::String(text.join("\n"));
    }

    // Surviving images render as data-URL content parts
    let parts: Vec<Value> = filtered
        .iter()
        .map(|block| match block {
            PolicyBlock::Text(t) => serde_json::json!({"type": "text", "text": t}),
            PolicyBlock::Image { data, mime_type } => serde_json::json!({
                "type": "image_url",
                "image_url": {"url": format!("data:{mime_type};base64,{data}")},
            }),
        })
        .collect();
    Value::Array(parts)
}

impl RequestAdapter for OpenAiRequestAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        self.model_override.as_deref().unwrap_or(&self.request.model)
    }

    fn is_streaming(&self) -> bool {
        self.request.stream.unwrap_or(false)
    }

    fn messages(&self) -> Vec<CommonMessage> {
        self.request
            .messages
            .iter()
            .map(|message| CommonMessage {
                role: parse_role(&message.role),
                content: flatten_content(message.content.as_ref()),
                tool_calls: message.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|call| CommonToolCall {
                            id: call.id.clone(),
                            name: call.function.name.clone(),
                            arguments: parse_arguments(&call.function.arguments),
                        })
                        .collect()
                }),
            })
            .collect()
    }

    fn tool_results(&self) -> Vec<CommonToolResult> {
        let names = self.call_names();
        self.request
            .messages
            .iter()
            .filter(|m| m.role == "tool")
            .filter_map(|message| {
                let id = message.tool_call_id.clone()?;
                let name = names.get(id.as_str()).map_or(UNKNOWN_TOOL_NAME, |n| *n).to_owned();
                let content = match &message.content {
                    Some(Value::String(s)) => parse_content(s),
                    Some(other) => other.clone(),
                    None => Value::Null,
                };
                Some(CommonToolResult {
                    id,
                    name,
                    content,
                    is_error: false,
                })
            })
            .collect()
    }

    fn tools(&self) -> Vec<CommonToolDefinition> {
        self.request
            .tools
            .iter()
            .flatten()
            .map(|tool| CommonToolDefinition {
                name: tool.function.name.clone(),
                description: tool.function.description.clone(),
                input_schema: tool.function.parameters.clone().unwrap_or_else(|| serde_json::json!({})),
            })
            .collect()
    }

    fn set_model(&mut self, model: &str) {
        self.model_override = Some(model.to_owned());
    }

    fn update_tool_result(&mut self, id: &str, content: Value) {
        self.updates.insert(id.to_owned(), content);
    }

    fn convert_tool_result_content(&mut self, capabilities: &dyn ModelCapabilities) {
        self.image_support = Some(capabilities.supports_images(self.model()));
    }

    fn to_provider_request(&self) -> Value {
        let mut request = self.request.clone();
        if let Some(model) = &self.model_override {
            request.model.clone_from(model);
        }

        let names: HashMap<String, String> = self
            .call_names()
            .into_iter()
            .map(|(id, name)| (id.to_owned(), name.to_owned()))
            .collect();

        for message in &mut request.messages {
            if message.role != "tool" {
                continue;
            }
            let Some(call_id) = message.tool_call_id.clone() else {
                continue;
            };
            render_tool_message(message, &call_id, &names, &self.updates, self.image_support);
        }

        serde_json::to_value(&request).unwrap_or(Value::Null)
    }
}

/// Apply rewrites then the image/size policy to one tool message
fn render_tool_message(
    message: &mut OpenAiMessage,
    call_id: &str,
    names: &HashMap<String, String>,
    updates: &HashMap<String, Value>,
    image_support: Option<bool>,
) {
    if let Some(update) = updates.get(call_id) {
        message.content = Some(Value::String(content_to_string(update)));
    }

    if let Some(name) = names.get(call_id) {
        if let Some(Value::String(text)) = &message.content {
            if let Some(truncated) = transform::truncate_browser_output(name, text) {
                message.content = Some(Value::String(truncated));
            }
        }
    }

    if let Some(supports) = image_support {
        if let Some(content) = &message.content {
            message.content = Some(render_tool_content(content, supports));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use babel_core::CommonRole;

    use super::*;

    struct NoImages;
    impl ModelCapabilities for NoImages {
        fn supports_images(&self, _model: &str) -> bool {
            false
        }
    }

    struct WithImages;
    impl ModelCapabilities for WithImages {
        fn supports_images(&self, _model: &str) -> bool {
            true
        }
    }

    fn request_with_tool_result(content: Value) -> Value {
        json!({
            "model": "gpt-test",
            "messages": [
                {"role": "user", "content": "run it"},
                {"role": "assistant", "tool_calls": [
                    {"id": "call_1", "type": "function",
                     "function": {"name": "capture", "arguments": "{}"}},
                ]},
                {"role": "tool", "tool_call_id": "call_1", "content": content},
            ],
            "stream": true,
        })
    }

    #[test]
    fn exposes_common_accessors() {
        let payload = request_with_tool_result(json!("{\"rows\": 3}"));
        let adapter = OpenAiRequestAdapter::new(Provider::Zhipu, &payload).unwrap();

        assert_eq!(adapter.provider(), Provider::Zhipu);
        assert_eq!(adapter.model(), "gpt-test");
        assert!(adapter.is_streaming());

        let messages = adapter.messages();
        assert_eq!(messages[0].role, CommonRole::User);
        assert_eq!(messages[1].tool_calls.as_ref().unwrap()[0].name, "capture");

        let results = adapter.tool_results();
        assert_eq!(results[0].id, "call_1");
        assert_eq!(results[0].name, "capture");
        assert_eq!(results[0].content, json!({"rows": 3}));
    }

    #[test]
    fn unmatched_tool_result_gets_unknown_name() {
        let payload = json!({
            "model": "gpt-test",
            "messages": [{"role": "tool", "tool_call_id": "call_missing", "content": "x"}],
        });
        let adapter = OpenAiRequestAdapter::new(Provider::OpenAi, &payload).unwrap();
        assert_eq!(adapter.tool_results()[0].name, UNKNOWN_TOOL_NAME);
    }

    #[test]
    fn rewrites_apply_before_rendering() {
        let payload = request_with_tool_result(json!("original"));
        let mut adapter = OpenAiRequestAdapter::new(Provider::OpenAi, &payload).unwrap();
        adapter.set_model("gpt-next");
        adapter.update_tool_result("call_1", json!("rewritten"));

        let rendered = adapter.to_provider_request();
        assert_eq!(rendered["model"], "gpt-next");
        assert_eq!(rendered["messages"][2]["content"], "rewritten");
        // Rendering twice gives the same body
        assert_eq!(adapter.to_provider_request(), rendered);
    }

    #[test]
    fn image_blocks_stripped_for_text_only_model() {
        let blocks = json!([
            {"type": "text", "text": "page loaded"},
            {"type": "image", "data": "aGVsbG8=", "mimeType": "image/png"},
        ]);
        let payload = request_with_tool_result(blocks);
        let mut adapter = OpenAiRequestAdapter::new(Provider::OpenAi, &payload).unwrap();
        adapter.convert_tool_result_content(&NoImages);

        let rendered = adapter.to_provider_request();
        let content = rendered["messages"][2]["content"].as_str().unwrap();
        assert!(content.ends_with("[1 image(s) removed - model does not support image inputs]"));
        assert!(!content.contains("aGVsbG8="));
    }

    #[test]
    fn image_blocks_become_data_urls_when_supported() {
        let blocks = json!([
            {"type": "image", "data": "aGVsbG8=", "mimeType": "image/png"},
        ]);
        let payload = request_with_tool_result(blocks);
        let mut adapter = OpenAiRequestAdapter::new(Provider::OpenAi, &payload).unwrap();
        adapter.convert_tool_result_content(&WithImages);

        let rendered = adapter.to_provider_request();
        let parts = rendered["messages"][2]["content"].as_array().unwrap();
        assert_eq!(parts[0]["image_url"]["url"], "data:image/png;base64,aGVsbG8=");
    }
}
