//! Request adapter for the Anthropic messages API

use std::collections::HashMap;

use serde_json::Value;

use babel_core::{
    CommonMessage, CommonToolCall, CommonToolDefinition, CommonToolResult, McpContentBlock, ModelCapabilities,
    Provider, UNKNOWN_TOOL_NAME,
};

use crate::protocol::anthropic::{AnthropicContent, AnthropicContentBlock, AnthropicRequest};
use crate::transform::{self, PolicyBlock};

use super::{AdapterError, RequestAdapter, content_to_string, parse_content, parse_role};

/// Adapter over one messages API request
pub struct AnthropicRequestAdapter {
    request: AnthropicRequest,
    model_override: Option<String>,
    updates: HashMap<String, Value>,
    image_support: Option<bool>,
}

impl AnthropicRequestAdapter {
    /// Wrap a parsed request body
    pub fn new(payload: &Value) -> Result<Self, AdapterError> {
        let request = serde_json::from_value(payload.clone()).map_err(|source| AdapterError::Parse {
            provider: Provider::Anthropic,
            source,
        })?;
        Ok(Self {
            request,
            model_override: None,
            updates: HashMap::new(),
            image_support: None,
        })
    }

    /// Tool-use id → tool name, from assistant turns
    fn call_names(&self) -> HashMap<&str, &str> {
        let mut names = HashMap::new();
        for message in &self.request.messages {
            if let AnthropicContent::Blocks(blocks) = &message.content {
                for block in blocks {
                    if let AnthropicContentBlock::ToolUse { id, name, .. } = block {
                        names.insert(id.as_str(), name.as_str());
                    }
                }
            }
        }
        names
    }
}

/// Flatten message content to plain text
fn flatten_content(content: &AnthropicContent) -> String {
    match content {
        AnthropicContent::Text(s) => s.clone(),
        AnthropicContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match b {
                AnthropicContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect(),
    }
}

/// Apply the image policy to one tool result's content value
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

    let native: Vec<Value> = filtered
        .iter()
        .map(|block| match block {
            PolicyBlock::Text(t) => serde_json::json!({"type": "text", "text": t}),
            PolicyBlock::Image { data, mime_type } => serde_json::json!({
                "type": "image",
                "source": {"type": "base64", "media_type": mime_type, "data": data},
            }),
        })
        .collect();
    Value::Array(native)
}

impl RequestAdapter for AnthropicRequestAdapter {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn model(&self) -> &str {
        self.model_override.as_deref().unwrap_or(&self.request.model)
    }

    fn is_streaming(&self) -> bool {
        self.request.stream.unwrap_or(false)
    }

    fn messages(&self) -> Vec<CommonMessage> {
        let mut messages: Vec<CommonMessage> = Vec::with_capacity(self.request.messages.len() + 1);
        if let Some(system) = &self.request.system {
            messages.push(CommonMessage::text(
                babel_core::CommonRole::System,
                content_to_string(system),
            ));
        }
        for message in &self.request.messages {
            let tool_calls: Vec<CommonToolCall> = match &message.content {
                AnthropicContent::Blocks(blocks) => blocks
                    .iter()
                    .filter_map(|b| match b {
                        AnthropicContentBlock::ToolUse { id, name, input } => Some(CommonToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            arguments: input.clone(),
                        }),
                        _ => None,
                    })
                    .collect(),
                AnthropicContent::Text(_) => Vec::new(),
            };
            messages.push(CommonMessage {
                role: parse_role(&message.role),
                content: flatten_content(&message.content),
                tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
            });
        }
        messages
    }

    fn tool_results(&self) -> Vec<CommonToolResult> {
        let names = self.call_names();
        let mut results = Vec::new();
        for message in &self.request.messages {
            let AnthropicContent::Blocks(blocks) = &message.content else {
                continue;
            };
            for block in blocks {
                if let AnthropicContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } = block
                {
                    let parsed = match content {
                        Some(Value::String(s)) => parse_content(s),
                        Some(other) => other.clone(),
                        None => Value::Null,
                    };
                    results.push(CommonToolResult {
                        id: tool_use_id.clone(),
                        name: names.get(tool_use_id.as_str()).map_or(UNKNOWN_TOOL_NAME, |n| *n).to_owned(),
                        content: parsed,
                        is_error: is_error.unwrap_or(false),
                    });
                }
            }
        }
        results
    }

    fn tools(&self) -> Vec<CommonToolDefinition> {
        self.request
            .tools
            .iter()
            .flatten()
            .map(|tool| CommonToolDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: tool.input_schema.clone(),
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
        let names: HashMap<String, String> = self
            .call_names()
            .into_iter()
            .map(|(id, name)| (id.to_owned(), name.to_owned()))
            .collect();

        let mut request = self.request.clone();
        if let Some(model) = &self.model_override {
            request.model.clone_from(model);
        }

        for message in &mut request.messages {
            let AnthropicContent::Blocks(blocks) = &mut message.content else {
                continue;
            };
            for block in blocks {
                let AnthropicContentBlock::ToolResult {
                    tool_use_id, content, ..
                } = block
                else {
                    continue;
                };

                if let Some(update) = self.updates.get(tool_use_id) {
                    *content = Some(Value::String(content_to_string(update)));
                }

                if let Some(name) = names.get(tool_use_id) {
                    if let Some(Value::String(text)) = content {
                        if let Some(truncated) = transform::truncate_browser_output(name, text) {
                            *content = Some(Value::String(truncated));
                        }
                    }
                }

                if let Some(supports) = self.image_support {
                    if let Some(value) = content {
                        *content = Some(render_tool_content(value, supports));
                    }
                }
            }
        }

        serde_json::to_value(&request).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct WithImages;
    impl ModelCapabilities for WithImages {
        fn supports_images(&self, _model: &str) -> bool {
            true
        }
    }

    fn payload() -> Value {
        json!({
            "model": "claude-test",
            "max_tokens": 1024,
            "system": "be brief",
            "messages": [
                {"role": "user", "content": "check the page"},
                {"role": "assistant", "content": [
                    {"type": "tool_use", "id": "toolu_1", "name": "fetch", "input": {"url": "x"}},
                ]},
                {"role": "user", "content": [
                    {"type": "tool_result", "tool_use_id": "toolu_1",
                     "content": [{"type": "image", "data": "aGk=", "mimeType": "image/png"}]},
                ]},
            ],
        })
    }

    #[test]
    fn exposes_tool_calls_and_results() {
        let adapter = AnthropicRequestAdapter::new(&payload()).unwrap();

        let messages = adapter.messages();
        assert_eq!(messages[0].content, "be brief");
        assert_eq!(messages[2].tool_calls.as_ref().unwrap()[0].id, "toolu_1");

        let results = adapter.tool_results();
        assert_eq!(results[0].name, "fetch");
        assert!(!results[0].is_error);
    }

    #[test]
    fn images_render_as_native_base64_blocks() {
        let mut adapter = AnthropicRequestAdapter::new(&payload()).unwrap();
        adapter.convert_tool_result_content(&WithImages);

        let rendered = adapter.to_provider_request();
        let content = &rendered["messages"][2]["content"][0]["content"];
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
    }

    #[test]
    fn rewrite_replaces_tool_result_content() {
        let mut adapter = AnthropicRequestAdapter::new(&payload()).unwrap();
        adapter.update_tool_result("toolu_1", json!("rows:\n1,a\n"));

        let rendered = adapter.to_provider_request();
        assert_eq!(rendered["messages"][2]["content"][0]["content"], "rows:\n1,a\n");
    }
}
