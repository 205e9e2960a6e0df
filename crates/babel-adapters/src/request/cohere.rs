//! Request adapter for the Cohere v2 chat API
//!
//! The v2 wire has no image block inside tool results, so MCP image
//! blocks are always replaced by the count placeholder here regardless of
//! model capability.

use std::collections::HashMap;

use serde_json::Value;

use babel_core::{
    CommonMessage, CommonToolCall, CommonToolDefinition, CommonToolResult, McpContentBlock, ModelCapabilities,
    Provider, UNKNOWN_TOOL_NAME,
};

use crate::protocol::cohere::CohereRequest;
use crate::transform::{self, PolicyBlock};

use super::{AdapterError, RequestAdapter, content_to_string, parse_arguments, parse_content, parse_role};

/// Adapter over one v2 chat request
pub struct CohereRequestAdapter {
    request: CohereRequest,
    model_override: Option<String>,
    updates: HashMap<String, Value>,
    policy_armed: bool,
}

impl CohereRequestAdapter {
    /// Wrap a parsed request body
    pub fn new(payload: &Value) -> Result<Self, AdapterError> {
        let request = serde_json::from_value(payload.clone()).map_err(|source| AdapterError::Parse {
            provider: Provider::Cohere,
            source,
        })?;
        Ok(Self {
            request,
            model_override: None,
            updates: HashMap::new(),
            policy_armed: false,
        })
    }

    /// Tool-call id → tool name, from assistant turns
    fn call_names(&self) -> HashMap<&str, &str> {
        let mut names = HashMap::new();
        for message in &self.request.messages {
            for call in message.tool_calls.iter().flatten() {
                if let (Some(id), Some(name)) = (call.id.as_deref(), call.function.name.as_deref()) {
                    names.insert(id, name);
                }
            }
        }
        names
    }
}

/// Flatten message content (string or text/document block array)
fn flatten_content(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect(),
        _ => String::new(),
    }
}

/// Strip image blocks out of one tool message's content
fn render_tool_content(content: &Value) -> Value {
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

    let text: Vec<String> = transform::apply_image_policy(&blocks, false)
        .into_iter()
        .filter_map(|b| match b {
            PolicyBlock::Text(t) => Some(t),
            PolicyBlock::Image { .. } => None,
        })
        .collect();
    Value::String(text.join("\n"))
}

impl RequestAdapter for CohereRequestAdapter {
    fn provider(&self) -> Provider {
        Provider::Cohere
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
                            id: call.id.clone().unwrap_or_default(),
                            name: call.function.name.clone().unwrap_or_default(),
                            arguments: parse_arguments(call.function.arguments.as_deref().unwrap_or("{}")),
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
        // Capability is irrelevant on this wire; images never pass
        let _ = capabilities.supports_images(self.model());
        self.policy_armed = true;
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
            if message.role != "tool" {
                continue;
            }
            let Some(call_id) = message.tool_call_id.clone() else {
                continue;
            };

            if let Some(update) = self.updates.get(&call_id) {
                message.content = Some(Value::String(content_to_string(update)));
            }

            if let Some(name) = names.get(&call_id) {
                if let Some(Value::String(text)) = &message.content {
                    if let Some(truncated) = transform::truncate_browser_output(name, text) {
                        message.content = Some(Value::String(truncated));
                    }
                }
            }

            if self.policy_armed {
                if let Some(content) = &message.content {
                    message.content = Some(render_tool_content(content));
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
            "model": "command-test",
            "messages": [
                {"role": "assistant", "tool_calls": [
                    {"id": "tc_1", "type": "function",
                     "function": {"name": "snap", "arguments": "{\"page\":1}"}},
                ]},
                {"role": "tool", "tool_call_id": "tc_1", "content": [
                    {"type": "image", "data": "aGk=", "mimeType": "image/png"},
                ]},
            ],
        })
    }

    #[test]
    fn exposes_tool_calls_with_parsed_arguments() {
        let adapter = CohereRequestAdapter::new(&payload()).unwrap();
        let calls = adapter.messages()[0].tool_calls.clone().unwrap();
        assert_eq!(calls[0].arguments, json!({"page": 1}));
        assert_eq!(adapter.tool_results()[0].name, "snap");
    }

    #[test]
    fn images_never_pass_even_for_capable_models() {
        let mut adapter = CohereRequestAdapter::new(&payload()).unwrap();
        adapter.convert_tool_result_content(&WithImages);

        let rendered = adapter.to_provider_request();
        let content = rendered["messages"][1]["content"].as_str().unwrap();
        assert!(content.ends_with("[1 image(s) removed - model does not support image inputs]"));
    }
}
