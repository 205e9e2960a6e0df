//! Request adapter for the Bedrock Converse API

use std::collections::HashMap;

use serde_json::Value;

use babel_core::{
    CommonMessage, CommonToolCall, CommonToolDefinition, CommonToolResult, McpContentBlock, ModelCapabilities,
    Provider, UNKNOWN_TOOL_NAME,
};

use crate::protocol::bedrock::{BedrockRequest, BedrockToolResult};
use crate::transform::{self, PolicyBlock};

use super::{AdapterError, RequestAdapter, content_to_string, parse_role};

/// Adapter over one Converse request
pub struct BedrockRequestAdapter {
    request: BedrockRequest,
    model_override: Option<String>,
    updates: HashMap<String, Value>,
    image_support: Option<bool>,
}

impl BedrockRequestAdapter {
    /// Wrap a parsed request body
    pub fn new(payload: &Value) -> Result<Self, AdapterError> {
        let request = serde_json::from_value(payload.clone()).map_err(|source| AdapterError::Parse {
            provider: Provider::Bedrock,
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
            for block in &message.content {
                if let Some(tool) = &block.tool_use {
                    names.insert(tool.tool_use_id.as_str(), tool.name.as_str());
                }
            }
        }
        names
    }
}

/// Common-form view of a tool result's content entries
fn result_content(result: &BedrockToolResult) -> Value {
    if let [entry] = result.content.as_slice() {
        if let Some(json) = entry.get("json") {
            return json.clone();
        }
    }
    let texts: Vec<&str> = result
        .content
        .iter()
        .filter_map(|e| e.get("text").and_then(Value::as_str))
        .collect();
    if texts.len() == result.content.len() {
        Value::String(texts.join("\n"))
    } else {
        Value::Array(result.content.clone())
    }
}

/// Image-policy pass over one tool result's content entries
///
/// Entries that carry no image and no MCP block array are preserved in
/// place; the rewrite only happens when an image is actually present.
fn apply_policy_to_entries(entries: &[Value], supports_images: bool) -> Option<Vec<Value>> {
    let mut blocks: Vec<McpContentBlock> = Vec::new();
    let mut passthrough: Vec<Value> = Vec::new();
    for entry in entries {
        if let Some(text) = entry.get("text").and_then(Value::as_str) {
            blocks.push(McpContentBlock::Text { text: text.to_owned() });
        } else if let Some(image) = entry.get("image") {
            let format = image.get("format").and_then(Value::as_str).unwrap_or("png");
            let bytes = image
                .pointer("/source/bytes")
                .and_then(Value::as_str)
                .unwrap_or_default();
            blocks.push(McpContentBlock::Image {
                data: bytes.to_owned(),
                mime_type: format!("image/{format}"),
            });
        } else if let Some(json) = entry.get("json") {
            if let Some(nested) = McpContentBlock::parse_blocks(json) {
                blocks.extend(nested);
            } else {
                passthrough.push(entry.clone());
            }
        } else {
            passthrough.push(entry.clone());
        }
    }

    if !blocks.iter().any(|b| matches!(b, McpContentBlock::Image { .. })) {
        return None;
    }

    let mut rendered: Vec<Value> = transform::apply_image_policy(&blocks, supports_images)
        .into_iter()
        .map(|block| match block {
            PolicyBlock::Text(t) => serde_json::json!({"text": t}),
            PolicyBlock::Image { data, mime_type } => {
                let format = mime_type.split('/').nth(1).unwrap_or("png");
                serde_json::json!({"image": {"format": format, "source": {"bytes": data}}})
            }
        })
        .collect();
    rendered.extend(passthrough);
    Some(rendered)
}

impl RequestAdapter for BedrockRequestAdapter {
    fn provider(&self) -> Provider {
        Provider::Bedrock
    }

    fn model(&self) -> &str {
        self.model_override.as_deref().unwrap_or(&self.request.model_id)
    }

    fn is_streaming(&self) -> bool {
        // Streaming is the `converse-stream` endpoint, not a body field
        false
    }

    fn messages(&self) -> Vec<CommonMessage> {
        let mut messages = Vec::with_capacity(self.request.messages.len() + 1);
        if let Some(system) = &self.request.system {
            let text: Vec<&str> = system.iter().map(|b| b.text.as_str()).collect();
            messages.push(CommonMessage::text(babel_core::CommonRole::System, text.join("\n")));
        }
        for message in &self.request.messages {
            let text: String = message
                .content
                .iter()
                .filter_map(|b| b.text.as_deref())
                .collect();
            let tool_calls: Vec<CommonToolCall> = message
                .content
                .iter()
                .filter_map(|b| b.tool_use.as_ref())
                .map(|tool| CommonToolCall {
                    id: tool.tool_use_id.clone(),
                    name: tool.name.clone(),
                    arguments: tool.input.clone(),
                })
                .collect();
            messages.push(CommonMessage {
                role: parse_role(&message.role),
                content: text,
                tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
            });
        }
        messages
    }

    fn tool_results(&self) -> Vec<CommonToolResult> {
        let names = self.call_names();
        self.request
            .messages
            .iter()
            .flat_map(|m| &m.content)
            .filter_map(|block| block.tool_result.as_ref())
            .map(|result| CommonToolResult {
                id: result.tool_use_id.clone(),
                name: names
                    .get(result.tool_use_id.as_str())
                    .map_or(UNKNOWN_TOOL_NAME, |n| *n)
                    .to_owned(),
                content: result_content(result),
                is_error: result.status.as_deref() == Some("error"),
            })
            .collect()
    }

    fn tools(&self) -> Vec<CommonToolDefinition> {
        self.request
            .tool_config
            .iter()
            .flat_map(|c| &c.tools)
            .map(|entry| CommonToolDefinition {
                name: entry.tool_spec.name.clone(),
                description: entry.tool_spec.description.clone(),
                input_schema: entry.tool_spec.input_schema.json.clone(),
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
            request.model_id.clone_from(model);
        }

        for message in &mut request.messages {
            for block in &mut message.content {
                let Some(result) = block.tool_result.as_mut() else {
                    continue;
                };

                if let Some(update) = self.updates.get(&result.tool_use_id) {
                    result.content = match update {
                        Value::Object(_) | Value::Array(_) => vec![serde_json::json!({"json": update})],
                        other => vec![serde_json::json!({"text": content_to_string(other)})],
                    };
                }

                if let Some(name) = names.get(&result.tool_use_id) {
                    for entry in &mut result.content {
                        let Some(text) = entry.get("text").and_then(Value::as_str) else {
                            continue;
                        };
                        if let Some(truncated) = transform::truncate_browser_output(name, text) {
                            *entry = serde_json::json!({"text": truncated});
                        }
                    }
                }

                if let Some(supports) = self.image_support {
                    if let Some(rendered) = apply_policy_to_entries(&result.content, supports) {
                        result.content = rendered;
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

    struct NoImages;
    impl ModelCapabilities for NoImages {
        fn supports_images(&self, _model: &str) -> bool {
            false
        }
    }

    fn payload() -> Value {
        json!({
            "modelId": "bedrock-test",
            "messages": [
                {"role": "assistant", "content": [
                    {"toolUse": {"toolUseId": "tooluse_1", "name": "capture", "input": {}}},
                ]},
                {"role": "user", "content": [
                    {"toolResult": {"toolUseId": "tooluse_1", "content": [
                        {"text": "done"},
                        {"image": {"format": "png", "source": {"bytes": "aGk="}}},
                    ]}},
                ]},
            ],
            "toolConfig": {"tools": [
                {"toolSpec": {"name": "capture", "inputSchema": {"json": {"type": "object"}}}},
            ]},
        })
    }

    #[test]
    fn exposes_tools_and_results() {
        let adapter = BedrockRequestAdapter::new(&payload()).unwrap();
        assert_eq!(adapter.model(), "bedrock-test");
        assert_eq!(adapter.tools()[0].name, "capture");

        let results = adapter.tool_results();
        assert_eq!(results[0].id, "tooluse_1");
        assert_eq!(results[0].name, "capture");
    }

    #[test]
    fn image_entries_replaced_for_text_only_model() {
        let mut adapter = BedrockRequestAdapter::new(&payload()).unwrap();
        adapter.convert_tool_result_content(&NoImages);

        let rendered = adapter.to_provider_request();
        let content = rendered["messages"][1]["content"][0]["toolResult"]["content"]
            .as_array()
            .unwrap();
        assert!(content.iter().all(|e| e.get("image").is_none()));
        let last = content.last().unwrap()["text"].as_str().unwrap();
        assert!(last.ends_with("[1 image(s) removed - model does not support image inputs]"));
    }

    #[test]
    fn json_update_renders_as_json_entry() {
        let mut adapter = BedrockRequestAdapter::new(&payload()).unwrap();
        adapter.update_tool_result("tooluse_1", json!({"rows": 2}));

        let rendered = adapter.to_provider_request();
        let content = &rendered["messages"][1]["content"][0]["toolResult"]["content"];
        assert_eq!(content[0]["json"]["rows"], 2);
    }
}
