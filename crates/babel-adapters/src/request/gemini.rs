//! Request adapter for the Gemini `generateContent` API
//!
//! The model travels in the URL rather than the body, so the adapter
//! starts with an empty model until [`RequestAdapter::set_model`] is
//! called with the path-derived value. Function calls and responses carry
//! no ids on this wire; results are keyed by function name instead.

use std::collections::HashMap;

use serde_json::Value;

use babel_core::{
    CommonMessage, CommonToolCall, CommonToolDefinition, CommonToolResult, McpContentBlock, ModelCapabilities,
    Provider,
};

use crate::protocol::gemini::{GeminiPart, GeminiRequest};
use crate::transform::{self, PolicyBlock};

use super::{AdapterError, RequestAdapter, parse_role};

/// Adapter over one `generateContent` request
pub struct GeminiRequestAdapter {
    request: GeminiRequest,
    model: String,
    updates: HashMap<String, Value>,
    image_support: Option<bool>,
}

impl GeminiRequestAdapter {
    /// Wrap a parsed request body
    pub fn new(payload: &Value) -> Result<Self, AdapterError> {
        let request = serde_json::from_value(payload.clone()).map_err(|source| AdapterError::Parse {
            provider: Provider::Gemini,
            source,
        })?;
        Ok(Self {
            request,
            model: String::new(),
            updates: HashMap::new(),
            image_support: None,
        })
    }
}

/// Wrap an updated content value in the object shape the API requires
fn response_envelope(update: &Value) -> Value {
    match update {
        Value::Object(_) => update.clone(),
        other => serde_json::json!({"result": super::content_to_string(other)}),
    }
}

/// Image-policy pass over one function response
///
/// Returns the rewritten response plus any surviving images, which render
/// as sibling `inlineData` parts since a function response cannot carry
/// binary data itself.
fn render_function_response(response: &Value, supports_images: bool) -> (Value, Vec<(String, String)>) {
    let Some(blocks) = McpContentBlock::parse_blocks(response) else {
        return (response.clone(), Vec::new());
    };

    let filtered = transform::apply_image_policy(&blocks, supports_images);
    let mut text = Vec::new();
    let mut images = Vec::new();
    for block in filtered {
        match block {
            PolicyBlock::Text(t) => text.push(t),
            PolicyBlock::Image { data, mime_type } => images.push((mime_type, data)),
        }
    }
    (serde_json::json!({"result": text.join("\n")}), images)
}

impl RequestAdapter for GeminiRequestAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_streaming(&self) -> bool {
        // Streaming is selected by the `:streamGenerateContent` path, not
        // by a body field; the handler drives that choice
        false
    }

    fn messages(&self) -> Vec<CommonMessage> {
        let mut messages = Vec::with_capacity(self.request.contents.len() + 1);
        if let Some(system) = &self.request.system_instruction {
            let text: String = system
                .parts
                .iter()
                .filter_map(|p| match p {
                    GeminiPart::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect();
            messages.push(CommonMessage::text(babel_core::CommonRole::System, text));
        }
        for content in &self.request.contents {
            let text: String = content
                .parts
                .iter()
                .filter_map(|p| match p {
                    GeminiPart::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect();
            let tool_calls: Vec<CommonToolCall> = content
                .parts
                .iter()
                .filter_map(|p| match p {
                    GeminiPart::FunctionCall(call) => Some(CommonToolCall {
                        id: call.name.clone(),
                        name: call.name.clone(),
                        arguments: call.args.clone(),
                    }),
                    _ => None,
                })
                .collect();
            messages.push(CommonMessage {
                role: parse_role(content.role.as_deref().unwrap_or("user")),
                content: text,
                tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
            });
        }
        messages
    }

    fn tool_results(&self) -> Vec<CommonToolResult> {
        self.request
            .contents
            .iter()
            .flat_map(|c| &c.parts)
            .filter_map(|part| match part {
                GeminiPart::FunctionResponse(fr) => Some(CommonToolResult {
                    id: fr.name.clone(),
                    name: fr.name.clone(),
                    content: fr.response.clone(),
                    is_error: false,
                }),
                _ => None,
            })
            .collect()
    }

    fn tools(&self) -> Vec<CommonToolDefinition> {
        self.request
            .tools
            .iter()
            .flatten()
            .flat_map(|t| &t.function_declarations)
            .map(|decl| CommonToolDefinition {
                name: decl.name.clone(),
                description: decl.description.clone(),
                input_schema: decl.parameters.clone().unwrap_or_else(|| serde_json::json!({})),
            })
            .collect()
    }

    fn set_model(&mut self, model: &str) {
        self.model = model.to_owned();
    }

    fn update_tool_result(&mut self, id: &str, content: Value) {
        self.updates.insert(id.to_owned(), content);
    }

    fn convert_tool_result_content(&mut self, capabilities: &dyn ModelCapabilities) {
        self.image_support = Some(capabilities.supports_images(&self.model));
    }

    fn to_provider_request(&self) -> Value {
        let mut request = self.request.clone();

        for content in &mut request.contents {
            let mut extra_images = Vec::new();
            for part in &mut content.parts {
                let GeminiPart::FunctionResponse(fr) = part else {
                    continue;
                };

                if let Some(update) = self.updates.get(&fr.name) {
                    fr.response = response_envelope(update);
                }

                if let Some(text) = fr.response.get("result").and_then(Value::as_str) {
                    if let Some(truncated) = transform::truncate_browser_output(&fr.name, text) {
                        fr.response = serde_json::json!({"result": truncated});
                    }
                }

                if let Some(supports) = self.image_support {
                    let (rewritten, images) = render_function_response(&fr.response, supports);
                    fr.response = rewritten;
                    extra_images.extend(images);
                }
            }
            for (mime_type, data) in extra_images {
                content.parts.push(GeminiPart::InlineData(crate::protocol::gemini::GeminiInlineData {
                    mime_type,
                    data,
                }));
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
            "contents": [
                {"role": "user", "parts": [{"text": "look"}]},
                {"role": "model", "parts": [
                    {"functionCall": {"name": "screenshot", "args": {"page": 1}}},
                ]},
                {"role": "user", "parts": [
                    {"functionResponse": {"name": "screenshot", "response": [
                        {"type": "image", "data": "aGk=", "mimeType": "image/png"},
                    ]}},
                ]},
            ],
            "tools": [{"functionDeclarations": [
                {"name": "screenshot", "parameters": {"type": "object"}},
            ]}],
        })
    }

    #[test]
    fn results_are_keyed_by_function_name() {
        let adapter = GeminiRequestAdapter::new(&payload()).unwrap();
        let results = adapter.tool_results();
        assert_eq!(results[0].id, "screenshot");
        assert!(adapter.has_tools());
    }

    #[test]
    fn model_comes_from_the_path_override() {
        let mut adapter = GeminiRequestAdapter::new(&payload()).unwrap();
        assert_eq!(adapter.model(), "");
        adapter.set_model("gemini-test");
        assert_eq!(adapter.model(), "gemini-test");
    }

    #[test]
    fn image_policy_rewrites_the_function_response() {
        let mut adapter = GeminiRequestAdapter::new(&payload()).unwrap();
        adapter.convert_tool_result_content(&NoImages);

        let rendered = adapter.to_provider_request();
        let response = &rendered["contents"][2]["parts"][0]["functionResponse"]["response"];
        let text = response["result"].as_str().unwrap();
        assert!(text.ends_with("[1 image(s) removed - model does not support image inputs]"));
    }
}
