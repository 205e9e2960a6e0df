//! AWS Bedrock Converse API wire format
//!
//! The transport re-frames the binary event stream as JSON events, so the
//! streaming types here mirror the `ConverseStream` event payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Request --

/// Converse request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockRequest {
    /// Model identifier
    #[serde(default)]
    pub model_id: String,
    /// Conversation messages
    pub messages: Vec<BedrockMessage>,
    /// System prompt blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<BedrockSystemBlock>>,
    /// Inference parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_config: Option<Value>,
    /// Tool configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<BedrockToolConfig>,
    /// Remaining request fields, forwarded untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// System prompt block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockSystemBlock {
    /// Prompt text
    pub text: String,
}

/// Message within a request or response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockMessage {
    /// `"user"` or `"assistant"`
    pub role: String,
    /// Ordered content blocks
    #[serde(default)]
    pub content: Vec<BedrockContentBlock>,
}

/// Content block; exactly one field is set per block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockContentBlock {
    /// Text block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Image block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<BedrockImage>,
    /// Tool invocation by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use: Option<BedrockToolUse>,
    /// Tool result supplied by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<BedrockToolResult>,
}

/// Image block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockImage {
    /// Image format (`"png"`, `"jpeg"`, …)
    pub format: String,
    /// Image source
    pub source: BedrockImageSource,
}

/// Image source carrying base64 bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockImageSource {
    /// Base64-encoded bytes
    pub bytes: String,
}

/// Tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockToolUse {
    /// Tool call identifier
    pub tool_use_id: String,
    /// Tool name
    pub name: String,
    /// Parsed arguments
    #[serde(default)]
    pub input: Value,
}

/// Tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockToolResult {
    /// Id of the tool call being answered
    pub tool_use_id: String,
    /// Result content blocks (`{text}` or `{json}` or `{image}`)
    #[serde(default)]
    pub content: Vec<Value>,
    /// `"success"` or `"error"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockToolConfig {
    /// Declared tools
    #[serde(default)]
    pub tools: Vec<BedrockToolEntry>,
    /// Tool choice directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
}

/// Tool entry wrapping a tool spec
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockToolEntry {
    /// The tool specification
    pub tool_spec: BedrockToolSpec,
}

/// Tool specification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockToolSpec {
    /// Tool name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Input schema wrapper (`{"json": <schema>}`)
    pub input_schema: BedrockSchemaWrapper,
}

/// Schema wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockSchemaWrapper {
    /// The JSON Schema
    pub json: Value,
}

// -- Response --

/// Converse response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockResponse {
    /// Output wrapper
    pub output: BedrockOutput,
    /// Why generation stopped (`"end_turn"`, `"tool_use"`, …)
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<BedrockUsage>,
}

/// Output wrapper around the generated message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockOutput {
    /// The generated message
    pub message: BedrockMessage,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockUsage {
    /// Prompt tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Generated tokens
    #[serde(default)]
    pub output_tokens: u32,
    /// Total tokens
    #[serde(default)]
    pub total_tokens: u32,
}

// -- Streaming --

/// One `ConverseStream` event, re-framed as JSON by the transport
///
/// Exactly one field is set per event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockStreamEvent {
    /// Message opened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_start: Option<BedrockMessageStart>,
    /// Content block opened (carries tool id/name for tool blocks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_block_start: Option<BedrockBlockStart>,
    /// Incremental content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_block_delta: Option<BedrockBlockDelta>,
    /// Content block closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_block_stop: Option<BedrockBlockStop>,
    /// Message closed with a stop reason; usage follows separately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_stop: Option<BedrockMessageStop>,
    /// Trailing metadata event carrying usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BedrockMetadata>,
}

/// `messageStart` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockMessageStart {
    /// Always `"assistant"`
    #[serde(default)]
    pub role: String,
}

/// `contentBlockStart` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockBlockStart {
    /// Block index within the message
    #[serde(default)]
    pub content_block_index: u32,
    /// Start data (`{"toolUse": {toolUseId, name}}` for tool blocks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<BedrockBlockStartData>,
}

/// Start data within `contentBlockStart`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockBlockStartData {
    /// Tool-use opening (id and name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use: Option<BedrockStreamToolStart>,
}

/// Tool-use opening data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockStreamToolStart {
    /// Tool call identifier
    #[serde(default)]
    pub tool_use_id: Option<String>,
    /// Tool name
    #[serde(default)]
    pub name: Option<String>,
}

/// `contentBlockDelta` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockBlockDelta {
    /// Block index within the message
    #[serde(default)]
    pub content_block_index: u32,
    /// The delta
    pub delta: BedrockDeltaData,
}

/// Delta data: text or a tool-input fragment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockDeltaData {
    /// Text fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Tool-input fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use: Option<BedrockStreamToolDelta>,
}

/// Tool-input fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockStreamToolDelta {
    /// Argument-string fragment
    #[serde(default)]
    pub input: String,
}

/// `contentBlockStop` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockBlockStop {
    /// Block index within the message
    #[serde(default)]
    pub content_block_index: u32,
}

/// `messageStop` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BedrockMessageStop {
    /// Why generation stopped
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Trailing `metadata` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockMetadata {
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<BedrockUsage>,
}

// -- Error --

/// Bedrock exception body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockErrorBody {
    /// Exception type name (`"ValidationException"`, …), from either the
    /// `__type` field or the SDK error name
    #[serde(default, rename = "__type")]
    pub exception_type: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
}
