//! Cohere v2 chat API wire format

use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Request --

/// v2 chat request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages
    pub messages: Vec<CohereMessage>,
    /// Tool definitions (OpenAI-shaped `function` entries)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<CohereTool>>,
    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Remaining request fields, forwarded untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Message within a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereMessage {
    /// `"system"`, `"user"`, `"assistant"`, or `"tool"`
    pub role: String,
    /// Content: string or array of `{type: "text", text}` blocks; tool
    /// results additionally allow `{type: "document", document}` blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<CohereToolCall>>,
    /// Tool call this message answers (role `tool` only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Assistant's tool-use plan text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_plan: Option<String>,
}

/// Tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereTool {
    /// Always `"function"`
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function declaration
    pub function: CohereFunctionDef,
}

/// Function declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereFunctionDef {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Tool call within a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereToolCall {
    /// Tool call identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Always `"function"`
    #[serde(default, rename = "type")]
    pub tool_type: Option<String>,
    /// Function name and arguments
    pub function: CohereFunctionCall,
}

/// Function invocation within a tool call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CohereFunctionCall {
    /// Function name
    #[serde(default)]
    pub name: Option<String>,
    /// JSON-encoded arguments
    #[serde(default)]
    pub arguments: Option<String>,
}

// -- Response --

/// v2 chat response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereResponse {
    /// Response identifier
    #[serde(default)]
    pub id: String,
    /// Generated assistant message
    pub message: CohereResponseMessage,
    /// Why generation stopped (`"COMPLETE"`, `"MAX_TOKENS"`, `"TOOL_CALL"`)
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CohereUsage>,
}

/// Assistant message within a response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CohereResponseMessage {
    /// Always `"assistant"`
    #[serde(default)]
    pub role: String,
    /// Text content blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<CohereContentBlock>>,
    /// Tool calls requested by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<CohereToolCall>>,
    /// Tool-use plan text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_plan: Option<String>,
}

/// Text content block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereContentBlock {
    /// Always `"text"`
    #[serde(rename = "type")]
    pub block_type: String,
    /// The text payload
    #[serde(default)]
    pub text: String,
}

/// Token usage wrapper
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CohereUsage {
    /// Billed token counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billed_units: Option<CohereTokenCounts>,
    /// Raw token counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<CohereTokenCounts>,
}

/// Input/output token pair
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CohereTokenCounts {
    /// Prompt tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Generated tokens
    #[serde(default)]
    pub output_tokens: u32,
}

// -- Streaming --

/// v2 chat stream event, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CohereStreamEvent {
    /// Stream opened; carries the response id
    MessageStart {
        /// Response identifier
        #[serde(default)]
        id: Option<String>,
    },
    /// A text content block opened
    ContentStart {
        /// Content block index
        #[serde(default)]
        index: u32,
    },
    /// Text fragment
    ContentDelta {
        /// Content block index
        #[serde(default)]
        index: u32,
        /// Nested delta payload
        #[serde(default)]
        delta: Option<CohereStreamDelta>,
    },
    /// A text content block closed
    ContentEnd {
        /// Content block index
        #[serde(default)]
        index: u32,
    },
    /// Tool-plan text fragment
    ToolPlanDelta {
        /// Nested delta payload
        #[serde(default)]
        delta: Option<CohereStreamDelta>,
    },
    /// A tool call opened; carries id and name
    ToolCallStart {
        /// Tool call index
        #[serde(default)]
        index: u32,
        /// Nested delta payload
        #[serde(default)]
        delta: Option<CohereStreamDelta>,
    },
    /// Tool-argument fragment
    ToolCallDelta {
        /// Tool call index
        #[serde(default)]
        index: u32,
        /// Nested delta payload
        #[serde(default)]
        delta: Option<CohereStreamDelta>,
    },
    /// A tool call closed
    ToolCallEnd {
        /// Tool call index
        #[serde(default)]
        index: u32,
    },
    /// Stream closed; finish reason and usage arrive together here
    MessageEnd {
        /// Nested delta payload carrying `finish_reason` and `usage`
        #[serde(default)]
        delta: Option<CohereMessageEndDelta>,
    },
}

/// Nested `delta.message` payload shared by content and tool events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CohereStreamDelta {
    /// Message fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<CohereStreamMessage>,
}

/// Message fragment within a stream delta
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CohereStreamMessage {
    /// Text content fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CohereStreamContent>,
    /// Tool call fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<CohereToolCall>,
    /// Tool-plan text fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_plan: Option<String>,
}

/// Text fragment within a stream message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CohereStreamContent {
    /// The text fragment
    #[serde(default)]
    pub text: String,
}

/// `message-end` delta payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CohereMessageEndDelta {
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CohereUsage>,
}

// -- Error --

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereErrorBody {
    /// Error message
    #[serde(default)]
    pub message: String,
}
