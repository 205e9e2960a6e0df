//! Anthropic messages API wire format

use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Request --

/// Messages API request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicRequest {
    /// Model identifier
    pub model: String,
    /// Maximum tokens to generate (required by the API)
    pub max_tokens: u32,
    /// System prompt (string or block array)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Value>,
    /// Conversation messages
    pub messages: Vec<AnthropicMessage>,
    /// Tool definitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
    /// Tool choice directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Remaining request fields, forwarded untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Message within a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// `"user"` or `"assistant"`
    pub role: String,
    /// String or array of content blocks
    pub content: AnthropicContent,
}

/// Message content, either plain text or structured blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnthropicContent {
    /// Plain text
    Text(String),
    /// Content block array
    Blocks(Vec<AnthropicContentBlock>),
}

/// Content block within a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    /// Text block
    Text {
        /// The text payload
        text: String,
    },
    /// Image block
    Image {
        /// Image source
        source: AnthropicImageSource,
    },
    /// Tool invocation by the assistant
    ToolUse {
        /// Tool call id
        id: String,
        /// Tool name
        name: String,
        /// Parsed arguments
        input: Value,
    },
    /// Tool result supplied by the caller
    ToolResult {
        /// Id of the tool call being answered
        tool_use_id: String,
        /// Result content (string or nested blocks)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Value>,
        /// Whether the tool reported failure
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// Image source within an image block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicImageSource {
    /// `"base64"` or `"url"`
    #[serde(rename = "type")]
    pub source_type: String,
    /// MIME type for base64 sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Base64 data or URL
    #[serde(default)]
    pub data: String,
}

/// Tool definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicTool {
    /// Tool name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the input
    pub input_schema: Value,
}

// -- Response --

/// Complete messages API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicResponse {
    /// Response identifier
    #[serde(default)]
    pub id: String,
    /// Object type (`"message"`)
    #[serde(default, rename = "type")]
    pub response_type: String,
    /// Always `"assistant"`
    #[serde(default)]
    pub role: String,
    /// Model that produced the response
    #[serde(default)]
    pub model: String,
    /// Content blocks
    #[serde(default)]
    pub content: Vec<AnthropicContentBlock>,
    /// Why generation stopped
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Stop sequence hit, if any
    #[serde(default)]
    pub stop_sequence: Option<String>,
    /// Token usage
    #[serde(default)]
    pub usage: AnthropicUsage,
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnthropicUsage {
    /// Prompt tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Generated tokens
    #[serde(default)]
    pub output_tokens: u32,
}

// -- Streaming --

/// Server-sent stream event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamEvent {
    /// Stream opened; carries response id, model, and input usage
    MessageStart {
        /// Partial message envelope
        message: AnthropicResponse,
    },
    /// A content block began
    ContentBlockStart {
        /// Shared content-block index
        index: u32,
        /// The opening block (text or `tool_use` with id/name)
        content_block: AnthropicContentBlock,
    },
    /// Incremental content for the current block
    ContentBlockDelta {
        /// Shared content-block index
        index: u32,
        /// The delta payload
        delta: AnthropicStreamDelta,
    },
    /// The current content block ended
    ContentBlockStop {
        /// Shared content-block index
        index: u32,
    },
    /// Stop reason and output usage, sent together near stream end
    MessageDelta {
        /// Stop reason / stop sequence
        delta: AnthropicMessageDelta,
        /// Output token usage
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<AnthropicUsage>,
    },
    /// Stream closed
    MessageStop,
    /// Keepalive
    Ping,
    /// Mid-stream error
    Error {
        /// Error details
        error: Value,
    },
}

/// Delta payload within `content_block_delta`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamDelta {
    /// Text fragment
    TextDelta {
        /// The text fragment
        text: String,
    },
    /// Tool-argument JSON fragment
    InputJsonDelta {
        /// The partial JSON string
        partial_json: String,
    },
}

/// Stop data within `message_delta`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicMessageDelta {
    /// Why generation stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    /// Stop sequence hit, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
}

// -- Error --

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicErrorBody {
    /// Error details
    pub error: AnthropicErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicErrorDetail {
    /// Error type (e.g. `overloaded_error`)
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
}
