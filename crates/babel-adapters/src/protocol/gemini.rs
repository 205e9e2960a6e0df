//! Gemini / Vertex `generateContent` wire format

use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Request --

/// `generateContent` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Conversation contents
    pub contents: Vec<GeminiContent>,
    /// System instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    /// Generation parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<Value>,
    /// Tool declarations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GeminiTool>>,
    /// Function-calling configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<Value>,
    /// Remaining request fields, forwarded untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Content object: a role plus ordered parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    /// `"user"` or `"model"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// Part within a content object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeminiPart {
    /// Text part
    Text(String),
    /// Inline binary data (images)
    InlineData(GeminiInlineData),
    /// Function call emitted by the model — carries no id
    FunctionCall(GeminiFunctionCall),
    /// Function response supplied by the caller
    FunctionResponse(GeminiFunctionResponse),
}

/// Inline binary data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    /// MIME type
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

/// Function call part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionCall {
    /// Function name
    pub name: String,
    /// Complete arguments object
    #[serde(default)]
    pub args: Value,
}

/// Function response part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionResponse {
    /// Function name
    pub name: String,
    /// Response payload
    pub response: Value,
}

/// Tool declaration wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    /// Declared functions
    #[serde(default)]
    pub function_declarations: Vec<GeminiFunctionDeclaration>,
}

/// Function declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiFunctionDeclaration {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

// -- Response / streaming --

/// `generateContent` response; streaming sends one of these per SSE event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<GeminiUsageMetadata>,
    /// Model version string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Response identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

/// Generated candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// Generated content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<GeminiContent>,
    /// Why generation stopped (`"STOP"`, `"MAX_TOKENS"`, …)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Candidate index
    #[serde(default)]
    pub index: u32,
}

/// Token usage metadata
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_token_count: u32,
    /// Generated tokens
    #[serde(default)]
    pub candidates_token_count: u32,
    /// Total tokens
    #[serde(default)]
    pub total_token_count: u32,
}

// -- Error --

/// Error response body (google.rpc.Status shaped)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiErrorBody {
    /// Error details
    pub error: GeminiErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiErrorDetail {
    /// gRPC-style numeric code
    #[serde(default)]
    pub code: Option<u32>,
    /// Error message
    #[serde(default)]
    pub message: String,
    /// gRPC-style status string (`"INVALID_ARGUMENT"`, …)
    #[serde(default)]
    pub status: Option<String>,
    /// Structured detail entries; may contain a
    /// `google.rpc.ErrorInfo` with a machine-readable `reason`
    #[serde(default)]
    pub details: Vec<Value>,
}
