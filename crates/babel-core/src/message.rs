use serde::{Deserialize, Serialize};

use crate::tool::CommonToolCall;

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommonRole {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool result
    Tool,
}

/// Provider-agnostic view of one conversation message
///
/// Built by a request adapter from the provider's own message shape.
/// Read-only to consumers and discarded after each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonMessage {
    /// Role of the message author
    pub role: CommonRole,
    /// Flattened text content
    pub content: String,
    /// Tool calls made by the assistant, in emission order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<CommonToolCall>>,
}

impl CommonMessage {
    /// Plain text message with no tool calls
    pub fn text(role: CommonRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
        }
    }
}
