use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name used when a tool result cannot be matched back to its call
pub const UNKNOWN_TOOL_NAME: &str = "unknown";

/// A tool call emitted by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonToolCall {
    /// Vendor tool-call identifier, unique within a turn
    ///
    /// Synthesized by the adapter when the vendor omits one; an empty id
    /// would break result-to-call matching downstream.
    pub id: String,
    /// Name of the tool being invoked
    pub name: String,
    /// Arguments, parsed as JSON when possible
    ///
    /// Invalid argument JSON degrades to an empty object rather than an
    /// error.
    pub arguments: Value,
}

/// A tool result returned into the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonToolResult {
    /// Id of the tool call this result answers
    pub id: String,
    /// Tool name, `"unknown"` when the call lookup fails
    pub name: String,
    /// Result content: parsed JSON when possible, else the raw string
    pub content: Value,
    /// Whether the tool reported failure
    #[serde(default)]
    pub is_error: bool,
}

/// MCP tool definition declared on the inbound request
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonToolDefinition {
    /// Tool name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON-schema-shaped input declaration
    pub input_schema: Value,
}

/// Content block inside an MCP tool result
///
/// Tool results may arrive as plain strings, arbitrary JSON, or arrays of
/// these blocks; the image policy in the adapter layer operates on the
/// block form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpContentBlock {
    /// Text block
    Text {
        /// The text payload
        text: String,
    },
    /// Base64 image block
    Image {
        /// Base64-encoded image bytes
        data: String,
        /// MIME type, e.g. `image/png`
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl McpContentBlock {
    /// Parse a tool-result content value into MCP blocks, when it is one
    ///
    /// Returns `None` for plain strings and non-block JSON; callers fall
    /// back to treating the value as opaque content.
    pub fn parse_blocks(content: &Value) -> Option<Vec<Self>> {
        let items = content.as_array()?;
        let blocks: Vec<Self> = items
            .iter()
            .map(|item| serde_json::from_value(item.clone()).ok())
            .collect::<Option<_>>()?;
        if blocks.is_empty() { None } else { Some(blocks) }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_mcp_block_arrays() {
        let content = json!([
            {"type": "text", "text": "hello"},
            {"type": "image", "data": "aGk=", "mimeType": "image/png"},
        ]);
        let blocks = McpContentBlock::parse_blocks(&content).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[1], McpContentBlock::Image { .. }));
    }

    #[test]
    fn rejects_non_block_content() {
        assert!(McpContentBlock::parse_blocks(&json!("plain string")).is_none());
        assert!(McpContentBlock::parse_blocks(&json!({"rows": [1, 2]})).is_none());
        assert!(McpContentBlock::parse_blocks(&json!([{"kind": "other"}])).is_none());
    }
}
