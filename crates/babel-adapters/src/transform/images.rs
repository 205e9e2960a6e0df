//! Image and large-payload policy for tool-result content
//!
//! Models without image input get a count-based text placeholder in place
//! of MCP image blocks. Models with image input get the blocks converted
//! to the provider's native shape by the request adapter — except blocks
//! whose estimated decoded size exceeds the ceiling, which become a fixed
//! placeholder regardless of capability. Oversized text output from
//! browser-style tools is truncated.

use base64::decoded_len_estimate;

use babel_core::McpContentBlock;

/// Decoded-size ceiling for forwarded images
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

/// Placeholder for an image over the size ceiling
pub const OVERSIZED_IMAGE_PLACEHOLDER: &str = "[image too large to forward]";

/// Byte limit for browser-tool text output before truncation
pub const BROWSER_OUTPUT_LIMIT: usize = 50_000;

/// Name fragments identifying browser-style tools with huge outputs
const BROWSER_TOOL_PATTERNS: &[&str] = &["browser", "playwright", "puppeteer", "navigate", "screenshot", "snapshot"];

/// Policy-filtered content block, ready for provider-native rendering
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyBlock {
    /// Text to render as a provider text block
    Text(String),
    /// Image that passed the policy; the adapter renders the native shape
    Image {
        /// Base64-encoded bytes
        data: String,
        /// MIME type
        mime_type: String,
    },
}

/// Count-based placeholder for images a model cannot accept
fn removed_images_placeholder(count: usize) -> String {
    format!("[{count} image(s) removed - model does not support image inputs]")
}

/// Apply the image policy to one tool result's MCP blocks
pub fn apply_image_policy(blocks: &[McpContentBlock], supports_images: bool) -> Vec<PolicyBlock> {
    let mut out = Vec::with_capacity(blocks.len());
    let mut removed = 0usize;

    for block in blocks {
        match block {
            McpContentBlock::Text { text } => out.push(PolicyBlock::Text(text.clone())),
            McpContentBlock::Image { data, mime_type } => {
                if !supports_images {
                    removed += 1;
                } else if decoded_len_estimate(data.len()) > MAX_IMAGE_BYTES {
                    out.push(PolicyBlock::Text(OVERSIZED_IMAGE_PLACEHOLDER.to_owned()));
                } else {
                    out.push(PolicyBlock::Image {
                        data: data.clone(),
                        mime_type: mime_type.clone(),
                    });
                }
            }
        }
    }

    if removed > 0 {
        out.push(PolicyBlock::Text(removed_images_placeholder(removed)));
    }
    out
}

/// Truncate oversized output from browser-style tools
///
/// Non-browser tools and small payloads come back unchanged.
pub fn truncate_browser_output(tool_name: &str, text: &str) -> Option<String> {
    let lowered = tool_name.to_lowercase();
    if !BROWSER_TOOL_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return None;
    }
    if text.len() <= BROWSER_OUTPUT_LIMIT {
        return None;
    }
    let mut cut = BROWSER_OUTPUT_LIMIT;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut truncated = text[..cut].to_owned();
    truncated.push_str("\n[output truncated]");
    Some(truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_block(data: &str) -> McpContentBlock {
        McpContentBlock::Image {
            data: data.to_owned(),
            mime_type: "image/png".to_owned(),
        }
    }

    #[test]
    fn images_removed_for_incapable_model() {
        let blocks = vec![
            McpContentBlock::Text { text: "result".to_owned() },
            image_block("aGVsbG8="),
        ];
        let out = apply_image_policy(&blocks, false);
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[1],
            PolicyBlock::Text("[1 image(s) removed - model does not support image inputs]".to_owned())
        );
        assert!(!out.iter().any(|b| matches!(b, PolicyBlock::Image { .. })));
    }

    #[test]
    fn images_kept_for_capable_model() {
        let out = apply_image_policy(&[image_block("aGVsbG8=")], true);
        assert!(matches!(&out[0], PolicyBlock::Image { mime_type, .. } if mime_type == "image/png"));
    }

    #[test]
    fn oversized_image_replaced_even_when_capable() {
        // Base64 long enough to decode past the ceiling
        let huge = "A".repeat(MAX_IMAGE_BYTES * 2);
        let out = apply_image_policy(&[image_block(&huge)], true);
        assert_eq!(out[0], PolicyBlock::Text(OVERSIZED_IMAGE_PLACEHOLDER.to_owned()));
    }

    #[test]
    fn browser_output_truncated_only_over_limit() {
        let big = "x".repeat(BROWSER_OUTPUT_LIMIT + 10);
        assert!(truncate_browser_output("browser_snapshot", &big).unwrap().ends_with("[output truncated]"));
        assert!(truncate_browser_output("browser_snapshot", "small").is_none());
        assert!(truncate_browser_output("calculator", &big).is_none());
    }
}
