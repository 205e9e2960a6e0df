use serde::{Deserialize, Serialize};

/// Token usage for one completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt
    pub input_tokens: u32,
    /// Tokens generated by the model
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Combined input and output token count
    pub const fn total(self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Outcome of one TOON compression pass over a request's tool results
///
/// Computed once per request and attached to billing/interaction records
/// by the gateway handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCompressionStats {
    /// Token count of the tool results before compression
    pub tokens_before: u32,
    /// Token count after compression (equals `tokens_before` when skipped)
    pub tokens_after: u32,
    /// Input-token cost saved, in dollars
    pub cost_savings: f64,
    /// Whether any tool result was actually rewritten
    pub was_effective: bool,
    /// Whether the request carried tool results at all
    pub had_tool_results: bool,
}
