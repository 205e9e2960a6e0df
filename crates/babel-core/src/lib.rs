//! Shared vocabulary for the babel adapter layer
//!
//! Provider-agnostic message, tool, usage, and error types that every
//! adapter translates into and out of, plus the traits through which the
//! adapter layer consumes its external collaborators (tokenizer, price
//! lookup, model capabilities).

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod collaborators;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod usage;

pub use collaborators::{ModelCapabilities, ModelPricing, PriceLookup, Tokenizer};
pub use error::{ChatErrorCode, ChatErrorResponse, OriginalError, ProviderError};
pub use message::{CommonMessage, CommonRole};
pub use provider::Provider;
pub use tool::{CommonToolCall, CommonToolDefinition, CommonToolResult, McpContentBlock, UNKNOWN_TOOL_NAME};
pub use usage::{TokenUsage, ToolCompressionStats};
