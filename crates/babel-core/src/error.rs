use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::provider::Provider;

/// Normalized error classification shared by every provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatErrorCode {
    /// Request was malformed or rejected by validation
    InvalidRequest,
    /// Credentials missing or invalid
    Authentication,
    /// Credentials valid but access denied
    PermissionDenied,
    /// Model or resource does not exist
    NotFound,
    /// Upstream rate limit hit
    RateLimit,
    /// Upstream failure
    ServerError,
    /// Conversation exceeds the model's context window
    ContextTooLong,
    /// Output or input blocked by the provider's content filter
    ContentFiltered,
    /// Anything that could not be classified
    Unknown,
}

impl ChatErrorCode {
    /// Fixed, vendor-independent user-facing message for this code
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::InvalidRequest => "The request was invalid. Please check your input and try again.",
            Self::Authentication => "Authentication failed. Please check the configured API key.",
            Self::PermissionDenied => "Access to this model or resource is not permitted.",
            Self::NotFound => "The requested model or resource was not found.",
            Self::RateLimit => "The provider is rate limiting requests. Please retry shortly.",
            Self::ServerError => "The provider encountered an internal error. Please retry shortly.",
            Self::ContextTooLong => "The conversation is too long for this model's context window.",
            Self::ContentFiltered => "The content was blocked by the provider's safety filter.",
            Self::Unknown => "An unexpected error occurred while contacting the provider.",
        }
    }

    /// Whether callers may retry on this code
    ///
    /// Derived strictly from the code, never from vendor retry flags.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::ServerError)
    }
}

/// Diagnostic attribution for a normalized error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalError {
    /// Provider the failing call targeted
    pub provider: Provider,
    /// HTTP status, when one was present on the raw error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Message extracted from the vendor payload
    pub message: String,
    /// Vendor error-type string, when one was present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Depth-bounded defensive serialization of the raw error
    pub raw: Value,
}

/// Normalized error model returned for every failed provider call
///
/// Created fresh per failure and never mutated afterwards, except that the
/// retry-unwrap path in the taxonomy mapper prefixes `message` with an
/// attempt-count note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatErrorResponse {
    /// Normalized classification
    pub code: ChatErrorCode,
    /// User-facing message, looked up from `code`
    pub message: String,
    /// Fixed retryability bit for `code`
    pub is_retryable: bool,
    /// Diagnostic attribution
    pub original: OriginalError,
}

impl ChatErrorResponse {
    /// Build a response for `code`, filling the fixed message and
    /// retryability from the taxonomy
    pub fn new(code: ChatErrorCode, original: OriginalError) -> Self {
        Self {
            code,
            message: code.user_message().to_owned(),
            is_retryable: code.is_retryable(),
            original,
        }
    }
}

/// Carrier for an already-normalized error
///
/// When one internal call delegates to another provider (an agent invoking
/// a sub-agent on a different vendor), wrapping the normalized response in
/// this error preserves the original provider attribution instead of
/// letting the outer call's provider context overwrite it.
#[derive(Debug, Clone, Error)]
#[error("{} error: {}", .response.original.provider, .response.message)]
pub struct ProviderError {
    /// The normalized error, with its original attribution intact
    pub response: ChatErrorResponse,
}

impl ProviderError {
    /// Wrap a normalized response
    pub const fn new(response: ChatErrorResponse) -> Self {
        Self { response }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_set_is_fixed() {
        let retryable = [ChatErrorCode::RateLimit, ChatErrorCode::ServerError];
        let not_retryable = [
            ChatErrorCode::InvalidRequest,
            ChatErrorCode::Authentication,
            ChatErrorCode::PermissionDenied,
            ChatErrorCode::NotFound,
            ChatErrorCode::ContextTooLong,
            ChatErrorCode::ContentFiltered,
            ChatErrorCode::Unknown,
        ];
        for code in retryable {
            assert!(code.is_retryable());
        }
        for code in not_retryable {
            assert!(!code.is_retryable());
        }
    }

    #[test]
    fn provider_error_keeps_attribution() {
        let original = OriginalError {
            provider: Provider::Gemini,
            status: Some(429),
            message: "quota".to_owned(),
            error_type: Some("RESOURCE_EXHAUSTED".to_owned()),
            raw: serde_json::json!({}),
        };
        let wrapped = ProviderError::new(ChatErrorResponse::new(ChatErrorCode::RateLimit, original));
        assert_eq!(wrapped.response.original.provider, Provider::Gemini);
        assert!(wrapped.to_string().contains("gemini"));
    }
}
