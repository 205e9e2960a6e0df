//! Error taxonomy mapper
//!
//! One entry point, [`map_provider_error`], turns whatever a failed
//! provider call produced into the normalized [`ChatErrorResponse`]. The
//! mapper never panics and never returns an error; anything it cannot
//! classify lands on `Unknown`.

mod anthropic;
mod bedrock;
mod cohere;
mod extract;
mod gemini;
mod openai;

use http::StatusCode;
use serde_json::Value;

use babel_core::{ChatErrorCode, ChatErrorResponse, OriginalError, Provider};

/// Structured record a per-provider parser produced from the body
#[derive(Debug, Default)]
pub(crate) struct Classification {
    /// Normalized code; `None` falls back to the status table
    pub code: Option<ChatErrorCode>,
    /// Vendor error-type string, for attribution
    pub error_type: Option<String>,
    /// Vendor message, as a message-extraction fallback
    pub message: Option<String>,
}

/// Map a raw provider error into the normalized taxonomy
pub fn map_provider_error(raw: &Value, provider: Provider) -> ChatErrorResponse {
    // Retry wrappers carry the attempts list and the final underlying
    // error; classification comes from the latter
    if let Some(last) = raw.get("lastError") {
        if let Some(attempts) = raw.get("attempts").and_then(Value::as_array) {
            let mut mapped = map_inner(last, provider);
            mapped.message = format!("(after {} attempts) {}", attempts.len(), mapped.message);
            return mapped;
        }
    }
    map_inner(raw, provider)
}

fn map_inner(raw: &Value, provider: Provider) -> ChatErrorResponse {
    let status = extract::status_code(raw);
    let body = extract::response_body(raw);

    let classification = match provider {
        Provider::OpenAi | Provider::Zhipu | Provider::Vllm | Provider::Ollama | Provider::Mistral => {
            openai::classify(provider, body)
        }
        Provider::Anthropic => anthropic::classify(body),
        Provider::Gemini => gemini::classify(body),
        Provider::Bedrock => bedrock::classify(body),
        Provider::Cohere => cohere::classify(body),
    };

    let code = classification.code.unwrap_or_else(|| code_from_status(status));
    let message = extract::best_message(raw, body, classification.message);

    tracing::debug!(
        %provider,
        status,
        code = ?code,
        "mapped provider error",
    );

    ChatErrorResponse::new(
        code,
        OriginalError {
            provider,
            status,
            message,
            error_type: classification.error_type,
            raw: extract::sanitize(raw, 0),
        },
    )
}

/// Fixed HTTP status → code table, the classification of last resort
pub(crate) fn code_from_status(status: Option<u16>) -> ChatErrorCode {
    match status {
        Some(400 | 422) => ChatErrorCode::InvalidRequest,
        Some(401) => ChatErrorCode::Authentication,
        Some(403) => ChatErrorCode::PermissionDenied,
        Some(404) => ChatErrorCode::NotFound,
        Some(413) => ChatErrorCode::ContextTooLong,
        Some(429) => ChatErrorCode::RateLimit,
        Some(s) if StatusCode::from_u16(s).is_ok_and(|c| c.is_server_error()) => ChatErrorCode::ServerError,
        _ => ChatErrorCode::Unknown,
    }
}
