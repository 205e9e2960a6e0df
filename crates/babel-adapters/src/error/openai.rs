//! Classification for the `OpenAI` dialect, Zhipu included
//!
//! Precedence: vendor `code` beats vendor `type` beats the HTTP status.
//! Zhipu speaks the same envelope but uses numeric-string codes.

use serde_json::Value;

use babel_core::{ChatErrorCode, Provider};

use crate::protocol::openai::{OpenAiErrorBody, OpenAiErrorDetail};

use super::Classification;

pub(crate) fn classify(provider: Provider, body: &Value) -> Classification {
    let detail = parse_detail(body);
    let Some(detail) = detail else {
        return Classification::default();
    };

    let code_str = detail.code.as_ref().map(|c| match c {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    let code = code_str
        .as_deref()
        .and_then(|c| {
            if provider == Provider::Zhipu {
                from_zhipu_code(c)
            } else {
                from_code(c)
            }
        })
        .or_else(|| detail.error_type.as_deref().and_then(from_type));

    Classification {
        code,
        error_type: detail.error_type.clone().or(code_str),
        message: (!detail.message.is_empty()).then(|| detail.message.clone()),
    }
}

/// Accept both the `{"error": {...}}` envelope and a bare detail object
fn parse_detail(body: &Value) -> Option<OpenAiErrorDetail> {
    if let Ok(parsed) = serde_json::from_value::<OpenAiErrorBody>(body.clone()) {
        return Some(parsed.error);
    }
    serde_json::from_value::<OpenAiErrorDetail>(body.clone())
        .ok()
        .filter(|d| !d.message.is_empty() || d.error_type.is_some() || d.code.is_some())
}

fn from_code(code: &str) -> Option<ChatErrorCode> {
    Some(match code {
        "context_length_exceeded" | "string_above_max_length" => ChatErrorCode::ContextTooLong,
        "invalid_api_key" | "account_deactivated" => ChatErrorCode::Authentication,
        "model_not_found" => ChatErrorCode::NotFound,
        "insufficient_quota" | "rate_limit_exceeded" => ChatErrorCode::RateLimit,
        "content_filter" | "content_policy_violation" => ChatErrorCode::ContentFiltered,
        _ => return None,
    })
}

/// Zhipu numeric-string codes
fn from_zhipu_code(code: &str) -> Option<ChatErrorCode> {
    Some(match code {
        "1000" | "1001" | "1002" | "1003" | "1004" => ChatErrorCode::Authentication,
        "1110" | "1111" | "1112" => ChatErrorCode::PermissionDenied,
        "1113" => ChatErrorCode::PermissionDenied, // insufficient balance
        "1301" => ChatErrorCode::ContentFiltered,
        "1302" | "1303" | "1305" => ChatErrorCode::RateLimit,
        "1304" => ChatErrorCode::PermissionDenied, // daily call limit
        _ => return None,
    })
}

fn from_type(error_type: &str) -> Option<ChatErrorCode> {
    Some(match error_type {
        "invalid_request_error" => ChatErrorCode::InvalidRequest,
        "authentication_error" => ChatErrorCode::Authentication,
        "permission_error" => ChatErrorCode::PermissionDenied,
        "not_found_error" => ChatErrorCode::NotFound,
        "rate_limit_error" | "insufficient_quota" => ChatErrorCode::RateLimit,
        "server_error" => ChatErrorCode::ServerError,
        "content_filter_error" => ChatErrorCode::ContentFiltered,
        _ => return None,
    })
}
