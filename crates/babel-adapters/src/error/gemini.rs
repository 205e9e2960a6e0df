//! Classification for Gemini `google.rpc.Status` errors
//!
//! Precedence: an `ErrorInfo.reason` from the `details` array beats the
//! gRPC status string, which beats the HTTP status. Upstream proxies
//! sometimes re-encode the whole status object as a JSON string one or
//! more times, so the reason search un-escapes nested strings up to the
//! shared depth bound.

use serde_json::Value;

use babel_core::ChatErrorCode;

use crate::protocol::gemini::GeminiErrorBody;

use super::Classification;
use super::extract::MAX_DEPTH;

pub(crate) fn classify(body: &Value) -> Classification {
    let Some(detail) = parse_body(body, 0) else {
        return Classification::default();
    };

    let reason = detail.details.iter().find_map(|d| error_info_reason(d, 0));

    let code = reason
        .as_deref()
        .and_then(from_reason)
        .or_else(|| detail.status.as_deref().and_then(from_grpc_status));

    Classification {
        code,
        error_type: reason.or(detail.status),
        message: (!detail.message.is_empty()).then_some(detail.message),
    }
}

/// Parse the status body, un-escaping JSON-encoded wrappers
fn parse_body(body: &Value, depth: usize) -> Option<crate::protocol::gemini::GeminiErrorDetail> {
    if depth >= MAX_DEPTH {
        return None;
    }
    match body {
        Value::String(s) => parse_body(&serde_json::from_str(s).ok()?, depth + 1),
        _ => serde_json::from_value::<GeminiErrorBody>(body.clone()).ok().map(|b| b.error),
    }
}

/// Dig a `google.rpc.ErrorInfo` reason out of one detail entry
fn error_info_reason(detail: &Value, depth: usize) -> Option<String> {
    if depth >= MAX_DEPTH {
        return None;
    }
    match detail {
        Value::String(s) => error_info_reason(&serde_json::from_str(s).ok()?, depth + 1),
        Value::Object(map) => {
            let is_error_info = map
                .get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.ends_with("ErrorInfo"));
            if is_error_info {
                map.get("reason").and_then(Value::as_str).map(str::to_owned)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn from_reason(reason: &str) -> Option<ChatErrorCode> {
    Some(match reason {
        "API_KEY_INVALID" | "API_KEY_SERVICE_BLOCKED" | "CREDENTIALS_MISSING" => ChatErrorCode::Authentication,
        "PERMISSION_DENIED" | "CONSUMER_SUSPENDED" | "BILLING_DISABLED" => ChatErrorCode::PermissionDenied,
        "RATE_LIMIT_EXCEEDED" | "QUOTA_EXCEEDED" | "RESOURCE_EXHAUSTED" => ChatErrorCode::RateLimit,
        "MODEL_NOT_FOUND" => ChatErrorCode::NotFound,
        "SAFETY" => ChatErrorCode::ContentFiltered,
        _ => return None,
    })
}

fn from_grpc_status(status: &str) -> Option<ChatErrorCode> {
    Some(match status {
        "INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "OUT_OF_RANGE" => ChatErrorCode::InvalidRequest,
        "UNAUTHENTICATED" => ChatErrorCode::Authentication,
        "PERMISSION_DENIED" => ChatErrorCode::PermissionDenied,
        "NOT_FOUND" => ChatErrorCode::NotFound,
        "RESOURCE_EXHAUSTED" => ChatErrorCode::RateLimit,
        "UNAVAILABLE" | "INTERNAL" | "DEADLINE_EXCEEDED" => ChatErrorCode::ServerError,
        _ => return None,
    })
}
