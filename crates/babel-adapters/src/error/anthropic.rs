//! Classification for Anthropic messages API errors
//!
//! The vendor type string decides; `invalid_request_error` is refined to
//! `ContextTooLong` when the message names the prompt length.

use serde_json::Value;

use babel_core::ChatErrorCode;

use crate::protocol::anthropic::AnthropicErrorBody;

use super::Classification;

pub(crate) fn classify(body: &Value) -> Classification {
    let Ok(parsed) = serde_json::from_value::<AnthropicErrorBody>(body.clone()) else {
        return Classification::default();
    };
    let detail = parsed.error;

    let code = detail.error_type.as_deref().and_then(|t| from_type(t, &detail.message));

    Classification {
        code,
        error_type: detail.error_type,
        message: (!detail.message.is_empty()).then_some(detail.message),
    }
}

fn from_type(error_type: &str, message: &str) -> Option<ChatErrorCode> {
    Some(match error_type {
        "invalid_request_error" => {
            if message.contains("prompt is too long") {
                ChatErrorCode::ContextTooLong
            } else {
                ChatErrorCode::InvalidRequest
            }
        }
        "authentication_error" => ChatErrorCode::Authentication,
        "permission_error" => ChatErrorCode::PermissionDenied,
        "not_found_error" => ChatErrorCode::NotFound,
        "rate_limit_error" => ChatErrorCode::RateLimit,
        "overloaded_error" | "api_error" => ChatErrorCode::ServerError,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use babel_core::Provider;

    use super::super::map_provider_error;
    use super::*;

    #[test]
    fn documented_pairs_map_as_specified() {
        let cases = [
            (529, "overloaded_error", "Overloaded", ChatErrorCode::ServerError, true),
            (429, "rate_limit_error", "Too many requests", ChatErrorCode::RateLimit, true),
            (401, "authentication_error", "invalid x-api-key", ChatErrorCode::Authentication, false),
            (404, "not_found_error", "model not found", ChatErrorCode::NotFound, false),
            (
                400,
                "invalid_request_error",
                "prompt is too long: 250000 tokens",
                ChatErrorCode::ContextTooLong,
                false,
            ),
            (400, "invalid_request_error", "max_tokens required", ChatErrorCode::InvalidRequest, false),
        ];

        for (status, error_type, message, expected, retryable) in cases {
            let raw = json!({
                "status": status,
                "error": {"type": error_type, "message": message},
            });
            let mapped = map_provider_error(&raw, Provider::Anthropic);
            assert_eq!(mapped.code, expected, "{error_type}");
            assert_eq!(mapped.is_retryable, retryable, "{error_type}");
            assert_eq!(mapped.original.error_type.as_deref(), Some(error_type));
        }
    }

    #[test]
    fn unknown_type_falls_back_to_status() {
        let raw = json!({"status": 500, "error": {"type": "weird_error", "message": "?"}});
        let mapped = map_provider_error(&raw, Provider::Anthropic);
        assert_eq!(mapped.code, ChatErrorCode::ServerError);
    }
}
