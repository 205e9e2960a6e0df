//! Classification for Bedrock exceptions
//!
//! Precedence: the `model_context_window_exceeded` message substring
//! beats the exception-type mapping, which beats the HTTP status. The
//! exception type may arrive namespaced
//! (`com.amazonaws...#ValidationException`); only the leaf name matters.

use serde_json::Value;

use babel_core::ChatErrorCode;

use crate::protocol::bedrock::BedrockErrorBody;

use super::Classification;

pub(crate) fn classify(body: &Value) -> Classification {
    let Ok(parsed) = serde_json::from_value::<BedrockErrorBody>(body.clone()) else {
        return Classification::default();
    };

    let leaf = parsed
        .exception_type
        .as_deref()
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_owned());

    let code = if parsed.message.contains("model_context_window_exceeded") {
        Some(ChatErrorCode::ContextTooLong)
    } else {
        leaf.as_deref().and_then(from_exception)
    };

    Classification {
        code,
        error_type: leaf,
        message: (!parsed.message.is_empty()).then_some(parsed.message),
    }
}

fn from_exception(exception: &str) -> Option<ChatErrorCode> {
    Some(match exception {
        "ValidationException" => ChatErrorCode::InvalidRequest,
        "UnrecognizedClientException" | "ExpiredTokenException" | "InvalidSignatureException" => {
            ChatErrorCode::Authentication
        }
        "AccessDeniedException" => ChatErrorCode::PermissionDenied,
        "ResourceNotFoundException" => ChatErrorCode::NotFound,
        "ThrottlingException" | "TooManyRequestsException" => ChatErrorCode::RateLimit,
        "InternalServerException" | "ServiceUnavailableException" | "ModelErrorException"
        | "ModelTimeoutException" | "ModelNotReadyException" => ChatErrorCode::ServerError,
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
            ("ValidationException", "Malformed input request", ChatErrorCode::InvalidRequest, false),
            ("ThrottlingException", "Too many requests", ChatErrorCode::RateLimit, true),
            ("AccessDeniedException", "not authorized", ChatErrorCode::PermissionDenied, false),
            ("ResourceNotFoundException", "model not found", ChatErrorCode::NotFound, false),
            ("ServiceUnavailableException", "try again", ChatErrorCode::ServerError, true),
        ];
        for (exception, message, expected, retryable) in cases {
            let raw = json!({"__type": exception, "message": message});
            let mapped = map_provider_error(&raw, Provider::Bedrock);
            assert_eq!(mapped.code, expected, "{exception}");
            assert_eq!(mapped.is_retryable, retryable, "{exception}");
        }
    }

    #[test]
    fn context_window_substring_beats_the_exception_type() {
        let raw = json!({
            "__type": "ValidationException",
            "message": "Input is too long: model_context_window_exceeded",
        });
        let mapped = map_provider_error(&raw, Provider::Bedrock);
        assert_eq!(mapped.code, ChatErrorCode::ContextTooLong);
    }

    #[test]
    fn namespaced_exception_types_use_the_leaf_name() {
        let body = json!({
            "__type": "com.amazonaws.bedrockruntime#ThrottlingException",
            "message": "slow down",
        });
        let classification = classify(&body);
        assert_eq!(classification.code, Some(ChatErrorCode::RateLimit));
        assert_eq!(classification.error_type.as_deref(), Some("ThrottlingException"));
    }
}
