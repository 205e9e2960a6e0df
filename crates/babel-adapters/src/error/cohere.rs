//! Classification for Cohere v2 errors
//!
//! The body carries only a message, so the HTTP status decides and the
//! message refines the two cases the status cannot distinguish.

use serde_json::Value;

use babel_core::ChatErrorCode;

use crate::protocol::cohere::CohereErrorBody;

use super::Classification;

pub(crate) fn classify(body: &Value) -> Classification {
    let Ok(parsed) = serde_json::from_value::<CohereErrorBody>(body.clone()) else {
        return Classification::default();
    };
    if parsed.message.is_empty() {
        return Classification::default();
    }

    let lowered = parsed.message.to_lowercase();
    let code = if lowered.contains("too many tokens") || lowered.contains("max tokens") {
        Some(ChatErrorCode::ContextTooLong)
    } else if lowered.contains("invalid api token") {
        Some(ChatErrorCode::Authentication)
    } else {
        None
    };

    Classification {
        code,
        error_type: None,
        message: Some(parsed.message),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use babel_core::{ChatErrorCode, Provider};

    use super::super::map_provider_error;

    #[test]
    fn status_decides_for_plain_messages() {
        let raw = json!({"status": 429, "message": "rate limited"});
        let mapped = map_provider_error(&raw, Provider::Cohere);
        assert_eq!(mapped.code, ChatErrorCode::RateLimit);
        assert!(mapped.is_retryable);
    }

    #[test]
    fn message_refinements_beat_the_status() {
        let raw = json!({"status": 400, "message": "too many tokens: prompt exceeds the limit"});
        let mapped = map_provider_error(&raw, Provider::Cohere);
        assert_eq!(mapped.code, ChatErrorCode::ContextTooLong);

        let raw = json!({"status": 401, "message": "invalid api token"});
        let mapped = map_provider_error(&raw, Provider::Cohere);
        assert_eq!(mapped.code, ChatErrorCode::Authentication);
    }
}
