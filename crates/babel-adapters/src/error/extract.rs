//! Field probing, message unwrapping, and defensive serialization
//!
//! Raw errors arrive in whatever shape the upstream client produced: a
//! plain vendor body, a transport wrapper with the body nested under
//! `response`, or a vendor body re-encoded as a JSON string inside
//! another error's `message`. Everything here is bounded-depth and
//! infallible.

use serde_json::Value;

/// Recursion bound for unwrapping and serialization
pub(crate) const MAX_DEPTH: usize = 10;

/// Clip bound for strings in the sanitized raw value
const MAX_STRING_LEN: usize = 2_000;

/// Marker substituted for content beyond the depth or length bounds
const TRUNCATED: &str = "[Truncated]";

/// Probe the raw error for an HTTP status code
pub(crate) fn status_code(raw: &Value) -> Option<u16> {
    let candidates = [
        raw.get("status"),
        raw.get("statusCode"),
        raw.pointer("/response/status"),
        raw.get("code"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_u64)
        .find_map(|n| {
            let status = u16::try_from(n).ok()?;
            (100..=599).contains(&status).then_some(status)
        })
}

/// Probe the raw error for the vendor response body
///
/// Client-library wrappers nest the body under `response.data` or
/// `response.body`; plain objects are their own body.
pub(crate) fn response_body(raw: &Value) -> &Value {
    [raw.pointer("/response/data"), raw.pointer("/response/body")]
        .into_iter()
        .flatten()
        .find(|v| v.is_object() || v.is_string())
        .unwrap_or(raw)
}

fn looks_like_json(s: &str) -> bool {
    s.starts_with('{') || s.starts_with('[')
}

/// Deepest plain-text message reachable through nested `message`/`error`
/// fields, un-escaping JSON-encoded strings along the way
pub(crate) fn deepest_message(value: &Value, depth: usize) -> Option<String> {
    if depth >= MAX_DEPTH {
        return None;
    }
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if looks_like_json(trimmed) {
                if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                    return deepest_message(&parsed, depth + 1);
                }
                return None;
            }
            Some(trimmed.to_owned())
        }
        Value::Object(map) => ["message", "error"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|nested| deepest_message(nested, depth + 1)),
        _ => None,
    }
}

/// Most human-meaningful message for the raw error
pub(crate) fn best_message(raw: &Value, body: &Value, vendor_message: Option<String>) -> String {
    deepest_message(body, 0)
        .or_else(|| deepest_message(raw, 0))
        .or(vendor_message)
        .unwrap_or_else(|| "Unknown provider error".to_owned())
}

/// Depth-bounded defensive copy of the raw error
///
/// Always re-serializable: content past the depth bound and oversized
/// strings are replaced or clipped with the truncation marker.
pub(crate) fn sanitize(value: &Value, depth: usize) -> Value {
    if depth >= MAX_DEPTH {
        return Value::String(TRUNCATED.to_owned());
    }
    match value {
        Value::String(s) if s.len() > MAX_STRING_LEN => {
            let mut cut = MAX_STRING_LEN;
            while !s.is_char_boundary(cut) {
                cut -= 1;
            }
            Value::String(format!("{}{TRUNCATED}", &s[..cut]))
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| sanitize(v, depth + 1)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize(v, depth + 1)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_probing_tries_each_field() {
        assert_eq!(status_code(&json!({"status": 429})), Some(429));
        assert_eq!(status_code(&json!({"statusCode": 404})), Some(404));
        assert_eq!(status_code(&json!({"response": {"status": 500}})), Some(500));
        assert_eq!(status_code(&json!({"code": 403})), Some(403));
        // Vendor codes outside the HTTP range are not statuses
        assert_eq!(status_code(&json!({"code": 1302})), None);
        assert_eq!(status_code(&json!({"message": "x"})), None);
    }

    #[test]
    fn nested_json_strings_unwrap_to_the_deepest_plain_text() {
        let inner = json!({"error": {"message": "quota exhausted"}}).to_string();
        let outer = json!({"message": inner});
        assert_eq!(deepest_message(&outer, 0).as_deref(), Some("quota exhausted"));
    }

    #[test]
    fn unwrapping_is_depth_bounded() {
        let mut nested = json!({"message": "bottom"});
        for _ in 0..15 {
            nested = json!({"message": nested.to_string()});
        }
        // Must terminate; the bottom is unreachable within the bound
        assert_eq!(deepest_message(&nested, 0), None);
    }

    #[test]
    fn sanitize_bounds_depth_and_string_length() {
        let mut deep = json!("bottom");
        for _ in 0..15 {
            deep = json!({"inner": deep});
        }
        let safe = sanitize(&deep, 0);
        assert!(safe.to_string().contains(TRUNCATED));
        // Round-trips through serialization
        let text = serde_json::to_string(&safe).unwrap();
        let _: Value = serde_json::from_str(&text).unwrap();

        let long = Value::String("x".repeat(5_000));
        let clipped = sanitize(&long, 0);
        assert!(clipped.as_str().unwrap().ends_with(TRUNCATED));
        assert!(clipped.as_str().unwrap().len() < 5_000);
    }
}
