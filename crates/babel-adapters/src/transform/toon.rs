//! Token-oriented re-encoding of JSON tool results
//!
//! JSON spends tokens on braces, quotes and repeated keys. For the
//! payloads tools actually return (rows of uniform objects, mostly), a
//! tabular rendering with one header line is markedly cheaper. A result
//! is rewritten only when the re-encoding is strictly smaller in tokens,
//! so the pass is idempotent: compressed output is a plain string, which
//! never shrinks further and is left alone on the next application.

use std::collections::HashMap;

use serde_json::Value;

use babel_core::{CommonToolResult, McpContentBlock, PriceLookup, Tokenizer, ToolCompressionStats};

/// Render a JSON value in token-oriented form
pub fn encode(value: &Value) -> String {
    let mut out = String::new();
    encode_value(value, 0, &mut out);
    out
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

/// Keys shared by every element of a uniform scalar-object array
fn tabular_keys(items: &[Value]) -> Option<Vec<&str>> {
    let first = items.first()?.as_object()?;
    if first.is_empty() {
        return None;
    }
    let keys: Vec<&str> = first.keys().map(String::as_str).collect();
    for item in items {
        let obj = item.as_object()?;
        if obj.len() != keys.len() {
            return None;
        }
        for key in &keys {
            if !obj.get(*key).is_some_and(is_scalar) {
                return None;
            }
        }
    }
    Some(keys)
}

fn is_scalar(value: &Value) -> bool {
    !(value.is_object() || value.is_array())
}

/// Render a scalar cell, quoting only when the bare form would be
/// ambiguous against the row syntax
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => {
            let needs_quoting = s.is_empty()
                || s.contains([',', ':', '\n', '"'])
                || s.starts_with(' ')
                || s.ends_with(' ')
                || matches!(s.as_str(), "true" | "false" | "null")
                || s.parse::<f64>().is_ok();
            if needs_quoting {
                Value::String(s.clone()).to_string()
            } else {
                s.clone()
            }
        }
        other => other.to_string(),
    }
}

fn encode_value(value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::Array(items) => {
            if let Some(keys) = tabular_keys(items) {
                indent(depth, out);
                out.push_str(&keys.join(","));
                out.push_str(":\n");
                for item in items {
                    indent(depth, out);
                    let row: Vec<String> = keys
                        .iter()
                        .map(|key| item.get(*key).map_or_else(String::new, scalar))
                        .collect();
                    out.push_str(&row.join(","));
                    out.push('\n');
                }
            } else {
                for item in items {
                    if is_scalar(item) {
                        indent(depth, out);
                        out.push_str("- ");
                        out.push_str(&scalar(item));
                        out.push('\n');
                    } else {
                        indent(depth, out);
                        out.push_str("-\n");
                        encode_value(item, depth + 1, out);
                    }
                }
            }
        }
        Value::Object(map) => {
            for (key, val) in map {
                indent(depth, out);
                out.push_str(key);
                out.push(':');
                if is_scalar(val) {
                    out.push(' ');
                    out.push_str(&scalar(val));
                    out.push('\n');
                } else {
                    out.push('\n');
                    encode_value(val, depth + 1, out);
                }
            }
        }
        other => {
            indent(depth, out);
            out.push_str(&scalar(other));
            out.push('\n');
        }
    }
}

/// Text form of a tool result's content, as the model would see it
fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compress a request's tool results where the re-encoding pays off
///
/// Returns the id-keyed content updates to apply plus the stats for the
/// billing record. Results that are plain strings, MCP block arrays
/// (those carry images and go through the image policy instead), or
/// whose re-encoding is not strictly smaller are left untouched.
pub async fn compress_tool_results(
    results: &[CommonToolResult],
    model: &str,
    tokenizer: &dyn Tokenizer,
    prices: &dyn PriceLookup,
) -> (HashMap<String, Value>, ToolCompressionStats) {
    let mut updates = HashMap::new();
    let mut stats = ToolCompressionStats {
        had_tool_results: !results.is_empty(),
        ..Default::default()
    };

    for result in results {
        let before = tokenizer.count_tokens(&content_text(&result.content)).await;
        stats.tokens_before += before;

        let compressible = (result.content.is_array() || result.content.is_object())
            && McpContentBlock::parse_blocks(&result.content).is_none();
        if !compressible {
            stats.tokens_after += before;
            continue;
        }

        let encoded = encode(&result.content);
        let after = tokenizer.count_tokens(&encoded).await;
        if after < before {
            tracing::debug!(
                tool = %result.name,
                tokens_before = before,
                tokens_after = after,
                "compressed tool result",
            );
            updates.insert(result.id.clone(), Value::String(encoded));
            stats.tokens_after += after;
            stats.was_effective = true;
        } else {
            stats.tokens_after += before;
        }
    }

    let saved = stats.tokens_before.saturating_sub(stats.tokens_after);
    if saved > 0 {
        if let Some(pricing) = prices.price_for(model).await {
            stats.cost_savings = f64::from(saved) / 1_000_000.0 * pricing.input_per_million;
        }
    }
    (updates, stats)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use babel_core::ModelPricing;

    use super::*;

    /// Byte-count tokenizer, deterministic for gain comparisons
    struct ByteTokenizer;

    #[async_trait]
    impl Tokenizer for ByteTokenizer {
        async fn count_tokens(&self, text: &str) -> u32 {
            u32::try_from(text.len()).unwrap_or(u32::MAX)
        }
    }

    struct FlatPrice;

    #[async_trait]
    impl PriceLookup for FlatPrice {
        async fn price_for(&self, _model: &str) -> Option<ModelPricing> {
            Some(ModelPricing {
                input_per_million: 2.0,
                output_per_million: 8.0,
            })
        }
    }

    fn result(id: &str, content: Value) -> CommonToolResult {
        CommonToolResult {
            id: id.to_owned(),
            name: "search".to_owned(),
            content,
            is_error: false,
        }
    }

    #[test]
    fn uniform_arrays_render_tabular() {
        let rows = json!([
            {"id": 1, "name": "alpha"},
            {"id": 2, "name": "beta"},
        ]);
        assert_eq!(encode(&rows), "id,name:\n1,alpha\n2,beta\n");
    }

    #[test]
    fn mixed_values_render_indented() {
        let value = json!({"ok": true, "items": [1, 2]});
        assert_eq!(encode(&value), "ok: true\nitems:\n  - 1\n  - 2\n");
    }

    #[test]
    fn ambiguous_strings_are_quoted() {
        let rows = json!([{"v": "a,b"}, {"v": "42"}]);
        assert_eq!(encode(&rows), "v:\n\"a,b\"\n\"42\"\n");
    }

    #[tokio::test]
    async fn rewrites_only_when_strictly_smaller() {
        let rows: Vec<Value> = (0..20).map(|i| json!({"id": i, "name": format!("row{i}")})).collect();
        let results = vec![
            result("call_1", Value::Array(rows)),
            result("call_2", json!("already plain text")),
        ];

        let (updates, stats) = compress_tool_results(&results, "m", &ByteTokenizer, &FlatPrice).await;
        assert!(updates.contains_key("call_1"));
        assert!(!updates.contains_key("call_2"));
        assert!(stats.was_effective);
        assert!(stats.had_tool_results);
        assert!(stats.tokens_after < stats.tokens_before);
        assert!(stats.cost_savings > 0.0);
    }

    #[tokio::test]
    async fn second_application_is_a_no_op() {
        let rows: Vec<Value> = (0..20).map(|i| json!({"id": i, "name": format!("row{i}")})).collect();
        let first = vec![result("call_1", Value::Array(rows))];
        let (updates, _) = compress_tool_results(&first, "m", &ByteTokenizer, &FlatPrice).await;
        let compressed = updates.get("call_1").cloned().unwrap();

        let second = vec![result("call_1", compressed)];
        let (updates, stats) = compress_tool_results(&second, "m", &ByteTokenizer, &FlatPrice).await;
        assert!(updates.is_empty());
        assert!(!stats.was_effective);
        assert_eq!(stats.tokens_before, stats.tokens_after);
    }

    #[tokio::test]
    async fn mcp_block_arrays_are_left_for_the_image_policy() {
        let blocks = json!([{"type": "image", "data": "aGk=", "mimeType": "image/png"}]);
        let (updates, _) = compress_tool_results(&[result("call_1", blocks)], "m", &ByteTokenizer, &FlatPrice).await;
        assert!(updates.is_empty());
    }
}
