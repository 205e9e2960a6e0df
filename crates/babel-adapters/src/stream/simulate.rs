//! Simulated streams from buffered responses
//!
//! Some routes buffer the complete upstream response (e.g. when a policy
//! layer must inspect it) and then replay it to a caller that asked for
//! streaming. This is the one place where wire chunks are synthesized
//! rather than passed through.

use serde_json::Value;

use babel_core::Provider;

use crate::protocol::anthropic::AnthropicResponse;
use crate::protocol::openai::{
    OpenAiResponse, OpenAiStreamChoice, OpenAiStreamChunk, OpenAiStreamDelta, OpenAiStreamFunction,
    OpenAiStreamToolCall,
};

use super::{frame_data, frame_event};

/// Render a complete provider response as a provider-shaped chunk sequence
///
/// Returns fully framed SSE blocks, ready to write to the caller, ending
/// with the provider's natural terminator.
pub fn simulate_stream(provider: Provider, response: &Value) -> Vec<String> {
    match provider {
        Provider::OpenAi | Provider::Zhipu | Provider::Vllm | Provider::Ollama | Provider::Mistral => {
            simulate_openai(response)
        }
        Provider::Anthropic => simulate_anthropic(response),
        // A Gemini response is already a valid stream fragment
        Provider::Gemini => vec![frame_data(&response.to_string())],
        Provider::Bedrock => simulate_bedrock(response),
        Provider::Cohere => simulate_cohere(response),
    }
}

fn simulate_openai(response: &Value) -> Vec<String> {
    let Ok(parsed) = serde_json::from_value::<OpenAiResponse>(response.clone()) else {
        return vec![frame_data(&response.to_string()), frame_data("[DONE]")];
    };

    let chunk = |choices, usage| OpenAiStreamChunk {
        id: parsed.id.clone(),
        object: "chat.completion.chunk".to_owned(),
        created: parsed.created,
        model: parsed.model.clone(),
        choices,
        usage,
    };

    let mut frames = Vec::new();
    if let Some(choice) = parsed.choices.first() {
        let tool_calls = choice.message.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .enumerate()
                .map(|(i, tc)| OpenAiStreamToolCall {
                    index: u32::try_from(i).unwrap_or(u32::MAX),
                    id: Some(tc.id.clone()),
                    tool_type: Some("function".to_owned()),
                    function: Some(OpenAiStreamFunction {
                        name: Some(tc.function.name.clone()),
                        arguments: Some(tc.function.arguments.clone()),
                    }),
                })
                .collect()
        });
        let content = chunk(
            vec![OpenAiStreamChoice {
                index: 0,
                delta: OpenAiStreamDelta {
                    role: Some("assistant".to_owned()),
                    content: choice.message.content.clone(),
                    tool_calls,
                },
                finish_reason: choice.finish_reason.clone(),
            }],
            None,
        );
        frames.push(frame_data(&serde_json::to_string(&content).unwrap_or_default()));
    }
    if parsed.usage.is_some() {
        let trailing = chunk(Vec::new(), parsed.usage);
        frames.push(frame_data(&serde_json::to_string(&trailing).unwrap_or_default()));
    }
    frames.push(frame_data("[DONE]"));
    frames
}

fn simulate_anthropic(response: &Value) -> Vec<String> {
    let Ok(parsed) = serde_json::from_value::<AnthropicResponse>(response.clone()) else {
        return vec![frame_event("message_stop", "{\"type\":\"message_stop\"}")];
    };

    let mut frames = Vec::new();

    let start = serde_json::json!({
        "type": "message_start",
        "message": {
            "id": parsed.id, "type": "message", "role": "assistant", "model": parsed.model,
            "content": [], "usage": {"input_tokens": parsed.usage.input_tokens, "output_tokens": 0},
        },
    });
    frames.push(frame_event("message_start", &start.to_string()));

    for (index, block) in parsed.content.iter().enumerate() {
        // Open an empty block and deliver the payload as a delta, the way
        // the live API does
        use crate::protocol::anthropic::AnthropicContentBlock;
        let (open_block, delta) = match block {
            AnthropicContentBlock::Text { text } => (
                serde_json::json!({"type": "text", "text": ""}),
                Some(serde_json::json!({"type": "text_delta", "text": text})),
            ),
            AnthropicContentBlock::ToolUse { id, name, input } => (
                serde_json::json!({"type": "tool_use", "id": id, "name": name, "input": {}}),
                Some(serde_json::json!({"type": "input_json_delta", "partial_json": input.to_string()})),
            ),
            other => (serde_json::to_value(other).unwrap_or(Value::Null), None),
        };
        let open = serde_json::json!({"type": "content_block_start", "index": index, "content_block": open_block});
        frames.push(frame_event("content_block_start", &open.to_string()));
        if let Some(delta) = delta {
            let event = serde_json::json!({"type": "content_block_delta", "index": index, "delta": delta});
            frames.push(frame_event("content_block_delta", &event.to_string()));
        }
        let close = serde_json::json!({"type": "content_block_stop", "index": index});
        frames.push(frame_event("content_block_stop", &close.to_string()));
    }

    let delta = serde_json::json!({
        "type": "message_delta",
        "delta": {"stop_reason": parsed.stop_reason, "stop_sequence": null},
        "usage": {"input_tokens": 0, "output_tokens": parsed.usage.output_tokens},
    });
    frames.push(frame_event("message_delta", &delta.to_string()));
    frames.push(frame_event("message_stop", "{\"type\":\"message_stop\"}"));
    frames
}

fn simulate_bedrock(response: &Value) -> Vec<String> {
    let mut frames = vec![frame_data(
        &serde_json::json!({"messageStart": {"role": "assistant"}}).to_string(),
    )];

    let blocks = response
        .pointer("/output/message/content")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for (index, block) in blocks.iter().enumerate() {
        if let Some(text) = block.get("text") {
            let delta = serde_json::json!({
                "contentBlockDelta": {"contentBlockIndex": index, "delta": {"text": text}},
            });
            frames.push(frame_data(&delta.to_string()));
        }
        if let Some(tool) = block.get("toolUse") {
            let start = serde_json::json!({
                "contentBlockStart": {"contentBlockIndex": index, "start": {"toolUse": {
                    "toolUseId": tool.get("toolUseId"), "name": tool.get("name"),
                }}},
            });
            frames.push(frame_data(&start.to_string()));
            let input = tool.get("input").map_or_else(String::new, ToString::to_string);
            let delta = serde_json::json!({
                "contentBlockDelta": {"contentBlockIndex": index, "delta": {"toolUse": {"input": input}}},
            });
            frames.push(frame_data(&delta.to_string()));
        }
        frames.push(frame_data(
            &serde_json::json!({"contentBlockStop": {"contentBlockIndex": index}}).to_string(),
        ));
    }

    let stop = serde_json::json!({"messageStop": {"stopReason": response.get("stopReason")}});
    frames.push(frame_data(&stop.to_string()));
    if let Some(usage) = response.get("usage") {
        frames.push(frame_data(&serde_json::json!({"metadata": {"usage": usage}}).to_string()));
    }
    frames
}

fn simulate_cohere(response: &Value) -> Vec<String> {
    let mut frames = vec![frame_event(
        "message-start",
        &serde_json::json!({"type": "message-start", "id": response.get("id")}).to_string(),
    )];

    let text: String = response
        .pointer("/message/content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    if !text.is_empty() {
        let delta = serde_json::json!({
            "type": "content-delta", "index": 0,
            "delta": {"message": {"content": {"text": text}}},
        });
        frames.push(frame_event("content-delta", &delta.to_string()));
    }

    if let Some(calls) = response.pointer("/message/tool_calls").and_then(Value::as_array) {
        for (index, call) in calls.iter().enumerate() {
            let start = serde_json::json!({
                "type": "tool-call-start", "index": index,
                "delta": {"message": {"tool_calls": call}},
            });
            frames.push(frame_event("tool-call-start", &start.to_string()));
            frames.push(frame_event(
                "tool-call-end",
                &serde_json::json!({"type": "tool-call-end", "index": index}).to_string(),
            ));
        }
    }

    let end = serde_json::json!({
        "type": "message-end",
        "delta": {"finish_reason": response.get("finish_reason"), "usage": response.get("usage")},
    });
    frames.push(frame_event("message-end", &end.to_string()));
    frames
}

#[cfg(test)]
mod tests {
    use babel_core::Provider;

    use super::*;
    use crate::stream;

    #[test]
    fn simulated_openai_stream_replays_through_the_adapter() {
        let response = serde_json::json!({
            "id": "chatcmpl-sim", "object": "chat.completion", "created": 1, "model": "gpt-test",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "replayed"},
                "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 2, "completion_tokens": 1, "total_tokens": 3},
        });

        let frames = simulate_stream(Provider::OpenAi, &response);
        assert_eq!(frames.last().unwrap(), "data: [DONE]\n\n");

        let mut adapter = stream::for_provider(Provider::OpenAi, "gpt-test");
        let mut finals = 0;
        for frame in &frames {
            let payload = frame.trim_start_matches("data: ").trim_end();
            if adapter.process_chunk(payload).is_final {
                finals += 1;
            }
        }
        assert_eq!(finals, 1);
        assert_eq!(adapter.accumulator().text, "replayed");
    }

    #[test]
    fn simulated_anthropic_stream_carries_usage_in_message_delta() {
        let response = serde_json::json!({
            "id": "msg_sim", "type": "message", "role": "assistant", "model": "claude-test",
            "content": [{"type": "text", "text": "hello"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 4, "output_tokens": 2},
        });
        let frames = simulate_stream(Provider::Anthropic, &response);
        assert!(frames.iter().any(|f| f.starts_with("event: message_delta")));
        assert!(frames.last().unwrap().starts_with("event: message_stop"));
    }
}
