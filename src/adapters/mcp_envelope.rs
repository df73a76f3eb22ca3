//! Response decoding for tool hosts
//!
//! Tool hosts answer a JSON-RPC request either with a plain JSON body or with
//! a short event stream whose final `data:` line carries the JSON envelope.
//! These helpers are pure so they can be exercised without a network.

use serde_json::Value;

use crate::agents::error::{ToolCallResult, ToolError};

const EXCERPT_LEN: usize = 100;

/// Whether a body should be read as an event stream
pub fn is_event_stream(body: &str, content_type: Option<&str>) -> bool {
    if content_type.map_or(false, |ct| ct.contains("text/event-stream")) {
        return true;
    }
    let trimmed = body.trim_start();
    trimmed.starts_with("event:") || trimmed.starts_with("data:")
}

/// Decode a response body into its JSON envelope.
///
/// Event streams yield the last non-empty `data:` payload. A stream with no
/// such line is [`ToolError::EmptyStream`]; unparsable JSON is
/// [`ToolError::Malformed`].
pub fn decode_body(body: &str, content_type: Option<&str>) -> Result<Value, ToolError> {
    if is_event_stream(body, content_type) {
        let payload = body
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .filter(|data| !data.is_empty())
            .last()
            .ok_or(ToolError::EmptyStream)?;
        return serde_json::from_str(payload).map_err(|_| ToolError::Malformed(excerpt(payload)));
    }

    serde_json::from_str(body).map_err(|_| ToolError::Malformed(excerpt(body)))
}

/// Pick the outcome out of a decoded envelope.
///
/// `result` wins if present; otherwise `error.message` becomes an application
/// error; otherwise the raw object is the payload.
pub fn extract_outcome(envelope: Value) -> ToolCallResult {
    let mut envelope = envelope;
    if let Some(obj) = envelope.as_object_mut() {
        if let Some(result) = obj.remove("result") {
            return unwrap_tool_result(result);
        }
        if let Some(error) = obj.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| error.as_str().map(str::to_string))
                .unwrap_or_else(|| error.to_string());
            return Err(ToolError::application(message));
        }
    }
    Ok(envelope)
}

/// Unwrap an MCP `CallToolResult` into a plain value.
///
/// Anything that does not look like a tool result passes through unchanged.
pub fn unwrap_tool_result(result: Value) -> ToolCallResult {
    let Some(obj) = result.as_object() else {
        return Ok(result);
    };
    let is_error = obj.get("isError").and_then(Value::as_bool).unwrap_or(false);

    let texts: Vec<&str> = obj
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if is_error {
        let message = if texts.is_empty() {
            "Tool reported an error".to_string()
        } else {
            texts.join("\n")
        };
        return Err(ToolError::application(message));
    }

    if let Some(structured) = obj.get("structuredContent") {
        return Ok(structured.clone());
    }

    if !obj.contains_key("content") {
        return Ok(result);
    }

    if texts.is_empty() {
        return Ok(obj.get("content").cloned().unwrap_or(Value::Null));
    }

    let joined = texts.join("\n");
    Ok(serde_json::from_str(&joined).unwrap_or(Value::String(joined)))
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_LEN).collect()
}
