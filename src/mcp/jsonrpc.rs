//! JSON-RPC 2.0 framing shared by the MCP transports.

use super::traits::{McpError, McpToolInfo};
use serde_json::{json, Value};

/// MCP protocol revision sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Upper bound on `tools/list` pages followed before giving up.
pub const MAX_TOOL_PAGES: usize = 50;

pub fn request(id: u64, method: &str, params: Option<Value>) -> Value {
    let mut message = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(params) = params {
        message["params"] = params;
    }
    message
}

pub fn notification(method: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
    })
}

pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": "dirchat",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

pub fn list_tools_params(cursor: Option<&str>) -> Option<Value> {
    cursor.map(|c| json!({ "cursor": c }))
}

pub fn call_tool_params(name: &str, arguments: serde_json::Map<String, Value>) -> Value {
    json!({
        "name": name,
        "arguments": arguments,
    })
}

/// Unwrap a response envelope into its `result`, turning `error` into `McpError::Rpc`.
pub fn into_result(response: Value) -> Result<Value, McpError> {
    if let Some(error) = response.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown MCP error")
            .to_string();
        return Err(McpError::Rpc { code, message });
    }
    match response {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| McpError::Protocol("response has neither result nor error".into())),
        _ => Err(McpError::Protocol("response is not a JSON object".into())),
    }
}

/// Numeric id of a response, accepting ids echoed back as strings.
pub fn response_id(message: &Value) -> Option<u64> {
    let id = message.get("id")?;
    id.as_u64().or_else(|| id.as_str()?.parse().ok())
}

/// Check that a parsed message answers `expected_id`. Messages without an id
/// (notifications) never match, so callers can skip them.
pub fn matches_id(message: &Value, expected_id: u64) -> bool {
    response_id(message) == Some(expected_id)
}

/// Find the response for `expected_id` in a `text/event-stream` body.
///
/// Each event's `data:` lines are joined and parsed as one JSON message;
/// notifications and requests from the server are skipped.
pub fn parse_sse_response(body: &str, expected_id: u64) -> Result<Value, McpError> {
    let mut data = String::new();
    let mut events = Vec::new();

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !data.is_empty() {
                events.push(std::mem::take(&mut data));
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if !data.is_empty() {
        events.push(data);
    }

    for event in events {
        let message: Value = serde_json::from_str(&event)?;
        if matches_id(&message, expected_id) {
            return Ok(message);
        }
    }

    Err(McpError::Protocol(format!(
        "event stream ended without a response to request {expected_id}"
    )))
}

/// Split a `tools/list` result into tools and the next page cursor.
pub fn parse_tools_page(result: Value) -> Result<(Vec<McpToolInfo>, Option<String>), McpError> {
    let next_cursor = result
        .get("nextCursor")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(ToString::to_string);
    let tools = match result.get("tools") {
        Some(tools) => serde_json::from_value(tools.clone())?,
        None => Vec::new(),
    };
    Ok((tools, next_cursor))
}
