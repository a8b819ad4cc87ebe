//! Remote tool source trait and the data it exchanges.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tool as listed by the server's `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Result of `tools/call`, kept as the raw JSON the server returned.
#[derive(Debug, Clone, PartialEq)]
pub struct CallToolResult {
    raw: Value,
}

impl CallToolResult {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// The server's `isError` flag. Accepts `true`, `"true"` and `1`.
    pub fn is_error(&self) -> bool {
        match self.raw.get("isError") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        }
    }

    /// Every `content[].text` fragment, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.raw
            .get("content")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Compact JSON serialization handed to the model.
    pub fn to_canonical_string(&self) -> String {
        self.raw.to_string()
    }
}

/// Transport-level failure talking to the tool server.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("Tool server returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Tool server error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Tool server request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Tool server I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON from tool server: {0}")]
    Json(#[from] serde_json::Error),
    #[error("MCP protocol violation: {0}")]
    Protocol(String),
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },
    #[error("Tool server process failed: {0}")]
    Process(String),
}

impl McpError {
    /// HTTP status code, when the failure carried one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Stable category name for diagnostics and error payloads.
    pub fn category(&self) -> &'static str {
        match self {
            Self::HttpStatus { .. } => "HttpStatusError",
            Self::Rpc { .. } => "JsonRpcError",
            Self::Request(e) if e.is_timeout() => "TimeoutError",
            Self::Request(e) if e.is_connect() => "ConnectionError",
            Self::Request(_) => "RequestError",
            Self::Io(_) => "IoError",
            Self::Json(_) => "SerializationError",
            Self::Protocol(_) => "ProtocolError",
            Self::Timeout { .. } => "TimeoutError",
            Self::Process(_) => "ProcessError",
        }
    }
}

/// The remote server exposing directory query tools.
///
/// # Implementation Guide
///
/// 1. Finish any handshake before handing the source to the loop
/// 2. `list_tools` is called once per session; return what the server lists
/// 3. `call_tool` returns `Ok` whenever the server answered, even if the answer
///    reports a failure (`isError` or prose); `Err` is for transport faults only
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Transport name (e.g. "http", "stdio") for logs.
    fn name(&self) -> &str;

    async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, McpError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn is_error_accepts_boolean_like_values() {
        for flag in [json!(true), json!("true"), json!("TRUE"), json!(1)] {
            assert!(CallToolResult::new(json!({"isError": flag})).is_error());
        }
        for flag in [json!(false), json!("no"), json!(0), json!(null)] {
            assert!(!CallToolResult::new(json!({"isError": flag})).is_error());
        }
        assert!(!CallToolResult::new(json!({"content": []})).is_error());
    }

    #[test]
    fn texts_collects_text_items_only() {
        let result = CallToolResult::new(json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "AAAA"},
                {"type": "text", "text": "second"}
            ]
        }));
        assert_eq!(result.texts(), vec!["first", "second"]);
    }

    #[test]
    fn texts_empty_without_content() {
        assert!(CallToolResult::new(json!({})).texts().is_empty());
        assert!(CallToolResult::new(json!({"content": "oops"})).texts().is_empty());
    }

    #[test]
    fn canonical_string_is_compact_json() {
        let raw = json!({"content": [{"type": "text", "text": "42"}]});
        let s = CallToolResult::new(raw.clone()).to_canonical_string();
        assert_eq!(serde_json::from_str::<Value>(&s).unwrap(), raw);
        assert!(!s.contains('\n'));
    }

    #[test]
    fn error_status_and_category() {
        let err = McpError::HttpStatus {
            status: 403,
            body: "Forbidden".into(),
        };
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(err.category(), "HttpStatusError");

        let err = McpError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ));
        assert_eq!(err.status_code(), None);
        assert_eq!(err.category(), "IoError");
        assert!(err.to_string().contains("connection reset by peer"));
    }

    #[test]
    fn tool_info_deserializes() {
        let info: McpToolInfo = serde_json::from_str(
            r#"{"name":"microsoft_graph_get","description":"Run a query","inputSchema":{"type":"object"}}"#,
        )
        .unwrap();
        assert_eq!(info.name, "microsoft_graph_get");
        assert_eq!(info.description.as_deref(), Some("Run a query"));
        assert_eq!(info.input_schema["type"], "object");

        let minimal: McpToolInfo = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert!(minimal.description.is_none());
        assert!(minimal.input_schema.is_null());
    }
}
