use super::jsonrpc;
use super::traits::{CallToolResult, McpError, McpToolInfo, ToolSource};
use crate::providers::sanitize_api_error;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const HEADER_SESSION_ID: &str = "Mcp-Session-Id";
const EVENT_STREAM_MIME_TYPE: &str = "text/event-stream";
const ACCEPT_VALUE: &str = "application/json, text/event-stream";

/// MCP client over the Streamable HTTP transport.
///
/// Each JSON-RPC request is a POST; the server answers with either a JSON
/// body or a short SSE stream carrying the response. The session id issued
/// on `initialize` is echoed on every later request.
pub struct HttpToolSource {
    url: String,
    token: String,
    client: Client,
    session_id: Mutex<Option<String>>,
    next_id: AtomicU64,
}

impl HttpToolSource {
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self, McpError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            url: url.to_string(),
            token: token.to_string(),
            client,
            session_id: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    /// Create the client and complete the `initialize` handshake.
    pub async fn connect(url: &str, token: &str, timeout: Duration) -> Result<Self, McpError> {
        let source = Self::new(url, token, timeout)?;
        source.initialize().await?;
        Ok(source)
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    async fn initialize(&self) -> Result<(), McpError> {
        let result = self
            .request("initialize", Some(jsonrpc::initialize_params()))
            .await?;
        let server = result
            .pointer("/serverInfo/name")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let protocol = result
            .get("protocolVersion")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        debug!(server, protocol, "MCP session initialized");
        self.notify("notifications/initialized").await
    }

    async fn post(&self, message: &Value) -> Result<reqwest::Response, McpError> {
        let mut builder = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .header(ACCEPT, ACCEPT_VALUE)
            .json(message);
        if let Some(session_id) = self.session_id() {
            builder = builder.header(HEADER_SESSION_ID, session_id);
        }

        let response = builder.send().await?;

        if let Some(session_id) = response
            .headers()
            .get(HEADER_SESSION_ID)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock() = Some(session_id.to_string());
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::HttpStatus {
                status: status.as_u16(),
                body: sanitize_api_error(&body),
            });
        }
        Ok(response)
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let message = jsonrpc::request(id, method, params);
        debug!(method, id, "MCP request");

        let response = self.post(&message).await?;
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with(EVENT_STREAM_MIME_TYPE));

        let body = response.text().await?;
        let envelope = if is_event_stream {
            jsonrpc::parse_sse_response(&body, id)?
        } else {
            let envelope: Value = serde_json::from_str(&body)?;
            if !jsonrpc::matches_id(&envelope, id) {
                return Err(McpError::Protocol(format!(
                    "response id does not match request {id}"
                )));
            }
            envelope
        };
        jsonrpc::into_result(envelope)
    }

    async fn notify(&self, method: &str) -> Result<(), McpError> {
        self.post(&jsonrpc::notification(method)).await?;
        Ok(())
    }
}

#[async_trait]
impl ToolSource for HttpToolSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..jsonrpc::MAX_TOOL_PAGES {
            let result = self
                .request(
                    "tools/list",
                    jsonrpc::list_tools_params(cursor.as_deref()),
                )
                .await?;
            let (page, next) = jsonrpc::parse_tools_page(result)?;
            tools.extend(page);
            match next {
                Some(next) => cursor = Some(next),
                None => return Ok(tools),
            }
        }
        Err(McpError::Protocol(format!(
            "tools/list did not finish within {} pages",
            jsonrpc::MAX_TOOL_PAGES
        )))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .request("tools/call", Some(jsonrpc::call_tool_params(name, arguments)))
            .await?;
        Ok(CallToolResult::new(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_handshake(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "initialize"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(HEADER_SESSION_ID, "session-123")
                    .set_body_json(json!({
                        "jsonrpc": "2.0",
                        "id": 1,
                        "result": {
                            "protocolVersion": "2025-03-26",
                            "capabilities": {"tools": {}},
                            "serverInfo": {"name": "directory", "version": "1.0"}
                        }
                    })),
            )
            .expect(1)
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_partial_json(json!({"method": "notifications/initialized"})))
            .and(header(HEADER_SESSION_ID, "session-123"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn connect_performs_handshake_and_keeps_session() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        let source = HttpToolSource::connect(
            &format!("{}/mcp", server.uri()),
            "token-abc",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(source.session_id().as_deref(), Some("session-123"));

        let requests = server.received_requests().await.unwrap();
        let auth = requests[0].headers.get("authorization").unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer token-abc");
    }

    #[tokio::test]
    async fn list_tools_follows_cursor_and_parses_sse() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/list", "params": {"cursor": "p2"}})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":3,\"result\":{\"tools\":[{\"name\":\"microsoft_graph_list_properties\"}]}}\n\n",
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/list", "id": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "result": {
                    "tools": [
                        {"name": "microsoft_graph_suggest_queries", "description": "Suggest"},
                        {"name": "microsoft_graph_get", "description": "Get"}
                    ],
                    "nextCursor": "p2"
                }
            })))
            .mount(&server)
            .await;

        let source = HttpToolSource::connect(
            &format!("{}/mcp", server.uri()),
            "t",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        let tools = source.list_tools().await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "microsoft_graph_suggest_queries",
                "microsoft_graph_get",
                "microsoft_graph_list_properties"
            ]
        );
    }

    #[tokio::test]
    async fn call_tool_returns_raw_result() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "tools/call",
                "params": {"name": "microsoft_graph_get", "arguments": {"relativeUrl": "/v1.0/users/$count"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "result": {"content": [{"type": "text", "text": "42"}], "isError": false}
            })))
            .mount(&server)
            .await;

        let source = HttpToolSource::connect(
            &format!("{}/mcp", server.uri()),
            "t",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        let mut args = Map::new();
        args.insert("relativeUrl".into(), json!("/v1.0/users/$count"));
        let result = source.call_tool("microsoft_graph_get", args).await.unwrap();
        assert!(!result.is_error());
        assert_eq!(result.texts(), vec!["42"]);
    }

    #[tokio::test]
    async fn http_failure_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_token"))
            .mount(&server)
            .await;

        let err = HttpToolSource::connect(
            &format!("{}/mcp", server.uri()),
            "expired",
            Duration::from_secs(5),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.status_code(), Some(401));
        assert!(err.to_string().contains("invalid_token"));
    }

    #[tokio::test]
    async fn rpc_error_is_surfaced() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/call"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "error": {"code": -32602, "message": "Unknown tool"}
            })))
            .mount(&server)
            .await;

        let source = HttpToolSource::connect(
            &format!("{}/mcp", server.uri()),
            "t",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        let err = source.call_tool("nope", Map::new()).await.unwrap_err();
        assert_eq!(err.category(), "JsonRpcError");
        assert!(err.to_string().contains("Unknown tool"));
    }
}
