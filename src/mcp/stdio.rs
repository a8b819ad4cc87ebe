use super::jsonrpc;
use super::traits::{CallToolResult, McpError, McpToolInfo, ToolSource};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::debug;

/// Maximum bytes per line read from the server's stdio.
const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;
/// Maximum consecutive notifications before we bail.
const MAX_NOTIFICATIONS: usize = 100;

/// MCP client for a local server spawned as a child process.
///
/// Messages are newline-delimited JSON-RPC on the child's stdin/stdout.
/// The child is killed when the source is dropped.
pub struct StdioToolSource {
    server: Mutex<StdioServer>,
    timeout: Duration,
}

struct StdioServer {
    _child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    /// Bytes of a line whose read was cut short by a timeout.
    pending: Vec<u8>,
    next_id: u64,
}

impl StdioToolSource {
    /// Spawn `command` and complete the `initialize` handshake.
    ///
    /// The command and arguments come from the user's config file, so
    /// we trust that the configured binary is intentional.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(command);
        cmd.kill_on_drop(true)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        for (k, v) in env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::Process(format!("failed to start '{command}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Process(format!("failed to capture stdin for '{command}'")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Process(format!("failed to capture stdout for '{command}'")))?;

        if let Some(stderr) = child.stderr.take() {
            let tag = command.to_string();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            if line.len() > MAX_LINE_BYTES {
                                debug!(server = %tag, "stderr line exceeded max size, skipping");
                                continue;
                            }
                            debug!(server = %tag, "{}", line.trim());
                        }
                    }
                }
            });
        }

        let source = Self {
            server: Mutex::new(StdioServer {
                _child: child,
                stdin: BufWriter::new(stdin),
                stdout: BufReader::new(stdout),
                pending: Vec::new(),
                next_id: 1,
            }),
            timeout,
        };

        source
            .with_timeout("MCP initialization", source.initialize())
            .await?;
        Ok(source)
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T, McpError>>,
    ) -> Result<T, McpError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| McpError::Timeout {
                operation: operation.to_string(),
                secs: self.timeout.as_secs(),
            })?
    }

    async fn initialize(&self) -> Result<(), McpError> {
        self.request("initialize", Some(jsonrpc::initialize_params()))
            .await?;
        let mut server = self.server.lock().await;
        send_message(
            &mut server.stdin,
            &jsonrpc::notification("notifications/initialized"),
        )
        .await
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let mut server = self.server.lock().await;
        let id = server.next_id;
        server.next_id += 1;
        debug!(method, id, "MCP request");

        send_message(&mut server.stdin, &jsonrpc::request(id, method, params)).await?;
        let server = &mut *server;
        let response = read_response(&mut server.stdout, &mut server.pending, id).await?;
        jsonrpc::into_result(response)
    }
}

#[async_trait]
impl ToolSource for StdioToolSource {
    fn name(&self) -> &str {
        "stdio"
    }

    async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        self.with_timeout("MCP tool discovery", async {
            let mut tools = Vec::new();
            let mut cursor: Option<String> = None;
            for _ in 0..jsonrpc::MAX_TOOL_PAGES {
                let result = self
                    .request("tools/list", jsonrpc::list_tools_params(cursor.as_deref()))
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
        })
        .await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .with_timeout(
                &format!("Tool call '{name}'"),
                self.request("tools/call", Some(jsonrpc::call_tool_params(name, arguments))),
            )
            .await?;
        Ok(CallToolResult::new(result))
    }
}

async fn send_message(stdin: &mut BufWriter<ChildStdin>, message: &Value) -> Result<(), McpError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    stdin.write_all(line.as_bytes()).await?;
    stdin.flush().await?;
    Ok(())
}

/// Read lines until the response to `expected_id` arrives.
///
/// Partial lines accumulate in `pending`, which survives a cancelled read.
/// Responses to earlier ids belong to requests that timed out and are
/// discarded.
async fn read_response(
    stdout: &mut BufReader<ChildStdout>,
    pending: &mut Vec<u8>,
    expected_id: u64,
) -> Result<Value, McpError> {
    let mut skipped = 0usize;
    loop {
        let n = stdout.read_until(b'\n', pending).await?;
        if pending.len() > MAX_LINE_BYTES {
            pending.clear();
            return Err(McpError::Protocol("response line exceeds maximum size".into()));
        }
        if n == 0 && pending.is_empty() {
            return Err(McpError::Process(
                "server closed its output unexpectedly".into(),
            ));
        }
        if n != 0 && pending.last() != Some(&b'\n') {
            continue;
        }
        let line = std::mem::take(pending);
        let trimmed = String::from_utf8_lossy(&line);
        let trimmed = trimmed.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: Value = serde_json::from_str(trimmed)?;
        // Server-initiated requests and notifications carry a method.
        if parsed.get("method").is_none() && parsed.get("id").is_some() {
            match jsonrpc::response_id(&parsed) {
                Some(id) if id == expected_id => return Ok(parsed),
                Some(id) if id < expected_id => {
                    debug!(id, expected_id, "discarding late MCP response");
                }
                _ => {
                    return Err(McpError::Protocol(format!(
                        "response id mismatch: expected {expected_id}"
                    )));
                }
            }
        }
        skipped += 1;
        if skipped > MAX_NOTIFICATIONS {
            return Err(McpError::Protocol(
                "too many notifications without a response".into(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .is_ok()
    }

    const MOCK_SERVER: &str = r#"
import sys, json
for line in sys.stdin:
    line = line.strip()
    if not line:
        continue
    msg = json.loads(line)
    method = msg.get("method", "")
    if method == "initialize":
        r = {"jsonrpc":"2.0","id":msg["id"],"result":{"protocolVersion":"2025-03-26","capabilities":{}}}
        print(json.dumps(r), flush=True)
    elif method == "notifications/initialized":
        pass
    elif method == "tools/list":
        print(json.dumps({"jsonrpc":"2.0","method":"notifications/message","params":{}}), flush=True)
        r = {"jsonrpc":"2.0","id":msg["id"],"result":{"tools":[{"name":"microsoft_graph_get","description":"Run a query"}]}}
        print(json.dumps(r), flush=True)
    elif method == "tools/call":
        args = msg["params"].get("arguments", {})
        if "relativeUrl" not in args:
            r = {"jsonrpc":"2.0","id":msg["id"],"result":{"content":[{"type":"text","text":"Error: relativeUrl is required"}],"isError":True}}
        else:
            r = {"jsonrpc":"2.0","id":msg["id"],"result":{"content":[{"type":"text","text":json.dumps(args)}]}}
        print(json.dumps(r), flush=True)
"#;

    #[tokio::test]
    async fn spawn_failure_is_process_error() {
        let err = StdioToolSource::spawn(
            "/nonexistent/dirchat-mcp-server",
            &[],
            &HashMap::new(),
            Duration::from_secs(5),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.category(), "ProcessError");
        assert!(err.to_string().contains("failed to start"));
    }

    #[tokio::test]
    async fn server_exiting_before_handshake_is_reported() {
        if !python_available() {
            eprintln!("skipping: python3 not available");
            return;
        }
        let err = StdioToolSource::spawn(
            "python3",
            &["-c".into(), "import sys; sys.exit(0)".into()],
            &HashMap::new(),
            Duration::from_secs(5),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, McpError::Process(_) | McpError::Io(_)), "{err:?}");
    }

    #[tokio::test]
    async fn integration_list_and_call() {
        if !python_available() {
            eprintln!("skipping: python3 not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("mock_mcp.py");
        std::fs::write(&script_path, MOCK_SERVER).unwrap();

        let source = StdioToolSource::spawn(
            "python3",
            &[script_path.to_string_lossy().into()],
            &HashMap::new(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        let tools = source.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "microsoft_graph_get");

        let mut args = Map::new();
        args.insert("relativeUrl".into(), json!("/v1.0/me"));
        let result = source.call_tool("microsoft_graph_get", args).await.unwrap();
        assert!(!result.is_error());
        assert!(result.texts()[0].contains("/v1.0/me"));

        let result = source
            .call_tool("microsoft_graph_get", Map::new())
            .await
            .unwrap();
        assert!(result.is_error());
    }

    const SLOW_FIRST_CALL_SERVER: &str = r#"
import sys, json, time
calls = 0
for line in sys.stdin:
    line = line.strip()
    if not line:
        continue
    msg = json.loads(line)
    method = msg.get("method", "")
    if method == "initialize":
        r = {"jsonrpc":"2.0","id":msg["id"],"result":{"protocolVersion":"2025-03-26","capabilities":{}}}
        print(json.dumps(r), flush=True)
    elif method == "tools/call":
        calls += 1
        if calls == 1:
            time.sleep(3)
        r = {"jsonrpc":"2.0","id":msg["id"],"result":{"content":[{"type":"text","text":"call %d" % calls}]}}
        print(json.dumps(r), flush=True)
"#;

    #[tokio::test]
    async fn source_recovers_after_a_timed_out_call() {
        if !python_available() {
            eprintln!("skipping: python3 not available");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("slow_mcp.py");
        std::fs::write(&script_path, SLOW_FIRST_CALL_SERVER).unwrap();

        let source = StdioToolSource::spawn(
            "python3",
            &[script_path.to_string_lossy().into()],
            &HashMap::new(),
            Duration::from_secs(2),
        )
        .await
        .unwrap();

        let err = source
            .call_tool("microsoft_graph_get", Map::new())
            .await
            .err()
            .unwrap();
        assert_eq!(err.category(), "TimeoutError");

        for expected in ["call 2", "call 3", "call 4"] {
            let result = source
                .call_tool("microsoft_graph_get", Map::new())
                .await
                .unwrap();
            assert_eq!(result.texts(), vec![expected]);
        }
    }

    #[test]
    fn response_ids_accept_numbers_and_strings() {
        assert_eq!(jsonrpc::response_id(&json!({"id": 7})), Some(7));
        assert_eq!(jsonrpc::response_id(&json!({"id": "7"})), Some(7));
        assert_eq!(jsonrpc::response_id(&json!({"method": "x"})), None);
    }
}
