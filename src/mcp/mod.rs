pub mod http;
pub mod jsonrpc;
pub mod stdio;
pub mod traits;

pub use http::HttpToolSource;
pub use stdio::StdioToolSource;
pub use traits::{CallToolResult, McpError, McpToolInfo, ToolSource};

use crate::auth::TokenProvider;
use crate::config::{McpConfig, McpTransport};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Connect to the configured tool server and finish its handshake.
///
/// Only the HTTP transport asks the token provider for a bearer token.
pub async fn connect_tool_source(
    config: &McpConfig,
    tokens: &dyn TokenProvider,
) -> anyhow::Result<Arc<dyn ToolSource>> {
    let timeout = Duration::from_secs(config.timeout_secs.max(1));
    match config.transport {
        McpTransport::Http => {
            let token = tokens.access_token().await?;
            let source = HttpToolSource::connect(&config.url, &token, timeout)
                .await
                .with_context(|| format!("Failed to connect to tool server at {}", config.url))?;
            tracing::info!(url = %config.url, session = ?source.session_id(), "Connected to tool server");
            Ok(Arc::new(source))
        }
        McpTransport::Stdio => {
            let command = config
                .command
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("[mcp].command is required for the stdio transport"))?;
            let source = StdioToolSource::spawn(command, &config.args, &config.env, timeout)
                .await
                .with_context(|| format!("Failed to start tool server '{command}'"))?;
            tracing::info!(command, "Started local tool server");
            Ok(Arc::new(source))
        }
    }
}
