//! Tool data shared by the schema adapter, the invoker and the providers.

use serde::{Deserialize, Serialize};

/// Description of a tool for the LLM.
///
/// Built once per session from the remote server's tool list: name and
/// description come from the server, `parameters` from the schema adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name (used in function calling)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Outcome of one tool call, ready to become a tool-result message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the tool call this answers
    pub call_id: String,
    /// Serialized payload shown to the model
    pub content: String,
    /// Whether the invocation itself failed (unknown tool, bad arguments,
    /// transport fault). Server-reported errors inside a successful response
    /// leave this `false`.
    pub is_error: bool,
    /// Short error description for the operator, if any
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
            error: None,
        }
    }

    pub fn failure(
        call_id: impl Into<String>,
        content: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
            error: Some(error.into()),
        }
    }
}
