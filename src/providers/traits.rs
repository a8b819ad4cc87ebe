//! Provider trait: the chat completion API seen by the tool-calling loop.
//!
//! Implement `Provider` for any LLM backend that supports function calling.
//! The conversation loop only ever hands it the full message history plus
//! every tool schema, and expects either tool calls or a final text back.

use crate::tools::traits::ToolSpec;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque identifier, echoed back on the matching tool-result message.
    pub id: String,
    pub name: String,
    /// Raw JSON argument string exactly as the model produced it.
    pub arguments: String,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content,
            tool_calls,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }
}

/// What a single completion round trip produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            tool_calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// Chat completion backend with function calling.
///
/// # Implementation Guide
///
/// 1. Translate `messages` into the backend's wire format, preserving
///    assistant tool-call ids and tool-result correlation ids
/// 2. Offer every entry of `tools` on each call and let the model choose
/// 3. Return `ChatResponse::tool_calls` in the order the model emitted them
/// 4. Return `Err` only for faults of the round trip itself (network, auth,
///    malformed response); the loop aborts the current turn on `Err`
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend name used in logs and diagnostics.
    fn name(&self) -> &str;

    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<ChatResponse>;
}
