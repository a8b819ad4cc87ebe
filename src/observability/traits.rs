use crate::tools::diagnostics::Diagnostic;
use std::time::Duration;

/// Events the observer can record
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    SessionStart {
        provider: String,
        model: String,
        tool_count: usize,
    },
    /// A request is about to be sent to the chat completion API.
    ///
    /// Emitted immediately before a provider call so observers can print
    /// progress without leaking prompt contents.
    LlmRequest {
        provider: String,
        model: String,
        messages_count: usize,
        iteration: usize,
    },
    /// Result of a single completion call.
    LlmResponse {
        provider: String,
        model: String,
        duration: Duration,
        success: bool,
        tool_calls: usize,
        error_message: Option<String>,
    },
    /// A tool call is about to be executed.
    ToolCallStart {
        tool: String,
        arguments: String,
    },
    ToolCall {
        tool: String,
        duration: Duration,
        success: bool,
    },
    /// A tool call produced a server-reported error or a fault.
    ToolDiagnostic(Diagnostic),
    /// The turn used its whole completion budget without a final answer.
    IterationLimit {
        iterations: usize,
    },
    /// The turn was aborted by a fault outside tool execution.
    TurnError {
        message: String,
    },
    /// The model produced a final answer for the current user message.
    TurnComplete {
        iterations: usize,
    },
}

/// Core observability trait. Implement for any backend.
pub trait Observer: Send + Sync + 'static {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
