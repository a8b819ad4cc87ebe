use super::traits::{Observer, ObserverEvent};
use crate::tools::diagnostics::DiagnosticKind;
use tracing::{debug, error, info, warn};

/// Emits every event as a structured `tracing` record.
pub struct LogObserver;

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::SessionStart {
                provider,
                model,
                tool_count,
            } => info!(provider, model, tool_count, "session.start"),
            ObserverEvent::LlmRequest {
                provider,
                model,
                messages_count,
                iteration,
            } => debug!(provider, model, messages_count, iteration, "llm.request"),
            ObserverEvent::LlmResponse {
                provider,
                model,
                duration,
                success,
                tool_calls,
                error_message,
            } => {
                let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                info!(
                    provider,
                    model,
                    duration_ms,
                    success,
                    tool_calls,
                    error = error_message.as_deref().unwrap_or(""),
                    "llm.response"
                );
            }
            ObserverEvent::ToolCallStart { tool, arguments } => {
                debug!(tool, arguments, "tool.start");
            }
            ObserverEvent::ToolCall {
                tool,
                duration,
                success,
            } => {
                let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                info!(tool, duration_ms, success, "tool.call");
            }
            ObserverEvent::ToolDiagnostic(diag) => {
                let kind = match diag.kind {
                    DiagnosticKind::ServerReported => "server_reported",
                    DiagnosticKind::Fault => "fault",
                };
                warn!(
                    tool = %diag.tool,
                    kind,
                    class = diag.class.label(),
                    hint = diag.hint(),
                    details = %diag.details.join(" | "),
                    "tool.diagnostic"
                );
            }
            ObserverEvent::IterationLimit { iterations } => {
                warn!(iterations, "turn.iteration_limit");
            }
            ObserverEvent::TurnError { message } => error!(error = %message, "turn.error"),
            ObserverEvent::TurnComplete { iterations } => info!(iterations, "turn.complete"),
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
