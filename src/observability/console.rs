use super::traits::{Observer, ObserverEvent};
use crate::tools::diagnostics::{Diagnostic, DiagnosticKind};
use crate::util::truncate_with_ellipsis;
use console::{style, Term};
use std::fmt::Write;

/// Longest argument preview printed next to a tool call.
const ARGUMENT_PREVIEW_CHARS: usize = 120;

/// Operator console: short progress lines and diagnostic blocks on stderr.
///
/// Stdout stays reserved for the model's answers.
pub struct ConsoleObserver {
    term: Term,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ConsoleObserver {
    fn record_event(&self, event: &ObserverEvent) {
        if let Some(text) = render(event) {
            let _ = self.term.write_line(&text);
        }
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Text printed for `event`, or `None` for events the console skips.
pub fn render(event: &ObserverEvent) -> Option<String> {
    match event {
        ObserverEvent::SessionStart {
            provider,
            model,
            tool_count,
        } => Some(format!(
            "{} {provider} / {model} with {tool_count} tool(s)",
            style("Connected:").green().bold()
        )),
        ObserverEvent::ToolCallStart { tool, arguments } => Some(format!(
            "{} {} {}",
            style("→").cyan(),
            style(tool).cyan(),
            style(truncate_with_ellipsis(arguments, ARGUMENT_PREVIEW_CHARS)).dim()
        )),
        ObserverEvent::ToolDiagnostic(diag) => Some(render_diagnostic(diag)),
        ObserverEvent::IterationLimit { iterations } => Some(format!(
            "{} reached maximum iterations ({iterations}) without a final answer. \
             The query may be too complex; try breaking it into smaller questions.",
            style("Warning:").yellow().bold()
        )),
        ObserverEvent::TurnError { message } => {
            Some(format!("{} {message}", style("Error:").red().bold()))
        }
        ObserverEvent::LlmRequest { .. }
        | ObserverEvent::LlmResponse { .. }
        | ObserverEvent::ToolCall { .. }
        | ObserverEvent::TurnComplete { .. } => None,
    }
}

fn render_diagnostic(diag: &Diagnostic) -> String {
    let title = match diag.kind {
        DiagnosticKind::ServerReported => "Tool server reported an error",
        DiagnosticKind::Fault => "Tool call failed",
    };
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        style(format!("{title}:")).red().bold(),
        style(&diag.tool).bold()
    );
    let _ = writeln!(out, "  classification: {}", diag.class.label());
    for line in &diag.details {
        let _ = writeln!(out, "  {line}");
    }
    let _ = write!(out, "  {} {}", style("hint:").yellow(), diag.hint());
    out
}
