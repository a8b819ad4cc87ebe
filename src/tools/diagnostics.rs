//! Operator-facing diagnostics for tool calls.
//!
//! The embedded-error scan is a heuristic: a server may report failure only
//! through prose, so text fragments are matched against a few fixed phrases.
//! It can misfire on legitimate answers that mention "failed", and it misses
//! new phrasings. The patterns are kept exactly as listed below.

use crate::mcp::{CallToolResult, McpError};
use std::error::Error as _;

/// Case-insensitive substrings that mark a text fragment as a failure report.
const EMBEDDED_ERROR_SUBSTRINGS: &[&str] = &[
    "error:",
    "failed",
    "no scopes found",
    "unauthorized",
    "forbidden",
];

/// Where the problem came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The server answered, but the answer reports a failure.
    ServerReported,
    /// The call itself faulted (transport, timeout, bad arguments).
    Fault,
}

/// Classification of a failure message, each with its own operator hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Delegated scopes missing: an application token was used where a
    /// signed-in user's token is required.
    ScopeMismatch,
    Unauthorized,
    Forbidden,
    NotFound,
    BadRequest,
    Unclassified,
}

impl ErrorClass {
    pub fn label(self) -> &'static str {
        match self {
            Self::ScopeMismatch => "scope mismatch",
            Self::Unauthorized => "401 unauthorized",
            Self::Forbidden => "403 forbidden",
            Self::NotFound => "404 not found",
            Self::BadRequest => "400 bad request",
            Self::Unclassified => "unclassified",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Self::ScopeMismatch => {
                "The token carries no delegated scopes. The tool server needs a delegated \
                 (signed-in user) token, not an application token from client credentials."
            }
            Self::Unauthorized => {
                "The access token was rejected. It may be expired or issued for a different \
                 audience; acquire a fresh delegated token."
            }
            Self::Forbidden => {
                "The token is valid but lacks permission for this query. Check the consented \
                 scopes and the signed-in user's directory role."
            }
            Self::NotFound => {
                "The resource or endpoint was not found. Check the relative URL and the tool \
                 server address."
            }
            Self::BadRequest => {
                "The request was malformed. Check the tool arguments and the query syntax."
            }
            Self::Unclassified => {
                "Check the tool server logs and network connectivity for more detail."
            }
        }
    }
}

/// A diagnostic block for the operator console. Never sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub tool: String,
    pub class: ErrorClass,
    pub details: Vec<String>,
}

impl Diagnostic {
    pub fn hint(&self) -> &'static str {
        self.class.hint()
    }
}

/// True when a text fragment reads like a failure report.
pub fn text_reports_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.starts_with("error")
        || EMBEDDED_ERROR_SUBSTRINGS.iter().any(|p| lower.contains(p))
}

/// True when the server flagged the result or any text fragment reads like
/// a failure report.
pub fn has_embedded_error(result: &CallToolResult) -> bool {
    result.is_error() || result.texts().into_iter().any(text_reports_error)
}

/// Classify a server-reported error message.
pub fn classify_server_error(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if lower.contains("no scopes found") {
        ErrorClass::ScopeMismatch
    } else if lower.contains("401") || lower.contains("unauthorized") {
        ErrorClass::Unauthorized
    } else if lower.contains("403") || lower.contains("forbidden") {
        ErrorClass::Forbidden
    } else {
        ErrorClass::Unclassified
    }
}

/// Classify a fault by status code first, then by message text.
pub fn classify_fault(status: Option<u16>, message: &str) -> ErrorClass {
    match status {
        Some(401) => return ErrorClass::Unauthorized,
        Some(403) => return ErrorClass::Forbidden,
        Some(404) => return ErrorClass::NotFound,
        Some(400) => return ErrorClass::BadRequest,
        _ => {}
    }
    let lower = message.to_lowercase();
    if lower.contains("401") || lower.contains("unauthorized") {
        ErrorClass::Unauthorized
    } else if lower.contains("403") || lower.contains("forbidden") {
        ErrorClass::Forbidden
    } else if lower.contains("404") || lower.contains("not found") {
        ErrorClass::NotFound
    } else if lower.contains("400") || lower.contains("bad request") {
        ErrorClass::BadRequest
    } else {
        ErrorClass::Unclassified
    }
}

/// Diagnostic for a structurally successful result that reports failure.
pub fn server_error_diagnostic(tool: &str, result: &CallToolResult) -> Diagnostic {
    let texts = result.texts();
    let combined = texts.join("\n");
    let mut details = vec![format!("isError: {}", result.is_error())];
    details.extend(texts.iter().map(|t| format!("message: {t}")));
    Diagnostic {
        kind: DiagnosticKind::ServerReported,
        tool: tool.to_string(),
        class: classify_server_error(&combined),
        details,
    }
}

/// Diagnostic for a transport fault raised by the tool source.
pub fn fault_diagnostic(tool: &str, arguments: &str, err: &McpError) -> Diagnostic {
    let message = err.to_string();
    let status = err.status_code();
    let mut details = vec![
        format!("type: {}", err.category()),
        format!("message: {message}"),
    ];
    if let Some(status) = status {
        details.push(format!("http status: {status}"));
    }
    let mut source = err.source();
    while let Some(inner) = source {
        details.push(format!("inner: {inner}"));
        source = inner.source();
    }
    details.push(format!("arguments: {arguments}"));
    Diagnostic {
        kind: DiagnosticKind::Fault,
        tool: tool.to_string(),
        class: classify_fault(status, &message),
        details,
    }
}

/// Diagnostic for arguments the model produced that could not be parsed.
pub fn argument_fault_diagnostic(tool: &str, arguments: &str, message: &str) -> Diagnostic {
    Diagnostic {
        kind: DiagnosticKind::Fault,
        tool: tool.to_string(),
        class: ErrorClass::BadRequest,
        details: vec![
            "type: ArgumentParseError".to_string(),
            format!("message: {message}"),
            format!("arguments: {arguments}"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_result(text: &str) -> CallToolResult {
        CallToolResult::new(json!({"content": [{"type": "text", "text": text}]}))
    }

    #[test]
    fn scan_matches_listed_phrases_case_insensitively() {
        for text in [
            "Error retrieving users",
            "Request ERROR: bad filter",
            "Operation Failed",
            "No scopes found in token",
            "UNAUTHORIZED",
            "Forbidden by policy",
        ] {
            assert!(text_reports_error(text), "{text}");
        }
    }

    #[test]
    fn scan_ignores_ordinary_answers() {
        for text in ["{\"@odata.count\": 42}", "/v1.0/users/$count", "terror is a word", "  error"] {
            assert!(!text_reports_error(text), "{text}");
        }
    }

    #[test]
    fn explicit_flag_counts_without_text() {
        let result = CallToolResult::new(json!({"isError": true, "content": []}));
        assert!(has_embedded_error(&result));
        assert!(!has_embedded_error(&text_result("42")));
        assert!(has_embedded_error(&text_result("request failed")));
    }

    #[test]
    fn server_error_classification() {
        assert_eq!(
            classify_server_error("No scopes found in the access token"),
            ErrorClass::ScopeMismatch
        );
        assert_eq!(classify_server_error("Unauthorized"), ErrorClass::Unauthorized);
        assert_eq!(classify_server_error("HTTP 403"), ErrorClass::Forbidden);
        assert_eq!(classify_server_error("Error: timeout"), ErrorClass::Unclassified);
    }

    #[test]
    fn only_missing_scopes_count_as_scope_mismatch() {
        assert_eq!(
            classify_server_error("403 Forbidden: required scope User.Read.All"),
            ErrorClass::Forbidden
        );
        assert_eq!(
            classify_server_error("Unauthorized: scope claim is invalid"),
            ErrorClass::Unauthorized
        );
    }

    #[test]
    fn fault_classification_prefers_status() {
        assert_eq!(classify_fault(Some(404), "unauthorized"), ErrorClass::NotFound);
        assert_eq!(classify_fault(None, "401 Unauthorized"), ErrorClass::Unauthorized);
        assert_eq!(classify_fault(None, "forbidden"), ErrorClass::Forbidden);
        assert_eq!(classify_fault(None, "Not Found"), ErrorClass::NotFound);
        assert_eq!(classify_fault(Some(400), ""), ErrorClass::BadRequest);
        assert_eq!(classify_fault(None, "connection refused"), ErrorClass::Unclassified);
    }

    #[test]
    fn every_class_has_distinct_hint() {
        let classes = [
            ErrorClass::ScopeMismatch,
            ErrorClass::Unauthorized,
            ErrorClass::Forbidden,
            ErrorClass::NotFound,
            ErrorClass::BadRequest,
            ErrorClass::Unclassified,
        ];
        for (i, a) in classes.iter().enumerate() {
            for b in &classes[i + 1..] {
                assert_ne!(a.hint(), b.hint());
            }
        }
    }

    #[test]
    fn fault_diagnostic_includes_status_and_inner_message() {
        let err = McpError::HttpStatus {
            status: 401,
            body: "token expired".into(),
        };
        let diag = fault_diagnostic("microsoft_graph_get", "{}", &err);
        assert_eq!(diag.kind, DiagnosticKind::Fault);
        assert_eq!(diag.class, ErrorClass::Unauthorized);
        assert!(diag.details.iter().any(|d| d == "http status: 401"));

        let err = McpError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        let diag = fault_diagnostic("microsoft_graph_get", "{\"relativeUrl\":\"/v1.0/users\"}", &err);
        assert!(diag.details.iter().any(|d| d.contains("inner: connection refused")));
        assert!(diag.details.iter().any(|d| d.contains("/v1.0/users")));
    }

    #[test]
    fn server_diagnostic_carries_text() {
        let diag = server_error_diagnostic("microsoft_graph_get", &text_result("Unauthorized"));
        assert_eq!(diag.kind, DiagnosticKind::ServerReported);
        assert_eq!(diag.class, ErrorClass::Unauthorized);
        assert!(diag.hint().contains("access token"));
        assert!(diag.details.iter().any(|d| d == "message: Unauthorized"));
    }
}
