use super::diagnostics::{self, Diagnostic};
use super::schema::specs_from_descriptors;
use super::traits::{ToolResult, ToolSpec};
use crate::mcp::{McpToolInfo, ToolSource};
use crate::providers::ToolCall;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// A tool result plus the operator diagnostic it produced, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub result: ToolResult,
    pub diagnostic: Option<Diagnostic>,
}

/// Runs model-requested tool calls against the remote tool source.
///
/// Never fails: unknown tools, bad arguments and transport faults all come
/// back as a [`ToolResult`] the model can read.
pub struct ToolInvoker {
    source: Arc<dyn ToolSource>,
    tools: Vec<McpToolInfo>,
}

impl ToolInvoker {
    pub fn new(source: Arc<dyn ToolSource>, tools: Vec<McpToolInfo>) -> Self {
        Self { source, tools }
    }

    /// Discover the source's tools once and build an invoker over them.
    pub async fn discover(source: Arc<dyn ToolSource>) -> anyhow::Result<Self> {
        let tools = source.list_tools().await?;
        tracing::info!(source = source.name(), count = tools.len(), "Discovered tools");
        Ok(Self::new(source, tools))
    }

    pub fn tools(&self) -> &[McpToolInfo] {
        &self.tools
    }

    /// Function-calling specs for every discovered tool.
    pub fn specs(&self) -> Vec<ToolSpec> {
        specs_from_descriptors(&self.tools)
    }

    pub async fn invoke(&self, call: &ToolCall) -> ToolInvocation {
        if !self.tools.iter().any(|t| t.name == call.name) {
            let available: Vec<&str> = self.tools.iter().map(|t| t.name.as_str()).collect();
            let message = format!("Tool '{}' not found", call.name);
            let payload = json!({
                "error": message,
                "tool": call.name,
                "availableTools": available,
            });
            return ToolInvocation {
                result: ToolResult::failure(&call.id, payload.to_string(), message),
                diagnostic: None,
            };
        }

        let arguments = match parse_arguments(&call.arguments) {
            Ok(arguments) => arguments,
            Err(message) => {
                let payload = fault_payload(&message, "ArgumentParseError", call);
                return ToolInvocation {
                    result: ToolResult::failure(&call.id, payload.to_string(), message.clone()),
                    diagnostic: Some(diagnostics::argument_fault_diagnostic(
                        &call.name,
                        &call.arguments,
                        &message,
                    )),
                };
            }
        };

        match self.source.call_tool(&call.name, arguments).await {
            Ok(result) => {
                let diagnostic = diagnostics::has_embedded_error(&result)
                    .then(|| diagnostics::server_error_diagnostic(&call.name, &result));
                ToolInvocation {
                    result: ToolResult::success(&call.id, result.to_canonical_string()),
                    diagnostic,
                }
            }
            Err(err) => {
                let message = err.to_string();
                let payload = fault_payload(&message, err.category(), call);
                ToolInvocation {
                    result: ToolResult::failure(&call.id, payload.to_string(), message),
                    diagnostic: Some(diagnostics::fault_diagnostic(
                        &call.name,
                        &call.arguments,
                        &err,
                    )),
                }
            }
        }
    }
}

fn fault_payload(message: &str, category: &str, call: &ToolCall) -> Value {
    json!({
        "error": message,
        "errorType": category,
        "tool": call.name,
        "arguments": call.arguments,
    })
}

/// Parse the model's raw argument string into a key/value map.
///
/// Blank input and `{}` mean no arguments.
pub fn parse_arguments(raw: &str) -> Result<Map<String, Value>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "{}" {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!(
            "Tool arguments must be a JSON object, got: {}",
            json_type_name(&other)
        )),
        Err(e) => Err(format!("Invalid tool arguments JSON: {e}")),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
