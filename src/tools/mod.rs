//! Tool layer between the chat model and the remote tool server.
//!
//! - [`schema`] maps tool names to function-calling parameter schemas
//! - [`invoker`] runs one tool call and normalizes its outcome
//! - [`diagnostics`] classifies failures for the operator console

pub mod diagnostics;
pub mod invoker;
pub mod schema;
pub mod traits;

pub use diagnostics::{Diagnostic, DiagnosticKind, ErrorClass};
pub use invoker::{ToolInvocation, ToolInvoker};
pub use schema::{parameters_for, specs_from_descriptors};
pub use traits::{ToolResult, ToolSpec};
