//! Parameter schemas for the remote directory tools.
//!
//! The tool server lists only a name and description per tool, so the
//! function-calling schema is supplied here from a fixed table. Unknown tools
//! get an empty object schema and stay callable.

use crate::mcp::McpToolInfo;
use crate::tools::traits::ToolSpec;
use serde_json::{json, Value};

pub const SUGGEST_QUERIES_TOOL: &str = "microsoft_graph_suggest_queries";
pub const GRAPH_GET_TOOL: &str = "microsoft_graph_get";
pub const LIST_PROPERTIES_TOOL: &str = "microsoft_graph_list_properties";

/// A single required string argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredArgument {
    pub name: &'static str,
    pub description: &'static str,
}

const KNOWN_TOOLS: &[(&str, RequiredArgument)] = &[
    (
        SUGGEST_QUERIES_TOOL,
        RequiredArgument {
            name: "intentDescription",
            description: "Natural-language description of what you want to find out, \
                          matched against known directory query patterns (e.g. 'count users').",
        },
    ),
    (
        GRAPH_GET_TOOL,
        RequiredArgument {
            name: "relativeUrl",
            description: "Relative directory API path including any query string to execute, \
                          e.g. '/v1.0/users?$count=true&$top=1'.",
        },
    ),
    (
        LIST_PROPERTIES_TOOL,
        RequiredArgument {
            name: "entityName",
            description: "Name of the entity whose properties should be listed, e.g. 'user' or 'group'.",
        },
    ),
];

/// The required argument of a known tool, `None` for unrecognized names.
pub fn required_argument(tool_name: &str) -> Option<RequiredArgument> {
    KNOWN_TOOLS
        .iter()
        .find(|(name, _)| *name == tool_name)
        .map(|(_, arg)| *arg)
}

/// Function-calling parameter schema for `tool_name`.
pub fn parameters_for(tool_name: &str) -> Value {
    match required_argument(tool_name) {
        Some(arg) => json!({
            "type": "object",
            "properties": {
                (arg.name): {
                    "type": "string",
                    "description": arg.description
                }
            },
            "required": [arg.name]
        }),
        None => json!({
            "type": "object",
            "properties": {},
            "required": []
        }),
    }
}

/// Combine discovered tools with their adapted schemas.
pub fn specs_from_descriptors(tools: &[McpToolInfo]) -> Vec<ToolSpec> {
    tools
        .iter()
        .map(|tool| ToolSpec {
            name: tool.name.clone(),
            description: tool.description.clone().unwrap_or_default(),
            parameters: parameters_for(&tool.name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tools_have_one_required_string_property() {
        for (tool, arg) in [
            (SUGGEST_QUERIES_TOOL, "intentDescription"),
            (GRAPH_GET_TOOL, "relativeUrl"),
            (LIST_PROPERTIES_TOOL, "entityName"),
        ] {
            let schema = parameters_for(tool);
            assert_eq!(schema["type"], "object");
            let required = schema["required"].as_array().unwrap();
            assert_eq!(required.len(), 1, "{tool}");
            assert_eq!(required[0], arg);
            let properties = schema["properties"].as_object().unwrap();
            assert_eq!(properties.len(), 1);
            assert_eq!(properties[arg]["type"], "string");
            assert!(!properties[arg]["description"].as_str().unwrap().is_empty());
        }
    }

    #[test]
    fn unknown_tool_gets_empty_schema() {
        let schema = parameters_for("microsoft_graph_post");
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"].as_object().unwrap().is_empty());
        assert!(schema["required"].as_array().unwrap().is_empty());
    }

    #[test]
    fn lookup_is_exact_match() {
        assert!(required_argument("MICROSOFT_GRAPH_GET").is_none());
        assert!(required_argument("").is_none());
    }

    #[test]
    fn schema_is_stable_across_calls() {
        for name in [GRAPH_GET_TOOL, "something_else"] {
            assert_eq!(parameters_for(name), parameters_for(name));
        }
    }

    #[test]
    fn specs_keep_server_name_and_description() {
        let tools = vec![
            McpToolInfo {
                name: GRAPH_GET_TOOL.into(),
                description: Some("Execute a query".into()),
                input_schema: Value::Null,
            },
            McpToolInfo {
                name: "new_tool".into(),
                description: None,
                input_schema: Value::Null,
            },
        ];
        let specs = specs_from_descriptors(&tools);
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].description, "Execute a query");
        assert_eq!(specs[0].parameters["required"][0], "relativeUrl");
        assert_eq!(specs[1].description, "");
        assert!(specs[1].parameters["required"].as_array().unwrap().is_empty());
    }
}
