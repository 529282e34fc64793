//! Tool catalogue exposed over MCP.
//!
//! One tool per receiver operation, named after its `tool` entry, whose
//! arguments are exactly the POST fields. Three extra tools read state back
//! through GETs.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::ops::{self, Fallback, FieldKind, FieldSpec, Operation, OperationKind};

/// A `tools/list` entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// What a tool name resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolTarget {
    /// POST the operation.
    Operation(&'static Operation),
    /// `GET /count_parameters`.
    CountParameters,
    /// `GET /list_parameters`.
    ListParameters,
    /// `GET /<operation>` for a named operation.
    GetResult,
}

impl ToolTarget {
    /// Resolves a tool name.
    #[must_use]
    pub fn resolve(name: &str) -> Option<Self> {
        match name {
            "count_parameters" => Some(Self::CountParameters),
            "list_parameters" => Some(Self::ListParameters),
            "get_result" => Some(Self::GetResult),
            _ => ops::by_tool(name).map(Self::Operation),
        }
    }
}

/// Content block of a tool result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

/// Body of a `tools/call` reply.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResult {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Wraps a receiver reply. A body with `"success": false` is flagged as
    /// an error so the agent notices without parsing the text.
    #[must_use]
    pub fn from_reply(reply: &Value) -> Self {
        let failed = reply.get("success") == Some(&Value::Bool(false));
        let text = serde_json::to_string_pretty(reply).unwrap_or_else(|_| reply.to_string());
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: failed,
        }
    }
}

fn field_schema(field: &FieldSpec) -> Value {
    let mut schema = json!({
        "type": field.kind.schema_type(),
        "description": field.description,
    });
    match field.kind {
        FieldKind::Point => {
            schema["items"] = json!({ "type": "number" });
            schema["minItems"] = json!(2);
            schema["maxItems"] = json!(3);
        }
        FieldKind::PointList => {
            schema["items"] = json!({
                "type": "array",
                "items": { "type": "number" },
                "minItems": 2,
                "maxItems": 3,
            });
        }
        FieldKind::Number | FieldKind::Integer | FieldKind::Boolean | FieldKind::Text => {}
    }
    if !matches!(field.default, Fallback::Required | Fallback::Null) {
        if let Some(default) = field.default.to_value() {
            schema["default"] = default;
        }
    }
    schema
}

/// JSON Schema for an operation's arguments.
#[must_use]
pub fn input_schema(fields: &[FieldSpec]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|f| (f.name.to_string(), field_schema(f)))
        .collect();
    let required: Vec<&str> = fields
        .iter()
        .filter(|f| f.is_required())
        .map(|f| f.name)
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn operation_tool(op: &'static Operation) -> ToolDefinition {
    ToolDefinition {
        name: op.tool,
        description: op.description,
        input_schema: input_schema(op.fields),
    }
}

/// Every tool, catalogue order first.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    let result_ops: Vec<&str> = ops::all()
        .iter()
        .filter(|op| op.kind != OperationKind::Inline)
        .map(|op| op.name)
        .collect();

    let mut tools: Vec<ToolDefinition> = ops::all().iter().map(operation_tool).collect();
    tools.push(ToolDefinition {
        name: "count_parameters",
        description: "Returns the number of user parameters in the active design.",
        input_schema: json!({ "type": "object", "properties": {} }),
    });
    tools.push(ToolDefinition {
        name: "list_parameters",
        description: "Lists the model parameters of the active design with value, unit and expression.",
        input_schema: json!({ "type": "object", "properties": {} }),
    });
    tools.push(ToolDefinition {
        name: "get_result",
        description: "Fetches the most recent stored result of an operation.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "description": "Operation name, e.g. list_bodies",
                    "enum": result_ops,
                }
            },
            "required": ["operation"],
        }),
    });
    tools
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tool_per_operation_plus_readers() {
        let tools = definitions();
        assert_eq!(tools.len(), ops::all().len() + 3);
        let mut names: Vec<_> = tools.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len(), "tool names must be unique");
    }

    #[test]
    fn schema_mirrors_fields() {
        let op = ops::by_tool("draw_holes").unwrap();
        let schema = input_schema(op.fields);
        assert_eq!(schema["properties"]["points"]["type"], "array");
        assert_eq!(schema["properties"]["width"]["default"], 1.0);
        assert!(schema["properties"]["depth"].get("default").is_none());
        assert_eq!(schema["required"], json!([]));

        let op = ops::by_tool("change_parameter").unwrap();
        assert_eq!(input_schema(op.fields)["required"], json!(["name", "value"]));
    }

    #[test]
    fn resolves_names() {
        assert_eq!(ToolTarget::resolve("get_result"), Some(ToolTarget::GetResult));
        assert!(matches!(
            ToolTarget::resolve("delete_all"),
            Some(ToolTarget::Operation(op)) if op.name == "delete_everything"
        ));
        assert_eq!(ToolTarget::resolve("nope"), None);
    }

    #[test]
    fn failed_reply_is_flagged() {
        let r = ToolCallResult::from_reply(&json!({"success": false, "error": "x"}));
        assert!(r.is_error);
        let r = ToolCallResult::from_reply(&json!({"message": "Box requested"}));
        assert!(!r.is_error);
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("isError").is_none());
        assert_eq!(v["content"][0]["type"], "text");
    }
}
