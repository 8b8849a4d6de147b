//! Sample `tools/call` collaborator: `echo` and `add`.

use serde_json::{json, Value};

use mcp_wire::{error_codes, CallToolResult, DomainError, Method, RequestParams};

use super::{string_arg, BoxFuture, MethodHandler, SessionRef};

/// Names of the tools this set serves.
pub const TOOL_NAMES: &[&str] = &["echo", "add"];

pub struct ToolSet;

impl ToolSet {
    pub fn call(
        name: &str,
        arguments: &serde_json::Map<String, Value>,
    ) -> anyhow::Result<CallToolResult> {
        match name {
            "echo" => Ok(echo(arguments)),
            "add" => Ok(add(arguments)),
            _ => Err(DomainError::new(
                error_codes::INVALID_PARAMS,
                format!("Unknown tool: {name}"),
            )
            .with_data(json!({ "available": TOOL_NAMES }))
            .into()),
        }
    }
}

fn echo(arguments: &serde_json::Map<String, Value>) -> CallToolResult {
    match string_arg(arguments, "text") {
        Some(text) => CallToolResult::text(text),
        None => CallToolResult::error("Missing required argument: text"),
    }
}

fn add(arguments: &serde_json::Map<String, Value>) -> CallToolResult {
    let a = arguments.get("a").and_then(Value::as_f64);
    let b = arguments.get("b").and_then(Value::as_f64);
    match (a, b) {
        (Some(a), Some(b)) => CallToolResult::json(&json!({ "sum": a + b })),
        _ => CallToolResult::error("Arguments `a` and `b` must both be numbers"),
    }
}

impl MethodHandler for ToolSet {
    fn handle<'a>(
        &'a self,
        method: Method,
        payload: RequestParams,
        session: SessionRef,
    ) -> BoxFuture<'a, anyhow::Result<Value>> {
        Box::pin(async move {
            let RequestParams::CallTool(params) = payload else {
                anyhow::bail!("tool set cannot serve {method}");
            };
            tracing::debug!(session = %session.session_id, tool = %params.name, "Calling tool");
            let result = ToolSet::call(&params.name, &params.arguments)?;
            Ok(serde_json::to_value(result)?)
        })
    }
}
