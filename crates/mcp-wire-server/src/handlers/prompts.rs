//! Sample `prompts/get` collaborator serving a single `greeting` prompt.

use serde_json::{json, Map, Value};

use mcp_wire::{error_codes, DomainError, GetPromptResult, Method, PromptMessage, RequestParams};

use super::{string_arg, BoxFuture, MethodHandler, SessionRef};

pub const GREETING: &str = "greeting";

/// Values accepted by the greeting's `style` argument.
pub const STYLES: &[&str] = &["casual", "formal", "friendly", "pirate"];

pub struct PromptSet;

impl PromptSet {
    pub fn get(name: &str, arguments: &Map<String, Value>) -> anyhow::Result<GetPromptResult> {
        match name {
            GREETING => greeting(arguments),
            _ => Err(DomainError::new(
                error_codes::INVALID_PARAMS,
                format!("Unknown prompt: {name}"),
            )
            .into()),
        }
    }
}

fn greeting(arguments: &Map<String, Value>) -> anyhow::Result<GetPromptResult> {
    let who = string_arg(arguments, "name").ok_or_else(|| {
        DomainError::new(
            error_codes::INVALID_PARAMS,
            "Missing required argument: name",
        )
        .with_data(json!({ "argument": "name" }))
    })?;

    let style = string_arg(arguments, "style").unwrap_or("friendly");
    let instruction = match style {
        "casual" => format!("Say hi to {who} in a relaxed, casual way."),
        "formal" => format!("Write a formal greeting addressed to {who}."),
        "friendly" => format!("Write a warm, friendly greeting for {who}."),
        "pirate" => format!("Greet {who} the way a pirate would."),
        other => {
            return Err(DomainError::new(
                error_codes::INVALID_PARAMS,
                format!("Unknown style: {other}"),
            )
            .with_data(json!({ "argument": "style", "allowed": STYLES }))
            .into())
        }
    };

    Ok(GetPromptResult {
        description: Some(format!("A {style} greeting")),
        messages: vec![PromptMessage::user(instruction)],
    })
}

impl MethodHandler for PromptSet {
    fn handle<'a>(
        &'a self,
        method: Method,
        payload: RequestParams,
        session: SessionRef,
    ) -> BoxFuture<'a, anyhow::Result<Value>> {
        Box::pin(async move {
            let RequestParams::GetPrompt(params) = payload else {
                anyhow::bail!("prompt set cannot serve {method}");
            };
            tracing::debug!(session = %session.session_id, prompt = %params.name, "Rendering prompt");
            let result = PromptSet::get(&params.name, &params.arguments)?;
            Ok(serde_json::to_value(result)?)
        })
    }
}
