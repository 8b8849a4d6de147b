//! Sample `completion/complete` collaborator: prefix matches for the
//! greeting prompt's arguments.

use serde_json::Value;

use mcp_wire::{CompleteArgument, CompleteResult, Completion, Method, Reference, RequestParams};

use super::prompts::{GREETING, STYLES};
use super::{BoxFuture, MethodHandler, SessionRef};

pub struct PrefixCompletion;

impl PrefixCompletion {
    pub fn complete(reference: &Reference, argument: &CompleteArgument) -> CompleteResult {
        let candidates: &[&str] = match (reference, argument.name.as_str()) {
            (Reference::Prompt { name }, "style") if name == GREETING => STYLES,
            _ => &[],
        };

        let prefix = argument.value.to_lowercase();
        let values = candidates
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .map(|c| c.to_string())
            .collect();

        CompleteResult {
            completion: Completion::from_candidates(values),
        }
    }
}

impl MethodHandler for PrefixCompletion {
    fn handle<'a>(
        &'a self,
        method: Method,
        payload: RequestParams,
        _session: SessionRef,
    ) -> BoxFuture<'a, anyhow::Result<Value>> {
        Box::pin(async move {
            let RequestParams::Complete(params) = payload else {
                anyhow::bail!("completion source cannot serve {method}");
            };
            let result = PrefixCompletion::complete(&params.reference, &params.argument);
            Ok(serde_json::to_value(result)?)
        })
    }
}
