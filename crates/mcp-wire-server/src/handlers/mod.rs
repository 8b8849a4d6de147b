//! Collaborator contract and method-family routing.
//!
//! A handler receives the already-decoded payload plus a read-only snapshot
//! of its session. It returns a JSON result, or an error: a [`DomainError`]
//! or an [`McpError`] keep their code, anything else is reported to the
//! client as an internal error.
//!
//! [`DomainError`]: mcp_wire::DomainError
//! [`McpError`]: mcp_wire::McpError

pub mod completion;
pub mod prompts;
pub mod tools;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use mcp_wire::{
    ClientCapabilities, Implementation, LoggingCapability, McpError, McpResult, Method,
    PromptsCapability, RequestParams, ServerCapabilities, Session, ToolsCapability,
};

/// A boxed future for async handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler may know about the session that sent the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub session_id: String,
    pub protocol_version: Option<String>,
    pub client_info: Option<Implementation>,
    pub client_capabilities: Option<ClientCapabilities>,
}

impl From<&Session> for SessionRef {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            protocol_version: session.negotiated_protocol_version().map(str::to_string),
            client_info: session.client_info().cloned(),
            client_capabilities: session.client_capabilities().cloned(),
        }
    }
}

/// Handles every request of one method family.
pub trait MethodHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        method: Method,
        payload: RequestParams,
        session: SessionRef,
    ) -> BoxFuture<'a, anyhow::Result<Value>>;
}

/// Adapter turning an async closure into a [`MethodHandler`].
pub struct FnHandler<F>(F);

/// Wrap `f` as a handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(RequestParams, SessionRef) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    FnHandler(f)
}

impl<F, Fut> MethodHandler for FnHandler<F>
where
    F: Fn(RequestParams, SessionRef) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        _method: Method,
        payload: RequestParams,
        session: SessionRef,
    ) -> BoxFuture<'a, anyhow::Result<Value>> {
        Box::pin((self.0)(payload, session))
    }
}

/// One handler per method family. Shared read-only by every session.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<Method, Arc<dyn MethodHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sample collaborators served by the binary.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.handlers.insert(Method::CallTool, Arc::new(tools::ToolSet));
        registry
            .handlers
            .insert(Method::GetPrompt, Arc::new(prompts::PromptSet));
        registry
            .handlers
            .insert(Method::Complete, Arc::new(completion::PrefixCompletion));
        registry
    }

    /// Route `method` to `handler`, replacing any previous handler.
    /// `initialize` belongs to the handshake and cannot be registered.
    pub fn register(
        &mut self,
        method: Method,
        handler: impl MethodHandler + 'static,
    ) -> McpResult<&mut Self> {
        if method == Method::Initialize {
            return Err(McpError::InvalidRequest(
                "initialize is handled by the handshake and cannot be registered".to_string(),
            ));
        }
        if self.handlers.insert(method, Arc::new(handler)).is_some() {
            tracing::debug!("Replaced handler for {method}");
        }
        Ok(self)
    }

    pub fn get(&self, method: Method) -> Option<Arc<dyn MethodHandler>> {
        self.handlers.get(&method).cloned()
    }

    pub fn has(&self, method: Method) -> bool {
        self.handlers.contains_key(&method)
    }

    /// Registered methods in table order.
    pub fn methods(&self) -> Vec<Method> {
        Method::ALL
            .into_iter()
            .filter(|m| self.handlers.contains_key(m))
            .collect()
    }

    /// The capability set advertised for what is registered.
    pub fn server_capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            logging: Some(LoggingCapability {}),
            tools: self
                .has(Method::CallTool)
                .then(|| ToolsCapability { list_changed: false }),
            prompts: self
                .has(Method::GetPrompt)
                .then(|| PromptsCapability { list_changed: false }),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}

/// Pull a string argument out of a tool or prompt argument map.
pub(crate) fn string_arg<'a>(
    arguments: &'a serde_json::Map<String, Value>,
    name: &str,
) -> Option<&'a str> {
    arguments.get(name).and_then(Value::as_str)
}
