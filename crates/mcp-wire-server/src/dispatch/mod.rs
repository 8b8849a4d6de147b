//! Per-session dispatcher: classify, decode, gate through the handshake,
//! invoke the collaborator and build the correlated response.

use std::sync::Arc;

use serde_json::Value;

use mcp_wire::{
    classify, recover_id, DomainError, Event, HandshakeConfig, JsonRpcMessage, JsonRpcRequest,
    JsonRpcResponse, McpError, McpResult, MessageKind, Outcome, RequestId, RequestParams, Session,
    SessionState,
};

use crate::handlers::{HandlerRegistry, SessionRef};

/// Owns exactly one session. Every entry point takes `&mut self`, so a
/// session's messages are processed one at a time in arrival order.
pub struct Dispatcher {
    session: Session,
    config: Arc<HandshakeConfig>,
    handlers: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(
        session_id: impl Into<String>,
        config: Arc<HandshakeConfig>,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            session: Session::new(session_id),
            config,
            handlers,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_closed(&self) -> bool {
        self.session.state().is_closed()
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Close the session, as on transport disconnect.
    pub fn close(&mut self) {
        self.session.advance(&self.config, Event::TransportClosed);
    }

    /// Handle one framed message. Returns the response to send, if any.
    pub async fn handle_text(&mut self, text: &str) -> Option<JsonRpcResponse> {
        if self.is_closed() {
            tracing::debug!(session = %self.session.id(), "Dropping message on closed session");
            return None;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                tracing::warn!(session = %self.session.id(), "Parse error: {e}");
                self.malformed(false);
                Some(McpError::ParseError(e.to_string()).to_json_rpc_error(None))
            }
        }
    }

    /// Handle one already-parsed JSON value.
    pub async fn handle_value(&mut self, value: Value) -> Option<JsonRpcResponse> {
        if self.is_closed() {
            tracing::debug!(session = %self.session.id(), "Dropping message on closed session");
            return None;
        }
        match classify(&value) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => self.reject_envelope(&value, e),
        }
    }

    /// Handle one classified message.
    pub async fn handle_message(&mut self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        if self.is_closed() {
            return None;
        }
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.session
                    .advance(&self.config, Event::Notification(&notification.method));
                None
            }
            JsonRpcMessage::Response(_) => {
                self.session.advance(&self.config, Event::Response);
                None
            }
        }
    }

    /// Answer an envelope that failed classification. Only request-shaped
    /// or unrecognizable input is answered; a broken notification or
    /// response has no one waiting for a reply.
    fn reject_envelope(&mut self, value: &Value, error: McpError) -> Option<JsonRpcResponse> {
        let id = recover_id(value);
        let shape = value.as_object().and_then(|o| MessageKind::of(o).ok());
        tracing::warn!(
            session = %self.session.id(),
            id = ?id,
            "Rejected envelope: {error}"
        );
        self.malformed(id.is_some());

        match shape {
            Some(MessageKind::Notification | MessageKind::Response) => None,
            Some(MessageKind::Request) | None => Some(error.to_json_rpc_error(id)),
        }
    }

    fn malformed(&mut self, id_recovered: bool) {
        self.session
            .advance(&self.config, Event::Malformed { id_recovered });
    }

    async fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id;

        let payload = match RequestParams::decode(&request.method, request.params.as_ref()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(session = %self.session.id(), method = %request.method, "{e}");
                self.malformed(true);
                return e.to_json_rpc_error(Some(id));
            }
        };

        match self.session.advance(&self.config, Event::Request(&payload)) {
            Outcome::Initialized(result) => JsonRpcResponse::from_result(
                id,
                serde_json::to_value(result).map_err(McpError::Json),
            ),
            Outcome::Forward => self.invoke(id, payload).await,
            Outcome::Reject(e) => e.to_json_rpc_error(Some(id)),
            Outcome::Closed => McpError::SessionClosed.to_json_rpc_error(Some(id)),
            Outcome::Continue => McpError::InternalError(format!(
                "handshake produced no outcome for {}",
                payload.method()
            ))
            .to_json_rpc_error(Some(id)),
        }
    }

    async fn invoke(&self, id: RequestId, payload: RequestParams) -> JsonRpcResponse {
        let method = payload.method();
        let Some(handler) = self.handlers.get(method) else {
            return McpError::MethodNotFound(method.to_string()).to_json_rpc_error(Some(id));
        };

        let session = SessionRef::from(&self.session);
        let task = tokio::spawn(async move { handler.handle(method, payload, session).await });

        let result: McpResult<Value> = match task.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(collaborator_error(err)),
            Err(join) => {
                tracing::error!(session = %self.session.id(), "Handler for {method} failed: {join}");
                Err(McpError::InternalError(format!("handler for {method} failed")))
            }
        };

        if let Err(e) = &result {
            tracing::debug!(session = %self.session.id(), id = %id, "{method} failed: {e}");
        }

        JsonRpcResponse::from_result(id, result)
    }
}

/// Map a collaborator failure onto the wire taxonomy.
fn collaborator_error(err: anyhow::Error) -> McpError {
    let err = match err.downcast::<DomainError>() {
        Ok(domain) => return McpError::Domain(domain),
        Err(err) => err,
    };
    match err.downcast::<McpError>() {
        Ok(mcp) => mcp,
        Err(other) => {
            tracing::error!("Unexpected handler failure: {other:#}");
            McpError::InternalError(other.to_string())
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("session", &self.session)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
