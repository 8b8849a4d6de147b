//! HTTP transport: one JSON-RPC message per `POST /mcp`, sessions keyed by
//! the `Mcp-Session-Id` header, plus `/health`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json as AxumJson, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use mcp_wire::{recover_id, JsonRpcResponse, McpError, McpResult, Method, RequestId};

use crate::session::SessionRegistry;

/// Header carrying the session id assigned at initialize.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Shared server state passed to all handlers via axum State.
pub struct HttpState {
    pub sessions: Mutex<SessionRegistry>,
}

/// HTTP transport for web-based MCP clients.
pub struct HttpTransport {
    state: Arc<HttpState>,
}

impl HttpTransport {
    pub fn new(sessions: SessionRegistry) -> Self {
        Self {
            state: Arc::new(HttpState {
                sessions: Mutex::new(sessions),
            }),
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the HTTP server on the given address.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!("HTTP transport listening on {addr}");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(())
    }
}

pub fn router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/mcp", post(handle_post).delete(handle_delete))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn error_reply(status: StatusCode, error: McpError, id: Option<RequestId>) -> Response {
    (status, AxumJson(error.to_json_rpc_error(id))).into_response()
}

fn reply(response: Option<JsonRpcResponse>, session_id: Option<&str>) -> Response {
    let Some(response) = response else {
        return StatusCode::ACCEPTED.into_response();
    };
    let mut http = AxumJson(response).into_response();
    if let Some(value) = session_id.and_then(|id| HeaderValue::from_str(id).ok()) {
        http.headers_mut().insert(SESSION_HEADER, value);
    }
    http
}

async fn handle_post(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(id) = session_header(&headers) else {
        return open_session(&state, &body).await;
    };

    let dispatcher = state.sessions.lock().await.get(&id);
    let Some(dispatcher) = dispatcher else {
        return error_reply(
            StatusCode::NOT_FOUND,
            McpError::InvalidRequest(format!("Unknown session: {id}")),
            None,
        );
    };

    let (response, closed) = {
        let mut dispatcher = dispatcher.lock().await;
        let response = dispatcher.handle_text(&body).await;
        (response, dispatcher.is_closed())
    };

    if closed {
        state.sessions.lock().await.remove(&id);
    }

    reply(response, None)
}

/// A message without a session header must be an `initialize` request.
/// The session is only registered if the handshake accepts it.
async fn open_session(state: &HttpState, body: &str) -> Response {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return error_reply(
                StatusCode::BAD_REQUEST,
                McpError::ParseError(e.to_string()),
                None,
            )
        }
    };

    let is_initialize = value.get("method").and_then(Value::as_str)
        == Some(Method::Initialize.as_str())
        && value.get("id").is_some();
    if !is_initialize {
        return error_reply(
            StatusCode::BAD_REQUEST,
            McpError::InvalidRequest("Missing Mcp-Session-Id header".to_string()),
            recover_id(&value),
        );
    }

    let mut dispatcher = state.sessions.lock().await.create();
    let response = dispatcher.handle_value(value).await;

    match response {
        Some(response) if response.is_success() => {
            let id = dispatcher.session().id().to_string();
            state.sessions.lock().await.insert(dispatcher);
            reply(Some(response), Some(&id))
        }
        other => reply(other, None),
    }
}

async fn handle_delete(State(state): State<Arc<HttpState>>, headers: HeaderMap) -> StatusCode {
    let Some(id) = session_header(&headers) else {
        return StatusCode::BAD_REQUEST;
    };
    let removed = state.sessions.lock().await.remove(&id);
    match removed {
        Some(dispatcher) => {
            dispatcher.lock().await.close();
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// Health check endpoint.
async fn handle_health(State(state): State<Arc<HttpState>>) -> AxumJson<Value> {
    let sessions = state.sessions.lock().await.count();
    AxumJson(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": sessions,
    }))
}
