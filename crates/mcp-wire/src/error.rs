//! Error types and JSON-RPC error codes for the MCP message layer.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::message::RequestId;
use crate::response::{JsonRpcErrorObject, JsonRpcResponse};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP-specific error codes. Kept outside the reserved JSON-RPC block.
pub mod mcp_error_codes {
    pub const UNSUPPORTED_PROTOCOL_VERSION: i32 = -32800;
    pub const SESSION_CLOSED: i32 = -32801;
}

/// An error raised by a collaborator. Code, message and data reach the
/// client exactly as given.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct DomainError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl DomainError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// All errors that can occur while decoding or gating MCP messages.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Valid JSON that is not a request, notification or response.
    #[error("Parse error: invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid request: server not initialized")]
    NotInitialized,

    #[error("Invalid request: already initialized")]
    AlreadyInitialized,

    #[error("Unsupported protocol version: {requested} (supported: {supported})")]
    UnsupportedProtocolVersion { requested: String, supported: String },

    #[error("Session closed")]
    SessionClosed,

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {path}: {message}")]
    InvalidParams { path: String, message: String },

    /// Resource contents carrying both or neither of `text`/`blob`.
    #[error("Invalid params: {path}: ambiguous resource contents, {detail}")]
    AmbiguousResourceContents { path: String, detail: String },

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Shorthand for a field-path-qualified `InvalidParams`.
    pub fn invalid_params(path: impl Into<String>, message: impl Into<String>) -> Self {
        McpError::InvalidParams {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) | McpError::InvalidEnvelope(_) => PARSE_ERROR,
            McpError::InvalidRequest(_)
            | McpError::NotInitialized
            | McpError::AlreadyInitialized => INVALID_REQUEST,
            McpError::UnsupportedProtocolVersion { .. } => UNSUPPORTED_PROTOCOL_VERSION,
            McpError::SessionClosed => SESSION_CLOSED,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams { .. } | McpError::AmbiguousResourceContents { .. } => {
                INVALID_PARAMS
            }
            McpError::InternalError(_) | McpError::Transport(_) | McpError::Io(_) => {
                INTERNAL_ERROR
            }
            McpError::Domain(e) => e.code,
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    /// Structured `data` attached to the wire error, if any.
    pub fn data(&self) -> Option<Value> {
        match self {
            McpError::InvalidParams { path, .. } | McpError::AmbiguousResourceContents { path, .. }
                if !path.is_empty() =>
            {
                Some(json!({ "path": path }))
            }
            McpError::UnsupportedProtocolVersion {
                requested,
                supported,
            } => Some(json!({ "supported": [supported], "requested": requested })),
            McpError::Domain(e) => e.data.clone(),
            _ => None,
        }
    }

    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        let message = match self {
            McpError::Domain(e) => e.message.clone(),
            other => other.to_string(),
        };
        JsonRpcErrorObject {
            code: self.code(),
            message,
            data: self.data(),
        }
    }

    /// Build the error response correlated to `id` (`null` when unknown).
    pub fn to_json_rpc_error(&self, id: Option<RequestId>) -> JsonRpcResponse {
        JsonRpcResponse::failure(id, self.to_error_object())
    }
}

pub type McpResult<T> = Result<T, McpError>;
