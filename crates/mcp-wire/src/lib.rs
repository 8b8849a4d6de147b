//! mcp-wire: the MCP message layer over JSON-RPC 2.0.
//!
//! Classifies raw JSON into requests, notifications and responses, decodes
//! method payloads and content into typed values, gates requests through the
//! initialize handshake and builds correlated responses. Nothing here does
//! I/O; transports and handlers live in `mcp-wire-server`.

pub mod capabilities;
mod decode;
pub mod content;
pub mod error;
pub mod handshake;
pub mod message;
pub mod request;
pub mod response;
pub mod result;

pub use capabilities::*;
pub use content::{
    Annotations, BlobResourceContents, Content, EmbeddedResource, ImageContent, ResourceContents,
    Role, TextContent, TextResourceContents,
};
pub use error::{error_codes, mcp_error_codes, DomainError, McpError, McpResult};
pub use handshake::{
    Event, HandshakeConfig, Outcome, Session, SessionState, CANCELLED_NOTIFICATION,
    DEFAULT_MAX_CONSECUTIVE_MALFORMED, INITIALIZED_NOTIFICATION,
};
pub use message::{
    classify, parse, recover_id, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, MessageKind,
    RequestId, JSONRPC_VERSION,
};
pub use request::{
    CallToolParams, CompleteArgument, CompleteParams, ContextInclusion, CreateMessageParams,
    GetPromptParams, Method, ModelHint, ModelPreferences, Reference, RequestParams,
    SamplingMessage,
};
pub use response::{JsonRpcErrorObject, JsonRpcResponse, ResponseOutcome};
pub use result::{
    CallToolResult, CompleteResult, Completion, CreateMessageResult, GetPromptResult,
    PromptMessage, StopReason, MAX_COMPLETION_VALUES,
};
