//! The per-connection handshake state machine.
//!
//! A [`Session`] is a plain value. [`Session::step`] maps the current session
//! and one inbound [`Event`] to the next session and an [`Outcome`] telling
//! the caller what to emit. It performs no I/O; the caller owns the transport
//! and must feed events in arrival order.

use serde::Serialize;

use crate::capabilities::{
    ClientCapabilities, Implementation, InitializeParams, InitializeResult, ServerCapabilities,
    MCP_VERSION,
};
use crate::error::McpError;
use crate::request::RequestParams;

/// Sent by the client once it has processed the initialize result.
pub const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";
/// Sent by either side to abandon an in-flight request.
pub const CANCELLED_NOTIFICATION: &str = "notifications/cancelled";

/// Consecutive unrecoverable messages tolerated before the session closes.
pub const DEFAULT_MAX_CONSECUTIVE_MALFORMED: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        }
    }

    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide, read-only handshake configuration. Built once at startup
/// and shared by every session.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeConfig {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
    pub instructions: Option<String>,
    /// Zero disables the threshold.
    pub max_consecutive_malformed: u32,
}

impl HandshakeConfig {
    pub fn new(server_info: Implementation, capabilities: ServerCapabilities) -> Self {
        Self {
            protocol_version: MCP_VERSION.to_string(),
            capabilities,
            server_info,
            instructions: None,
            max_consecutive_malformed: DEFAULT_MAX_CONSECUTIVE_MALFORMED,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_malformed_threshold(mut self, threshold: u32) -> Self {
        self.max_consecutive_malformed = threshold;
        self
    }

    pub fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: self.protocol_version.clone(),
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        }
    }
}

/// One inbound message, as seen by the state machine.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// A request whose params decoded successfully.
    Request(&'a RequestParams),
    Notification(&'a str),
    /// A response from the client. Never answered.
    Response,
    /// A message that failed classification or decoding.
    Malformed { id_recovered: bool },
    TransportClosed,
}

/// What the caller should do after a transition.
#[derive(Debug)]
pub enum Outcome {
    /// Reply to the initialize request with this result.
    Initialized(InitializeResult),
    /// Pass the request on to its handler.
    Forward,
    /// Reply with this error.
    Reject(McpError),
    /// Nothing to send.
    Continue,
    /// The session is closed. Stop processing messages.
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: String,
    state: SessionState,
    negotiated_protocol_version: Option<String>,
    merged_capabilities: Option<ServerCapabilities>,
    client_capabilities: Option<ClientCapabilities>,
    client_info: Option<Implementation>,
    consecutive_malformed: u32,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Uninitialized,
            negotiated_protocol_version: None,
            merged_capabilities: None,
            client_capabilities: None,
            client_info: None,
            consecutive_malformed: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn negotiated_protocol_version(&self) -> Option<&str> {
        self.negotiated_protocol_version.as_deref()
    }

    pub fn merged_capabilities(&self) -> Option<&ServerCapabilities> {
        self.merged_capabilities.as_ref()
    }

    pub fn client_capabilities(&self) -> Option<&ClientCapabilities> {
        self.client_capabilities.as_ref()
    }

    pub fn client_info(&self) -> Option<&Implementation> {
        self.client_info.as_ref()
    }

    pub fn consecutive_malformed(&self) -> u32 {
        self.consecutive_malformed
    }

    /// Compute the transition for `event` without touching `self`.
    pub fn step(&self, config: &HandshakeConfig, event: Event<'_>) -> (Session, Outcome) {
        let mut next = self.clone();
        let outcome = next.apply(config, event);
        (next, outcome)
    }

    /// Apply the transition for `event` in place.
    pub fn advance(&mut self, config: &HandshakeConfig, event: Event<'_>) -> Outcome {
        let (next, outcome) = self.step(config, event);
        *self = next;
        outcome
    }

    fn apply(&mut self, config: &HandshakeConfig, event: Event<'_>) -> Outcome {
        if self.state.is_closed() {
            return Outcome::Closed;
        }

        match event {
            Event::Malformed { id_recovered: true } => {
                self.consecutive_malformed = 0;
                Outcome::Continue
            }
            Event::Malformed {
                id_recovered: false,
            } => self.record_malformed(config),
            Event::TransportClosed => {
                self.close("transport closed");
                Outcome::Closed
            }
            Event::Response => {
                self.consecutive_malformed = 0;
                tracing::debug!(session = %self.id, "Ignoring response from client");
                Outcome::Continue
            }
            Event::Notification(method) => {
                self.consecutive_malformed = 0;
                self.on_notification(method);
                Outcome::Continue
            }
            Event::Request(params) => {
                self.consecutive_malformed = 0;
                self.on_request(config, params)
            }
        }
    }

    fn on_request(&mut self, config: &HandshakeConfig, params: &RequestParams) -> Outcome {
        match (self.state, params) {
            (SessionState::Uninitialized, RequestParams::Initialize(init)) => {
                self.initialize(config, init)
            }
            (SessionState::Initializing | SessionState::Ready, RequestParams::Initialize(_)) => {
                tracing::warn!(session = %self.id, state = %self.state, "Duplicate initialize");
                Outcome::Reject(McpError::AlreadyInitialized)
            }
            (SessionState::Ready, _) => Outcome::Forward,
            (state, other) => {
                tracing::warn!(
                    session = %self.id,
                    state = %state,
                    method = %other.method(),
                    "Request before handshake completed"
                );
                Outcome::Reject(McpError::NotInitialized)
            }
        }
    }

    fn initialize(&mut self, config: &HandshakeConfig, params: &InitializeParams) -> Outcome {
        if params.protocol_version != config.protocol_version {
            tracing::warn!(
                session = %self.id,
                "Client requested protocol version {}, server supports {}",
                params.protocol_version,
                config.protocol_version
            );
            return Outcome::Reject(McpError::UnsupportedProtocolVersion {
                requested: params.protocol_version.clone(),
                supported: config.protocol_version.clone(),
            });
        }

        self.negotiated_protocol_version = Some(config.protocol_version.clone());
        self.merged_capabilities = Some(config.capabilities.clone());
        self.client_capabilities = Some(params.capabilities.clone());
        self.client_info = Some(params.client_info.clone());
        self.state = SessionState::Initializing;

        tracing::info!(
            session = %self.id,
            "Initialized with client: {} v{}",
            params.client_info.name,
            params.client_info.version
        );

        Outcome::Initialized(config.initialize_result())
    }

    fn on_notification(&mut self, method: &str) {
        match (self.state, method) {
            (SessionState::Initializing, INITIALIZED_NOTIFICATION) => {
                self.state = SessionState::Ready;
                tracing::info!(session = %self.id, "MCP handshake complete");
            }
            (state, INITIALIZED_NOTIFICATION) => {
                tracing::debug!(session = %self.id, state = %state, "Ignoring out-of-order initialized notification");
            }
            (_, CANCELLED_NOTIFICATION) => {
                tracing::debug!(session = %self.id, "Received cancellation notification");
            }
            (_, other) => {
                tracing::debug!(session = %self.id, method = other, "Ignoring unknown notification");
            }
        }
    }

    fn record_malformed(&mut self, config: &HandshakeConfig) -> Outcome {
        self.consecutive_malformed = self.consecutive_malformed.saturating_add(1);
        let limit = config.max_consecutive_malformed;
        if limit > 0 && self.consecutive_malformed > limit {
            tracing::warn!(
                session = %self.id,
                count = self.consecutive_malformed,
                "Too many consecutive malformed messages"
            );
            self.close("malformed message threshold exceeded");
            return Outcome::Closed;
        }
        Outcome::Continue
    }

    fn close(&mut self, reason: &str) {
        tracing::info!(session = %self.id, from = %self.state, reason, "Session closed");
        self.state = SessionState::Closed;
    }
}
