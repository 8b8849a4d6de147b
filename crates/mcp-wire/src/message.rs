//! JSON-RPC 2.0 envelope types and the envelope classifier.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::decode::type_name;
use crate::error::{McpError, McpResult};
use crate::response::JsonRpcResponse;

/// JSON-RPC 2.0 protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier, a number or a string. Numbers are kept as received
/// so they echo back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(Number),
    String(String),
}

impl RequestId {
    /// Read an id from its wire value. `null` and other shapes yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(RequestId::Number(n.clone())),
            Value::String(s) => Some(RequestId::String(s.clone())),
            _ => None,
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id.into())
    }
}


impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A JSON-RPC 2.0 request message. Always serialized as version "2.0".
///
/// `params: None` means the member was absent. An explicit `null` is kept as
/// `Some(Value::Null)` so the envelope re-encodes as it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub id: RequestId,
    pub method: String,
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcNotification {
    pub method: String,
    pub params: Option<Value>,
}

/// Union type for any JSON-RPC message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

/// Which of the three envelope shapes an object has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Notification,
    Response,
}

impl MessageKind {
    /// Classify by key presence alone. The three predicates are mutually
    /// exclusive; an object matching none of them is an invalid envelope.
    pub fn of(object: &Map<String, Value>) -> McpResult<Self> {
        let has = |key: &str| object.contains_key(key);
        if has("method") && has("id") {
            Ok(MessageKind::Request)
        } else if has("method") {
            Ok(MessageKind::Notification)
        } else if has("result") || has("error") {
            Ok(MessageKind::Response)
        } else {
            Err(McpError::InvalidEnvelope(
                "object has none of `method`, `result` or `error`".to_string(),
            ))
        }
    }
}

/// Turn a decoded JSON value into a typed envelope.
pub fn classify(value: &Value) -> McpResult<JsonRpcMessage> {
    let object = value.as_object().ok_or_else(|| {
        McpError::InvalidEnvelope(format!("expected a JSON object, found {}", type_name(value)))
    })?;

    match MessageKind::of(object)? {
        MessageKind::Request => JsonRpcRequest::from_object(object).map(JsonRpcMessage::Request),
        MessageKind::Notification => {
            JsonRpcNotification::from_object(object).map(JsonRpcMessage::Notification)
        }
        MessageKind::Response => {
            JsonRpcResponse::from_object(object).map(JsonRpcMessage::Response)
        }
    }
}

/// Parse raw text into a typed envelope.
pub fn parse(text: &str) -> McpResult<JsonRpcMessage> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| McpError::ParseError(e.to_string()))?;
    classify(&value)
}

/// Best-effort id recovery for messages that failed to classify.
pub fn recover_id(value: &Value) -> Option<RequestId> {
    value.get("id").and_then(RequestId::from_value)
}

pub(crate) fn check_version(object: &Map<String, Value>) -> McpResult<()> {
    match object.get("jsonrpc") {
        Some(Value::String(v)) if v == JSONRPC_VERSION => Ok(()),
        Some(Value::String(v)) => Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{v}\""
        ))),
        Some(other) => Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got {}",
            type_name(other)
        ))),
        None => Err(McpError::InvalidRequest(
            "Missing `jsonrpc` member".to_string(),
        )),
    }
}

fn read_method(object: &Map<String, Value>) -> McpResult<String> {
    match object.get("method") {
        Some(Value::String(m)) if !m.is_empty() => Ok(m.clone()),
        Some(Value::String(_)) => Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        )),
        Some(other) => Err(McpError::InvalidRequest(format!(
            "Method must be a string, found {}",
            type_name(other)
        ))),
        None => Err(McpError::InvalidRequest("Missing `method`".to_string())),
    }
}

fn read_params(object: &Map<String, Value>) -> Option<Value> {
    object.get("params").cloned()
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    fn from_object(object: &Map<String, Value>) -> McpResult<Self> {
        check_version(object)?;
        let id = object
            .get("id")
            .and_then(RequestId::from_value)
            .ok_or_else(|| {
                McpError::InvalidRequest("Request id must be a number or a string".to_string())
            })?;
        Ok(Self {
            id,
            method: read_method(object)?,
            params: read_params(object),
        })
    }
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    fn from_object(object: &Map<String, Value>) -> McpResult<Self> {
        check_version(object)?;
        Ok(Self {
            method: read_method(object)?,
            params: read_params(object),
        })
    }
}

impl Serialize for JsonRpcRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("method", &self.method)?;
        if let Some(params) = &self.params {
            map.serialize_entry("params", params)?;
        }
        map.end()
    }
}

impl Serialize for JsonRpcNotification {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        map.serialize_entry("method", &self.method)?;
        if let Some(params) = &self.params {
            map.serialize_entry("params", params)?;
        }
        map.end()
    }
}

impl JsonRpcMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            JsonRpcMessage::Request(_) => MessageKind::Request,
            JsonRpcMessage::Notification(_) => MessageKind::Notification,
            JsonRpcMessage::Response(_) => MessageKind::Response,
        }
    }

    pub fn to_value(&self) -> McpResult<Value> {
        serde_json::to_value(self).map_err(McpError::Json)
    }
}

impl<'de> Deserialize<'de> for JsonRpcMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        classify(&value).map_err(serde::de::Error::custom)
    }
}
