//! JSON-RPC response envelopes and the builders that produce them.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decode::type_name;
use crate::error::{McpError, McpResult};
use crate::message::{check_version, RequestId, JSONRPC_VERSION};

/// Error object within a JSON-RPC error response. An explicit `"data": null`
/// decodes as `Some(Value::Null)`, distinct from an absent member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub data: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Result(Value),
    Error(JsonRpcErrorObject),
}

/// A JSON-RPC 2.0 response. `id` is `None` when the triggering message's id
/// could not be recovered; it is emitted as `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    pub id: Option<RequestId>,
    pub outcome: ResponseOutcome,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            outcome: ResponseOutcome::Result(result),
        }
    }

    pub fn failure(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            id,
            outcome: ResponseOutcome::Error(error),
        }
    }

    /// Wrap the outcome of handling the request with id `id`.
    pub fn from_result(id: RequestId, result: McpResult<Value>) -> Self {
        match result {
            Ok(value) => Self::success(id, value),
            Err(e) => e.to_json_rpc_error(Some(id)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Result(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Result(v) => Some(v),
            ResponseOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&JsonRpcErrorObject> {
        match &self.outcome {
            ResponseOutcome::Result(_) => None,
            ResponseOutcome::Error(e) => Some(e),
        }
    }

    pub fn to_value(&self) -> McpResult<Value> {
        serde_json::to_value(self).map_err(McpError::Json)
    }

    pub(crate) fn from_object(object: &Map<String, Value>) -> McpResult<Self> {
        check_version(object)?;

        let id = match object.get("id") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(RequestId::from_value(raw).ok_or_else(|| {
                McpError::InvalidRequest("Response id must be a number or a string".to_string())
            })?),
        };

        let outcome = match (object.get("result"), object.get("error")) {
            (Some(result), None) => ResponseOutcome::Result(result.clone()),
            (None, Some(error)) => {
                let error = JsonRpcErrorObject::deserialize(error).map_err(|e| {
                    McpError::InvalidEnvelope(format!("malformed error object: {e}"))
                })?;
                ResponseOutcome::Error(error)
            }
            (Some(_), Some(_)) => {
                return Err(McpError::InvalidEnvelope(
                    "response carries both `result` and `error`".to_string(),
                ))
            }
            (None, None) => {
                return Err(McpError::InvalidEnvelope(
                    "response carries neither `result` nor `error`".to_string(),
                ))
            }
        };

        Ok(Self { id, outcome })
    }
}

impl Serialize for JsonRpcResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        map.serialize_entry("id", &self.id)?;
        match &self.outcome {
            ResponseOutcome::Result(result) => map.serialize_entry("result", result)?,
            ResponseOutcome::Error(error) => map.serialize_entry("error", error)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for JsonRpcResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let object = value.as_object().ok_or_else(|| {
            serde::de::Error::custom(format!("expected a JSON object, found {}", type_name(&value)))
        })?;
        JsonRpcResponse::from_object(object).map_err(serde::de::Error::custom)
    }
}
