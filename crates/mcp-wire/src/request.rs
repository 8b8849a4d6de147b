//! MCP request payloads and the method-keyed payload decoder.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capabilities::{ClientCapabilities, Implementation, InitializeParams};
use crate::content::{Content, Role};
use crate::decode::{deserialize_via_decode, ObjectReader};
use crate::error::{McpError, McpResult};

/// The closed set of request methods this layer decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    CallTool,
    CreateMessage,
    Complete,
    GetPrompt,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Initialize,
        Method::CallTool,
        Method::CreateMessage,
        Method::Complete,
        Method::GetPrompt,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Method::Initialize),
            "tools/call" => Some(Method::CallTool),
            "sampling/createMessage" => Some(Method::CreateMessage),
            "completion/complete" => Some(Method::Complete),
            "prompts/get" => Some(Method::GetPrompt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Initialize => "initialize",
            Method::CallTool => "tools/call",
            Method::CreateMessage => "sampling/createMessage",
            Method::Complete => "completion/complete",
            Method::GetPrompt => "prompts/get",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetPromptParams {
    pub name: String,
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingMessage {
    pub role: Role,
    pub content: Content,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<ModelHint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_priority: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_priority: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intelligence_priority: Option<f64>,
}

/// Which servers' context the client should attach to a sampling request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextInclusion {
    None,
    ThisServer,
    AllServers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageParams {
    pub messages: Vec<SamplingMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_preferences: Option<ModelPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_context: Option<ContextInclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// What a completion request is completing an argument of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Reference {
    #[serde(rename = "ref/prompt")]
    Prompt { name: String },
    #[serde(rename = "ref/resource")]
    Resource { uri: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteArgument {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompleteParams {
    #[serde(rename = "ref")]
    pub reference: Reference,
    pub argument: CompleteArgument,
}

/// A decoded request payload, one variant per method.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    Initialize(InitializeParams),
    CallTool(CallToolParams),
    CreateMessage(CreateMessageParams),
    Complete(CompleteParams),
    GetPrompt(GetPromptParams),
}

impl RequestParams {
    /// Decode `params` for `method`. Unknown methods fail `MethodNotFound`;
    /// structurally invalid params fail `InvalidParams` with a field path.
    /// Absent or `null` params decode as `{}`.
    pub fn decode(method: &str, params: Option<&Value>) -> McpResult<Self> {
        let method = Method::from_name(method)
            .ok_or_else(|| McpError::MethodNotFound(method.to_string()))?;

        let empty = Value::Object(Map::new());
        let params = params.filter(|v| !v.is_null()).unwrap_or(&empty);

        match method {
            Method::Initialize => InitializeParams::decode(params, "params").map(Self::Initialize),
            Method::CallTool => CallToolParams::decode(params, "params").map(Self::CallTool),
            Method::CreateMessage => {
                CreateMessageParams::decode(params, "params").map(Self::CreateMessage)
            }
            Method::Complete => CompleteParams::decode(params, "params").map(Self::Complete),
            Method::GetPrompt => GetPromptParams::decode(params, "params").map(Self::GetPrompt),
        }
    }

    pub fn method(&self) -> Method {
        match self {
            RequestParams::Initialize(_) => Method::Initialize,
            RequestParams::CallTool(_) => Method::CallTool,
            RequestParams::CreateMessage(_) => Method::CreateMessage,
            RequestParams::Complete(_) => Method::Complete,
            RequestParams::GetPrompt(_) => Method::GetPrompt,
        }
    }

    pub fn to_value(&self) -> McpResult<Value> {
        serde_json::to_value(self).map_err(McpError::Json)
    }
}

impl InitializeParams {
    pub fn decode(value: &Value, path: &str) -> McpResult<Self> {
        let reader = ObjectReader::new(value, path)?;
        let client_info = reader.object("clientInfo")?;
        Ok(Self {
            protocol_version: reader.required_str("protocolVersion")?,
            capabilities: reader.required_typed::<ClientCapabilities>("capabilities")?,
            client_info: Implementation {
                name: client_info.required_str("name")?,
                version: client_info.required_str("version")?,
            },
        })
    }
}

deserialize_via_decode!(InitializeParams, "params");

impl CallToolParams {
    pub fn decode(value: &Value, path: &str) -> McpResult<Self> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            name: reader.required_str("name")?,
            arguments: reader.map_or_empty("arguments")?,
        })
    }
}

deserialize_via_decode!(CallToolParams, "params");

impl GetPromptParams {
    pub fn decode(value: &Value, path: &str) -> McpResult<Self> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            name: reader.required_str("name")?,
            arguments: reader.map_or_empty("arguments")?,
        })
    }
}

deserialize_via_decode!(GetPromptParams, "params");

impl SamplingMessage {
    pub fn decode(value: &Value, path: &str) -> McpResult<Self> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            role: reader.required_typed::<Role>("role")?,
            content: Content::decode(reader.required("content")?, &reader.field_path("content"))?,
        })
    }
}

deserialize_via_decode!(SamplingMessage, "message");

impl CreateMessageParams {
    pub fn decode(value: &Value, path: &str) -> McpResult<Self> {
        let reader = ObjectReader::new(value, path)?;
        let messages = reader
            .array("messages")?
            .into_iter()
            .map(|(item_path, item)| SamplingMessage::decode(item, &item_path))
            .collect::<McpResult<Vec<_>>>()?;

        Ok(Self {
            messages,
            model_preferences: reader.typed::<ModelPreferences>("modelPreferences")?,
            system_prompt: reader.optional_str("systemPrompt")?,
            include_context: reader.typed::<ContextInclusion>("includeContext")?,
            temperature: reader.optional_f64("temperature")?,
            max_tokens: reader.required_u32("maxTokens")?,
            stop_sequences: reader.optional_string_array("stopSequences")?,
            metadata: reader.optional_map("metadata")?,
        })
    }
}

deserialize_via_decode!(CreateMessageParams, "params");

impl Reference {
    pub fn decode(value: &Value, path: &str) -> McpResult<Self> {
        let reader = ObjectReader::new(value, path)?;
        match reader.required_str("type")?.as_str() {
            "ref/prompt" => Ok(Reference::Prompt {
                name: reader.required_str("name")?,
            }),
            "ref/resource" => Ok(Reference::Resource {
                uri: reader.required_str("uri")?,
            }),
            other => Err(McpError::invalid_params(
                reader.field_path("type"),
                format!("unknown reference type `{other}`, expected ref/prompt or ref/resource"),
            )),
        }
    }
}

impl CompleteParams {
    pub fn decode(value: &Value, path: &str) -> McpResult<Self> {
        let reader = ObjectReader::new(value, path)?;
        let argument = reader.object("argument")?;
        Ok(Self {
            reference: Reference::decode(reader.required("ref")?, &reader.field_path("ref"))?,
            argument: CompleteArgument {
                name: argument.required_str("name")?,
                value: argument.required_str("value")?,
            },
        })
    }
}

deserialize_via_decode!(CompleteParams, "params");
