//! Content and resource-contents sum types.
//!
//! `Content` carries an explicit `type` tag. `ResourceContents` has no tag on
//! the wire; it is told apart by which of `text` or `blob` is present, and an
//! object with both or neither is rejected rather than guessed at.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decode::{deserialize_via_decode, ObjectReader};
use crate::error::{McpError, McpResult};

/// Sender or recipient of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Optional hints for the client: who the content is for and how much it
/// matters. `priority` always lies in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Annotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<f64>,
}

fn check_priority(priority: f64, path: &str) -> McpResult<f64> {
    if (0.0..=1.0).contains(&priority) {
        Ok(priority)
    } else {
        Err(McpError::invalid_params(
            path,
            format!("priority must lie in [0, 1], got {priority}"),
        ))
    }
}

impl Annotations {
    pub fn new(audience: Option<Vec<Role>>, priority: Option<f64>) -> McpResult<Self> {
        let priority = priority
            .map(|p| check_priority(p, "priority"))
            .transpose()?;
        Ok(Self { audience, priority })
    }

    pub fn audience(&self) -> Option<&[Role]> {
        self.audience.as_deref()
    }

    pub fn priority(&self) -> Option<f64> {
        self.priority
    }

    fn decode(reader: &ObjectReader<'_>) -> McpResult<Self> {
        let audience = reader.typed::<Vec<Role>>("audience")?;
        let priority = reader
            .optional_f64("priority")?
            .map(|p| check_priority(p, &reader.field_path("priority")))
            .transpose()?;
        Ok(Self { audience, priority })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub text: String,
    #[serde(flatten)]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageContent {
    /// Base64-encoded image data.
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(flatten)]
    pub annotations: Annotations,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedResource {
    pub resource: ResourceContents,
    #[serde(flatten)]
    pub annotations: Annotations,
}

/// A piece of message content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text(TextContent),
    #[serde(rename = "image")]
    Image(ImageContent),
    #[serde(rename = "resource")]
    Resource(EmbeddedResource),
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(TextContent {
            text: text.into(),
            annotations: Annotations::default(),
        })
    }

    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Content::Image(ImageContent {
            data: data.into(),
            mime_type: mime_type.into(),
            annotations: Annotations::default(),
        })
    }

    pub fn resource(resource: ResourceContents) -> Self {
        Content::Resource(EmbeddedResource {
            resource,
            annotations: Annotations::default(),
        })
    }

    /// Replace this content's annotations.
    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        match &mut self {
            Content::Text(c) => c.annotations = annotations,
            Content::Image(c) => c.annotations = annotations,
            Content::Resource(c) => c.annotations = annotations,
        }
        self
    }

    /// The wire value of the `type` discriminant.
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Image(_) => "image",
            Content::Resource(_) => "resource",
        }
    }

    pub fn annotations(&self) -> &Annotations {
        match self {
            Content::Text(c) => &c.annotations,
            Content::Image(c) => &c.annotations,
            Content::Resource(c) => &c.annotations,
        }
    }

    /// Decode content found at `path`.
    pub fn decode(value: &Value, path: &str) -> McpResult<Self> {
        let reader = ObjectReader::new(value, path)?;
        let kind = reader.required_str("type")?;
        // Only read once the type is known to be valid.
        let annotations = || Annotations::decode(&reader);

        match kind.as_str() {
            "text" => Ok(Content::Text(TextContent {
                text: reader.required_str("text")?,
                annotations: annotations()?,
            })),
            "image" => Ok(Content::Image(ImageContent {
                data: reader.required_str("data")?,
                mime_type: reader.required_str("mimeType")?,
                annotations: annotations()?,
            })),
            "resource" => Ok(Content::Resource(EmbeddedResource {
                resource: ResourceContents::decode(
                    reader.required("resource")?,
                    &reader.field_path("resource"),
                )?,
                annotations: annotations()?,
            })),
            other => Err(McpError::invalid_params(
                reader.field_path("type"),
                format!("unknown content type `{other}`, expected text, image or resource"),
            )),
        }
    }
}

deserialize_via_decode!(Content, "content");

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextResourceContents {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobResourceContents {
    pub uri: String,
    pub mime_type: String,
    /// Base64-encoded binary data.
    pub blob: String,
}

impl BlobResourceContents {
    pub fn from_bytes(uri: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            uri: uri.into(),
            mime_type: mime_type.into(),
            blob: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn decode_blob(&self) -> McpResult<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.blob)
            .map_err(|e| McpError::invalid_params("blob", format!("invalid base64: {e}")))
    }
}

/// Contents of a resource, distinguished structurally.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceContents {
    Text(TextResourceContents),
    Blob(BlobResourceContents),
}

impl ResourceContents {
    pub fn uri(&self) -> &str {
        match self {
            ResourceContents::Text(c) => &c.uri,
            ResourceContents::Blob(c) => &c.uri,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            ResourceContents::Text(c) => &c.mime_type,
            ResourceContents::Blob(c) => &c.mime_type,
        }
    }

    /// Decode resource contents found at `path`.
    pub fn decode(value: &Value, path: &str) -> McpResult<Self> {
        let reader = ObjectReader::new(value, path)?;

        match (reader.has("text"), reader.has("blob")) {
            (true, false) => Ok(ResourceContents::Text(TextResourceContents {
                uri: reader.required_str("uri")?,
                mime_type: reader.required_str("mimeType")?,
                text: reader.required_str("text")?,
            })),
            (false, true) => Ok(ResourceContents::Blob(BlobResourceContents {
                uri: reader.required_str("uri")?,
                mime_type: reader.required_str("mimeType")?,
                blob: reader.required_str("blob")?,
            })),
            (true, true) => Err(McpError::AmbiguousResourceContents {
                path: reader.path().to_string(),
                detail: "both `text` and `blob` are present".to_string(),
            }),
            (false, false) => Err(McpError::AmbiguousResourceContents {
                path: reader.path().to_string(),
                detail: "neither `text` nor `blob` is present".to_string(),
            }),
        }
    }
}

deserialize_via_decode!(ResourceContents, "resource");
