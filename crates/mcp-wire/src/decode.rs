//! Structural decoding over generic JSON trees.
//!
//! Payloads are parsed into a `serde_json::Value` first and then walked with
//! explicit presence and type checks, so every failure names the field path
//! it happened at (`params.messages[0].content.type`). A `null` value is
//! treated the same as an absent key.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{McpError, McpResult};

/// Implement `Deserialize` for a type by routing through its structural
/// `decode(&Value, path)` constructor.
macro_rules! deserialize_via_decode {
    ($ty:ty, $root:expr) => {
        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
                <$ty>::decode(&value, $root).map_err(serde::de::Error::custom)
            }
        }
    };
}
pub(crate) use deserialize_via_decode;

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mistyped(path: &str, expected: &str, found: &Value) -> McpError {
    McpError::invalid_params(path, format!("expected {expected}, found {}", type_name(found)))
}

pub(crate) fn as_string(value: &Value, path: &str) -> McpResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mistyped(path, "string", value))
}

/// A view over one JSON object plus the path it was reached by.
pub(crate) struct ObjectReader<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> ObjectReader<'a> {
    pub fn new(value: &'a Value, path: impl Into<String>) -> McpResult<Self> {
        let path = path.into();
        match value {
            Value::Object(map) => Ok(Self { map, path }),
            other => Err(mistyped(&path, "object", other)),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn field_path(&self, key: &str) -> String {
        format!("{}.{key}", self.path)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn required(&self, key: &str) -> McpResult<&'a Value> {
        self.get(key)
            .ok_or_else(|| McpError::invalid_params(self.field_path(key), "missing required field"))
    }

    pub fn required_str(&self, key: &str) -> McpResult<String> {
        as_string(self.required(key)?, &self.field_path(key))
    }

    pub fn optional_str(&self, key: &str) -> McpResult<Option<String>> {
        self.get(key)
            .map(|v| as_string(v, &self.field_path(key)))
            .transpose()
    }

    pub fn optional_f64(&self, key: &str) -> McpResult<Option<f64>> {
        self.get(key)
            .map(|v| v.as_f64().ok_or_else(|| mistyped(&self.field_path(key), "number", v)))
            .transpose()
    }

    pub fn required_u32(&self, key: &str) -> McpResult<u32> {
        let value = self.required(key)?;
        value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| mistyped(&self.field_path(key), "non-negative integer", value))
    }

    pub fn object(&self, key: &str) -> McpResult<ObjectReader<'a>> {
        ObjectReader::new(self.required(key)?, self.field_path(key))
    }

    /// Elements of a required array, each paired with its own path.
    pub fn array(&self, key: &str) -> McpResult<Vec<(String, &'a Value)>> {
        let path = self.field_path(key);
        match self.required(key)? {
            Value::Array(items) => Ok(items
                .iter()
                .enumerate()
                .map(|(i, item)| (format!("{path}[{i}]"), item))
                .collect()),
            other => Err(mistyped(&path, "array", other)),
        }
    }

    pub fn optional_string_array(&self, key: &str) -> McpResult<Option<Vec<String>>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let path = self.field_path(key);
        let items = value
            .as_array()
            .ok_or_else(|| mistyped(&path, "array", value))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| as_string(item, &format!("{path}[{i}]")))
            .collect::<McpResult<Vec<_>>>()
            .map(Some)
    }

    pub fn optional_map(&self, key: &str) -> McpResult<Option<Map<String, Value>>> {
        self.get(key)
            .map(|v| {
                v.as_object()
                    .cloned()
                    .ok_or_else(|| mistyped(&self.field_path(key), "object", v))
            })
            .transpose()
    }

    /// Like `optional_map`, but an absent field decodes to `{}`.
    pub fn map_or_empty(&self, key: &str) -> McpResult<Map<String, Value>> {
        Ok(self.optional_map(key)?.unwrap_or_default())
    }

    /// Decode a leaf shape with its serde derive, keeping the field path.
    pub fn typed<T: DeserializeOwned>(&self, key: &str) -> McpResult<Option<T>> {
        self.get(key)
            .map(|v| {
                T::deserialize(v)
                    .map_err(|e| McpError::invalid_params(self.field_path(key), e.to_string()))
            })
            .transpose()
    }

    pub fn required_typed<T: DeserializeOwned>(&self, key: &str) -> McpResult<T> {
        self.required(key)?;
        self.typed(key)?
            .ok_or_else(|| McpError::invalid_params(self.field_path(key), "missing required field"))
    }
}
