//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use mcp_wire::{HandshakeConfig, Implementation, DEFAULT_MAX_CONSECUTIVE_MALFORMED};

use crate::handlers::HandlerRegistry;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "MCP_WIRE_CONFIG";
pub const INSTRUCTIONS_ENV: &str = "MCP_WIRE_INSTRUCTIONS";
pub const MAX_MALFORMED_ENV: &str = "MCP_WIRE_MAX_MALFORMED";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Server settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub server_name: String,
    pub server_version: String,
    pub instructions: Option<String>,
    /// Zero disables the threshold.
    pub max_consecutive_malformed: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: env!("CARGO_PKG_NAME").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: None,
            max_consecutive_malformed: DEFAULT_MAX_CONSECUTIVE_MALFORMED,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the config: explicit path, then `MCP_WIRE_CONFIG`, then
    /// defaults. Single-field env overrides apply last.
    pub fn resolve(explicit: Option<&str>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok());

        let config = match path {
            Some(path) => {
                tracing::info!("Loading config from {path}");
                Self::load(Path::new(&path))?
            }
            None => Self::default(),
        };

        config.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply single-field overrides read through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(instructions) = lookup(INSTRUCTIONS_ENV) {
            self.instructions = Some(instructions);
        }
        if let Some(value) = lookup(MAX_MALFORMED_ENV) {
            self.max_consecutive_malformed =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    var: MAX_MALFORMED_ENV,
                    value,
                })?;
        }
        Ok(self)
    }

    /// Freeze into the process-wide handshake configuration. Advertised
    /// capabilities follow the registered handlers.
    pub fn handshake_config(&self, handlers: &HandlerRegistry) -> HandshakeConfig {
        let mut config = HandshakeConfig::new(
            Implementation::new(&self.server_name, &self.server_version),
            handlers.server_capabilities(),
        )
        .with_malformed_threshold(self.max_consecutive_malformed);
        if let Some(instructions) = &self.instructions {
            config = config.with_instructions(instructions);
        }
        config
    }
}
