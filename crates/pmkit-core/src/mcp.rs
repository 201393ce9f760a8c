//! `.mcp.json`: MCP server definitions and the API keys they need.

use crate::error::{PmKitError, Result};
use crate::io;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A server PM Kit knows how to configure.
#[derive(Debug, Clone, Copy)]
pub struct ServerSpec {
    pub name: &'static str,
    pub required: bool,
    pub command: &'static str,
    pub args: &'static [&'static str],
    pub env_var: &'static str,
    /// Key under which the caller supplies this server's API key.
    pub api_key_name: &'static str,
    pub description: &'static str,
    pub key_url: &'static str,
}

pub const CATALOG: &[ServerSpec] = &[ServerSpec {
    name: "gemini",
    required: false,
    command: "npx",
    args: &["-y", "@anthropic-ai/claude-code-mcp-server-gemini"],
    env_var: "GEMINI_API_KEY",
    api_key_name: "geminiKey",
    description: "Gemini API for multi-modal analysis and enhanced AI capabilities",
    key_url: "https://ai.google.dev/",
}];

pub fn find_spec(name: &str) -> Option<&'static ServerSpec> {
    CATALOG.iter().find(|s| s.name == name)
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServer {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpConfig {
    pub mcp_servers: BTreeMap<String, McpServer>,
}

/// Outcome of a per-server configuration check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Configured,
    NotConfigured,
    Disabled,
    KeyMissing,
}

impl ServerStatus {
    pub fn is_ok(self) -> bool {
        self == ServerStatus::Configured
    }

    pub fn message(self) -> &'static str {
        match self {
            ServerStatus::Configured => "Server configured",
            ServerStatus::NotConfigured => "Server not configured",
            ServerStatus::Disabled => "Server is disabled",
            ServerStatus::KeyMissing => "API key not set",
        }
    }
}

impl McpConfig {
    /// Build a config from the supplied API keys, keyed by `api_key_name`.
    ///
    /// Optional servers without a key are written disabled with an empty
    /// env value so they can be enabled later.
    pub fn generate(keys: &BTreeMap<String, String>) -> Result<Self> {
        let mut config = McpConfig::default();
        for spec in CATALOG {
            let key = keys.get(spec.api_key_name).filter(|k| !k.is_empty());
            if spec.required && key.is_none() {
                return Err(PmKitError::ApiKeyInvalid(spec.api_key_name.to_string()));
            }
            let server = McpServer {
                command: spec.command.to_string(),
                args: spec.args.iter().map(|a| a.to_string()).collect(),
                env: BTreeMap::from([(
                    spec.env_var.to_string(),
                    key.cloned().unwrap_or_default(),
                )]),
                disabled: key.is_none(),
            };
            config.mcp_servers.insert(spec.name.to_string(), server);
        }
        Ok(config)
    }

    /// `Ok(None)` when the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PmKitError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| PmKitError::ConfigError(format!("failed to read .mcp.json: {e}")))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        io::write_json(path, self)
    }

    pub fn enabled_servers(&self) -> Vec<&str> {
        self.mcp_servers
            .iter()
            .filter(|(_, s)| !s.disabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn check_server(&self, name: &str) -> ServerStatus {
        let Some(server) = self.mcp_servers.get(name) else {
            return ServerStatus::NotConfigured;
        };
        if server.disabled {
            return ServerStatus::Disabled;
        }
        let env_var = find_spec(name).map(|s| s.env_var);
        let has_key = match env_var {
            Some(var) => server.env.get(var).is_some_and(|v| !v.is_empty()),
            None => true,
        };
        if has_key {
            ServerStatus::Configured
        } else {
            ServerStatus::KeyMissing
        }
    }

    fn server_mut(&mut self, name: &str) -> Result<&mut McpServer> {
        self.mcp_servers
            .get_mut(name)
            .ok_or_else(|| PmKitError::ConfigError(format!("Server not found in configuration: {name}")))
    }
}

/// Structural check of a raw `.mcp.json` document.
pub fn validate(doc: &Value) -> bool {
    let Some(servers) = doc.get("mcpServers").and_then(Value::as_object) else {
        return false;
    };
    servers.values().all(|server| {
        server.get("command").and_then(Value::as_str).is_some_and(|c| !c.is_empty())
            && server.get("args").is_some_and(Value::is_array)
            && server.get("env").is_some_and(Value::is_object)
    })
}

/// Set a server's API key in the file at `path` and enable it.
pub fn update_api_key(path: &Path, server: &str, api_key: &str) -> Result<()> {
    let mut config = McpConfig::read(path)?
        .ok_or_else(|| PmKitError::NotInitialized(path.parent().unwrap_or(path).to_path_buf()))?;
    let spec = find_spec(server)
        .ok_or_else(|| PmKitError::ConfigError(format!("Unknown server: {server}")))?;
    let entry = config.server_mut(server)?;
    entry.env.insert(spec.env_var.to_string(), api_key.to_string());
    entry.disabled = false;
    config.write(path)?;
    tracing::debug!(server, "updated MCP API key");
    Ok(())
}

pub fn set_enabled(path: &Path, server: &str, enabled: bool) -> Result<()> {
    let mut config = McpConfig::read(path)?
        .ok_or_else(|| PmKitError::ConfigError(format!("Server not found: {server}")))?;
    config.server_mut(server)?.disabled = !enabled;
    config.write(path)
}

pub fn enable(path: &Path, server: &str) -> Result<()> {
    set_enabled(path, server, true)
}

pub fn disable(path: &Path, server: &str) -> Result<()> {
    set_enabled(path, server, false)
}
