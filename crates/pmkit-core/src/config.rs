use crate::error::{PmKitError, Result};
use crate::io;
use crate::paths;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const LAST_UPDATED_KEY: &str = "lastUpdated";
pub const GLOBAL_PREFIX: &str = "global.";

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Local,
    Global,
}

impl ConfigScope {
    pub fn label(self) -> &'static str {
        match self {
            ConfigScope::Local => "local",
            ConfigScope::Global => "global",
        }
    }
}

impl std::fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Split a user-supplied key into its target scope and bare key.
pub fn split_scope(key: &str) -> (ConfigScope, &str) {
    match key.strip_prefix(GLOBAL_PREFIX) {
        Some(rest) => (ConfigScope::Global, rest),
        None => (ConfigScope::Local, key),
    }
}

// ---------------------------------------------------------------------------
// ConfigDocument
// ---------------------------------------------------------------------------

/// A flat JSON key/value document stored with owner-only permissions.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: PathBuf,
    values: Map<String, Value>,
}

impl ConfigDocument {
    /// Load the document at `path`. Missing or unparseable files load empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    tracing::warn!(path = %path.display(), "config is not a JSON object; ignoring");
                    Map::new()
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config; ignoring");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config; ignoring");
                Map::new()
            }
        };
        Self { path, values }
    }

    pub fn local(root: &Path) -> Self {
        Self::load(paths::local_config_path(root))
    }

    pub fn global(home: &Path) -> Self {
        Self::load(paths::global_config_path(home))
    }

    pub fn open(scope: ConfigScope, root: &Path, home: &Path) -> Self {
        match scope {
            ConfigScope::Local => Self::local(root),
            ConfigScope::Global => Self::global(home),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Write the document, stamping `lastUpdated`.
    pub fn save(&mut self) -> Result<()> {
        self.values.insert(
            LAST_UPDATED_KEY.to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        io::write_json(&self.path, &self.values)?;
        io::set_private_permissions(&self.path)
    }

    /// Delete the backing file. Returns whether one existed.
    pub fn delete_file(&self) -> Result<bool> {
        io::remove_path(&self.path)
    }
}

/// Look a key up in the local document, then the global one.
pub fn lookup(root: &Path, home: &Path, key: &str) -> Option<(ConfigScope, Value)> {
    [ConfigScope::Local, ConfigScope::Global]
        .into_iter()
        .find_map(|scope| {
            ConfigDocument::open(scope, root, home)
                .get(key)
                .cloned()
                .map(|v| (scope, v))
        })
}

/// Remove a key from whichever document holds it, local first.
pub fn delete(root: &Path, home: &Path, key: &str) -> Result<Option<ConfigScope>> {
    for scope in [ConfigScope::Local, ConfigScope::Global] {
        let mut doc = ConfigDocument::open(scope, root, home);
        if doc.remove(key).is_some() {
            doc.save()?;
            return Ok(Some(scope));
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Key classification
// ---------------------------------------------------------------------------

/// What `config set` should do with a bare key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    GithubToken,
    /// An MCP server API key, carrying the lowercase server name.
    ApiKey(String),
    Generic,
}

pub fn classify_key(key: &str) -> KeyKind {
    if key == "githubToken" || key == "github-token" {
        return KeyKind::GithubToken;
    }
    let lower = key.to_ascii_lowercase();
    if key.ends_with("ApiKey") || key.ends_with("-api-key") {
        let server = lower
            .trim_end_matches("apikey")
            .trim_end_matches("-api-key")
            .trim_end_matches(['-', '_']);
        return KeyKind::ApiKey(server.to_string());
    }
    KeyKind::Generic
}

pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.contains("token") || lower.contains("key")
}

/// Mask a secret for display: first four, up to twenty `*`, last four.
pub fn mask_sensitive(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        n if n <= 8 => "***".to_string(),
        n => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{head}{}{tail}", "*".repeat((n - 8).min(20)))
        }
    }
}

/// Render a config value for display, masking sensitive keys.
pub fn display_value(key: &str, value: &Value) -> String {
    if is_sensitive_key(key) {
        return match value {
            Value::String(s) => mask_sensitive(s),
            _ => mask_sensitive(""),
        };
    }
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a generic `config set` value: JSON literals are kept typed, anything
/// else is stored as a string.
pub fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::Null)) => v,
        _ => Value::String(raw.to_string()),
    }
}

pub fn require_key(action: &str, key: Option<&str>) -> Result<String> {
    key.filter(|k| !k.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| PmKitError::ValidationError(format!("Key is required for {action} action")))
}
