use crate::error::{PmKitError, Result};
use crate::io;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Version of this CLI, recorded alongside every install.
pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    #[default]
    Full,
    Minimal,
}

impl std::fmt::Display for InstallMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallMode::Full => f.write_str("full"),
            InstallMode::Minimal => f.write_str("minimal"),
        }
    }
}

/// What was installed and when (`.pm-kit/metadata.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallMetadata {
    /// Release tag or branch name the payload came from.
    pub version: String,
    pub installed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default = "default_cli_version")]
    pub cli_version: String,
    #[serde(default)]
    pub mode: InstallMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<String>,
}

fn default_cli_version() -> String {
    CLI_VERSION.to_string()
}

impl InstallMetadata {
    pub fn new(version: impl Into<String>, mode: InstallMode, exclusions: Vec<String>) -> Self {
        Self {
            version: version.into(),
            installed_at: Utc::now(),
            updated_at: None,
            cli_version: CLI_VERSION.to_string(),
            mode,
            exclusions,
        }
    }

    /// Load metadata. `Ok(None)` when no install has been recorded.
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = paths::metadata_path(root);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PmKitError::FileRead { path, source: e }),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| PmKitError::ConfigError(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        io::write_json(&paths::metadata_path(root), self)
    }

    /// Record a completed update to `version`.
    pub fn mark_updated(&mut self, version: impl Into<String>) {
        self.version = version.into();
        self.updated_at = Some(Utc::now());
        self.cli_version = CLI_VERSION.to_string();
    }
}

/// The installed kit version, falling back to the CLI version when unknown.
pub fn installed_version(root: &Path) -> String {
    match InstallMetadata::load(root) {
        Ok(Some(meta)) => meta.version,
        Ok(None) => CLI_VERSION.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable install metadata; assuming CLI version");
            CLI_VERSION.to_string()
        }
    }
}
