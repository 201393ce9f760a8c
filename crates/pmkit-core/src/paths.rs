use crate::error::{PmKitError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory and file constants
// ---------------------------------------------------------------------------

pub const PMKIT_DIR: &str = ".pm-kit";
pub const LOCAL_CONFIG_FILE: &str = ".pm-kit/local-config.json";
pub const BASELINE_FILE: &str = ".pm-kit/file-hashes.json";
pub const METADATA_FILE: &str = ".pm-kit/metadata.json";

pub const GLOBAL_CONFIG_FILE: &str = "config.json";
pub const CREDENTIALS_FILE: &str = ".credentials";
pub const VERSION_CACHE_FILE: &str = "cache/version-check.json";

pub const CLAUDE_DIR: &str = ".claude";
pub const CLAUDE_MD: &str = "CLAUDE.md";
pub const MCP_CONFIG_FILE: &str = ".mcp.json";

pub const BACKUP_PREFIX: &str = ".pm-kit-backup-";

pub const REQUIRED_DIRS: &[&str] = &[
    ".claude/workflows",
    ".claude/agents",
    ".claude/commands",
    ".claude/templates",
    ".claude/skills",
    "templates",
    "prds/active",
    "prds/archive",
    "research/user-interviews",
    "research/surveys",
    "research/insights",
    "research/personas",
    "decisions/logs",
    "decisions/templates",
    "outputs/research-reports",
    "outputs/consensus-reports",
    "outputs/decision-matrices",
    "outputs/evidence-logs",
];

/// Files protected from overwrite no matter what the user passes.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    ".mcp.json",
    ".pm-kit/**",
    "docs/**",
    "prds/active/**",
    "prds/archive/**",
    "research/**",
    "decisions/logs/**",
    "outputs/**",
    ".claude/custom-prompts/**",
    "company/**",
];

/// Extra exclusions applied by `init --minimal`.
pub const MINIMAL_EXCLUSIONS: &[&str] = &[
    ".claude/agents/**",
    ".claude/skills/**",
    ".claude/templates/**",
];

pub const GITIGNORE_MARKER: &str = "# PM Kit";

pub const GITIGNORE_ENTRIES: &str = "
# PM Kit - API Keys (DO NOT COMMIT)
.mcp.json
.env

# PM Kit - Local Configuration
.pm-kit/
local-config.json

# PM Kit - Generated Outputs
outputs/
";

// ---------------------------------------------------------------------------
// Download payload
// ---------------------------------------------------------------------------

/// One top-level location of the installable payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadPath {
    ClaudeDir,
    ClaudeMd,
}

impl DownloadPath {
    pub const ALL: [DownloadPath; 2] = [DownloadPath::ClaudeDir, DownloadPath::ClaudeMd];

    pub fn as_str(self) -> &'static str {
        match self {
            DownloadPath::ClaudeDir => CLAUDE_DIR,
            DownloadPath::ClaudeMd => CLAUDE_MD,
        }
    }

    pub fn is_dir(self) -> bool {
        matches!(self, DownloadPath::ClaudeDir)
    }

    /// Display form: directories are shown with a trailing `/**`.
    pub fn display(self) -> String {
        if self.is_dir() {
            format!("{}/**", self.as_str())
        } else {
            self.as_str().to_string()
        }
    }
}

impl std::fmt::Display for DownloadPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn pmkit_dir(root: &Path) -> PathBuf {
    root.join(PMKIT_DIR)
}

pub fn local_config_path(root: &Path) -> PathBuf {
    root.join(LOCAL_CONFIG_FILE)
}

pub fn baseline_path(root: &Path) -> PathBuf {
    root.join(BASELINE_FILE)
}

pub fn metadata_path(root: &Path) -> PathBuf {
    root.join(METADATA_FILE)
}

pub fn mcp_config_path(root: &Path) -> PathBuf {
    root.join(MCP_CONFIG_FILE)
}

pub fn claude_dir(root: &Path) -> PathBuf {
    root.join(CLAUDE_DIR)
}

pub fn claude_md_path(root: &Path) -> PathBuf {
    root.join(CLAUDE_MD)
}

/// `~/.pm-kit`
pub fn global_dir(home: &Path) -> PathBuf {
    home.join(PMKIT_DIR)
}

pub fn global_config_path(home: &Path) -> PathBuf {
    global_dir(home).join(GLOBAL_CONFIG_FILE)
}

pub fn credentials_path(home: &Path) -> PathBuf {
    global_dir(home).join(CREDENTIALS_FILE)
}

pub fn version_cache_path(home: &Path) -> PathBuf {
    global_dir(home).join(VERSION_CACHE_FILE)
}

/// Home directory, honoring `PMKIT_HOME`.
pub fn home_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("PMKIT_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    home::home_dir()
        .ok_or_else(|| PmKitError::ConfigError("home directory not found: set HOME".to_string()))
}

/// An installation needs the payload plus its MCP configuration.
pub fn is_initialized(root: &Path) -> bool {
    claude_dir(root).is_dir() && claude_md_path(root).is_file() && mcp_config_path(root).is_file()
}

/// Convert a relative path to the portable `/`-separated form.
pub fn to_portable(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
