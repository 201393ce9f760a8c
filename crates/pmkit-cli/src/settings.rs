use crate::root;
use anyhow::Context;
use pmkit_core::github::{DEFAULT_API_URL, DEFAULT_REPOSITORY};
use pmkit_core::paths;
use std::path::{Path, PathBuf};

/// Runtime settings resolved once from flags and the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub home: PathBuf,
    /// Kit repository, `owner/name`.
    pub repository: String,
    pub api_url: String,
    pub debug: bool,
    pub animation: bool,
}

impl Settings {
    pub fn resolve(explicit_root: Option<&Path>) -> anyhow::Result<Self> {
        let home = paths::home_dir().context("failed to locate home directory")?;
        Ok(Self {
            root: root::resolve_root(explicit_root),
            home,
            repository: env_or("PMKIT_REPO", DEFAULT_REPOSITORY),
            api_url: env_or("PMKIT_GITHUB_API_URL", DEFAULT_API_URL),
            debug: debug_enabled(),
            animation: !env_flag("PMKIT_NO_ANIMATION"),
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_flag(var: &str) -> bool {
    std::env::var(var).is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no")
}

pub fn debug_enabled() -> bool {
    env_flag("DEBUG")
}
