//! GitHub token resolution: an ordered chain of providers, first hit wins.

use crate::config::ConfigDocument;
use crate::credentials::{CredentialStore, GITHUB_TOKEN_KEY};
use crate::error::{PmKitError, Result};
use crate::prompt::Prompter;
use std::path::PathBuf;
use std::process::Command;

pub const TOKEN_URL: &str = "https://github.com/settings/tokens";
pub const TOKEN_SCOPES: &[&str] = &["repo"];
pub const TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

const LEGACY_TOKEN_KEY: &str = "githubToken";

pub trait TokenProvider {
    fn name(&self) -> &'static str;
    /// `Ok(None)` means "not available here, try the next provider".
    fn token(&self) -> Result<Option<String>>;
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Token from `GITHUB_TOKEN`, then `GH_TOKEN`.
#[derive(Debug, Clone, Default)]
pub struct EnvProvider {
    values: Vec<Option<String>>,
}

impl EnvProvider {
    pub fn from_env() -> Self {
        Self {
            values: TOKEN_ENV_VARS.iter().map(|v| std::env::var(v).ok()).collect(),
        }
    }

    pub fn with_values(values: Vec<Option<String>>) -> Self {
        Self { values }
    }
}

impl TokenProvider for EnvProvider {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn token(&self) -> Result<Option<String>> {
        Ok(self.values.iter().cloned().find_map(non_empty))
    }
}

/// Token from `gh auth token` when the GitHub CLI is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct GhCliProvider;

impl TokenProvider for GhCliProvider {
    fn name(&self) -> &'static str {
        "GitHub CLI"
    }

    fn token(&self) -> Result<Option<String>> {
        let Ok(gh) = which::which("gh") else {
            return Ok(None);
        };
        match Command::new(gh).args(["auth", "token"]).output() {
            Ok(out) if out.status.success() => {
                Ok(non_empty(Some(String::from_utf8_lossy(&out.stdout).into_owned())))
            }
            Ok(_) => {
                tracing::debug!("GitHub CLI not authenticated");
                Ok(None)
            }
            Err(e) => {
                tracing::debug!(error = %e, "failed to run gh");
                Ok(None)
            }
        }
    }
}

/// Token saved in the credential store.
pub struct StoreProvider<'a> {
    store: &'a dyn CredentialStore,
}

impl<'a> StoreProvider<'a> {
    pub fn new(store: &'a dyn CredentialStore) -> Self {
        Self { store }
    }
}

impl TokenProvider for StoreProvider<'_> {
    fn name(&self) -> &'static str {
        "credential store"
    }

    fn token(&self) -> Result<Option<String>> {
        match self.store.get(GITHUB_TOKEN_KEY) {
            Ok(v) => Ok(non_empty(v)),
            Err(e) => {
                tracing::debug!(error = %e, "credential store lookup failed");
                Ok(None)
            }
        }
    }
}

/// `githubToken` in the global config, written by older versions.
/// A hit is migrated into the credential store.
pub struct LegacyConfigProvider<'a> {
    config_path: PathBuf,
    store: &'a dyn CredentialStore,
}

impl<'a> LegacyConfigProvider<'a> {
    pub fn new(config_path: impl Into<PathBuf>, store: &'a dyn CredentialStore) -> Self {
        Self {
            config_path: config_path.into(),
            store,
        }
    }
}

impl TokenProvider for LegacyConfigProvider<'_> {
    fn name(&self) -> &'static str {
        "legacy config"
    }

    fn token(&self) -> Result<Option<String>> {
        let doc = ConfigDocument::load(&self.config_path);
        let Some(token) = non_empty(doc.get_str(LEGACY_TOKEN_KEY).map(str::to_string)) else {
            return Ok(None);
        };
        if let Err(e) = self.store.set(GITHUB_TOKEN_KEY, &token) {
            tracing::warn!(error = %e, "could not migrate saved token to the credential store");
        }
        Ok(Some(token))
    }
}

/// Ask the user, optionally saving the answer.
pub struct PromptProvider<'a> {
    prompter: &'a dyn Prompter,
    store: &'a dyn CredentialStore,
}

impl<'a> PromptProvider<'a> {
    pub fn new(prompter: &'a dyn Prompter, store: &'a dyn CredentialStore) -> Self {
        Self { prompter, store }
    }
}

impl TokenProvider for PromptProvider<'_> {
    fn name(&self) -> &'static str {
        "prompt"
    }

    fn token(&self) -> Result<Option<String>> {
        self.prompter.note("GitHub Personal Access Token required");
        self.prompter.note(&format!("Create one at: {TOKEN_URL}"));
        self.prompter
            .note(&format!("Required scopes: {}", TOKEN_SCOPES.join(", ")));
        let Some(token) = non_empty(self.prompter.password("Enter your GitHub Personal Access Token:")?)
        else {
            return Ok(None);
        };
        if self
            .prompter
            .confirm("Save token for future use? (stored securely)", true)?
        {
            self.store.set(GITHUB_TOKEN_KEY, &token)?;
            tracing::debug!(store = %self.store.describe(), "token saved");
        }
        Ok(Some(token))
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

pub struct TokenChain<'a> {
    providers: Vec<Box<dyn TokenProvider + 'a>>,
}

impl<'a> TokenChain<'a> {
    pub fn new(providers: Vec<Box<dyn TokenProvider + 'a>>) -> Self {
        Self { providers }
    }

    /// Environment, GitHub CLI, credential store, legacy config, prompt.
    pub fn standard(
        global_config: impl Into<PathBuf>,
        store: &'a dyn CredentialStore,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self::new(vec![
            Box::new(EnvProvider::from_env()),
            Box::new(GhCliProvider),
            Box::new(StoreProvider::new(store)),
            Box::new(LegacyConfigProvider::new(global_config, store)),
            Box::new(PromptProvider::new(prompter, store)),
        ])
    }

    /// Skip every saved source and ask.
    pub fn prompt_only(store: &'a dyn CredentialStore, prompter: &'a dyn Prompter) -> Self {
        Self::new(vec![Box::new(PromptProvider::new(prompter, store))])
    }

    /// First non-empty token, with the name of the provider that supplied it.
    pub fn resolve(&self) -> Result<(String, &'static str)> {
        for provider in &self.providers {
            if let Some(token) = provider.token()? {
                tracing::debug!(provider = provider.name(), "using GitHub token");
                return Ok((token, provider.name()));
            }
        }
        Err(PmKitError::AuthFailed(
            "no GitHub token found in the environment, GitHub CLI, credential store or prompt".to_string(),
        ))
    }
}
