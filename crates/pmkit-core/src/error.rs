use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PmKitError {
    #[error("GitHub authentication required: {0}")]
    AuthFailed(String),

    #[error("invalid GitHub token")]
    TokenInvalid,

    #[error("PM Kit is not initialized in {0}")]
    NotInitialized(PathBuf),

    #[error("repository not found: {0}")]
    RepoNotFound(String),

    #[error("file not found in repository: {0}")]
    FileNotFound(String),

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{action} {path}: {source}")]
    Fs {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("required API key missing: {0}")]
    ApiKeyInvalid(String),

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("GitHub API rate limit exceeded{}", .reset.as_deref().map(|r| format!(" (resets at {r})")).unwrap_or_default())]
    RateLimited { reset: Option<String> },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PmKitError {
    pub fn fs(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PmKitError::Fs {
            action,
            path: path.into(),
            source,
        }
    }

    /// Remediation text shown under the error message.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PmKitError::AuthFailed(_) => Some(
                "Set GITHUB_TOKEN, run `gh auth login`, or run: pm-kit config set github-token YOUR_TOKEN",
            ),
            PmKitError::TokenInvalid => Some(
                "Generate a new token (scope: repo) at https://github.com/settings/tokens, then run: pm-kit init --reset-token",
            ),
            PmKitError::NotInitialized(_) => Some("Run: pm-kit init to initialize PM Kit first"),
            PmKitError::RepoNotFound(_) => Some(
                "Verify the repository name and that your token can access the private repository (pm-kit versions lists available versions)",
            ),
            PmKitError::FileNotFound(_) => Some("The kit repository layout may have changed; try pm-kit update --version <tag>"),
            PmKitError::FileRead { .. } | PmKitError::Fs { .. } => {
                Some("Check file and directory permissions (e.g. chmod -R u+w <directory>)")
            }
            PmKitError::ConfigError(_) => Some("Inspect the file or run: pm-kit config reset"),
            PmKitError::ApiKeyInvalid(_) => {
                Some("Run: pm-kit init --reconfigure-api to set up API keys")
            }
            PmKitError::Api { status: 403, .. } => {
                Some("Access forbidden or rate limited; wait for the limit to reset or check token permissions")
            }
            PmKitError::RateLimited { .. } => {
                Some("Wait for the rate limit to reset, or authenticate to raise the limit")
            }
            PmKitError::Network(_) => {
                Some("Check your internet connection, proxy and DNS settings, then try again")
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PmKitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_initialized_has_hint() {
        let err = PmKitError::NotInitialized(PathBuf::from("/tmp/x"));
        assert!(err.to_string().contains("/tmp/x"));
        assert!(err.hint().unwrap().contains("pm-kit init"));
    }

    #[test]
    fn cancelled_has_no_hint() {
        assert!(PmKitError::Cancelled.hint().is_none());
    }
}
