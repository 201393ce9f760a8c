pub mod config;
pub mod doctor;
pub mod init;
pub mod uninstall;
pub mod update;
pub mod version;
pub mod versions;

use crate::settings::Settings;
use anyhow::Context;
use pmkit_core::auth::TokenChain;
use pmkit_core::credentials::CredentialStore;
use pmkit_core::github::GitHubClient;
use pmkit_core::paths;
use pmkit_core::prompt::Prompter;

/// Resolve a GitHub token and build the kit repository client.
///
/// With `reset_token` every saved source is skipped and the user is asked.
pub fn connect(
    settings: &Settings,
    store: &dyn CredentialStore,
    prompter: &dyn Prompter,
    reset_token: bool,
) -> anyhow::Result<GitHubClient> {
    let chain = if reset_token {
        TokenChain::prompt_only(store, prompter)
    } else {
        TokenChain::standard(paths::global_config_path(&settings.home), store, prompter)
    };
    let (token, source) = chain.resolve()?;
    tracing::debug!(source, repository = %settings.repository, "connecting to GitHub");
    let client = GitHubClient::new(&settings.api_url, &settings.repository, Some(token))
        .with_context(|| format!("failed to create GitHub client for {}", settings.repository))?;
    Ok(client)
}
