//! First-time installation (`pm-kit init`).

use crate::baseline;
use crate::error::{PmKitError, Result};
use crate::exclusion::ExclusionSet;
use crate::fetch;
use crate::github::DEFAULT_BRANCH;
use crate::io;
use crate::mcp::{McpConfig, CATALOG};
use crate::metadata::{InstallMetadata, InstallMode};
use crate::paths::{self, DownloadPath, GITIGNORE_ENTRIES, GITIGNORE_MARKER, REQUIRED_DIRS};
use crate::remote::RemoteRepository;
use crate::update::updatable_paths;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub minimal: bool,
    pub exclude: Vec<String>,
    /// Remove the existing payload before downloading.
    pub fresh: bool,
    pub force: bool,
    /// Installing into the home directory: no `.gitignore`, only `.claude` scaffolding.
    pub global: bool,
}

impl InstallOptions {
    pub fn mode(&self) -> InstallMode {
        if self.minimal {
            InstallMode::Minimal
        } else {
            InstallMode::Full
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Release tag, or the branch when the repository has no releases.
    pub version: String,
    pub files_written: usize,
    pub downloaded: Vec<DownloadPath>,
    pub dirs_created: usize,
    pub gitignore_updated: bool,
    pub enabled_servers: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum InstallOutcome {
    /// Already initialized and the user chose not to reinstall.
    Declined,
    Installed(InstallReport),
}

/// Interaction points of the install flow.
pub trait InstallUi {
    fn confirm_reinitialize(&self) -> Result<bool>;

    fn authenticated(&self, _login: &str) {}

    fn fetch_started(&self, _path: DownloadPath) {}

    fn file_written(&self, _path: &str) {}

    /// API keys keyed by the catalog's `api_key_name`. Missing keys are skipped.
    fn api_keys(&self) -> Result<BTreeMap<String, String>>;
}

pub struct Installer<'a> {
    root: &'a Path,
    remote: &'a dyn RemoteRepository,
    ui: &'a dyn InstallUi,
}

impl<'a> Installer<'a> {
    pub fn new(root: &'a Path, remote: &'a dyn RemoteRepository, ui: &'a dyn InstallUi) -> Self {
        Self { root, remote, ui }
    }

    pub fn run(&self, opts: &InstallOptions) -> Result<InstallOutcome> {
        let exclusions = if opts.minimal {
            ExclusionSet::minimal(opts.exclude.iter().cloned())?
        } else {
            ExclusionSet::new(opts.exclude.iter().cloned())?
        };

        if paths::is_initialized(self.root) && !opts.force && !self.ui.confirm_reinitialize()? {
            return Ok(InstallOutcome::Declined);
        }
        if opts.fresh {
            remove_payload(self.root)?;
        }

        let login = self.remote.authenticate()?;
        self.ui.authenticated(&login);

        let git_ref = self.resolve_ref()?;

        let downloaded = updatable_paths(&exclusions);
        let mut files_written = 0;
        for target in &downloaded {
            self.ui.fetch_started(*target);
            if target.is_dir() {
                files_written += fetch::download_directory(
                    self.remote,
                    target.as_str(),
                    self.root,
                    &git_ref,
                    &exclusions,
                    &mut |p| self.ui.file_written(p),
                )?
                .written;
            } else {
                fetch::download_file(
                    self.remote,
                    target.as_str(),
                    &self.root.join(target.as_str()),
                    &git_ref,
                )?;
                self.ui.file_written(target.as_str());
                files_written += 1;
            }
        }

        let config = write_mcp_config(self.root, self.ui.api_keys()?)?;

        let dirs_created = create_required_dirs(self.root, opts.global)?;
        let gitignore_updated = if opts.global {
            false
        } else {
            io::append_gitignore_block(self.root, GITIGNORE_MARKER, GITIGNORE_ENTRIES)?
        };

        InstallMetadata::new(&git_ref, opts.mode(), opts.exclude.clone()).save(self.root)?;
        baseline::record(self.root)?;

        Ok(InstallOutcome::Installed(InstallReport {
            version: git_ref,
            files_written,
            downloaded,
            dirs_created,
            gitignore_updated,
            enabled_servers: config.enabled_servers().into_iter().map(String::from).collect(),
        }))
    }

    /// Latest release tag; the default branch when nothing is published.
    fn resolve_ref(&self) -> Result<String> {
        match self.remote.latest_release() {
            Ok(release) => Ok(release.tag_name),
            Err(PmKitError::RepoNotFound(_)) => {
                tracing::warn!(branch = DEFAULT_BRANCH, "no published release; installing from branch");
                Ok(DEFAULT_BRANCH.to_string())
            }
            Err(e) => Err(e),
        }
    }
}

/// Generate and write `.mcp.json`. Keys the user skipped keep whatever value
/// an existing file already had.
pub fn write_mcp_config(root: &Path, mut keys: BTreeMap<String, String>) -> Result<McpConfig> {
    let path = paths::mcp_config_path(root);
    if let Ok(Some(existing)) = McpConfig::read(&path) {
        for spec in CATALOG {
            if keys.get(spec.api_key_name).is_some_and(|k| !k.is_empty()) {
                continue;
            }
            let previous = existing
                .mcp_servers
                .get(spec.name)
                .and_then(|s| s.env.get(spec.env_var))
                .filter(|v| !v.is_empty());
            if let Some(previous) = previous {
                keys.insert(spec.api_key_name.to_string(), previous.clone());
            }
        }
    }
    let config = McpConfig::generate(&keys)?;
    config.write(&path)?;
    io::set_private_permissions(&path)?;
    Ok(config)
}

/// Create the working directory layout. Returns how many were missing.
pub fn create_required_dirs(root: &Path, claude_only: bool) -> Result<usize> {
    let mut created = 0;
    for dir in REQUIRED_DIRS
        .iter()
        .filter(|d| !claude_only || d.starts_with(paths::CLAUDE_DIR))
    {
        let path = root.join(dir);
        if !path.is_dir() {
            io::ensure_dir(&path)?;
            created += 1;
        }
    }
    Ok(created)
}

/// Remove the installed payload and the recorded baseline.
pub fn remove_payload(root: &Path) -> Result<()> {
    for target in DownloadPath::ALL {
        if io::remove_path(&root.join(target.as_str()))? {
            tracing::debug!(path = %target, "removed for fresh install");
        }
    }
    io::remove_path(&paths::baseline_path(root))?;
    Ok(())
}
