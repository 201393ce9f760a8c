//! Terminal rendering of the install and update flows.

use crate::output;
use crate::progress::Spinner;
use owo_colors::OwoColorize;
use pmkit_core::detect::{ChangeSource, LocalChanges};
use pmkit_core::install::InstallUi;
use pmkit_core::mcp::CATALOG;
use pmkit_core::paths::DownloadPath;
use pmkit_core::prompt::Prompter;
use pmkit_core::update::{UpdateUi, VersionInfo};
use pmkit_core::version::VersionStatus;
use pmkit_core::Result;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::Path;

const CHANGES_SHOWN: usize = 5;

pub struct TerminalUi<'a> {
    prompter: &'a dyn Prompter,
    spinner: Spinner,
    files: Cell<usize>,
}

impl<'a> TerminalUi<'a> {
    pub fn new(prompter: &'a dyn Prompter) -> Self {
        Self {
            prompter,
            spinner: Spinner::default(),
            files: Cell::new(0),
        }
    }

    pub fn spinner(&self) -> &Spinner {
        &self.spinner
    }

    fn finish_download(&self) {
        if self.files.get() > 0 {
            self.spinner
                .succeed(&format!("Downloaded {} files", self.files.get()));
        } else {
            self.spinner.clear();
        }
    }
}

impl InstallUi for TerminalUi<'_> {
    fn confirm_reinitialize(&self) -> Result<bool> {
        output::warn("PM Kit is already initialized in this directory");
        let confirmed = self
            .prompter
            .confirm("Reinitialize? This will overwrite existing files.", false)?;
        if !confirmed {
            output::info("Installation cancelled");
            println!(
                "To update an existing installation, use: {}",
                "pm-kit update".cyan()
            );
        }
        Ok(confirmed)
    }

    fn authenticated(&self, login: &str) {
        output::success(&format!("Authenticated as {}", login.bold()));
        output::header("Download Framework Files");
    }

    fn fetch_started(&self, path: DownloadPath) {
        self.spinner.start(format!("Downloading {}...", path.display()));
    }

    fn file_written(&self, path: &str) {
        self.files.set(self.files.get() + 1);
        self.spinner.message(format!("Downloaded {path}"));
    }

    fn api_keys(&self) -> Result<BTreeMap<String, String>> {
        self.finish_download();
        prompt_api_keys(self.prompter)
    }
}

/// Ask for each catalog server's API key. Skipped keys are left out.
pub fn prompt_api_keys(prompter: &dyn Prompter) -> Result<BTreeMap<String, String>> {
    output::header("API Configuration");
    prompter.note("Configure optional API keys for enhanced functionality.");
    prompter.note("You can skip this step and configure later with: pm-kit config set <server>-api-key <key>");
    let mut keys = BTreeMap::new();
    for spec in CATALOG {
        println!();
        let label = if spec.required { "(Required)" } else { "(Optional)" };
        println!("{} {}", spec.name.cyan(), label.dimmed());
        println!("   {}", spec.description.dimmed());
        println!("   {} {}", "Get key at:".dimmed(), spec.key_url.cyan());
        let message = format!("{} API key (press Enter to skip):", spec.name);
        if let Some(key) = prompter.password(&message)? {
            keys.insert(spec.api_key_name.to_string(), key);
        }
    }
    Ok(keys)
}

impl UpdateUi for TerminalUi<'_> {
    fn authenticated(&self, login: &str) {
        self.spinner
            .suspend(|| output::success(&format!("Authenticated as {}", login.bold())));
    }

    fn show_plan(&self, info: &VersionInfo) {
        self.spinner.succeed(match info.status {
            VersionStatus::Current => "Reinstalling current version",
            _ => "Update available",
        });
        let published = info
            .target
            .published_at
            .map(|d| d.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let status = match info.status {
            VersionStatus::Outdated => "Update available",
            VersionStatus::Ahead => "Installed is newer (downgrade)",
            VersionStatus::Current => "Up to date (forced)",
        };
        println!();
        output::key_value("Installed Version", &info.installed.yellow().to_string());
        output::key_value("Target Version", &info.target.version().green().to_string());
        output::key_value("Published", &published);
        output::key_value("Status", status);
        if let Some(body) = info.target.body.as_deref().filter(|b| !b.trim().is_empty()) {
            println!();
            println!("{}", "Release Notes:".bold());
            println!("{}", body.trim().dimmed());
        }
        println!();
    }

    fn show_dry_run(&self, paths: &[String]) {
        output::header("Dry Run - Files that would be updated:");
        if paths.is_empty() {
            output::info("No files to update");
            return;
        }
        output::list(paths);
        println!();
        output::info(&format!("Total: {} paths would be updated", paths.len()));
        println!("Run without --dry-run to apply updates");
    }

    fn confirm_update(&self, info: &VersionInfo) -> Result<bool> {
        let message = format!("Update from {} to {}?", info.installed, info.target.version());
        self.spinner.suspend(|| self.prompter.confirm(&message, true))
    }

    fn backup_created(&self, dir: &Path) {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        output::success(&format!("Backup created: {name}"));
    }

    fn confirm_overwrite(&self, changes: &LocalChanges) -> Result<bool> {
        let qualifier = match changes.source {
            ChangeSource::Baseline => "with local modifications",
            ChangeSource::RecencyHeuristic => "modified in the last 24 hours",
        };
        output::warn(&format!("Found {} files {qualifier}", changes.len()));
        for m in changes.modifications.iter().take(CHANGES_SHOWN) {
            println!("  • {} {}", m.path.yellow(), format!("({})", m.status).dimmed());
        }
        if changes.len() > CHANGES_SHOWN {
            println!("{}", format!("  ... and {} more", changes.len() - CHANGES_SHOWN).dimmed());
        }
        println!();
        let confirmed = self.prompter.confirm(
            "Continue with update? (local changes will be overwritten)",
            false,
        )?;
        if !confirmed {
            println!("{}", "Tip: Use --exclude to preserve specific files".dimmed());
        }
        Ok(confirmed)
    }

    fn fetch_started(&self, path: DownloadPath) {
        self.spinner.start(format!("Updating {}...", path.display()));
    }

    fn file_written(&self, path: &str) {
        self.files.set(self.files.get() + 1);
        self.spinner.message(format!("Updated {path}"));
    }
}
