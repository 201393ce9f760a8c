use crate::settings::Settings;
use crate::ui::TerminalUi;
use crate::{output, prompt};
use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use pmkit_core::exclusion::parse_patterns;
use pmkit_core::update::{UpdateOptions, UpdateOutcome, UpdateReport, Updater};
use pmkit_core::{credentials, paths, PmKitError};

const CHANGELOG_LINES: usize = 5;

#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// Skip confirmations and overwrite local changes
    #[arg(long)]
    pub force: bool,
    /// Show what would be updated without making changes
    #[arg(long)]
    pub dry_run: bool,
    /// Additional exclusion patterns (comma-separated globs)
    #[arg(long)]
    pub exclude: Vec<String>,
    /// Back up CLAUDE.md, .mcp.json and .claude/ before updating
    #[arg(long)]
    pub backup: bool,
    /// Update to a specific release tag
    #[arg(long = "version", value_name = "VERSION")]
    pub version: Option<String>,
}

pub fn run(settings: &Settings, args: UpdateArgs) -> anyhow::Result<()> {
    output::header("Update PM Kit");
    let root = settings.root.as_path();
    if !paths::is_initialized(root) {
        return Err(PmKitError::NotInitialized(root.to_path_buf()).into());
    }

    let prompter = prompt::for_terminal();
    let store = credentials::default_store(&settings.home);
    let client = super::connect(settings, store.as_ref(), prompter.as_ref(), false)?;

    let opts = UpdateOptions {
        force: args.force,
        dry_run: args.dry_run,
        backup: args.backup,
        exclude: args.exclude.iter().flat_map(|e| parse_patterns(e)).collect(),
        version: args.version,
    };
    let ui = TerminalUi::new(prompter.as_ref());
    ui.spinner().start("Checking for updates...");
    let outcome = Updater::new(root, &client, &ui).run(&opts);
    if outcome.is_err() {
        ui.spinner().fail("Update failed");
    }
    match outcome.context("update failed")? {
        UpdateOutcome::UpToDate { version } => {
            ui.spinner().clear();
            output::success("You are already on the latest version!");
            output::info(&format!("Current version: {version}"));
        }
        UpdateOutcome::DryRun { .. } => {}
        UpdateOutcome::Declined => output::info("Update cancelled"),
        UpdateOutcome::OverwriteDeclined => output::info("Update cancelled; local changes kept"),
        UpdateOutcome::Updated(report) => {
            ui.spinner()
                .succeed(&format!("Updated {} files", report.files_written));
            summarize(&report);
        }
    }
    Ok(())
}

fn changelog(report: &UpdateReport) -> Vec<String> {
    match report.release.body.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        Some(body) => body
            .lines()
            .take(CHANGELOG_LINES)
            .map(|l| format!("  {l}"))
            .collect(),
        None => vec!["  No changelog available".to_string()],
    }
}

fn summarize(report: &UpdateReport) {
    println!();
    println!("Updated:");
    output::list(&report.updated.iter().map(|p| p.display()).collect::<Vec<_>>());
    if !report.preserved.is_empty() {
        println!();
        println!("Preserved (not updated):");
        for pattern in report.preserved.iter().take(CHANGELOG_LINES) {
            println!("  • {}", pattern.dimmed());
        }
    }
    println!();
    let mut lines = vec![
        "✓ Update Complete!".to_string(),
        String::new(),
        format!("Updated from {} to {}", report.from, report.to),
        String::new(),
        "What changed:".to_string(),
    ];
    lines.extend(changelog(report));
    lines.extend([
        String::new(),
        "Next steps:".to_string(),
        "  1. Run: pm-kit doctor to verify installation".to_string(),
        "  2. Review: CLAUDE.md for any new features".to_string(),
        "  3. Continue using: claude".to_string(),
    ]);
    output::boxed(&lines);
}
