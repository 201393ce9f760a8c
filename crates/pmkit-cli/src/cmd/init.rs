use crate::settings::Settings;
use crate::ui::{self, TerminalUi};
use crate::{animation, output, prompt};
use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use pmkit_core::exclusion::parse_patterns;
use pmkit_core::install::{self, InstallOptions, InstallOutcome, InstallReport, Installer};
use pmkit_core::{credentials, paths, system, PmKitError};
use std::path::Path;

#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Ignore saved tokens and prompt for a new GitHub token
    #[arg(long)]
    pub reset_token: bool,
    /// Only re-prompt API keys and rewrite .mcp.json
    #[arg(long)]
    pub reconfigure_api: bool,
    /// Install the minimal set of workflows
    #[arg(long, conflicts_with = "full")]
    pub minimal: bool,
    /// Install all workflows (default)
    #[arg(long)]
    pub full: bool,
    /// Exclude specific files/directories (comma-separated globs)
    #[arg(long)]
    pub exclude: Vec<String>,
    /// Install to the user-wide ~/.claude directory
    #[arg(short = 'g', long)]
    pub global: bool,
    /// Remove the existing payload before installing
    #[arg(long)]
    pub fresh: bool,
    /// Overwrite an existing installation without confirmation
    #[arg(long)]
    pub force: bool,
    /// Skip the animated logo
    #[arg(long)]
    pub no_animation: bool,
}

pub fn run(settings: &Settings, args: InitArgs) -> anyhow::Result<()> {
    animation::show_banner(settings.animation && !args.no_animation);

    let root = if args.global {
        settings.home.as_path()
    } else {
        settings.root.as_path()
    };
    let prompter = prompt::for_terminal();

    if args.reconfigure_api {
        return reconfigure_api(root, prompter.as_ref());
    }

    preflight(root);

    output::header("GitHub Authentication");
    let store = credentials::default_store(&settings.home);
    let client = super::connect(settings, store.as_ref(), prompter.as_ref(), args.reset_token)?;

    let opts = InstallOptions {
        minimal: args.minimal,
        exclude: args.exclude.iter().flat_map(|e| parse_patterns(e)).collect(),
        fresh: args.fresh,
        force: args.force,
        global: args.global,
    };
    let ui = TerminalUi::new(prompter.as_ref());
    let outcome = Installer::new(root, &client, &ui).run(&opts);
    if let Err(e) = &outcome {
        ui.spinner().fail("Installation failed");
        if matches!(e, PmKitError::RepoNotFound(_)) {
            explain_repo_access(&settings.repository);
        }
    }
    match outcome.context("installation failed")? {
        InstallOutcome::Declined => Ok(()),
        InstallOutcome::Installed(report) => {
            summarize(root, &report, args.global);
            Ok(())
        }
    }
}

fn reconfigure_api(root: &Path, prompter: &dyn pmkit_core::prompt::Prompter) -> anyhow::Result<()> {
    if !paths::is_initialized(root) {
        return Err(PmKitError::NotInitialized(root.to_path_buf()).into());
    }
    let keys = ui::prompt_api_keys(prompter)?;
    let config = install::write_mcp_config(root, keys).context("failed to update .mcp.json")?;
    output::success("Updated .mcp.json");
    let enabled = config.enabled_servers();
    if enabled.is_empty() {
        output::info("No MCP servers enabled");
    } else {
        output::info(&format!("Enabled servers: {}", enabled.join(", ")));
    }
    Ok(())
}

fn preflight(root: &Path) {
    output::header("Pre-flight Checks");
    output::check("Target", true, &root.display().to_string());
    match system::claude_cli_version() {
        Some(version) => output::check("Claude CLI", true, &version),
        None => {
            output::check("Claude CLI", false, "Not found");
            output::warn("Claude CLI is recommended but not required");
            println!("Install from: {}", system::CLAUDE_INSTALL_URL.cyan());
        }
    }
}

fn explain_repo_access(repository: &str) {
    println!();
    output::failure("Could not access the kit repository");
    println!("This may be because:");
    for reason in [
        "The repository is private and you need access",
        "Your GitHub token doesn't have the right permissions",
        "The repository name is incorrect",
    ] {
        println!("  • {}", reason.dimmed());
    }
    println!("Repository: {}", repository.cyan());
    println!(
        "Required permissions: {}",
        pmkit_core::auth::TOKEN_SCOPES.join(", ").cyan()
    );
}

fn summarize(root: &Path, report: &InstallReport, global: bool) {
    println!();
    println!("Downloaded:");
    output::list(&report.downloaded.iter().map(|p| p.display()).collect::<Vec<_>>());
    output::success("Created .mcp.json");
    if !report.enabled_servers.is_empty() {
        output::info(&format!("Enabled MCP servers: {}", report.enabled_servers.join(", ")));
    }
    output::success(&format!("Created {} directories", report.dirs_created));
    if report.gitignore_updated {
        output::success("Updated .gitignore with sensitive files");
    } else if !global {
        output::info(".gitignore already protects sensitive files");
    }
    println!();
    output::boxed(&[
        "✓ Installation Complete!".to_string(),
        String::new(),
        format!("PM Kit {} installed ({} files).", report.version, report.files_written),
        String::new(),
        "Next steps:".to_string(),
        "  1. Run: claude".to_string(),
        "  2. Use: /prd, /research, /prioritize".to_string(),
        "  3. Read: CLAUDE.md for full documentation".to_string(),
        String::new(),
        "Get help:".to_string(),
        "  pm-kit doctor - Run diagnostics".to_string(),
        "  pm-kit --help - Show all commands".to_string(),
    ]);
    println!();
    output::info(&format!("Installation completed in {}", root.display()));
}
