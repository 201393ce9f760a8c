use crate::progress::Spinner;
use crate::settings::Settings;
use crate::{output, prompt};
use clap::Args;
use owo_colors::OwoColorize;
use pmkit_core::remote::{Release, RemoteRepository};
use pmkit_core::version::{self, VersionStatus};
use pmkit_core::{credentials, metadata};

const SUMMARY_WIDTH: usize = 80;

#[derive(Args, Debug)]
pub struct VersionsArgs {
    /// Maximum versions to show
    #[arg(long, default_value_t = 30)]
    pub limit: usize,
    /// Include prereleases and drafts
    #[arg(long)]
    pub all: bool,
    /// Show the first line of each release's notes
    #[arg(long)]
    pub verbose: bool,
}

pub fn run(settings: &Settings, args: VersionsArgs) -> anyhow::Result<()> {
    output::header("Available Versions");

    let prompter = prompt::for_terminal();
    let store = credentials::default_store(&settings.home);
    let client = super::connect(settings, store.as_ref(), prompter.as_ref(), false)?;
    client.authenticate()?;

    let spinner = Spinner::default();
    spinner.start("Fetching versions...");
    let releases = match client.list_releases(args.limit, args.all) {
        Ok(r) => r,
        Err(e) => {
            spinner.fail("Failed to fetch versions");
            return Err(e.into());
        }
    };
    if releases.is_empty() {
        spinner.fail("No releases found");
        output::info("The repository may not have any releases yet.");
        return Ok(());
    }
    spinner.succeed(&format!("Found {} version(s)", releases.len()));
    println!();

    let installed = metadata::installed_version(&settings.root);
    for (i, release) in releases.iter().enumerate() {
        println!("{}", release_line(release, i == 0, &installed));
        if args.verbose {
            if let Some(summary) = release.summary(SUMMARY_WIDTH) {
                println!("    {}", summary.dimmed());
            }
        }
    }

    println!();
    println!("{}", "─".repeat(50).dimmed());
    println!("{} {}", "Installed version:".bold(), installed.cyan());
    println!();
    println!("{}", "Update to a specific version:".dimmed());
    println!("{}", "  pm-kit update --version <version>".cyan());
    Ok(())
}

fn release_line(release: &Release, latest: bool, installed: &str) -> String {
    let mut line = if latest {
        release.version().green().bold().to_string()
    } else {
        release.version().to_string()
    };
    let mut tags = Vec::new();
    if latest {
        tags.push("latest".green().to_string());
    }
    if version::compare(installed, release.version()) == VersionStatus::Current {
        tags.push("installed".cyan().to_string());
    }
    if release.prerelease {
        tags.push("prerelease".yellow().to_string());
    }
    if release.draft {
        tags.push("draft".dimmed().to_string());
    }
    if !tags.is_empty() {
        line.push(' ');
        line.push_str(&tags.join(" "));
    }
    if let Some(date) = release.published_at {
        line.push_str(&format!(" • {}", date.format("%b %-d, %Y")).dimmed().to_string());
    }
    line
}
