use crate::output;
use crate::settings::Settings;
use clap::Args;
use owo_colors::OwoColorize;
use pmkit_core::doctor::{self, Category, DoctorOptions, DoctorReport};
use serde::Serialize;

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    /// Include payload drift against the recorded baseline
    #[arg(long)]
    pub verbose: bool,
    /// Create missing directories
    #[arg(long)]
    pub fix: bool,
    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a DoctorReport,
    issues: usize,
    warnings: usize,
}

pub fn run(settings: &Settings, args: DoctorArgs) -> anyhow::Result<()> {
    if !args.json {
        output::header("PM Kit Diagnostics");
        println!("Running comprehensive diagnostics...");
    }

    let opts = DoctorOptions {
        verbose: args.verbose,
        api_url: Some(settings.api_url.clone()),
    };
    let report = doctor::run(&settings.root, &opts)?;
    let issues = report.issues();

    if args.json {
        output::print_json(&JsonReport {
            report: &report,
            issues,
            warnings: report.warnings(),
        })?;
    } else {
        display(&report);
    }

    if args.fix {
        fix(settings, &report)?;
        return Ok(());
    }
    if issues > 0 {
        anyhow::bail!("{issues} issue(s) found");
    }
    Ok(())
}

fn display_category(category: &Category) {
    output::header(&category.category);
    for check in &category.checks {
        let soft = check.optional || category.warning;
        let (icon, status) = if check.passed {
            ("✔".green().to_string(), "OK".green().to_string())
        } else if soft {
            ("⚠".yellow().to_string(), "WARNING".yellow().to_string())
        } else {
            ("✖".red().to_string(), "FAILED".red().to_string())
        };
        let label = if check.optional {
            format!(" {}", "(optional)".dimmed())
        } else {
            String::new()
        };
        println!(
            "{icon}  {}{label}: {status} - {}",
            check.name,
            check.message.dimmed()
        );
    }
}

fn display(report: &DoctorReport) {
    for category in &report.categories {
        display_category(category);
    }

    let issues = report.issues();
    let warnings = report.warnings();
    output::header("Summary");
    if issues == 0 && warnings == 0 {
        output::success("All checks passed! ✨");
        return;
    }
    if issues > 0 {
        output::failure(&format!("{issues} issue(s) found"));
    }
    if warnings > 0 {
        output::warn(&format!("{warnings} warning(s)"));
    }
    println!();
    println!(
        "{} {}",
        "To fix issues automatically, run:".yellow(),
        "pm-kit doctor --fix".cyan()
    );
}

fn fix(settings: &Settings, report: &DoctorReport) -> anyhow::Result<()> {
    output::header("Auto-fix Issues");
    let created = doctor::fix(&settings.root)?;
    for dir in &created {
        output::success(&format!("Created {dir}"));
    }
    if report.category("Permissions").is_some_and(|c| !c.passed) {
        output::warn("Permission issues detected");
        println!("You may need to run with appropriate permissions");
    }
    println!();
    if created.is_empty() {
        output::info("No issues could be auto-fixed");
        println!("You may need to run {} to reinstall", "pm-kit init".cyan());
    } else {
        output::success(&format!("Fixed {} issue(s)", created.len()));
        println!("Run {} again to verify", "pm-kit doctor".cyan());
    }
    Ok(())
}
