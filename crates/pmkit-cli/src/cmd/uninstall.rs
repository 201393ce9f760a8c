use crate::progress::Spinner;
use crate::settings::Settings;
use crate::{output, prompt};
use owo_colors::OwoColorize;
use pmkit_core::paths;
use pmkit_core::uninstall::{self, Installation, InstallationKind};

pub fn run(settings: &Settings, yes: bool) -> anyhow::Result<()> {
    output::header("Uninstall PM Kit");

    let installations = uninstall::detect_installations(&settings.root, &settings.home);
    if installations.is_empty() {
        output::info("No PM Kit installations found.");
        println!();
        println!("PM Kit is not installed in:");
        println!("{}", format!("  • Local: {}", paths::claude_dir(&settings.root).display()).dimmed());
        println!("{}", format!("  • Global: {}", paths::claude_dir(&settings.home).display()).dimmed());
        return Ok(());
    }

    println!("Found PM Kit installations:");
    println!();
    output::print_table(
        &["TYPE", "PATH", "SIZE", "VERSION", "INSTALLED"],
        installations.iter().map(row).collect(),
    );
    println!();

    if !yes && !confirm(&installations)? {
        output::info("Uninstall cancelled");
        return Ok(());
    }

    let spinner = Spinner::default();
    spinner.start("Removing PM Kit...");
    let report = uninstall::uninstall(&installations, &settings.home);
    spinner.succeed("PM Kit uninstalled successfully");
    for (path, error) in &report.failed {
        output::warn(&format!("Could not remove {}: {error}", path.display()));
    }

    println!();
    output::boxed(&[
        "✓ Uninstall Complete".to_string(),
        String::new(),
        format!("Removed {} installation(s)", installations.len()),
        String::new(),
        "What was removed:".to_string(),
        "  • .claude/ directories".to_string(),
        "  • CLAUDE.md files".to_string(),
        "  • .mcp.json configurations".to_string(),
        "  • .pm-kit/ configs".to_string(),
        String::new(),
        "To reinstall, run: pm-kit init".to_string(),
    ]);
    Ok(())
}

fn row(install: &Installation) -> Vec<String> {
    let (version, installed_at) = match &install.metadata {
        Some(m) => (m.version.clone(), m.installed_at.format("%Y-%m-%d").to_string()),
        None => ("unknown".to_string(), "unknown".to_string()),
    };
    vec![
        install.kind.to_string(),
        install.root.display().to_string(),
        uninstall::format_size(install.size),
        version,
        installed_at,
    ]
}

fn confirm(installations: &[Installation]) -> anyhow::Result<bool> {
    let prompter = prompt::for_terminal();
    output::warn("WARNING: This will permanently delete the following:");
    for install in installations {
        for target in install.targets().iter().filter(|t| t.exists()) {
            println!("  • {}", target.display().red());
        }
    }
    println!();
    if !prompter.confirm("Are you sure you want to uninstall PM Kit?", false)? {
        return Ok(false);
    }
    if installations.iter().any(|i| i.kind == InstallationKind::Global) {
        return Ok(prompt::confirm_typed(
            prompter.as_ref(),
            "This includes the GLOBAL installation. Type \"yes\" to confirm:",
        )?);
    }
    Ok(true)
}
