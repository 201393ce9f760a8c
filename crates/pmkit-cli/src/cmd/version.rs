use crate::settings::Settings;
use owo_colors::OwoColorize;
use pmkit_core::metadata::CLI_VERSION;
use pmkit_core::notifier::{Notifier, RELEASES_URL};

/// `pm-kit --version`: print the version, then mention a newer release if one exists.
pub fn run(settings: Option<&Settings>) {
    println!("pm-kit-cli v{CLI_VERSION}");

    let Some(settings) = settings else {
        return;
    };
    if Notifier::disabled_by_env() {
        return;
    }
    let notifier = Notifier::new(&settings.home, &settings.api_url);
    if let Some(latest) = notifier.check(chrono::Utc::now()) {
        let lines = [
            format!("Update available! {} → {}", CLI_VERSION.dimmed(), latest.green()),
            format!("Download: {}", RELEASES_URL.cyan()),
        ];
        println!();
        for line in lines {
            println!("  {} {line}", "│".yellow());
        }
    }
}
