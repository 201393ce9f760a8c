use crate::settings::Settings;
use crate::{output, prompt};
use owo_colors::OwoColorize;
use pmkit_core::config::{self, ConfigDocument, ConfigScope, KeyKind};
use pmkit_core::credentials::{self, GITHUB_TOKEN_KEY};
use pmkit_core::prompt::Prompter;
use pmkit_core::{mcp, paths, PmKitError};

const ACTIONS: &[&str] = &["list", "get", "set", "delete", "reset"];

pub fn run(
    settings: &Settings,
    action: &str,
    key: Option<&str>,
    value: Option<&str>,
) -> anyhow::Result<()> {
    match action {
        "list" => list(settings),
        "get" => get(settings, &config::require_key(action, key)?),
        "set" => {
            let key = config::require_key(action, key)?;
            let prompter = prompt::for_terminal();
            set(settings, prompter.as_ref(), &key, value)
        }
        "delete" => delete(settings, &config::require_key(action, key)?),
        "reset" => {
            let prompter = prompt::for_terminal();
            reset(settings, prompter.as_ref())
        }
        other => Err(PmKitError::ValidationError(format!(
            "Invalid action: {other} (valid actions: {})",
            ACTIONS.join(", ")
        ))
        .into()),
    }
}

fn show_document(title: &str, doc: &ConfigDocument) {
    println!("{} {}", title.bold(), format!("({})", doc.path().display()).dimmed());
    println!();
    if doc.is_empty() {
        println!("{}", format!("  No {} found", title.to_lowercase()).dimmed());
        return;
    }
    for (key, value) in doc.entries() {
        output::key_value(key, &config::display_value(key, value));
    }
}

fn list(settings: &Settings) -> anyhow::Result<()> {
    output::header("PM Kit Configuration");
    show_document("Global Configuration", &ConfigDocument::global(&settings.home));
    println!();
    show_document("Local Configuration", &ConfigDocument::local(&settings.root));
    println!();
    Ok(())
}

fn get(settings: &Settings, key: &str) -> anyhow::Result<()> {
    match config::lookup(&settings.root, &settings.home, key) {
        Some((scope, value)) => {
            output::success(&format!(
                "{key} ({scope}): {}",
                config::display_value(key, &value)
            ));
        }
        None => output::warn(&format!("Configuration key not found: {key}")),
    }
    Ok(())
}

fn read_value(prompter: &dyn Prompter, key: &str, given: Option<&str>) -> anyhow::Result<String> {
    if let Some(v) = given {
        return Ok(v.to_string());
    }
    let message = format!("Enter value for {key}:");
    let answer = if config::is_sensitive_key(key) {
        prompter.password(&message)?
    } else {
        prompter.text(&message, None)?
    };
    answer.ok_or_else(|| {
        PmKitError::ValidationError("Value is required for set action".to_string()).into()
    })
}

fn set(
    settings: &Settings,
    prompter: &dyn Prompter,
    key: &str,
    value: Option<&str>,
) -> anyhow::Result<()> {
    let (scope, bare) = config::split_scope(key);
    let value = read_value(prompter, bare, value)?;

    match config::classify_key(bare) {
        KeyKind::GithubToken => {
            let store = credentials::default_store(&settings.home);
            store.set(GITHUB_TOKEN_KEY, &value)?;
            output::success(&format!("GitHub token saved to {}", store.describe()));
        }
        KeyKind::ApiKey(server) => {
            mcp::update_api_key(&paths::mcp_config_path(&settings.root), &server, &value)?;
            output::success(&format!("API key updated for {server}"));
        }
        KeyKind::Generic => {
            let mut doc = ConfigDocument::open(scope, &settings.root, &settings.home);
            let parsed = config::parse_value(&value);
            let shown = config::display_value(bare, &parsed);
            doc.set(bare, parsed);
            doc.save()?;
            output::success(&format!("Set {bare} = {shown} ({scope})"));
        }
    }
    Ok(())
}

fn delete(settings: &Settings, key: &str) -> anyhow::Result<()> {
    match config::delete(&settings.root, &settings.home, key)? {
        Some(scope) => output::success(&format!("Deleted {key} ({scope})")),
        None => output::warn(&format!("Configuration key not found: {key}")),
    }
    Ok(())
}

fn reset(settings: &Settings, prompter: &dyn Prompter) -> anyhow::Result<()> {
    output::header("Reset Configuration");
    if !prompter.confirm("This will delete all configuration. Continue?", false)? {
        output::info("Reset cancelled");
        return Ok(());
    }
    for scope in [ConfigScope::Global, ConfigScope::Local] {
        if ConfigDocument::open(scope, &settings.root, &settings.home).delete_file()? {
            output::success(&format!("Deleted {scope} configuration"));
        }
    }
    println!();
    output::info("Configuration reset to defaults");
    println!("Run {} to set up again", "pm-kit init".cyan());
    Ok(())
}
