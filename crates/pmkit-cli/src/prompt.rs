use inquire::error::InquireError;
use inquire::{Confirm, Password, PasswordDisplayMode, Text};
use owo_colors::OwoColorize;
use pmkit_core::prompt::{NonInteractive, Prompter};
use pmkit_core::{PmKitError, Result};
use std::io::IsTerminal;

/// Prompts on the attached terminal via `inquire`.
pub struct TerminalPrompter;

fn map_err(e: InquireError) -> PmKitError {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => PmKitError::Cancelled,
        InquireError::IO(e) => PmKitError::Io(e),
        other => PmKitError::ValidationError(other.to_string()),
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        match Confirm::new(message).with_default(default).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::NotTTY) => Ok(default),
            Err(e) => Err(map_err(e)),
        }
    }

    fn password(&self, message: &str) -> Result<Option<String>> {
        match Password::new(message)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()
        {
            Ok(value) => Ok(non_empty(value)),
            Err(InquireError::NotTTY) => Ok(None),
            Err(e) => Err(map_err(e)),
        }
    }

    fn text(&self, message: &str, default: Option<&str>) -> Result<Option<String>> {
        let mut prompt = Text::new(message);
        if let Some(default) = default {
            prompt = prompt.with_default(default);
        }
        match prompt.prompt() {
            Ok(value) => Ok(non_empty(value)),
            Err(InquireError::NotTTY) => Ok(default.map(str::to_string)),
            Err(e) => Err(map_err(e)),
        }
    }

    fn note(&self, message: &str) {
        println!("{}", message.dimmed());
    }
}

/// Interactive prompts when stdin is a terminal, defaults otherwise.
pub fn for_terminal() -> Box<dyn Prompter> {
    if std::io::stdin().is_terminal() {
        Box::new(TerminalPrompter)
    } else {
        tracing::debug!("stdin is not a terminal; prompts use their defaults");
        Box::new(NonInteractive)
    }
}

/// A second confirmation that only accepts the literal word `yes`.
pub fn confirm_typed(prompter: &dyn Prompter, message: &str) -> Result<bool> {
    let answer = prompter.text(message, None)?;
    Ok(answer.is_some_and(|a| a.eq_ignore_ascii_case("yes")))
}
