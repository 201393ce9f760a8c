//! The seam between core flows and an interactive terminal.

use crate::error::Result;

/// Interactive input. Implementations map user abort (Ctrl-C, Esc) to
/// `PmKitError::Cancelled`.
pub trait Prompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Masked input. `None` when the user entered nothing or no terminal is attached.
    fn password(&self, message: &str) -> Result<Option<String>>;

    fn text(&self, message: &str, default: Option<&str>) -> Result<Option<String>>;

    /// Informational line shown before a prompt.
    fn note(&self, _message: &str) {}
}

/// Answers every prompt with its default. Used when stdin is not a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn confirm(&self, _message: &str, default: bool) -> Result<bool> {
        Ok(default)
    }

    fn password(&self, _message: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn text(&self, _message: &str, default: Option<&str>) -> Result<Option<String>> {
        Ok(default.map(str::to_string))
    }
}
