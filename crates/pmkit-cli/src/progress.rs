//! Spinner shown while talking to GitHub.

use crate::output;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(80);

/// One spinner at a time. Starting a new step replaces the previous one.
#[derive(Default)]
pub struct Spinner {
    bar: RefCell<Option<ProgressBar>>,
}

impl Spinner {
    pub fn start(&self, message: impl Into<String>) {
        self.clear();
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(TICK);
        bar.set_message(message.into());
        *self.bar.borrow_mut() = Some(bar);
    }

    pub fn message(&self, message: impl Into<String>) {
        if let Some(bar) = self.bar.borrow().as_ref() {
            bar.set_message(message.into());
        }
    }

    pub fn succeed(&self, message: &str) {
        self.clear();
        output::success(message);
    }

    pub fn fail(&self, message: &str) {
        self.clear();
        output::failure(message);
    }

    pub fn clear(&self) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_and_clear();
        }
    }

    /// Hide the spinner while `f` writes to the terminal or prompts.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        let bar = self.bar.borrow().clone();
        match bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.clear();
    }
}
