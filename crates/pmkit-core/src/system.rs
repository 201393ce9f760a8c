//! Probes of the host environment.

use std::process::Command;

pub const CLAUDE_INSTALL_URL: &str = "https://claude.ai/code";

/// Version string reported by `claude --version`, if the Claude CLI is installed.
pub fn claude_cli_version() -> Option<String> {
    let bin = which::which("claude").ok()?;
    let out = Command::new(bin).arg("--version").output().ok()?;
    if !out.status.success() {
        tracing::debug!(status = ?out.status, "claude --version failed");
        return None;
    }
    let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
    Some(if version.is_empty() {
        "installed".to_string()
    } else {
        version
    })
}
