//! Locating and removing pm-kit installations.

use crate::io;
use crate::metadata::InstallMetadata;
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Indicators required before a `.claude/` directory is treated as ours,
/// so a plain Claude Desktop directory is never touched.
const MIN_INDICATORS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallationKind {
    Local,
    Global,
}

impl std::fmt::Display for InstallationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallationKind::Local => f.write_str("local"),
            InstallationKind::Global => f.write_str("global"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Installation {
    pub kind: InstallationKind,
    /// Directory holding `.claude/`, `CLAUDE.md` and friends.
    pub root: PathBuf,
    pub metadata: Option<InstallMetadata>,
    /// Bytes under `.claude/`.
    pub size: u64,
}

impl Installation {
    pub fn claude_dir(&self) -> PathBuf {
        paths::claude_dir(&self.root)
    }

    /// Every path removed for this installation, existing or not.
    pub fn targets(&self) -> Vec<PathBuf> {
        vec![
            paths::claude_dir(&self.root),
            paths::claude_md_path(&self.root),
            paths::mcp_config_path(&self.root),
            paths::pmkit_dir(&self.root),
        ]
    }
}

pub fn is_pmkit_installation(root: &Path) -> bool {
    let claude = paths::claude_dir(root);
    if !claude.is_dir() {
        return false;
    }
    let indicators = [
        claude.join("workflows"),
        claude.join("agents"),
        claude.join("commands"),
        paths::pmkit_dir(root),
        paths::claude_md_path(root),
    ];
    indicators.iter().filter(|p| p.exists()).count() >= MIN_INDICATORS
}

fn inspect(kind: InstallationKind, root: &Path) -> Installation {
    let metadata = InstallMetadata::load(root).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "ignoring unreadable metadata");
        None
    });
    Installation {
        kind,
        root: root.to_path_buf(),
        metadata,
        size: io::dir_size(&paths::claude_dir(root)),
    }
}

/// Installations in `root` and in `home`, local first. The home directory is
/// only reported once when both are the same.
pub fn detect_installations(root: &Path, home: &Path) -> Vec<Installation> {
    let mut found = Vec::new();
    if is_pmkit_installation(root) {
        found.push(inspect(InstallationKind::Local, root));
    }
    if paths::claude_dir(home) != paths::claude_dir(root) && is_pmkit_installation(home) {
        found.push(inspect(InstallationKind::Global, home));
    }
    found
}

#[derive(Debug, Default)]
pub struct UninstallReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

fn remove_into(path: &Path, report: &mut UninstallReport) {
    match io::remove_path(path) {
        Ok(true) => {
            tracing::debug!(path = %path.display(), "removed");
            report.removed.push(path.to_path_buf());
        }
        Ok(false) => {}
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "could not remove");
            report.failed.push((path.to_path_buf(), e.to_string()));
        }
    }
}

/// Remove each installation, then the global config directory under `home`.
/// Failures are collected, never fatal.
pub fn uninstall(installations: &[Installation], home: &Path) -> UninstallReport {
    let mut report = UninstallReport::default();
    for install in installations {
        for target in install.targets() {
            remove_into(&target, &mut report);
        }
    }
    remove_into(&paths::global_dir(home), &mut report);
    report
}

/// Human-readable byte count, e.g. `12.3 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InstallMode;
    use tempfile::TempDir;

    fn install_at(root: &Path) {
        std::fs::create_dir_all(root.join(".claude/workflows")).unwrap();
        std::fs::write(root.join(".claude/workflows/a.md"), "hello").unwrap();
        std::fs::write(root.join("CLAUDE.md"), "doc").unwrap();
        std::fs::write(root.join(".mcp.json"), "{}").unwrap();
        InstallMetadata::new("v1.2.0", InstallMode::Full, vec![])
            .save(root)
            .unwrap();
    }

    #[test]
    fn plain_claude_dir_is_not_ours() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".claude/settings")).unwrap();
        assert!(!is_pmkit_installation(dir.path()));
        std::fs::create_dir_all(dir.path().join(".claude/agents")).unwrap();
        assert!(!is_pmkit_installation(dir.path()));
        std::fs::write(dir.path().join("CLAUDE.md"), "x").unwrap();
        assert!(is_pmkit_installation(dir.path()));
    }

    #[test]
    fn detects_local_and_global() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        install_at(project.path());
        install_at(home.path());
        let found = detect_installations(project.path(), home.path());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, InstallationKind::Local);
        assert_eq!(found[1].kind, InstallationKind::Global);
        assert_eq!(found[0].metadata.as_ref().unwrap().version, "v1.2.0");
        assert_eq!(found[0].size, 5);
    }

    #[test]
    fn home_as_project_is_reported_once() {
        let home = TempDir::new().unwrap();
        install_at(home.path());
        let found = detect_installations(home.path(), home.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, InstallationKind::Local);
    }

    #[test]
    fn uninstall_removes_payload_and_global_config() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        install_at(project.path());
        std::fs::create_dir_all(paths::global_dir(home.path())).unwrap();
        std::fs::write(project.path().join("notes.md"), "keep").unwrap();

        let found = detect_installations(project.path(), home.path());
        let report = uninstall(&found, home.path());

        assert!(report.failed.is_empty());
        assert_eq!(report.removed.len(), 5);
        assert!(!project.path().join(".claude").exists());
        assert!(!project.path().join(".pm-kit").exists());
        assert!(!paths::global_dir(home.path()).exists());
        assert!(project.path().join("notes.md").exists());
    }

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(format_size(0), "0.0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
