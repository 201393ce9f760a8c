//! The update state machine.
//!
//! `CHECK_INITIALIZED → AUTHENTICATE → RESOLVE_TARGET_VERSION →
//! COMPARE_VERSIONS → DISPLAY_INFO → [DRY_RUN] → CONFIRM → [BACKUP] →
//! DETECT_LOCAL_CHANGES → [CONFIRM_OVERWRITE] → FETCH_AND_WRITE →
//! PERSIST_NEW_BASELINE`
//!
//! Steps run strictly in order and any failure aborts the run. Files already
//! written by a failed fetch stay on disk.

use crate::baseline;
use crate::detect::{self, ChangeSource, LocalChanges, RECENT_EDIT_WINDOW};
use crate::error::{PmKitError, Result};
use crate::exclusion::ExclusionSet;
use crate::fetch;
use crate::io;
use crate::metadata::{self, InstallMetadata, InstallMode};
use crate::paths::{self, DownloadPath, BACKUP_PREFIX, CLAUDE_DIR, CLAUDE_MD, MCP_CONFIG_FILE};
use crate::remote::{Release, RemoteRepository};
use crate::snapshot::Snapshot;
use crate::version::{self, VersionStatus};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub force: bool,
    pub dry_run: bool,
    pub backup: bool,
    pub exclude: Vec<String>,
    /// Target a specific release tag instead of the latest.
    pub version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub installed: String,
    pub target: Release,
    pub status: VersionStatus,
}

#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub from: String,
    pub to: String,
    pub files_written: usize,
    pub updated: Vec<DownloadPath>,
    /// Exclusion patterns that protected part of the payload.
    pub preserved: Vec<String>,
    pub backup: Option<PathBuf>,
    pub release: Release,
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    UpToDate { version: String },
    DryRun { paths: Vec<String> },
    Declined,
    OverwriteDeclined,
    Updated(UpdateReport),
}

/// Everything the orchestrator shows to or asks of the user.
pub trait UpdateUi {
    fn authenticated(&self, _login: &str) {}

    fn show_plan(&self, info: &VersionInfo);

    fn show_dry_run(&self, _paths: &[String]) {}

    fn confirm_update(&self, info: &VersionInfo) -> Result<bool>;

    fn backup_created(&self, _dir: &Path) {}

    /// Local changes would be overwritten; return whether to continue.
    fn confirm_overwrite(&self, changes: &LocalChanges) -> Result<bool>;

    fn fetch_started(&self, _path: DownloadPath) {}

    fn file_written(&self, _path: &str) {}
}

pub struct Updater<'a> {
    root: &'a Path,
    remote: &'a dyn RemoteRepository,
    ui: &'a dyn UpdateUi,
}

impl<'a> Updater<'a> {
    pub fn new(root: &'a Path, remote: &'a dyn RemoteRepository, ui: &'a dyn UpdateUi) -> Self {
        Self { root, remote, ui }
    }

    pub fn run(&self, opts: &UpdateOptions) -> Result<UpdateOutcome> {
        let exclusions = run_exclusions(self.root, opts)?;

        if !paths::is_initialized(self.root) {
            return Err(PmKitError::NotInitialized(self.root.to_path_buf()));
        }

        let login = self.remote.authenticate()?;
        self.ui.authenticated(&login);

        let target = match &opts.version {
            Some(tag) => self.remote.release_by_tag(tag)?,
            None => self.remote.latest_release()?,
        };
        let installed = metadata::installed_version(self.root);
        let status = version::compare(&installed, target.version());
        let info = VersionInfo {
            installed,
            target,
            status,
        };
        tracing::debug!(installed = %info.installed, target = %info.target.version(), %status, "resolved update target");

        if status == VersionStatus::Current && !opts.force {
            return Ok(UpdateOutcome::UpToDate {
                version: info.installed,
            });
        }

        self.ui.show_plan(&info);

        if opts.dry_run {
            let paths: Vec<String> = updatable_paths(&exclusions)
                .into_iter()
                .map(DownloadPath::display)
                .collect();
            self.ui.show_dry_run(&paths);
            return Ok(UpdateOutcome::DryRun { paths });
        }

        if !opts.force && !self.ui.confirm_update(&info)? {
            return Ok(UpdateOutcome::Declined);
        }

        let backup = if opts.backup {
            let dir = create_backup(self.root)?;
            self.ui.backup_created(&dir);
            Some(dir)
        } else {
            None
        };

        let changes = detect_local_changes(self.root, &exclusions, SystemTime::now())?;
        if !changes.is_empty() && !opts.force && !self.ui.confirm_overwrite(&changes)? {
            return Ok(UpdateOutcome::OverwriteDeclined);
        }

        let git_ref = info.target.version().to_string();
        let updated = updatable_paths(&exclusions);
        let mut files_written = 0;
        for target in &updated {
            self.ui.fetch_started(*target);
            if target.is_dir() {
                let stats = fetch::download_directory(
                    self.remote,
                    target.as_str(),
                    self.root,
                    &git_ref,
                    &exclusions,
                    &mut |p| self.ui.file_written(p),
                )?;
                files_written += stats.written;
            } else {
                fetch::download_file(
                    self.remote,
                    target.as_str(),
                    &self.root.join(target.as_str()),
                    &git_ref,
                )?;
                self.ui.file_written(target.as_str());
                files_written += 1;
            }
        }

        rebaseline(self.root, &exclusions)?;
        let mut meta = InstallMetadata::load(self.root)
            .ok()
            .flatten()
            .unwrap_or_else(|| InstallMetadata::new(&info.installed, InstallMode::Full, Vec::new()));
        meta.mark_updated(&git_ref);
        meta.save(self.root)?;

        let preserved = exclusions
            .matching_patterns(DownloadPath::ALL.iter().map(|p| p.as_str()))
            .into_iter()
            .map(String::from)
            .collect();

        Ok(UpdateOutcome::Updated(UpdateReport {
            from: info.installed,
            to: git_ref,
            files_written,
            updated,
            preserved,
            backup,
            release: info.target,
        }))
    }
}

/// The install's recorded mode and exclusions plus this run's `--exclude`.
fn run_exclusions(root: &Path, opts: &UpdateOptions) -> Result<ExclusionSet> {
    let recorded = InstallMetadata::load(root).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable install metadata");
        None
    });
    let (mode, mut patterns) = match recorded {
        Some(meta) => (meta.mode, meta.exclusions),
        None => (InstallMode::Full, Vec::new()),
    };
    patterns.extend(opts.exclude.iter().cloned());
    match mode {
        InstallMode::Minimal => ExclusionSet::minimal(patterns),
        InstallMode::Full => ExclusionSet::new(patterns),
    }
}

/// Persist the baseline after an update.
///
/// Paths written by this run take their fresh hash. Excluded paths keep the
/// hash of the last installed state, so edits to them still read as local
/// modifications.
pub fn rebaseline(root: &Path, exclusions: &ExclusionSet) -> Result<Snapshot> {
    let prior = baseline::load(root);
    let mut next = Snapshot::capture_paths(root, &DownloadPath::ALL)?;
    next.retain(|p| !exclusions.is_excluded(p));
    let carried: Vec<(String, String)> = prior
        .iter()
        .filter(|(p, _)| exclusions.is_excluded(p))
        .map(|(p, h)| (p.to_string(), h.to_string()))
        .collect();
    for (path, hash) in carried {
        next.insert(path, hash);
    }
    baseline::save(root, &next)?;
    Ok(next)
}

/// Download paths not wholly covered by an exclusion.
pub fn updatable_paths(exclusions: &ExclusionSet) -> Vec<DownloadPath> {
    DownloadPath::ALL
        .into_iter()
        .filter(|p| {
            let excluded = exclusions.is_excluded(p.as_str());
            if excluded {
                tracing::debug!(path = %p, "skipping excluded download path");
            }
            !excluded
        })
        .collect()
}

/// Compare the installed payload with the recorded baseline.
///
/// Excluded paths are never reported. Without a baseline, files modified
/// within the last 24 hours relative to `now` are reported instead.
pub fn detect_local_changes(
    root: &Path,
    exclusions: &ExclusionSet,
    now: SystemTime,
) -> Result<LocalChanges> {
    let mut current = Snapshot::capture_paths(root, &DownloadPath::ALL)?;
    current.retain(|p| !exclusions.is_excluded(p));

    let mut recorded = baseline::load(root);
    if recorded.is_empty() {
        tracing::warn!("no baseline recorded; falling back to recent-modification check");
        let modifications =
            detect::recently_modified(root, current.paths(), RECENT_EDIT_WINDOW, now)?;
        return Ok(LocalChanges {
            source: ChangeSource::RecencyHeuristic,
            modifications,
        });
    }
    recorded.retain(|p| !exclusions.is_excluded(p));
    Ok(LocalChanges {
        source: ChangeSource::Baseline,
        modifications: detect::detect(&current, &recorded),
    })
}

/// Copy `CLAUDE.md`, `.mcp.json` and `.claude/` into a timestamped sibling
/// directory. A failed backup is removed before the error is returned.
pub fn create_backup(root: &Path) -> Result<PathBuf> {
    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let dir = root.join(format!("{BACKUP_PREFIX}{stamp}"));
    let result = (|| -> Result<usize> {
        io::ensure_dir(&dir)?;
        let mut copied = 0;
        for item in [CLAUDE_MD, MCP_CONFIG_FILE, CLAUDE_DIR] {
            let src = root.join(item);
            if src.exists() {
                copied += io::copy_recursive(&src, &dir.join(item))?;
            }
        }
        Ok(copied)
    })();
    match result {
        Ok(copied) => {
            tracing::debug!(dir = %dir.display(), copied, "backup created");
            Ok(dir)
        }
        Err(e) => {
            if let Err(cleanup) = io::remove_path(&dir) {
                tracing::warn!(dir = %dir.display(), error = %cleanup, "failed to remove partial backup");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{Modification, ModificationStatus};
    use crate::remote::testing::FakeRemote;
    use std::cell::RefCell;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct ScriptedUi {
        confirm_update: bool,
        confirm_overwrite: bool,
        overwrite_asked: RefCell<Option<LocalChanges>>,
        written: RefCell<Vec<String>>,
    }

    impl ScriptedUi {
        fn agreeing() -> Self {
            Self {
                confirm_update: true,
                confirm_overwrite: true,
                ..Default::default()
            }
        }
    }

    impl UpdateUi for ScriptedUi {
        fn show_plan(&self, _info: &VersionInfo) {}

        fn confirm_update(&self, _info: &VersionInfo) -> Result<bool> {
            Ok(self.confirm_update)
        }

        fn confirm_overwrite(&self, changes: &LocalChanges) -> Result<bool> {
            *self.overwrite_asked.borrow_mut() = Some(changes.clone());
            Ok(self.confirm_overwrite)
        }

        fn file_written(&self, path: &str) {
            self.written.borrow_mut().push(path.to_string());
        }
    }

    fn remote() -> FakeRemote {
        FakeRemote::with_files(&[
            ("CLAUDE.md", "new root"),
            (".claude/agents/pm.md", "new agent"),
            (".claude/custom-prompts/x.md", "remote prompt"),
        ])
        .with_release("v2.0.0")
        .with_release("v1.0.0")
    }

    /// An installed project at v1.0.0 with a recorded baseline.
    fn installed_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".claude/agents")).unwrap();
        std::fs::create_dir_all(root.join(".claude/custom-prompts")).unwrap();
        std::fs::write(root.join(".claude/agents/pm.md"), "old agent").unwrap();
        std::fs::write(root.join(".claude/custom-prompts/x.md"), "mine").unwrap();
        std::fs::write(root.join("CLAUDE.md"), "old root").unwrap();
        std::fs::write(root.join(".mcp.json"), r#"{"mcpServers":{}}"#).unwrap();
        InstallMetadata::new("v1.0.0", InstallMode::Full, vec![])
            .save(root)
            .unwrap();
        baseline::record(root).unwrap();
        dir
    }

    fn age(path: &Path, hours: u64) {
        let f = std::fs::File::options().write(true).open(path).unwrap();
        f.set_modified(SystemTime::now() - Duration::from_secs(hours * 3600))
            .unwrap();
    }

    #[test]
    fn requires_initialized_project() {
        let dir = TempDir::new().unwrap();
        let ui = ScriptedUi::agreeing();
        let err = Updater::new(dir.path(), &remote(), &ui)
            .run(&UpdateOptions::default())
            .unwrap_err();
        assert!(matches!(err, PmKitError::NotInitialized(_)));
    }

    #[test]
    fn current_version_stops_early() {
        let dir = installed_project();
        InstallMetadata::new("v2.0.0", InstallMode::Full, vec![])
            .save(dir.path())
            .unwrap();
        let ui = ScriptedUi::agreeing();
        let outcome = Updater::new(dir.path(), &remote(), &ui)
            .run(&UpdateOptions::default())
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }));
        assert_eq!(std::fs::read_to_string(dir.path().join("CLAUDE.md")).unwrap(), "old root");
    }

    #[test]
    fn dry_run_lists_paths_without_writing() {
        let dir = installed_project();
        let ui = ScriptedUi::agreeing();
        let outcome = Updater::new(dir.path(), &remote(), &ui)
            .run(&UpdateOptions {
                dry_run: true,
                exclude: vec!["CLAUDE.md".into()],
                ..Default::default()
            })
            .unwrap();
        match outcome {
            UpdateOutcome::DryRun { paths } => assert_eq!(paths, vec![".claude/**"]),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(dir.path().join("CLAUDE.md")).unwrap(), "old root");
    }

    #[test]
    fn declined_confirmation_writes_nothing() {
        let dir = installed_project();
        let ui = ScriptedUi::default();
        let outcome = Updater::new(dir.path(), &remote(), &ui)
            .run(&UpdateOptions::default())
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Declined));
        assert_eq!(std::fs::read_to_string(dir.path().join("CLAUDE.md")).unwrap(), "old root");
    }

    #[test]
    fn update_writes_payload_preserves_exclusions_and_rebaselines() {
        let dir = installed_project();
        let ui = ScriptedUi::agreeing();
        let outcome = Updater::new(dir.path(), &remote(), &ui)
            .run(&UpdateOptions::default())
            .unwrap();
        let report = match outcome {
            UpdateOutcome::Updated(r) => r,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(report.from, "v1.0.0");
        assert_eq!(report.to, "v2.0.0");
        assert_eq!(report.files_written, 2);

        let root = dir.path();
        assert_eq!(std::fs::read_to_string(root.join("CLAUDE.md")).unwrap(), "new root");
        assert_eq!(std::fs::read_to_string(root.join(".claude/agents/pm.md")).unwrap(), "new agent");
        assert_eq!(
            std::fs::read_to_string(root.join(".claude/custom-prompts/x.md")).unwrap(),
            "mine"
        );

        // New baseline matches the tree on disk, so nothing reads as changed.
        let changes = detect_local_changes(root, &ExclusionSet::with_defaults(), SystemTime::now()).unwrap();
        assert_eq!(changes.source, ChangeSource::Baseline);
        assert!(changes.is_empty());
        assert_eq!(metadata::installed_version(root), "v2.0.0");
        assert_eq!(*ui.written.borrow(), vec![".claude/agents/pm.md", "CLAUDE.md"]);
    }

    #[test]
    fn local_edit_prompts_and_decline_keeps_file() {
        let dir = installed_project();
        std::fs::write(dir.path().join("CLAUDE.md"), "my edits").unwrap();
        let ui = ScriptedUi {
            confirm_update: true,
            confirm_overwrite: false,
            ..Default::default()
        };
        let outcome = Updater::new(dir.path(), &remote(), &ui)
            .run(&UpdateOptions::default())
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::OverwriteDeclined));
        let asked = ui.overwrite_asked.borrow().clone().unwrap();
        assert_eq!(asked.source, ChangeSource::Baseline);
        assert_eq!(
            asked.modifications,
            vec![Modification::new("CLAUDE.md", ModificationStatus::Modified)]
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("CLAUDE.md")).unwrap(), "my edits");
    }

    #[test]
    fn force_skips_prompts() {
        let dir = installed_project();
        std::fs::write(dir.path().join("CLAUDE.md"), "my edits").unwrap();
        let ui = ScriptedUi::default();
        let outcome = Updater::new(dir.path(), &remote(), &ui)
            .run(&UpdateOptions {
                force: true,
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));
        assert!(ui.overwrite_asked.borrow().is_none());
    }

    #[test]
    fn missing_baseline_uses_recency_heuristic() {
        let dir = installed_project();
        let root = dir.path();
        std::fs::remove_file(paths::baseline_path(root)).unwrap();
        age(&root.join(".claude/agents/pm.md"), 72);
        // CLAUDE.md was written two hours ago.
        age(&root.join("CLAUDE.md"), 2);

        let ui = ScriptedUi {
            confirm_update: true,
            confirm_overwrite: false,
            ..Default::default()
        };
        let outcome = Updater::new(root, &remote(), &ui)
            .run(&UpdateOptions::default())
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::OverwriteDeclined));
        let asked = ui.overwrite_asked.borrow().clone().unwrap();
        assert_eq!(asked.source, ChangeSource::RecencyHeuristic);
        assert_eq!(
            asked.modifications,
            vec![Modification::new("CLAUDE.md", ModificationStatus::Modified)]
        );
    }

    #[test]
    fn explicit_version_not_found() {
        let dir = installed_project();
        let ui = ScriptedUi::agreeing();
        let err = Updater::new(dir.path(), &remote(), &ui)
            .run(&UpdateOptions {
                version: Some("v9.9.9".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PmKitError::RepoNotFound(_)));
    }

    #[test]
    fn backup_copies_tracked_items() {
        let dir = installed_project();
        let backup = create_backup(dir.path()).unwrap();
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(BACKUP_PREFIX));
        assert_eq!(std::fs::read_to_string(backup.join("CLAUDE.md")).unwrap(), "old root");
        assert!(backup.join(".mcp.json").is_file());
        assert!(backup.join(".claude/agents/pm.md").is_file());
    }

    #[test]
    fn excluded_edit_survives_rebaseline() {
        let dir = installed_project();
        let root = dir.path();
        std::fs::write(root.join("CLAUDE.md"), "my edits").unwrap();
        let ui = ScriptedUi::agreeing();
        let outcome = Updater::new(root, &remote(), &ui)
            .run(&UpdateOptions {
                exclude: vec!["CLAUDE.md".into()],
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(_)));
        assert_eq!(std::fs::read_to_string(root.join("CLAUDE.md")).unwrap(), "my edits");

        let changes = detect_local_changes(root, &ExclusionSet::with_defaults(), SystemTime::now()).unwrap();
        assert_eq!(changes.source, ChangeSource::Baseline);
        assert_eq!(
            changes.modifications,
            vec![Modification::new("CLAUDE.md", ModificationStatus::Modified)]
        );
        assert_eq!(
            baseline::load(root).get("CLAUDE.md"),
            Some(crate::hash::hash_bytes(b"old root").as_str())
        );
    }

    #[test]
    fn minimal_install_stays_minimal() {
        let dir = installed_project();
        let root = dir.path();
        InstallMetadata::new("v1.0.0", InstallMode::Minimal, vec!["CLAUDE.md".into()])
            .save(root)
            .unwrap();
        let ui = ScriptedUi::agreeing();
        Updater::new(root, &remote(), &ui)
            .run(&UpdateOptions::default())
            .unwrap();
        assert_eq!(std::fs::read_to_string(root.join(".claude/agents/pm.md")).unwrap(), "old agent");
        assert_eq!(std::fs::read_to_string(root.join("CLAUDE.md")).unwrap(), "old root");
        assert!(ui.written.borrow().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn failed_backup_aborts_and_cleans_up() {
        use std::os::unix::fs::PermissionsExt;

        let dir = installed_project();
        let root = dir.path();
        let locked = root.join(".claude/agents/pm.md");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::File::open(&locked).is_ok() {
            // Running as root: permission bits are not enforced.
            return;
        }

        let ui = ScriptedUi::agreeing();
        let result = Updater::new(root, &remote(), &ui).run(&UpdateOptions {
            backup: true,
            ..Default::default()
        });
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert!(matches!(result, Err(PmKitError::Fs { .. })));
        let leftovers = std::fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(BACKUP_PREFIX))
            .count();
        assert_eq!(leftovers, 0);
        assert_eq!(std::fs::read_to_string(root.join("CLAUDE.md")).unwrap(), "old root");
        assert!(ui.written.borrow().is_empty());
    }

    #[test]
    fn invalid_exclusion_fails_before_anything_else() {
        let dir = TempDir::new().unwrap();
        let ui = ScriptedUi::agreeing();
        let err = Updater::new(dir.path(), &remote(), &ui)
            .run(&UpdateOptions {
                exclude: vec!["[bad".into()],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, PmKitError::ValidationError(_)));
    }
}
