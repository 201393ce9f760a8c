use crate::error::{PmKitError, Result};
use crate::snapshot::Snapshot;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Files touched within this window count as locally edited when no baseline exists.
pub const RECENT_EDIT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationStatus {
    Added,
    Modified,
    Deleted,
}

impl std::fmt::Display for ModificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModificationStatus::Added => write!(f, "added"),
            ModificationStatus::Modified => write!(f, "modified"),
            ModificationStatus::Deleted => write!(f, "deleted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modification {
    pub path: String,
    pub status: ModificationStatus,
}

impl Modification {
    pub fn new(path: impl Into<String>, status: ModificationStatus) -> Self {
        Self {
            path: path.into(),
            status,
        }
    }
}

/// Classify every path of `current` against `baseline`.
///
/// Paths with equal hashes on both sides are omitted. The result is sorted
/// by path regardless of traversal order.
pub fn detect(current: &Snapshot, baseline: &Snapshot) -> Vec<Modification> {
    let mut changes: Vec<Modification> = current
        .iter()
        .filter_map(|(path, hash)| match baseline.get(path) {
            None => Some(Modification::new(path, ModificationStatus::Added)),
            Some(old) if old != hash => Some(Modification::new(path, ModificationStatus::Modified)),
            Some(_) => None,
        })
        .collect();

    changes.extend(
        baseline
            .paths()
            .filter(|path| !current.contains(path))
            .map(|path| Modification::new(path, ModificationStatus::Deleted)),
    );

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes
}

/// Tracked files whose mtime falls within `window` before `now`.
///
/// This is the fallback used when no baseline was recorded. It is an
/// approximation: a re-saved but unchanged file is reported, an old edit is not.
pub fn recently_modified<'a>(
    root: &Path,
    candidates: impl IntoIterator<Item = &'a str>,
    window: Duration,
    now: SystemTime,
) -> Result<Vec<Modification>> {
    let mut changes = Vec::new();
    for rel in candidates {
        let path = root.join(rel);
        let meta = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(PmKitError::FileRead { path, source: e }),
        };
        let modified = meta
            .modified()
            .map_err(|e| PmKitError::FileRead { path: path.clone(), source: e })?;
        // A timestamp in the future is as recent as it gets.
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age < window {
            changes.push(Modification::new(rel, ModificationStatus::Modified));
        }
    }
    changes.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(changes)
}

/// How a set of local changes was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    Baseline,
    RecencyHeuristic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalChanges {
    pub source: ChangeSource,
    pub modifications: Vec<Modification>,
}

impl LocalChanges {
    pub fn is_empty(&self) -> bool {
        self.modifications.is_empty()
    }

    pub fn len(&self) -> usize {
        self.modifications.len()
    }
}
