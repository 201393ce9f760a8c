use crate::error::{PmKitError, Result};
use crate::hash;
use crate::paths::{self, DownloadPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Relative path → content hash for every regular file of a tree.
///
/// Keys use `/` separators so snapshots taken on different platforms compare
/// cleanly. Directories never appear as keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, String>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `root` and hash every regular file under it.
    ///
    /// Symlinks are never followed. Hidden files are included. A missing
    /// root yields an empty snapshot.
    pub fn capture(root: &Path) -> Result<Self> {
        let mut snapshot = Snapshot::new();
        snapshot.capture_into(root, root, None)?;
        Ok(snapshot)
    }

    /// Snapshot the installed payload under `project_root`.
    ///
    /// Files contribute a single entry; directories contribute every file
    /// beneath them, keyed relative to `project_root`.
    pub fn capture_paths(project_root: &Path, targets: &[DownloadPath]) -> Result<Self> {
        let mut snapshot = Snapshot::new();
        for target in targets {
            let path = project_root.join(target.as_str());
            if target.is_dir() {
                snapshot.capture_into(&path, &path, Some(target.as_str()))?;
            } else if path.is_file() {
                snapshot.insert(target.as_str(), hash::hash_file(&path)?);
            }
        }
        Ok(snapshot)
    }

    fn capture_into(&mut self, dir: &Path, base: &Path, prefix: Option<&str>) -> Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                PmKitError::FileRead {
                    path,
                    source: e.into(),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(base) else {
                continue;
            };
            let rel = paths::to_portable(rel);
            let key = match prefix {
                Some(p) => format!("{p}/{rel}"),
                None => rel,
            };
            self.0.insert(key, hash::hash_file(entry.path())?);
        }
        Ok(())
    }

    pub fn insert(&mut self, path: impl Into<String>, hash: impl Into<String>) {
        self.0.insert(path.into(), hash.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in lexicographic path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|k, _| keep(k));
    }
}

impl FromIterator<(String, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Snapshot(iter.into_iter().collect())
    }
}
