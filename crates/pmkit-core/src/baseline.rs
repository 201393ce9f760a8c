//! The persisted baseline snapshot (`.pm-kit/file-hashes.json`).

use crate::error::Result;
use crate::io;
use crate::paths::{self, DownloadPath};
use crate::snapshot::Snapshot;
use std::path::Path;

/// Load the baseline recorded by the last install or update.
///
/// A missing or unreadable document means "no prior state" and yields an
/// empty snapshot rather than an error.
pub fn load(root: &Path) -> Snapshot {
    let path = paths::baseline_path(root);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "baseline unreadable; treating as empty");
            }
            return Snapshot::new();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "baseline corrupt; treating as empty");
        Snapshot::new()
    })
}

pub fn save(root: &Path, snapshot: &Snapshot) -> Result<()> {
    io::write_json(&paths::baseline_path(root), snapshot)
}

/// Snapshot the installed payload and persist it as the new baseline.
pub fn record(root: &Path) -> Result<Snapshot> {
    let snapshot = Snapshot::capture_paths(root, &DownloadPath::ALL)?;
    save(root, &snapshot)?;
    Ok(snapshot)
}
