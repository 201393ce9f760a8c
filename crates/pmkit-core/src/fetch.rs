//! Materialize remote files and directories under a local root.

use crate::error::{PmKitError, Result};
use crate::exclusion::ExclusionSet;
use crate::io;
use crate::remote::{EntryKind, RemoteRepository};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub written: usize,
    pub skipped: usize,
}

impl FetchStats {
    fn absorb(&mut self, other: FetchStats) {
        self.written += other.written;
        self.skipped += other.skipped;
    }
}

/// Fetch one file at `git_ref` and write it to `dest`.
pub fn download_file(
    remote: &dyn RemoteRepository,
    remote_path: &str,
    dest: &Path,
    git_ref: &str,
) -> Result<()> {
    let bytes = remote.file_content(remote_path, git_ref)?;
    io::atomic_write(dest, &bytes)?;
    tracing::debug!(path = remote_path, "downloaded");
    Ok(())
}

/// Recursively fetch `remote_path` into `root`, keeping repository-relative
/// paths. Entries matched by `exclusions` are skipped; `on_file` is called
/// with each written path. Files are fetched one at a time.
pub fn download_directory(
    remote: &dyn RemoteRepository,
    remote_path: &str,
    root: &Path,
    git_ref: &str,
    exclusions: &ExclusionSet,
    on_file: &mut dyn FnMut(&str),
) -> Result<FetchStats> {
    let mut stats = FetchStats::default();
    io::ensure_dir(&root.join(remote_path))?;
    for entry in remote.list_directory(remote_path, git_ref)? {
        ensure_contained(remote_path, &entry.path)?;
        if exclusions.is_excluded(&entry.path) {
            tracing::debug!(path = %entry.path, "skipping excluded path");
            stats.skipped += 1;
            continue;
        }
        match entry.kind {
            EntryKind::File => {
                download_file(remote, &entry.path, &root.join(&entry.path), git_ref)?;
                stats.written += 1;
                on_file(&entry.path);
            }
            EntryKind::Dir => {
                stats.absorb(download_directory(
                    remote,
                    &entry.path,
                    root,
                    git_ref,
                    exclusions,
                    on_file,
                )?);
            }
            EntryKind::Other => {
                tracing::debug!(path = %entry.path, "skipping unsupported entry type");
            }
        }
    }
    Ok(stats)
}

/// A listed entry must sit directly beneath the directory that listed it,
/// with no `..`, `.` or empty segments.
fn ensure_contained(parent: &str, entry_path: &str) -> Result<()> {
    let contained = entry_path
        .strip_prefix(parent)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty() && !name.contains(['/', '\\']))
        && entry_path
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
    if contained {
        Ok(())
    } else {
        Err(PmKitError::ValidationError(format!(
            "remote entry '{entry_path}' is outside '{parent}'"
        )))
    }
}

/// Number of files beneath `remote_path`, for progress reporting.
pub fn count_remote_files(
    remote: &dyn RemoteRepository,
    remote_path: &str,
    git_ref: &str,
) -> Result<usize> {
    let mut count = 0;
    for entry in remote.list_directory(remote_path, git_ref)? {
        match entry.kind {
            EntryKind::File => count += 1,
            EntryKind::Dir => count += count_remote_files(remote, &entry.path, git_ref)?,
            EntryKind::Other => {}
        }
    }
    Ok(count)
}
