use crate::error::{PmKitError, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting state files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PmKitError::fs("create temp file in", dir, e))?;
    tmp.write_all(data)
        .map_err(|e| PmKitError::fs("write", path, e))?;
    tmp.persist(path)
        .map_err(|e| PmKitError::fs("write", path, e.error))?;
    Ok(())
}

/// Write a JSON document with two-space indentation, atomically.
pub fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut data = serde_json::to_vec_pretty(value)?;
    data.push(b'\n');
    atomic_write(path, &data)
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| PmKitError::fs("create directory", path, e))
}

/// Restrict a file to its owner (0600). No-op off Unix.
pub fn set_private_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| PmKitError::fs("set permissions on", path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Remove a file or directory tree if it exists. Returns true if something was removed.
pub fn remove_path(path: &Path) -> Result<bool> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(PmKitError::fs("inspect", path, e)),
    };
    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| PmKitError::fs("remove", path, e))?;
    Ok(true)
}

/// Copy a file or directory tree from `src` to `dest`, creating parents.
/// Returns the number of files copied.
pub fn copy_recursive(src: &Path, dest: &Path) -> Result<usize> {
    if src.is_file() {
        if let Some(parent) = dest.parent() {
            ensure_dir(parent)?;
        }
        std::fs::copy(src, dest).map_err(|e| PmKitError::fs("copy", src, e))?;
        return Ok(1);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            PmKitError::fs("walk", path, e.into())
        })?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)
                .map_err(|e| PmKitError::fs("copy", entry.path(), e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Append the PM Kit block to `root/.gitignore` once.
///
/// Skips entirely when the marker comment is already present; otherwise
/// appends only lines not already in the file (comments and blanks are kept).
/// Returns true if the file changed.
pub fn append_gitignore_block(root: &Path, marker: &str, block: &str) -> Result<bool> {
    let gitignore = root.join(".gitignore");
    let existing = if gitignore.exists() {
        std::fs::read_to_string(&gitignore).map_err(|e| PmKitError::FileRead {
            path: gitignore.clone(),
            source: e,
        })?
    } else {
        String::new()
    };
    if existing.contains(marker) {
        return Ok(false);
    }

    let present: std::collections::HashSet<&str> =
        existing.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let additions: Vec<&str> = block
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            trimmed.is_empty() || trimmed.starts_with('#') || !present.contains(trimmed)
        })
        .collect();
    let text = additions.join("\n");
    if text.trim().is_empty() {
        return Ok(false);
    }

    let sep = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&gitignore)
        .map_err(|e| PmKitError::fs("open", &gitignore, e))?;
    writeln!(f, "{sep}{}", text.trim_end()).map_err(|e| PmKitError::fs("write", &gitignore, e))?;
    Ok(true)
}

/// Total size in bytes of all regular files under `path`.
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Whether the current user can write to `path` (probes with a temp file for directories).
pub fn is_writable(path: &Path) -> bool {
    if path.is_dir() {
        return NamedTempFile::new_in(path).is_ok();
    }
    std::fs::OpenOptions::new().append(true).open(path).is_ok()
}

pub fn is_readable(path: &Path) -> bool {
    if path.is_dir() {
        return std::fs::read_dir(path).is_ok();
    }
    std::fs::File::open(path).is_ok()
}
