//! Read-only access to the repository hosting the kit payload.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published release of the kit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
}

impl Release {
    pub fn version(&self) -> &str {
        &self.tag_name
    }

    /// First line of the release notes, truncated to `max` characters.
    pub fn summary(&self, max: usize) -> Option<String> {
        let line = self.body.as_deref()?.lines().map(str::trim).find(|l| !l.is_empty())?;
        if line.chars().count() <= max {
            return Some(line.to_string());
        }
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        Some(format!("{cut}..."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// One item of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    /// Path from the repository root, `/`-separated.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// The operations install and update need from a remote repository.
pub trait RemoteRepository {
    /// `owner/repo`
    fn repository(&self) -> &str;

    /// Verify credentials, returning the account login.
    fn authenticate(&self) -> Result<String>;

    /// Latest published, non-prerelease release.
    fn latest_release(&self) -> Result<Release>;

    fn release_by_tag(&self, tag: &str) -> Result<Release>;

    /// Newest first. Without `include_all`, prereleases and drafts are dropped.
    fn list_releases(&self, limit: usize, include_all: bool) -> Result<Vec<Release>>;

    fn file_content(&self, path: &str, git_ref: &str) -> Result<Vec<u8>>;

    fn list_directory(&self, path: &str, git_ref: &str) -> Result<Vec<RemoteEntry>>;
}
