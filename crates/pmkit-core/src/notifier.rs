//! Once-a-week check for a newer pm-kit CLI release.
//!
//! Every failure here is swallowed: the notifier must never break `--version`.

use crate::io;
use crate::metadata::CLI_VERSION;
use crate::paths;
use crate::version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CLI_REPOSITORY: &str = "kv0906/pm-kit-cli";
pub const RELEASES_URL: &str = "https://github.com/kv0906/pm-kit-cli/releases/latest";
pub const CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(3);
pub const OPT_OUT_VAR: &str = "NO_UPDATE_NOTIFIER";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    latest_version: String,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct LatestRelease {
    tag_name: String,
}

pub struct Notifier {
    cache_path: PathBuf,
    api_base: String,
    current: String,
}

impl Notifier {
    pub fn new(home: &Path, api_base: &str) -> Self {
        Self {
            cache_path: paths::version_cache_path(home),
            api_base: api_base.trim_end_matches('/').to_string(),
            current: CLI_VERSION.to_string(),
        }
    }

    pub fn with_current(mut self, current: impl Into<String>) -> Self {
        self.current = current.into();
        self
    }

    pub fn disabled_by_env() -> bool {
        std::env::var(OPT_OUT_VAR).is_ok_and(|v| v == "1")
    }

    /// The newer version, if one is published.
    pub fn check(&self, now: DateTime<Utc>) -> Option<String> {
        let latest = match self.cached(now) {
            Some(v) => v,
            None => {
                let v = self.fetch_latest()?;
                self.store(&v, now);
                v
            }
        };
        version::is_newer(&self.current, &latest).then_some(latest)
    }

    fn cached(&self, now: DateTime<Utc>) -> Option<String> {
        let raw = std::fs::read_to_string(&self.cache_path).ok()?;
        let entry: CacheEntry = serde_json::from_str(&raw).ok()?;
        let age = now.signed_duration_since(entry.timestamp).to_std().ok()?;
        (age < CACHE_TTL).then_some(entry.latest_version)
    }

    fn store(&self, latest: &str, now: DateTime<Utc>) {
        let entry = CacheEntry {
            latest_version: latest.to_string(),
            timestamp: now,
        };
        if let Err(e) = io::write_json(&self.cache_path, &entry) {
            tracing::debug!(error = %e, "could not write version cache");
        }
    }

    fn fetch_latest(&self) -> Option<String> {
        let url = format!("{}/repos/{CLI_REPOSITORY}/releases/latest", self.api_base);
        let client = reqwest::blocking::Client::builder()
            .timeout(CHECK_TIMEOUT)
            .user_agent(format!("pm-kit-cli/{CLI_VERSION}"))
            .build()
            .ok()?;
        let resp = client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .ok()?;
        if !resp.status().is_success() {
            tracing::debug!(status = resp.status().as_u16(), "version check failed");
            return None;
        }
        let release: LatestRelease = resp.json().ok()?;
        let tag = release.tag_name.trim();
        Some(tag.strip_prefix('v').unwrap_or(tag).to_string())
    }
}
