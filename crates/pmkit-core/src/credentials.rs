//! Secret storage for the GitHub token and API keys.
//!
//! The OS keychain is used where one is available (macOS, Windows); the
//! owner-only `~/.pm-kit/.credentials` file is the fallback everywhere.

use crate::error::Result;
use crate::io;
use crate::paths;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const SERVICE_NAME: &str = "pm-kit-cli";
pub const GITHUB_TOKEN_KEY: &str = "github-token";

pub trait CredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Returns whether anything was removed.
    fn delete(&self, key: &str) -> Result<bool>;
    /// Human-readable location, for status messages.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// FileCredentialStore
// ---------------------------------------------------------------------------

/// JSON object of key → secret at `~/.pm-kit/.credentials`, mode 0600.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_home(home: &std::path::Path) -> Self {
        Self::new(paths::credentials_path(home))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return BTreeMap::new(),
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "credentials file unreadable; ignoring");
            BTreeMap::new()
        })
    }

    fn write_all(&self, data: &BTreeMap<String, String>) -> Result<()> {
        if data.is_empty() {
            io::remove_path(&self.path)?;
            return Ok(());
        }
        io::write_json(&self.path, data)?;
        io::set_private_permissions(&self.path)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all().remove(key).filter(|v| !v.is_empty()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut data = self.read_all();
        data.insert(key.to_string(), value.to_string());
        self.write_all(&data)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut data = self.read_all();
        if data.remove(key).is_none() {
            return Ok(false);
        }
        self.write_all(&data)?;
        Ok(true)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// KeychainStore
// ---------------------------------------------------------------------------

#[cfg(any(target_os = "macos", target_os = "windows"))]
#[derive(Debug, Clone, Default)]
pub struct KeychainStore;

#[cfg(any(target_os = "macos", target_os = "windows"))]
use crate::error::PmKitError;

#[cfg(any(target_os = "macos", target_os = "windows"))]
impl KeychainStore {
    fn entry(key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(SERVICE_NAME, key)
            .map_err(|e| PmKitError::ConfigError(format!("keychain unavailable: {e}")))
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
impl CredentialStore for KeychainStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match Self::entry(key)?.get_password() {
            Ok(v) => Ok(Some(v).filter(|v| !v.is_empty())),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(PmKitError::ConfigError(format!("keychain read failed: {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Self::entry(key)?
            .set_password(value)
            .map_err(|e| PmKitError::ConfigError(format!("keychain write failed: {e}")))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(PmKitError::ConfigError(format!("keychain delete failed: {e}"))),
        }
    }

    fn describe(&self) -> String {
        "system keychain".to_string()
    }
}

// ---------------------------------------------------------------------------
// FallbackStore
// ---------------------------------------------------------------------------

/// Try `primary` first and fall back to `secondary` when it fails.
///
/// A successful primary write removes any stale secondary copy.
pub struct FallbackStore<P, S> {
    primary: P,
    secondary: S,
}

impl<P: CredentialStore, S: CredentialStore> FallbackStore<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: CredentialStore, S: CredentialStore> CredentialStore for FallbackStore<P, S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.primary.get(key) {
            Ok(Some(v)) => return Ok(Some(v)),
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "primary credential store failed; using fallback"),
        }
        self.secondary.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.primary.set(key, value) {
            Ok(()) => {
                if let Err(e) = self.secondary.delete(key) {
                    tracing::debug!(error = %e, "could not remove fallback credential copy");
                }
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "primary credential store failed; using fallback");
                self.secondary.set(key, value)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let primary = self.primary.delete(key).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "primary credential delete failed");
            false
        });
        let secondary = self.secondary.delete(key)?;
        Ok(primary || secondary)
    }

    fn describe(&self) -> String {
        format!("{} (fallback: {})", self.primary.describe(), self.secondary.describe())
    }
}

/// The platform's default store rooted at `home`.
pub fn default_store(home: &std::path::Path) -> Box<dyn CredentialStore> {
    #[cfg(any(target_os = "macos", target_os = "windows"))]
    {
        Box::new(FallbackStore::new(KeychainStore, FileCredentialStore::in_home(home)))
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Box::new(FileCredentialStore::in_home(home))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PmKitError;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// A store that can be told to fail every operation.
    #[derive(Default)]
    struct MemoryStore {
        data: RefCell<BTreeMap<String, String>>,
        broken: bool,
    }

    impl CredentialStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if self.broken {
                return Err(PmKitError::ConfigError("broken".into()));
            }
            Ok(self.data.borrow().get(key).cloned())
        }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.broken {
                return Err(PmKitError::ConfigError("broken".into()));
            }
            self.data.borrow_mut().insert(key.into(), value.into());
            Ok(())
        }
        fn delete(&self, key: &str) -> Result<bool> {
            if self.broken {
                return Err(PmKitError::ConfigError("broken".into()));
            }
            Ok(self.data.borrow_mut().remove(key).is_some())
        }
        fn describe(&self) -> String {
            "memory".into()
        }
    }

    #[test]
    fn file_store_round_trip_and_cleanup() {
        let home = TempDir::new().unwrap();
        let store = FileCredentialStore::in_home(home.path());
        assert_eq!(store.get(GITHUB_TOKEN_KEY).unwrap(), None);

        store.set(GITHUB_TOKEN_KEY, "ghp_secret").unwrap();
        assert_eq!(store.get(GITHUB_TOKEN_KEY).unwrap().as_deref(), Some("ghp_secret"));
        assert!(store.path().exists());

        assert!(store.delete(GITHUB_TOKEN_KEY).unwrap());
        assert!(!store.path().exists(), "empty credentials file should be removed");
        assert!(!store.delete(GITHUB_TOKEN_KEY).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let home = TempDir::new().unwrap();
        let store = FileCredentialStore::in_home(home.path());
        store.set("gemini-key", "k").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn fallback_uses_secondary_when_primary_broken() {
        let store = FallbackStore::new(
            MemoryStore {
                broken: true,
                ..Default::default()
            },
            MemoryStore::default(),
        );
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert!(store.delete("k").unwrap());
    }

    #[test]
    fn fallback_primary_write_clears_secondary_copy() {
        let secondary = MemoryStore::default();
        secondary.set("k", "old").unwrap();
        let store = FallbackStore::new(MemoryStore::default(), secondary);
        store.set("k", "new").unwrap();
        assert_eq!(store.primary.get("k").unwrap().as_deref(), Some("new"));
        assert_eq!(store.secondary.get("k").unwrap(), None);
    }
}
