//! Session state storage.
//!
//! The client never reaches into ambient storage; it is handed a
//! [`SessionStore`] and goes through `get`/`set`/`clear`. "Authenticated"
//! is derived from the presence of an access token, nothing else is tracked.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::CredentialPair;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Storage for the current credential pair.
///
/// Implementations must be safe to share between concurrent requests;
/// the last `set` wins.
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Result<Option<CredentialPair>>;
    fn set(&self, pair: &CredentialPair) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    pair: RwLock<Option<CredentialPair>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: RwLock::new(Some(pair)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<Option<CredentialPair>> {
        let guard = self
            .pair
            .read()
            .map_err(|_| anyhow!("Session lock poisoned"))?;
        Ok(guard.clone())
    }

    fn set(&self, pair: &CredentialPair) -> Result<()> {
        let mut guard = self
            .pair
            .write()
            .map_err(|_| anyhow!("Session lock poisoned"))?;
        *guard = Some(pair.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .pair
            .write()
            .map_err(|_| anyhow!("Session lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

// ============================================================================
// File store
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(flatten)]
    pub pair: CredentialPair,
    pub stored_at: DateTime<Utc>,
}

/// Persists the pair as JSON in the cache directory so a session survives
/// restarts.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    cache_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    /// Read the raw session file, including when it was written
    pub fn load(&self) -> Result<Option<SessionFile>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        match serde_json::from_str::<SessionFile>(&contents) {
            Ok(file) => Ok(Some(file)),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Ignoring corrupt session file");
                Ok(None)
            }
        }
    }

    fn write(path: &Path, file: &SessionFile) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(file)?;
        std::fs::write(path, contents).context("Failed to write session file")?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<Option<CredentialPair>> {
        Ok(self.load()?.map(|f| f.pair))
    }

    fn set(&self, pair: &CredentialPair) -> Result<()> {
        let file = SessionFile {
            pair: pair.clone(),
            stored_at: Utc::now(),
        };
        Self::write(&self.path(), &file)
    }

    fn clear(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to delete session file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemorySessionStore::new();
        assert!(store.get().unwrap().is_none());

        store.set(&CredentialPair::new("A1", "R1")).unwrap();
        assert_eq!(store.get().unwrap(), Some(CredentialPair::new("A1", "R1")));

        store.set(&CredentialPair::new("A2", "R1")).unwrap();
        assert_eq!(store.get().unwrap().unwrap().access_token, "A2");

        store.clear().unwrap();
        assert!(store.get().unwrap().is_none());
    }

    #[test]
    fn test_file_store_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested"));
        store.set(&CredentialPair::new("A1", "R1")).unwrap();

        let reopened = FileSessionStore::new(dir.path().join("nested"));
        assert_eq!(reopened.get().unwrap(), Some(CredentialPair::new("A1", "R1")));
        assert!(reopened.load().unwrap().unwrap().stored_at <= Utc::now());
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.set(&CredentialPair::new("A1", "R1")).unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.get().unwrap().is_none());

        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.get().unwrap().is_none());
    }
}
