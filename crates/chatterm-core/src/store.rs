//! Durable storage for the current session identifier
//!
//! The session machine only needs get/set/remove on a single key, so it
//! depends on the `SessionStore` capability rather than a concrete backend.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::Config;

pub trait SessionStore: Send {
    fn get(&self) -> Result<Option<String>>;
    fn set(&mut self, session_id: &str) -> Result<()>;
    fn remove(&mut self) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// JSON file holding `{"sessionId": "..."}`
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/chatterm/session.json`
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Config::config_dir()?.join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", self.path.display())),
        };

        let stored: StoredSession = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        if stored.session_id.is_empty() {
            return Ok(None);
        }
        Ok(Some(stored.session_id))
    }

    fn set(&mut self, session_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredSession {
            session_id: session_id.to_string(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}

/// In-process store. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session_id: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(session_id.to_string()))),
        }
    }

    /// Current contents without going through the trait
    pub fn peek(&self) -> Option<String> {
        self.slot.lock().map(|slot| slot.clone()).unwrap_or(None)
    }
}

impl SessionStore for MemoryStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.peek())
    }

    fn set(&mut self, session_id: &str) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        *slot = Some(session_id.to_string());
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_file_store_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSessionStore::new(dir.path().join("state").join("session.json"));

        store.set("abc").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc"));

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"sessionId\""));

        store.remove().unwrap();
        assert_eq!(store.get().unwrap(), None);
        // Second remove is still fine
        store.remove().unwrap();
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(FileSessionStore::new(&path).get().is_err());
    }

    #[test]
    fn test_memory_store_clones_share_slot() {
        let mut store = MemoryStore::new();
        let observer = store.clone();
        store.set("xyz").unwrap();
        assert_eq!(observer.peek().as_deref(), Some("xyz"));
        store.remove().unwrap();
        assert_eq!(observer.peek(), None);
    }
}
