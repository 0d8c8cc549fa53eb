//! Key-value backends for the session blob.
//!
//! `FileStore` is the durable copy (survives restarts); `MemoryStore` is the
//! process-scoped mirror. `SessionVault` writes both and reads the durable
//! copy first, falling back to the mirror.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One JSON file per key in a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(contents))
    }

    /// Write to a temp file and rename over the target, so readers never see
    /// a half-written value.
    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        std::fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Durable store plus volatile mirror.
pub(crate) struct SessionVault {
    durable: Box<dyn KeyValueStore>,
    volatile: MemoryStore,
}

impl SessionVault {
    pub(crate) fn new(durable: Box<dyn KeyValueStore>) -> Self {
        Self {
            durable,
            volatile: MemoryStore::new(),
        }
    }

    pub(crate) fn read(&self, key: &str) -> Option<String> {
        match self.durable.get(key) {
            Ok(Some(value)) => return Some(value),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Durable session read failed, using volatile copy"),
        }
        let value = self.volatile.get(key).ok().flatten();
        if value.is_some() {
            debug!("Session read from volatile copy");
        }
        value
    }

    /// The mirror is written first; a durable failure is logged and the
    /// mirror still holds the value.
    pub(crate) fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.volatile.set(key, value) {
            warn!(error = %e, "Volatile session write failed");
        }
        if let Err(e) = self.durable.set(key, value) {
            warn!(error = %e, "Failed to persist session");
        }
    }

    pub(crate) fn erase(&self, key: &str) {
        if let Err(e) = self.volatile.remove(key) {
            warn!(error = %e, "Volatile session remove failed");
        }
        if let Err(e) = self.durable.remove(key) {
            warn!(error = %e, "Failed to remove persisted session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get("session").expect("read should work"), None);
        store.set("session", r#"{"a":1}"#).expect("write should work");
        assert_eq!(store.get("session").expect("read should work").as_deref(), Some(r#"{"a":1}"#));

        store.remove("session").expect("remove should work");
        store.remove("session").expect("second remove is a no-op");
        assert_eq!(store.get("session").expect("read should work"), None);
    }

    #[test]
    fn test_file_store_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = FileStore::new(dir.path());
        store.set("session", "x").expect("write should work");

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .expect("dir should list")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["session.json".to_string()]);
    }

    #[test]
    fn test_vault_falls_back_to_volatile_copy() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let vault = SessionVault::new(Box::new(FileStore::new(dir.path())));
        vault.write("session", "blob");

        // Durable copy disappears (e.g. removed by another process)
        std::fs::remove_file(dir.path().join("session.json")).expect("file should exist");
        assert_eq!(vault.read("session").as_deref(), Some("blob"));

        vault.erase("session");
        assert_eq!(vault.read("session"), None);
    }
}
