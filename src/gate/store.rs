//! Key-value stores backing the fetch gate.
//!
//! Values are serialized JSON strings. Stores use interior mutability so a
//! single gate can be shared by concurrent fetches.

use crate::error::{Result, SiteError};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<()>;
    fn remove(&self, key: &str) -> Result<bool>;
    fn keys(&self) -> Vec<String>;
    /// Removes every key, including ones the gate did not write.
    fn clear(&self) -> Result<()>;

    fn remove_prefixed(&self, prefix: &str) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys().into_iter().filter(|k| k.starts_with(prefix)) {
            if self.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn poisoned() -> SiteError {
    SiteError::Store("cache lock poisoned".to_string())
}

/// Session-only store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| poisoned())?
            .remove(key)
            .is_some())
    }

    fn keys(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(entries) => entries.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    fn clear(&self) -> Result<()> {
        self.entries.lock().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

/// JSON file store that survives between runs. Every mutation rewrites the
/// file through a temporary file in the same directory.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| SiteError::Io {
                locator: path.display().to_string(),
                source,
            })?;
            match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        "Cache file {} is corrupted ({}). Starting empty.",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened cache at {} ({} entries)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let io_err = |source: std::io::Error| SiteError::Io {
            locator: self.path.display().to_string(),
            source,
        };
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(io_err)?;

        let content = serde_json::to_string(entries).map_err(|source| SiteError::Parse {
            locator: self.path.display().to_string(),
            source,
        })?;
        let mut staged = NamedTempFile::new_in(dir).map_err(io_err)?;
        staged.write_all(content.as_bytes()).map_err(io_err)?;
        staged
            .persist(&self.path)
            .map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        let removed = entries.remove(key).is_some();
        if removed {
            self.persist(&entries)?;
        }
        Ok(removed)
    }

    fn keys(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(entries) => entries.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.clear();
        self.persist(&entries)
    }
}

/// Store selected at runtime from the `cache_backend` setting.
#[derive(Debug)]
pub enum AnyStore {
    Memory(MemoryStore),
    Disk(FileStore),
}

impl CacheStore for AnyStore {
    fn get(&self, key: &str) -> Option<String> {
        match self {
            AnyStore::Memory(s) => s.get(key),
            AnyStore::Disk(s) => s.get(key),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.set(key, value),
            AnyStore::Disk(s) => s.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<bool> {
        match self {
            AnyStore::Memory(s) => s.remove(key),
            AnyStore::Disk(s) => s.remove(key),
        }
    }

    fn keys(&self) -> Vec<String> {
        match self {
            AnyStore::Memory(s) => s.keys(),
            AnyStore::Disk(s) => s.keys(),
        }
    }

    fn clear(&self) -> Result<()> {
        match self {
            AnyStore::Memory(s) => s.clear(),
            AnyStore::Disk(s) => s.clear(),
        }
    }
}
