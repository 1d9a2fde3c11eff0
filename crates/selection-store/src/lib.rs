//! Persistence for the one [`SelectionRecord`].
//!
//! The record lives in a session-storage slot keyed by [`RECORD_KEY`]. Storage
//! backends only move strings; (de)serialization and the "malformed means
//! absent" rule live in [`SelectionStore`].

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use resizer_core_types::{SelectionRecord, RECORD_KEY};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key/value slot scoped to one browsing session.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local storage. Clones share the same slots, which is how a
/// simulated reload keeps its session.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.slots.get(key).map(|entry| entry.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.slots.remove(key);
        Ok(())
    }
}

/// JSON object on disk, one member per key. Used by the CLI so a session
/// outlives a single process.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(self.io_err(err)),
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "session file unreadable; starting empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| self.io_err(err))?;
            }
        }
        let file = File::create(&self.path).map_err(|err| self.io_err(err))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, map)?;
        writer.flush().map_err(|err| self.io_err(err))?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value.to_string());
        self.write_all(&map)
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }
}

/// The single-record store. Only the page agent writes through it.
#[derive(Clone)]
pub struct SelectionStore {
    storage: Arc<dyn SessionStorage>,
}

impl SelectionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Missing, unreadable and malformed slots all read as `None`.
    pub fn load(&self) -> Option<SelectionRecord> {
        let raw = match self.storage.get_item(RECORD_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "selection slot unreadable");
                return None;
            }
        };
        match SelectionRecord::from_json(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(error = %err, "discarding malformed selection record");
                None
            }
        }
    }

    pub fn save(&self, record: &SelectionRecord) -> Result<(), StoreError> {
        let raw = record.to_json()?;
        self.storage.set_item(RECORD_KEY, &raw)?;
        debug!(locator = %record.locator, full_view = record.full_view_on, "selection record saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.storage.remove_item(RECORD_KEY)?;
        debug!("selection record cleared");
        Ok(())
    }

    /// Read-modify-write of the current record. Returns the saved record, or
    /// `None` when there was nothing to update.
    pub fn update<F>(&self, mutate: F) -> Result<Option<SelectionRecord>, StoreError>
    where
        F: FnOnce(&mut SelectionRecord),
    {
        let Some(mut record) = self.load() else {
            return Ok(None);
        };
        mutate(&mut record);
        self.save(&record)?;
        Ok(Some(record))
    }
}
