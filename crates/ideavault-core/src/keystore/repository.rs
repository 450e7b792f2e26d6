//! Persistent storage for key file handles.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, VaultError};
use crate::fs::write_atomic;

/// A small key-value store of handles, keyed by logical name.
///
/// An empty store (or a missing backing file) is a normal first run.
pub trait HandleRepository<H> {
    /// Load the handle stored under `name`.
    fn load(&self, name: &str) -> Result<Option<H>>;

    /// Store (or replace) the handle under `name`.
    fn store(&mut self, name: &str, handle: &H) -> Result<()>;

    /// Remove the handle under `name`. Returns whether one existed.
    fn remove(&mut self, name: &str) -> Result<bool>;
}

/// In-memory repository, for tests and embedding.
#[derive(Debug, Clone)]
pub struct MemoryHandleRepository<H> {
    entries: HashMap<String, H>,
}

impl<H> MemoryHandleRepository<H> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H> Default for MemoryHandleRepository<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone> HandleRepository<H> for MemoryHandleRepository<H> {
    fn load(&self, name: &str) -> Result<Option<H>> {
        Ok(self.entries.get(name).cloned())
    }

    fn store(&mut self, name: &str, handle: &H) -> Result<()> {
        self.entries.insert(name.to_string(), handle.clone());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<bool> {
        Ok(self.entries.remove(name).is_some())
    }
}

/// Repository backed by one JSON object file mapping names to handles.
///
/// Writes are atomic and the file is restricted to its owner on Unix.
#[derive(Debug, Clone)]
pub struct JsonHandleRepository {
    path: PathBuf,
}

impl JsonHandleRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(VaultError::Storage(format!(
                    "Failed to read handle store {}: {}",
                    self.path.display(),
                    err
                )))
            }
        };
        serde_json::from_slice(&contents).map_err(|e| {
            VaultError::Storage(format!(
                "Handle store {} is corrupted: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, serde_json::Value>) -> Result<()> {
        let contents = serde_json::to_vec_pretty(entries)?;
        write_atomic(&self.path, &contents, true).map_err(|e| {
            VaultError::Storage(format!(
                "Failed to write handle store {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl<H> HandleRepository<H> for JsonHandleRepository
where
    H: Serialize + DeserializeOwned,
{
    fn load(&self, name: &str) -> Result<Option<H>> {
        let mut entries = self.read_all()?;
        match entries.remove(name) {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                VaultError::Storage(format!("Stored handle \"{}\" is invalid: {}", name, e))
            }),
            None => Ok(None),
        }
    }

    fn store(&mut self, name: &str, handle: &H) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(name.to_string(), serde_json::to_value(handle)?);
        self.write_all(&entries)?;
        tracing::debug!(name, store = %self.path.display(), "stored key file handle");
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<bool> {
        let mut entries = self.read_all()?;
        let existed = entries.remove(name).is_some();
        if existed {
            self.write_all(&entries)?;
            tracing::debug!(name, store = %self.path.display(), "removed key file handle");
        }
        Ok(existed)
    }
}
