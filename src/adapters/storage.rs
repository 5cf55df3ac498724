use crate::core::KeyValueStore;
use crate::utils::error::{CartError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use url::form_urlencoded;

/// One JSON file per key under a base directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Keys are form-urlencoded into the file name, so distinct keys never
    /// share a file: `@storefront:cart` becomes `%40storefront%3Acart.json`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let stem: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.base_path.join(format!("{}.json", stem))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let full_path = self.path_for(key);

        fs::create_dir_all(&self.base_path)?;

        // Write beside the target, then rename over it: readers see either
        // the old blob or the new one, never a truncated file.
        let mut staged = NamedTempFile::new_in(&self.base_path)?;
        staged.write_all(value.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&full_path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Process-local store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|e| CartError::StorageError {
            message: e.to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|e| CartError::StorageError {
            message: e.to_string(),
        })?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
