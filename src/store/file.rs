//! JSON file backend for the persistent store
//!
//! All keys live in one JSON object on disk. The file is read once when the
//! store is opened and rewritten in full on every `set_value`.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::KeyValueStore;

/// Key-value store persisted as a single JSON document
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileStore {
    /// Default location: `<data_dir>/nodemap/store.json`
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("No data directory available")?;
        Ok(data_dir.join("nodemap").join("store.json"))
    }

    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            log::info!("Store file {} not found, starting empty", path.display());
            return Ok(Self {
                path,
                values: Map::new(),
            });
        }

        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read store file: {}", path.display()))?;
        let values: Map<String, Value> = serde_json::from_str(&json)
            .with_context(|| format!("Store file is not a JSON object: {}", path.display()))?;
        log::debug!("Loaded {} keys from {}", values.len(), path.display());
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write store file: {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: Value) -> Result<()> {
        let previous = self.values.insert(key.to_string(), value);
        if let Err(err) = self.flush() {
            // Keep memory in line with what is on disk
            match previous {
                Some(previous) => self.values.insert(key.to_string(), previous),
                None => self.values.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }
}
