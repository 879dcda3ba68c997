//! Configuration persistence for nodemap settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::tiles::TileLayerOptions;

const APP_DIR: &str = "nodemap";
const CONFIG_FILE: &str = "config.json";

/// Application configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Tile URL template, relative to `tile_root`
    pub tile_url: String,
    /// Lowest zoom the tile pyramid was exported for
    pub min_zoom: i32,
    /// Highest zoom, at most six levels above `min_zoom`
    pub max_zoom: i32,
    /// Tile side in pixels
    pub tile_size: u32,
    /// Render tiles at twice their size
    pub double_size: bool,
    /// Delay before a tile is fetched (None = immediately)
    pub tile_timeout_ms: Option<u64>,
    /// Directory tile URLs are resolved against
    pub tile_root: PathBuf,
    /// Directory holding nodes.json and types.json
    pub catalog_dir: PathBuf,
    /// Persistent store file (None = default data location)
    pub store_path: Option<PathBuf>,
}

impl Default for MapConfig {
    fn default() -> Self {
        let tiles = TileLayerOptions::default();
        let data_dir = data_dir();
        Self {
            tile_url: "{z}/{x}/{y}.png".to_string(),
            min_zoom: tiles.min_zoom,
            max_zoom: tiles.max_zoom,
            tile_size: tiles.tile_size,
            double_size: tiles.double_size,
            tile_timeout_ms: tiles.timeout_ms,
            tile_root: data_dir.join("tiles"),
            catalog_dir: data_dir.join("catalog"),
            store_path: None,
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl MapConfig {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            log::warn!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load from `path`; a missing or malformed file gives the defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:#}", err);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config file: {}", path.display()))
    }

    /// Save configuration to disk
    pub fn save(&self) {
        let Some(path) = Self::default_path() else {
            log::error!("No config directory available for saving");
            return;
        };
        if let Err(err) = self.save_to(&path) {
            log::error!("Failed to save config: {:#}", err);
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Tile layer options derived from these settings
    pub fn tile_options(&self) -> TileLayerOptions {
        TileLayerOptions {
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            tile_size: self.tile_size,
            double_size: self.double_size,
            timeout_ms: self.tile_timeout_ms,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MapConfig::load_from(&dir.path().join("config.json"));
        assert_eq!(config, MapConfig::default());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(MapConfig::load_from(&path), MapConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = MapConfig {
            tile_url: "{z}/{y}/{x}.webp".to_string(),
            min_zoom: 2,
            max_zoom: 8,
            tile_timeout_ms: None,
            store_path: Some(dir.path().join("store.json")),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(MapConfig::load_from(&path), config);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"tile_size": 256, "double_size": true}"#).unwrap();
        let config = MapConfig::load_from(&path);
        assert_eq!(config.tile_size, 256);
        assert!(config.double_size);
        assert_eq!(config.max_zoom, 6);
        assert_eq!(config.tile_timeout_ms, Some(100));
    }

    #[test]
    fn test_tile_options() {
        let config = MapConfig {
            tile_size: 256,
            double_size: true,
            tile_timeout_ms: Some(0),
            ..Default::default()
        };
        let options = config.tile_options();
        assert_eq!(options.canvas_size().width, 512);
        assert_eq!(options.timeout(), None);
        assert!(options.validate().is_ok());
    }
}
