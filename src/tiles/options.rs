//! Tile layer options

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::offsets::ZOOM_LEVELS;
use crate::domain::TileSize;

/// Largest accepted `tile_size`; doubled canvases stay under 8192 pixels a side
pub const MAX_TILE_SIZE: u32 = 4096;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLayerOptions {
    pub min_zoom: i32,
    pub max_zoom: i32,
    /// Side of a square tile in CSS pixels
    pub tile_size: u32,
    /// Allocate canvases at twice the tile size (high-density screens)
    pub double_size: bool,
    /// Delay before a tile is fetched; `None` or zero loads immediately
    pub timeout_ms: Option<u64>,
    /// Added to the zoom used in tile URLs
    pub zoom_offset: i32,
    /// Count URL zoom down from `max_zoom`
    pub zoom_reverse: bool,
    /// Values for the `{s}` placeholder
    pub subdomains: Vec<String>,
    /// Flip the row index (TMS scheme)
    pub tms: bool,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: ZOOM_LEVELS - 1,
            tile_size: 512,
            double_size: false,
            timeout_ms: Some(100),
            zoom_offset: 0,
            zoom_reverse: false,
            subdomains: vec!["a".into(), "b".into(), "c".into()],
            tms: false,
        }
    }
}

impl TileLayerOptions {
    /// Check the zoom range fits the offset table and the tile size is bounded
    pub fn validate(&self) -> Result<()> {
        if self.min_zoom > self.max_zoom {
            bail!(
                "min_zoom ({}) is greater than max_zoom ({})",
                self.min_zoom,
                self.max_zoom
            );
        }
        if self.max_zoom - self.min_zoom >= ZOOM_LEVELS {
            bail!(
                "Zoom range {}..={} exceeds the {} levels of the offset table",
                self.min_zoom,
                self.max_zoom,
                ZOOM_LEVELS
            );
        }
        if self.tile_size == 0 {
            bail!("tile_size must be positive");
        }
        if self.tile_size > MAX_TILE_SIZE {
            bail!(
                "tile_size {} is larger than {}",
                self.tile_size,
                MAX_TILE_SIZE
            );
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Size of the canvas allocated per tile
    pub fn canvas_size(&self) -> TileSize {
        let size = TileSize::square(self.tile_size);
        if self.double_size { size.doubled() } else { size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TileLayerOptions::default().validate().is_ok());
    }

    #[test]
    fn test_zoom_range_must_fit_table() {
        let options = TileLayerOptions {
            min_zoom: 2,
            max_zoom: 9,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = TileLayerOptions {
            min_zoom: 3,
            max_zoom: 2,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = TileLayerOptions {
            min_zoom: 2,
            max_zoom: 8,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_tile_size_is_capped() {
        let mut options = TileLayerOptions {
            tile_size: MAX_TILE_SIZE,
            double_size: true,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
        assert_eq!(options.canvas_size(), TileSize::square(MAX_TILE_SIZE * 2));

        options.tile_size = MAX_TILE_SIZE + 1;
        assert!(options.validate().is_err());
        options.tile_size = u32::MAX;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_means_immediate() {
        let options = TileLayerOptions {
            timeout_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(options.timeout(), None);
    }

    #[test]
    fn test_canvas_size() {
        let mut options = TileLayerOptions {
            tile_size: 256,
            ..Default::default()
        };
        assert_eq!(options.canvas_size(), TileSize::square(256));
        options.double_size = true;
        assert_eq!(options.canvas_size(), TileSize::square(512));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: TileLayerOptions = serde_json::from_str(r#"{"tile_size": 256}"#).unwrap();
        assert_eq!(options.tile_size, 256);
        assert_eq!(options.max_zoom, 6);
    }
}
