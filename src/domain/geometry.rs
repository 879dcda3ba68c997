//! Geographic and tile-grid coordinate types

use serde::{Deserialize, Serialize};

/// Geographic position on the map (latitude = y, longitude = x)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Address of one tile in the pyramid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
    /// Zoom level
    pub z: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Translate column and row by the same amount, keeping the zoom
    pub fn shifted(&self, offset: i32) -> TileCoord {
        TileCoord {
            x: self.x + offset,
            y: self.y + offset,
            z: self.z,
        }
    }
}

/// Pixel dimensions of a tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl TileSize {
    /// Square tile
    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    /// Both dimensions multiplied by two (high-density canvases)
    pub fn doubled(self) -> Self {
        Self {
            width: self.width.saturating_mul(2),
            height: self.height.saturating_mul(2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::square(256)
    }
}
