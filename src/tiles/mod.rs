//! Tiled image layer
//!
//! This module contains:
//! - The per-zoom offset table applied to tile indices
//! - Tile URL templates
//! - Image sources that turn a tile URL into encoded bytes
//! - The canvas tile layer with zoom-keyed cancellable delayed loads

pub mod layer;
pub mod offsets;
pub mod options;
pub mod source;
pub mod url;

pub use layer::{CanvasTileLayer, TileDone};
pub use offsets::{OFFSETS, ZOOM_LEVELS};
pub use options::{MAX_TILE_SIZE, TileLayerOptions};
pub use source::{CrossOrigin, DirectoryImageSource, ImageRequest, ImageSource};
