//! Tile rendering
//!
//! Canvas allocation, decoded image drawing and PNG export, all on
//! tiny-skia pixmaps.

pub mod tile;

pub use tile::Tile;
