//! Per-zoom tile index correction
//!
//! The tile pyramid was exported with a fixed origin, so the top-left tile
//! of each zoom level is not at index (0, 0). Column and row of a request
//! are shifted by the entry for `zoom - min_zoom` before building the URL.

use crate::domain::TileCoord;

/// Cumulative offsets indexed by `zoom - min_zoom`
pub const OFFSETS: [i32; 7] = [0, 1, 2, 4, 8, 16, 32];

/// Number of zoom levels the offset table covers
pub const ZOOM_LEVELS: i32 = OFFSETS.len() as i32;

/// Offset for `zoom`, or `None` outside the table
pub fn offset_for(zoom: i32, min_zoom: i32) -> Option<i32> {
    let index = usize::try_from(zoom - min_zoom).ok()?;
    OFFSETS.get(index).copied()
}

/// Source tile for a requested tile
pub fn source_coords(coords: TileCoord, min_zoom: i32) -> Option<TileCoord> {
    offset_for(coords.z, min_zoom).map(|offset| coords.shifted(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_table() {
        let offsets: Vec<i32> = (0..ZOOM_LEVELS).filter_map(|z| offset_for(z, 0)).collect();
        assert_eq!(offsets, OFFSETS.to_vec());
    }

    #[test]
    fn test_source_coords_at_zoom_three() {
        let source = source_coords(TileCoord::new(10, 10, 3), 0).unwrap();
        assert_eq!(source, TileCoord::new(14, 14, 3));
    }

    #[test]
    fn test_offset_is_relative_to_min_zoom() {
        assert_eq!(offset_for(2, 2), Some(0));
        assert_eq!(offset_for(5, 2), Some(4));
        let source = source_coords(TileCoord::new(-3, 7, 8), 2).unwrap();
        assert_eq!(source, TileCoord::new(29, 39, 8));
    }

    #[test]
    fn test_out_of_table_zoom() {
        assert_eq!(offset_for(-1, 0), None);
        assert_eq!(offset_for(7, 0), None);
        assert_eq!(source_coords(TileCoord::new(0, 0, 1), 2), None);
    }
}
