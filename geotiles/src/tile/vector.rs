//! Compact binary point tiles.
//!
//! Layout: for each point, `x` then `y` as little-endian `u16`, with no
//! header, separator or count. Coordinates are tile-local: the tile's
//! western/northern edge maps to `offset` and the eastern/southern edge to
//! `65535 - offset`, leaving room on every side for points in the padding.

use bytes::{BufMut, BytesMut};
use tracing::trace;

use super::{padded_bounds, TileEncoder, TileError, TileFormat, TILE_PIXELS};
use crate::coord::TileCoord;
use crate::points::PointIndex;

/// Default margin reserved on each axis, in tile units.
pub const DEFAULT_OFFSET: u16 = 5000;

/// Default padding in pixels, matching the default marker radius.
pub const DEFAULT_PADDING_PX: f64 = 5.0;

/// Encodes points as quantized u16 coordinate pairs.
#[derive(Debug, Clone, Copy)]
pub struct VectorEncoder {
    offset: u16,
    padding_px: f64,
}

impl Default for VectorEncoder {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            padding_px: DEFAULT_PADDING_PX,
        }
    }
}

impl VectorEncoder {
    /// Create an encoder with a custom edge offset and query padding.
    ///
    /// # Errors
    ///
    /// Returns `TileError::InvalidConfig` when the offset leaves no usable
    /// extent or the padded area does not fit inside the offset.
    pub fn new(offset: u16, padding_px: f64) -> Result<Self, TileError> {
        if offset >= u16::MAX / 2 {
            return Err(TileError::InvalidConfig(format!(
                "vector offset {} leaves no extent",
                offset
            )));
        }
        if !(0.0..=TILE_PIXELS as f64).contains(&padding_px) {
            return Err(TileError::InvalidConfig(format!(
                "vector padding {} px out of range",
                padding_px
            )));
        }

        let encoder = Self { offset, padding_px };
        let padding_units = encoder.padding_units();
        if padding_units > offset as f64 {
            return Err(TileError::InvalidConfig(format!(
                "vector padding {} px spans {:.0} units, more than offset {}",
                padding_px, padding_units, offset
            )));
        }
        Ok(encoder)
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Units spanned by one tile edge.
    pub fn extent(&self) -> f64 {
        (u16::MAX - 2 * self.offset) as f64
    }

    /// Width of the query padding in tile units.
    pub fn padding_units(&self) -> f64 {
        self.padding_px / TILE_PIXELS as f64 * self.extent()
    }

    /// Map a point in meters to tile-local units.
    pub fn quantize(&self, tile: &TileCoord, x: f64, y: f64) -> (u16, u16) {
        let bounds = tile.bounds();
        let size = tile.size();
        let extent = self.extent();
        let offset = self.offset as f64;

        let vx = (x - bounds.min_x) / size * extent + offset;
        let vy = (bounds.max_y - y) / size * extent + offset;
        (to_u16(vx), to_u16(vy))
    }
}

fn to_u16(value: f64) -> u16 {
    value.round().clamp(0.0, u16::MAX as f64) as u16
}

impl TileEncoder for VectorEncoder {
    fn encode(
        &self,
        points: &PointIndex,
        tile: &TileCoord,
    ) -> Result<Option<Vec<u8>>, TileError> {
        let query = padded_bounds(tile, self.padding_px);

        let mut buf = BytesMut::new();
        for point in points.query_bbox(&query) {
            let (vx, vy) = self.quantize(tile, point.x as f64, point.y as f64);
            buf.put_u16_le(vx);
            buf.put_u16_le(vy);
        }

        trace!(tile = %tile, points = buf.len() / 4, "Encoded vector tile");
        Ok((!buf.is_empty()).then(|| buf.to_vec()))
    }

    fn format(&self) -> TileFormat {
        TileFormat::Vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::ProjectedPoint;
    use crate::points::PointCollector;

    fn index(points: &[(i64, i64)]) -> PointIndex {
        let mut collector = PointCollector::new();
        for &(x, y) in points {
            collector.add(ProjectedPoint::new(x, y));
        }
        collector.finalize()
    }

    fn decode(data: &[u8]) -> Vec<(u16, u16)> {
        data.chunks_exact(4)
            .map(|c| {
                (
                    u16::from_le_bytes([c[0], c[1]]),
                    u16::from_le_bytes([c[2], c[3]]),
                )
            })
            .collect()
    }

    #[test]
    fn test_default_extent() {
        let encoder = VectorEncoder::default();
        assert_eq!(encoder.offset(), 5000);
        assert_eq!(encoder.extent(), 55535.0);
    }

    #[test]
    fn test_tile_centre_encodes_to_middle() {
        let points = index(&[(0, 0)]);
        let data = VectorEncoder::default()
            .encode(&points, &TileCoord::root())
            .unwrap()
            .unwrap();
        assert_eq!(data.len(), 4);

        let (x, y) = decode(&data)[0];
        assert!((x as i32 - 32768).abs() <= 1, "x = {}", x);
        assert!((y as i32 - 32768).abs() <= 1, "y = {}", y);
    }

    #[test]
    fn test_centre_of_deeper_tile() {
        let tile = TileCoord::new(5, 9, 4).unwrap();
        let bounds = tile.bounds();
        let (x, y) = VectorEncoder::default().quantize(
            &tile,
            (bounds.min_x + bounds.max_x) / 2.0,
            (bounds.min_y + bounds.max_y) / 2.0,
        );
        assert!((x as i32 - 32768).abs() <= 1);
        assert!((y as i32 - 32768).abs() <= 1);
    }

    #[test]
    fn test_corners_map_to_offsets() {
        let tile = TileCoord::new(1, 1, 2).unwrap();
        let b = tile.bounds();
        let encoder = VectorEncoder::default();
        assert_eq!(encoder.quantize(&tile, b.min_x, b.max_y), (5000, 5000));
        assert_eq!(encoder.quantize(&tile, b.max_x, b.min_y), (60535, 60535));
    }

    #[test]
    fn test_little_endian_layout() {
        let tile = TileCoord::root();
        let b = tile.bounds();
        let points = index(&[(b.max_x as i64, b.min_y as i64 + 1)]);
        let data = VectorEncoder::default().encode(&points, &tile).unwrap().unwrap();
        // x = 60535 = 0xEC77
        assert_eq!(&data[..2], &[0x77, 0xEC]);
    }

    #[test]
    fn test_one_pair_per_point() {
        let points = index(&[(0, 0), (1000, -1000), (-5000, 2500)]);
        let data = VectorEncoder::default()
            .encode(&points, &TileCoord::root())
            .unwrap()
            .unwrap();
        assert_eq!(data.len(), 12);
        let mut decoded = decode(&data);
        decoded.sort_unstable();
        assert_eq!(decoded.len(), 3);
    }

    #[test]
    fn test_empty_tile_is_none() {
        let points = index(&[]);
        assert!(VectorEncoder::default()
            .encode(&points, &TileCoord::root())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(VectorEncoder::new(40000, 5.0).is_err());
        assert!(VectorEncoder::new(5000, -1.0).is_err());
        assert!(VectorEncoder::new(5000, 5.0).is_ok());
    }

    #[test]
    fn test_padding_must_fit_inside_offset() {
        // 23 px is 4989 units of the default extent, 24 px is 5206.
        assert!(VectorEncoder::new(5000, 23.0).is_ok());
        assert!(matches!(
            VectorEncoder::new(5000, 24.0),
            Err(TileError::InvalidConfig(_))
        ));
        assert!(VectorEncoder::new(5000, 30.0).is_err());
        assert!(VectorEncoder::new(10000, 30.0).is_ok());
    }

    #[test]
    fn test_points_in_padding_stay_distinct() {
        let tile = TileCoord::new(1, 1, 2).unwrap();
        let bounds = tile.bounds();
        let px = tile.size() / TILE_PIXELS as f64;
        let y = ((bounds.min_y + bounds.max_y) / 2.0) as i64;
        let points = index(&[
            ((bounds.min_x - 25.0 * px) as i64, y),
            ((bounds.min_x - 28.0 * px) as i64, y),
        ]);

        let encoder = VectorEncoder::new(10000, 30.0).unwrap();
        let data = encoder.encode(&points, &tile).unwrap().unwrap();
        let mut xs: Vec<u16> = decode(&data).into_iter().map(|(x, _)| x).collect();
        xs.sort_unstable();

        assert_eq!(xs.len(), 2);
        assert!(xs[0] > 0, "xs = {:?}", xs);
        assert!(xs[0] < xs[1], "xs = {:?}", xs);
        assert!(xs[1] < encoder.offset());
    }

    #[test]
    fn test_format() {
        assert_eq!(VectorEncoder::default().format(), TileFormat::Vector);
    }
}
