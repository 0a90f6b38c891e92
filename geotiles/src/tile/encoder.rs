//! TileEncoder trait for abstracting tile encoding strategies.
//!
//! The pyramid generator asks one encoder for raster tiles below the
//! vector level and another for vector tiles at it. Both see the same point
//! index and the same tile address; they differ only in what bytes they
//! produce.
//!
//! # Example
//!
//! ```
//! use geotiles::coord::TileCoord;
//! use geotiles::points::PointCollector;
//! use geotiles::tile::{TileEncoder, VectorEncoder};
//!
//! let encoder = VectorEncoder::default();
//! let points = PointCollector::new().finalize();
//! let data = encoder.encode(&points, &TileCoord::root()).unwrap();
//! assert!(data.is_none(), "no points, no tile");
//! ```

use crate::coord::TileCoord;
use crate::points::PointIndex;
use crate::tile::{TileError, TileFormat};

/// Trait for tile encoding strategies.
///
/// Implementations must be thread-safe (`Send + Sync`) so a generator can
/// be shared across threads.
///
/// # Implementors
///
/// - [`RasterEncoder`](super::RasterEncoder) - PNG images with stamped markers
/// - [`VectorEncoder`](super::VectorEncoder) - quantized u16 point lists
pub trait TileEncoder: Send + Sync {
    /// Encode the points relevant to `tile`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no point falls in the tile's padded extent. Such a
    /// tile is not stored, and neither are its descendants.
    ///
    /// # Errors
    ///
    /// Returns `TileError` if the output format cannot be written.
    fn encode(&self, points: &PointIndex, tile: &TileCoord)
        -> Result<Option<Vec<u8>>, TileError>;

    /// Format of the bytes this encoder produces.
    fn format(&self) -> TileFormat;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::ProjectedPoint;
    use crate::points::PointCollector;
    use std::sync::Arc;

    /// Mock encoder for testing trait object behavior.
    struct MockEncoder {
        data: Vec<u8>,
        should_fail: bool,
    }

    impl TileEncoder for MockEncoder {
        fn encode(
            &self,
            points: &PointIndex,
            tile: &TileCoord,
        ) -> Result<Option<Vec<u8>>, TileError> {
            if self.should_fail {
                return Err(TileError::InvalidConfig("mock failure".to_string()));
            }
            Ok(points
                .any_in_bbox(&tile.bounds())
                .then(|| self.data.clone()))
        }

        fn format(&self) -> TileFormat {
            TileFormat::Vector
        }
    }

    #[test]
    fn test_trait_object_encode() {
        let encoder: Arc<dyn TileEncoder> = Arc::new(MockEncoder {
            data: vec![0xDE, 0xAD],
            should_fail: false,
        });
        let mut collector = PointCollector::new();
        collector.add(ProjectedPoint::new(100, 100));
        let points = collector.finalize();

        let result = encoder.encode(&points, &TileCoord::root()).unwrap();
        assert_eq!(result, Some(vec![0xDE, 0xAD]));
        assert_eq!(encoder.format(), TileFormat::Vector);
    }

    #[test]
    fn test_trait_object_encode_failure() {
        let encoder: Arc<dyn TileEncoder> = Arc::new(MockEncoder {
            data: vec![],
            should_fail: true,
        });
        let points = PointCollector::new().finalize();
        assert!(encoder.encode(&points, &TileCoord::root()).is_err());
    }

    #[test]
    fn test_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TileEncoder>();
    }
}
