//! Tile pyramid traversal.
//!
//! Walks the quadtree from the zoom 0 tile downwards with an explicit
//! worklist. Tiles below the vector level are rendered as rasters and, when
//! they show anything, their four children are queued. Tiles at the vector
//! level are encoded as vector tiles and never expanded.
//!
//! A tile that encodes to nothing is dropped together with its whole
//! subtree: the padded query box of a tile contains the padded boxes of all
//! its descendants, so no descendant can have points either.
//!
//! ```text
//!            0/0/0 ─── raster, non-empty → queue children
//!          ┌──┬──┬──┐
//!        1/0/0 ... 1/1/1 ── empty → pruned with all descendants
//!          │
//!         ...
//!     vector_level ─── vector tiles, leaves
//! ```

use tracing::debug;

use crate::coord::{CoordError, TileCoord, MAX_ZOOM};
use crate::points::PointIndex;
use crate::tile::{TileEncoder, TileError, TileRecord};

/// Counters for one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PyramidStats {
    /// Tiles popped from the worklist.
    pub visited: u64,
    /// Tiles handed out.
    pub emitted: u64,
    /// Empty tiles whose subtree was skipped.
    pub pruned: u64,
    /// Deepest zoom level emitted so far.
    pub max_zoom: Option<u8>,
}

/// Pyramid layout: which encoder serves which zoom levels.
pub struct TilePyramid {
    raster: Box<dyn TileEncoder>,
    vector: Box<dyn TileEncoder>,
    vector_level: u8,
}

impl TilePyramid {
    /// Create a pyramid with raster tiles on levels `0..vector_level` and
    /// vector tiles on `vector_level`.
    ///
    /// # Errors
    ///
    /// Returns `CoordError::InvalidZoom` if `vector_level` exceeds [`MAX_ZOOM`].
    pub fn new(
        raster: Box<dyn TileEncoder>,
        vector: Box<dyn TileEncoder>,
        vector_level: u8,
    ) -> Result<Self, CoordError> {
        if vector_level > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(vector_level));
        }
        Ok(Self {
            raster,
            vector,
            vector_level,
        })
    }

    pub fn vector_level(&self) -> u8 {
        self.vector_level
    }

    /// Iterate over every non-empty tile of the pyramid.
    ///
    /// Order is depth-first but otherwise unspecified; each tile appears at
    /// most once. The first encoding error ends the iteration.
    pub fn tiles<'a>(&'a self, points: &'a PointIndex) -> PyramidTiles<'a> {
        PyramidTiles {
            pyramid: self,
            points,
            worklist: vec![TileCoord::root()],
            stats: PyramidStats::default(),
        }
    }
}

/// Iterator over the tiles of a [`TilePyramid`].
pub struct PyramidTiles<'a> {
    pyramid: &'a TilePyramid,
    points: &'a PointIndex,
    worklist: Vec<TileCoord>,
    stats: PyramidStats,
}

impl PyramidTiles<'_> {
    pub fn stats(&self) -> PyramidStats {
        self.stats
    }

    /// Tiles queued but not yet visited.
    pub fn pending(&self) -> usize {
        self.worklist.len()
    }
}

impl Iterator for PyramidTiles<'_> {
    type Item = Result<TileRecord, TileError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(tile) = self.worklist.pop() {
            self.stats.visited += 1;

            let is_leaf = tile.z >= self.pyramid.vector_level;
            let encoder = if is_leaf {
                &self.pyramid.vector
            } else {
                &self.pyramid.raster
            };

            let data = match encoder.encode(self.points, &tile) {
                Ok(Some(data)) => data,
                Ok(None) => {
                    self.stats.pruned += 1;
                    continue;
                }
                Err(e) => {
                    self.worklist.clear();
                    return Some(Err(e));
                }
            };

            if !is_leaf {
                self.worklist.extend(tile.children());
            }
            if self.stats.max_zoom.map_or(true, |z| tile.z > z) {
                debug!(zoom = tile.z, "Reached zoom level");
                self.stats.max_zoom = Some(tile.z);
            }
            self.stats.emitted += 1;
            return Some(Ok(TileRecord::new(tile, encoder.format(), data)));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{BBox, ProjectedPoint, WORLD_HALF_EXTENT};
    use crate::points::PointCollector;
    use crate::tile::{padded_bounds, Marker, RasterEncoder, TileFormat, VectorEncoder};
    use std::collections::{BTreeMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn index(points: &[(i64, i64)]) -> PointIndex {
        let mut collector = PointCollector::new();
        for &(x, y) in points {
            collector.add(ProjectedPoint::new(x, y));
        }
        collector.finalize()
    }

    fn pyramid(vector_level: u8) -> TilePyramid {
        TilePyramid::new(
            Box::new(RasterEncoder::new(Marker::new(5).unwrap())),
            Box::new(VectorEncoder::default()),
            vector_level,
        )
        .unwrap()
    }

    fn collect(pyramid: &TilePyramid, points: &PointIndex) -> Vec<TileRecord> {
        pyramid
            .tiles(points)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn per_level(tiles: &[TileRecord]) -> BTreeMap<u8, usize> {
        let mut levels = BTreeMap::new();
        for tile in tiles {
            *levels.entry(tile.coord().z).or_default() += 1;
        }
        levels
    }

    /// A position that stays a third of a tile away from every edge at
    /// every zoom level.
    fn interior_point() -> (i64, i64) {
        let third = (WORLD_HALF_EXTENT / 3.0).round() as i64;
        (-third, -third)
    }

    #[test]
    fn test_empty_store_emits_nothing() {
        let points = index(&[]);
        let pyramid = pyramid(6);
        let mut tiles = pyramid.tiles(&points);
        assert!(tiles.next().is_none());
        assert_eq!(tiles.stats().visited, 1);
        assert_eq!(tiles.stats().pruned, 1);
    }

    #[test]
    fn test_single_point_emits_one_tile_per_level() {
        let points = index(&[interior_point()]);
        let tiles = collect(&pyramid(6), &points);

        assert_eq!(tiles.len(), 7);
        let levels = per_level(&tiles);
        assert_eq!(levels.len(), 7);
        assert!(levels.values().all(|&n| n == 1));

        for tile in &tiles {
            let expected = if tile.coord().z < 6 {
                TileFormat::Png
            } else {
                TileFormat::Vector
            };
            assert_eq!(tile.format(), expected);
        }
    }

    #[test]
    fn test_vector_level_zero_emits_single_vector_tile() {
        let points = index(&[interior_point()]);
        let tiles = collect(&pyramid(0), &points);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].format(), TileFormat::Vector);
        assert_eq!(tiles[0].data().len(), 4);
    }

    #[test]
    fn test_point_on_shared_corner_appears_in_all_neighbours() {
        // The world centre is a corner of four tiles on every level >= 1.
        let points = index(&[(0, 0)]);
        let tiles = collect(&pyramid(3), &points);

        let levels = per_level(&tiles);
        assert_eq!(levels.get(&0), Some(&1));
        assert_eq!(levels.get(&1), Some(&4));
        assert_eq!(levels.get(&2), Some(&4));
        assert_eq!(levels.get(&3), Some(&4));
    }

    #[test]
    fn test_each_tile_emitted_once() {
        let third = (WORLD_HALF_EXTENT / 3.0) as i64;
        let points = index(&[(0, 0), (third, third), (-third, third), (123_456, -7_654_321)]);
        let tiles = collect(&pyramid(5), &points);

        let unique: HashSet<TileCoord> = tiles.iter().map(|t| t.coord()).collect();
        assert_eq!(unique.len(), tiles.len());
    }

    #[test]
    fn test_every_emitted_tile_has_points_in_padded_bounds() {
        let third = (WORLD_HALF_EXTENT / 3.0) as i64;
        let points = index(&[(0, 0), (third, -third), (5_000_000, 5_000_000)]);
        for tile in collect(&pyramid(5), &points) {
            assert!(points.any_in_bbox(&padded_bounds(&tile.coord(), 5.0)));
        }
    }

    #[test]
    fn test_vector_tiles_cover_every_point() {
        let third = (WORLD_HALF_EXTENT / 3.0) as i64;
        let raw = [(0, 0), (third, -third), (5_000_000, 5_000_000), (-42, 17)];
        let points = index(&raw);
        let tiles = collect(&pyramid(4), &points);

        for &(x, y) in &raw {
            let covered = tiles.iter().any(|t| {
                t.format() == TileFormat::Vector
                    && t.coord().bounds().expand(1.0).contains(x as f64, y as f64)
            });
            assert!(covered, "point ({}, {}) has no vector tile", x, y);
        }
    }

    struct CountingEncoder {
        calls: Arc<AtomicUsize>,
        format: TileFormat,
    }

    impl TileEncoder for CountingEncoder {
        fn encode(
            &self,
            points: &PointIndex,
            tile: &TileCoord,
        ) -> Result<Option<Vec<u8>>, TileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let b = tile.bounds();
            Ok(points
                .any_in_bbox(&BBox::new(b.min_x, b.min_y, b.max_x, b.max_y))
                .then(|| vec![tile.z]))
        }

        fn format(&self) -> TileFormat {
            self.format
        }
    }

    #[test]
    fn test_empty_subtrees_are_not_visited() {
        let raster_calls = Arc::new(AtomicUsize::new(0));
        let vector_calls = Arc::new(AtomicUsize::new(0));
        let pyramid = TilePyramid::new(
            Box::new(CountingEncoder {
                calls: raster_calls.clone(),
                format: TileFormat::Png,
            }),
            Box::new(CountingEncoder {
                calls: vector_calls.clone(),
                format: TileFormat::Vector,
            }),
            8,
        )
        .unwrap();

        let points = index(&[interior_point()]);
        let tiles = collect(&pyramid, &points);

        assert_eq!(tiles.len(), 9);
        // One non-empty tile per raster level, each expanding into four.
        assert_eq!(raster_calls.load(Ordering::SeqCst), 1 + 4 * 7);
        assert_eq!(vector_calls.load(Ordering::SeqCst), 4);
    }

    struct FailingEncoder;

    impl TileEncoder for FailingEncoder {
        fn encode(&self, _: &PointIndex, _: &TileCoord) -> Result<Option<Vec<u8>>, TileError> {
            Err(TileError::InvalidConfig("boom".to_string()))
        }

        fn format(&self) -> TileFormat {
            TileFormat::Png
        }
    }

    #[test]
    fn test_error_ends_iteration() {
        let pyramid =
            TilePyramid::new(Box::new(FailingEncoder), Box::new(VectorEncoder::default()), 4)
                .unwrap();
        let points = index(&[(0, 0)]);
        let mut tiles = pyramid.tiles(&points);
        assert!(matches!(tiles.next(), Some(Err(TileError::InvalidConfig(_)))));
        assert!(tiles.next().is_none());
    }

    #[test]
    fn test_vector_level_above_max_zoom_rejected() {
        let result = TilePyramid::new(
            Box::new(RasterEncoder::new(Marker::new(5).unwrap())),
            Box::new(VectorEncoder::default()),
            MAX_ZOOM + 1,
        );
        assert!(matches!(result, Err(CoordError::InvalidZoom(_))));
    }

    #[test]
    fn test_worklist_stays_shallow() {
        let points = index(&[interior_point()]);
        let pyramid = pyramid(10);
        let mut tiles = pyramid.tiles(&points);
        let mut max_pending = 0;
        while let Some(tile) = tiles.next() {
            tile.unwrap();
            max_pending = max_pending.max(tiles.pending());
        }
        // Three siblings left behind per level plus the four newest children.
        assert!(max_pending <= 3 * 10 + 4, "pending = {}", max_pending);
    }
}
