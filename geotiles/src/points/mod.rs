//! Spatial point storage.
//!
//! Points go through two phases, modelled as two types:
//!
//! 1. [`PointCollector`] accepts points, dropping duplicates and (optionally)
//!    points whose entity is not in an [`EntityFilter`].
//! 2. [`PointIndex`], produced by [`PointCollector::finalize`], is read-only
//!    and answers bounding-box queries from an R-tree.
//!
//! Because the filter is handed to the collector at construction, it is
//! always complete before the first point arrives, and because finalizing
//! consumes the collector, no point can be added after queries begin.

use std::collections::HashSet;

use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use crate::coord::{BBox, ProjectedPoint};

/// Set of entity ids whose points take part in tile generation.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    ids: HashSet<u64>,
}

impl EntityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity_id: u64) -> bool {
        self.ids.insert(entity_id)
    }

    pub fn contains(&self, entity_id: u64) -> bool {
        self.ids.contains(&entity_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<u64> for EntityFilter {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Counters describing what happened to the points offered to a collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Points stored.
    pub accepted: u64,
    /// Points at an already stored position.
    pub duplicates: u64,
    /// Points rejected by the entity filter.
    pub filtered: u64,
}

/// Append-only point accumulator.
#[derive(Debug, Default)]
pub struct PointCollector {
    filter: Option<EntityFilter>,
    seen: HashSet<(i64, i64)>,
    points: Vec<ProjectedPoint>,
    stats: CollectStats,
}

impl PointCollector {
    /// Create a collector that accepts every distinct position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collector that only accepts points of the given entities.
    ///
    /// Points without an entity id are rejected.
    pub fn with_filter(filter: EntityFilter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    /// Offer a point to the collector.
    ///
    /// Returns `true` if the point was stored, `false` if it duplicates a
    /// stored position or is excluded by the filter.
    pub fn add(&mut self, point: ProjectedPoint) -> bool {
        if let Some(filter) = &self.filter {
            if !point.entity_id.is_some_and(|id| filter.contains(id)) {
                self.stats.filtered += 1;
                return false;
            }
        }

        if !self.seen.insert((point.x, point.y)) {
            self.stats.duplicates += 1;
            return false;
        }

        self.points.push(point);
        self.stats.accepted += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn stats(&self) -> CollectStats {
        self.stats
    }

    /// Seal the collector and build the spatial index.
    pub fn finalize(self) -> PointIndex {
        let Self { points, stats, .. } = self;
        info!(
            points = stats.accepted,
            duplicates = stats.duplicates,
            filtered = stats.filtered,
            "Building point index"
        );
        PointIndex {
            tree: RTree::bulk_load(points),
            stats,
        }
    }
}

impl RTreeObject for ProjectedPoint {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

/// Read-only point set answering bounding-box queries.
#[derive(Debug)]
pub struct PointIndex {
    tree: RTree<ProjectedPoint>,
    stats: CollectStats,
}

impl PointIndex {
    /// All points with `min_x < x <= max_x` and `min_y < y <= max_y`.
    ///
    /// The half-open convention means a point on an edge shared by two
    /// adjacent boxes belongs to exactly one of them.
    pub fn query_bbox<'a>(&'a self, bbox: &BBox) -> impl Iterator<Item = &'a ProjectedPoint> + 'a {
        integer_envelope(bbox)
            .into_iter()
            .flat_map(move |envelope| self.tree.locate_in_envelope(&envelope))
    }

    /// Whether any point falls in the box.
    pub fn any_in_bbox(&self, bbox: &BBox) -> bool {
        self.query_bbox(bbox).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Counters gathered while collecting.
    pub fn stats(&self) -> CollectStats {
        self.stats
    }

    /// Smallest box containing every point, or `None` when empty.
    pub fn extent(&self) -> Option<BBox> {
        if self.is_empty() {
            return None;
        }
        let envelope = self.tree.root().envelope();
        let [min_x, min_y] = envelope.lower();
        let [max_x, max_y] = envelope.upper();
        Some(BBox::new(
            min_x as f64,
            min_y as f64,
            max_x as f64,
            max_y as f64,
        ))
    }
}

/// Inclusive integer envelope equivalent to the half-open float box.
///
/// For integer `v`: `min < v` iff `v >= floor(min) + 1`, and `v <= max`
/// iff `v <= floor(max)`.
fn integer_envelope(bbox: &BBox) -> Option<AABB<[i64; 2]>> {
    let lower = [bbox.min_x.floor() as i64 + 1, bbox.min_y.floor() as i64 + 1];
    let upper = [bbox.max_x.floor() as i64, bbox.max_y.floor() as i64];
    (lower[0] <= upper[0] && lower[1] <= upper[1]).then(|| AABB::from_corners(lower, upper))
}
