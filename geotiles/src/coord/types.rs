//! Coordinate types: projected points, tile addresses and bounding boxes.

use thiserror::Error;

use super::{project, WORLD_HALF_EXTENT};

/// Deepest zoom level a tile address may use.
///
/// Keeps `2^z` and row flipping within `u32`.
pub const MAX_ZOOM: u8 = 24;

/// Errors from coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Projection produced a non-finite coordinate.
    #[error("projection of ({lon}, {lat}) is not finite")]
    NotFinite { lon: f64, lat: f64 },

    /// Tile address outside the grid of its zoom level.
    #[error("tile {x}/{y} is outside zoom level {z}")]
    InvalidTile { x: u32, y: u32, z: u8 },

    /// Zoom level above [`MAX_ZOOM`].
    #[error("zoom level {0} exceeds maximum {MAX_ZOOM}")]
    InvalidZoom(u8),
}

/// A point in Web Mercator meters, quantized to whole meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectedPoint {
    pub x: i64,
    pub y: i64,
    /// Entity (page) the point was derived from, if known.
    pub entity_id: Option<u64>,
}

impl ProjectedPoint {
    /// Create a point without an entity reference.
    pub fn new(x: i64, y: i64) -> Self {
        Self {
            x,
            y,
            entity_id: None,
        }
    }

    /// Attach the entity the point belongs to.
    pub fn with_entity(mut self, entity_id: u64) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    /// Project a geographic position and round to whole meters.
    ///
    /// # Errors
    ///
    /// Returns `CoordError::NotFinite` if the projection overflows, which
    /// cannot happen for positions accepted by the dump filters.
    pub fn from_lon_lat(lon: f64, lat: f64) -> Result<Self, CoordError> {
        let (x, y) = project(lon, lat);
        if !x.is_finite() || !y.is_finite() {
            return Err(CoordError::NotFinite { lon, lat });
        }
        Ok(Self::new(x.round() as i64, y.round() as i64))
    }
}

/// Axis-aligned box in Web Mercator meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Grow the box by `margin` meters on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether a point lies inside using the `min < v <= max` convention.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.min_x < x && x <= self.max_x && self.min_y < y && y <= self.max_y
    }
}

/// Address of a tile in the internal XYZ scheme (row 0 is the northern edge).
///
/// Tile databases store rows in the TMS scheme (row 0 is the southern edge);
/// use [`TileCoord::tms_row`] at the storage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    /// Create a tile address, validating it against the zoom level's grid.
    pub fn new(x: u32, y: u32, z: u8) -> Result<Self, CoordError> {
        if z > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(z));
        }
        let n = 1u32 << z;
        if x >= n || y >= n {
            return Err(CoordError::InvalidTile { x, y, z });
        }
        Ok(Self { x, y, z })
    }

    /// The single tile covering the world at zoom 0.
    pub fn root() -> Self {
        Self { x: 0, y: 0, z: 0 }
    }

    /// The four tiles covering this one at the next zoom level.
    pub fn children(&self) -> [TileCoord; 4] {
        let (x, y, z) = (self.x * 2, self.y * 2, self.z + 1);
        [
            TileCoord { x, y, z },
            TileCoord { x: x + 1, y, z },
            TileCoord { x, y: y + 1, z },
            TileCoord {
                x: x + 1,
                y: y + 1,
                z,
            },
        ]
    }

    /// Edge length of this tile in meters.
    pub fn size(&self) -> f64 {
        tile_size(self.z)
    }

    /// Extent of this tile in Web Mercator meters.
    pub fn bounds(&self) -> BBox {
        let size = self.size();
        let min_x = self.x as f64 * size - WORLD_HALF_EXTENT;
        let max_y = WORLD_HALF_EXTENT - self.y as f64 * size;
        BBox::new(min_x, max_y - size, min_x + size, max_y)
    }

    /// Row of this tile in the TMS scheme.
    pub fn tms_row(&self) -> u32 {
        flip_row(self.y, self.z)
    }

    /// Build an internal address from a TMS-scheme row.
    pub fn from_tms(x: u32, tms_row: u32, z: u8) -> Result<Self, CoordError> {
        let tile = Self::new(x, 0, z)?;
        if tms_row >= 1u32 << z {
            return Err(CoordError::InvalidTile { x, y: tms_row, z });
        }
        Ok(Self {
            y: flip_row(tms_row, z),
            ..tile
        })
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Edge length in meters of any tile at zoom `z`.
pub fn tile_size(z: u8) -> f64 {
    2.0 * WORLD_HALF_EXTENT / (1u64 << z) as f64
}

/// Convert a row between the XYZ and TMS schemes (the mapping is its own inverse).
fn flip_row(row: u32, z: u8) -> u32 {
    (1u32 << z) - 1 - row
}
