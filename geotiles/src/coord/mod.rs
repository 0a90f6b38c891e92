//! Coordinate conversion module
//!
//! Projects geographic coordinates (longitude/latitude, WGS84 degrees) to
//! spherical Web Mercator meters (EPSG:3857) and maps tiles of the quadtree
//! pyramid to their extents in that plane.

mod types;

pub use types::{tile_size, BBox, CoordError, ProjectedPoint, TileCoord, MAX_ZOOM};

use std::f64::consts::PI;

/// Sphere radius used by Web Mercator, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the edge length of the projected world square, in meters.
pub const WORLD_HALF_EXTENT: f64 = 20_037_508.342_789_244;

/// Project geographic coordinates to Web Mercator meters.
///
/// # Arguments
///
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `lat` - Latitude in degrees (about -85.06 to 85.06)
///
/// # Returns
///
/// The `(x, y)` pair in meters, with y increasing northward.
#[inline]
pub fn project(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Inverse of [`project`]: Web Mercator meters to `(lon, lat)` degrees.
pub fn unproject(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}
