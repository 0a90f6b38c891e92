//! Tile encoding.
//!
//! Turns the points relevant to one tile into the bytes stored for it:
//!
//! - [`RasterEncoder`] stamps a precomputed [`Marker`] per point into a
//!   256×256 canvas and writes a PNG.
//! - [`VectorEncoder`] writes quantized point coordinates.
//!
//! Both query the point index over the tile's extent padded by a number
//! of pixels (the marker radius), so markers centred just outside a tile
//! still show on it. The same padding keeps pruning sound: a point that
//! shows on a tile also falls inside the padded extent of its parent.

mod encoder;
mod error;
mod marker;
mod raster;
mod record;
mod vector;

pub use encoder::TileEncoder;
pub use error::TileError;
pub use marker::{Marker, MAX_MARKER_RADIUS, SUPERSAMPLING};
pub use raster::{RasterEncoder, DEFAULT_MARKER_COLOR};
pub use record::{TileFormat, TileRecord};
pub use vector::{VectorEncoder, DEFAULT_OFFSET, DEFAULT_PADDING_PX};

use crate::coord::{BBox, TileCoord};

/// Edge length of a raster tile in pixels.
pub const TILE_PIXELS: u32 = 256;

/// Extent of `tile` grown by `padding_px` pixels of its own resolution.
pub fn padded_bounds(tile: &TileCoord, padding_px: f64) -> BBox {
    let margin = tile.size() / TILE_PIXELS as f64 * padding_px;
    tile.bounds().expand(margin)
}
