//! PNG tiles with a marker stamped at every point.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Rgba, RgbaImage};
use tracing::trace;

use super::{padded_bounds, Marker, TileEncoder, TileError, TileFormat, TILE_PIXELS};
use crate::coord::TileCoord;
use crate::points::PointIndex;

/// Default marker colour (magenta).
pub const DEFAULT_MARKER_COLOR: [u8; 3] = [255, 0, 255];

/// Renders 256×256 RGBA PNG tiles.
///
/// The marker's coverage becomes the alpha channel; every pixel carries the
/// marker colour.
#[derive(Debug, Clone)]
pub struct RasterEncoder {
    marker: Marker,
    color: [u8; 3],
}

impl RasterEncoder {
    pub fn new(marker: Marker) -> Self {
        Self {
            marker,
            color: DEFAULT_MARKER_COLOR,
        }
    }

    /// Set the RGB marker colour.
    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    /// Draw the coverage canvas for a tile.
    ///
    /// Returns `None` when no point lies in the padded extent.
    pub fn draw(&self, points: &PointIndex, tile: &TileCoord) -> Option<GrayImage> {
        let bounds = tile.bounds();
        let scale = TILE_PIXELS as f64 / tile.size();
        let query = padded_bounds(tile, self.marker.radius() as f64);

        let mut canvas = GrayImage::new(TILE_PIXELS, TILE_PIXELS);
        let mut matched = 0usize;
        for point in points.query_bbox(&query) {
            matched += 1;
            let px = ((point.x as f64 - bounds.min_x) * scale).floor() as i64;
            let py = ((bounds.max_y - point.y as f64) * scale).floor() as i64;
            self.marker.stamp(&mut canvas, px, py);
        }

        trace!(tile = %tile, points = matched, "Drew raster tile");
        (matched > 0).then_some(canvas)
    }
}

impl TileEncoder for RasterEncoder {
    fn encode(
        &self,
        points: &PointIndex,
        tile: &TileCoord,
    ) -> Result<Option<Vec<u8>>, TileError> {
        let Some(canvas) = self.draw(points, tile) else {
            return Ok(None);
        };

        let [r, g, b] = self.color;
        let image = RgbaImage::from_fn(TILE_PIXELS, TILE_PIXELS, |x, y| {
            Rgba([r, g, b, canvas.get_pixel(x, y)[0]])
        });

        let mut data = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .map_err(|source| TileError::EncodingFailed {
                tile: *tile,
                source,
            })?;
        Ok(Some(data))
    }

    fn format(&self) -> TileFormat {
        TileFormat::Png
    }
}
