//! Anti-aliased circular point marker.
//!
//! The marker is a grayscale coverage mask built once per run by drawing a
//! hard-edged disc on a supersampled canvas and downscaling it. Renderers
//! borrow it immutably; nothing about it changes after construction.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

use super::TileError;

/// Linear supersampling factor used when drawing the disc.
pub const SUPERSAMPLING: u32 = 4;

/// Largest accepted marker radius in pixels.
pub const MAX_MARKER_RADIUS: u32 = 64;

/// Coverage mask of a filled circle, `2 * radius + 1` pixels square.
#[derive(Debug, Clone)]
pub struct Marker {
    radius: u32,
    mask: GrayImage,
}

impl Marker {
    /// Build the marker for a circle of `radius` pixels around its centre pixel.
    ///
    /// # Errors
    ///
    /// Returns `TileError::InvalidConfig` if `radius` exceeds
    /// [`MAX_MARKER_RADIUS`].
    pub fn new(radius: u32) -> Result<Self, TileError> {
        if radius > MAX_MARKER_RADIUS {
            return Err(TileError::InvalidConfig(format!(
                "marker radius {} px exceeds {}",
                radius, MAX_MARKER_RADIUS
            )));
        }

        let side = 2 * radius + 1;
        let big_side = side * SUPERSAMPLING;
        let centre = big_side as f64 / 2.0;
        // Diameter 2r; a zero radius still covers the centre pixel.
        let big_radius = (radius * SUPERSAMPLING).max(SUPERSAMPLING / 2) as f64;

        let disc = GrayImage::from_fn(big_side, big_side, |x, y| {
            let dx = x as f64 + 0.5 - centre;
            let dy = y as f64 + 0.5 - centre;
            if dx * dx + dy * dy <= big_radius * big_radius {
                Luma([255])
            } else {
                Luma([0])
            }
        });

        Ok(Self {
            radius,
            mask: imageops::resize(&disc, side, side, FilterType::Lanczos3),
        })
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Edge length of the mask in pixels.
    pub fn side(&self) -> u32 {
        self.mask.width()
    }

    /// Coverage (0-255) at a mask pixel.
    pub fn coverage(&self, x: u32, y: u32) -> u8 {
        self.mask.get_pixel(x, y)[0]
    }

    /// Composite the marker onto `canvas` centred on pixel `(cx, cy)`.
    ///
    /// Parts of the marker outside the canvas are dropped. Each covered pixel
    /// moves towards full intensity in proportion to the coverage.
    pub fn stamp(&self, canvas: &mut GrayImage, cx: i64, cy: i64) {
        let (width, height) = (canvas.width() as i64, canvas.height() as i64);
        let r = self.radius as i64;

        for (mx, my, coverage) in self.mask.enumerate_pixels() {
            let x = cx - r + mx as i64;
            let y = cy - r + my as i64;
            if x < 0 || y < 0 || x >= width || y >= height {
                continue;
            }

            let m = coverage[0] as u32;
            if m == 0 {
                continue;
            }
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            let c = pixel[0] as u32;
            pixel[0] = (c + ((255 - c) * m + 127) / 255) as u8;
        }
    }
}
