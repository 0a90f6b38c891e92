//! Generator configuration.
//!
//! [`GeneratorConfig`] holds every tunable of a run with the defaults of the
//! published tilesets. An optional INI file ([`ConfigFile`]) overlays it,
//! and command-line flags are applied last.
//!
//! # Example
//!
//! ```
//! use geotiles::config::GeneratorConfig;
//!
//! let config = GeneratorConfig::default()
//!     .with_vector_level(9)
//!     .with_marker_radius(3);
//! assert_eq!(config.vector_level, 9);
//! assert_eq!(config.marker_color, [255, 0, 255]);
//! ```

mod file;

pub use file::{parse_color, ConfigFile, ConfigFileError};

use crate::tile::{DEFAULT_MARKER_COLOR, DEFAULT_OFFSET};

/// Default zoom level served as vector tiles.
pub const DEFAULT_VECTOR_LEVEL: u8 = 11;

/// Default marker radius in pixels.
pub const DEFAULT_MARKER_RADIUS: u32 = 5;

/// Default tileset name written to metadata.
pub const DEFAULT_NAME: &str = "geotags";

/// Settings for one generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Zoom level encoded as vector tiles; lower levels are rasters.
    pub vector_level: u8,
    /// Marker radius in pixels. Also the query padding of every tile.
    pub marker_radius: u32,
    /// RGB marker colour.
    pub marker_color: [u8; 3],
    /// Vector tile edge offset in u16 units.
    pub vector_offset: u16,
    pub name: String,
    pub description: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            vector_level: DEFAULT_VECTOR_LEVEL,
            marker_radius: DEFAULT_MARKER_RADIUS,
            marker_color: DEFAULT_MARKER_COLOR,
            vector_offset: DEFAULT_OFFSET,
            name: DEFAULT_NAME.to_string(),
            description: String::new(),
        }
    }
}

impl GeneratorConfig {
    pub fn with_vector_level(mut self, level: u8) -> Self {
        self.vector_level = level;
        self
    }

    pub fn with_marker_radius(mut self, radius: u32) -> Self {
        self.marker_radius = radius;
        self
    }

    pub fn with_marker_color(mut self, color: [u8; 3]) -> Self {
        self.marker_color = color;
        self
    }

    pub fn with_vector_offset(mut self, offset: u16) -> Self {
        self.vector_offset = offset;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
