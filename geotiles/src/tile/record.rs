//! Encoded tiles on their way to a sink.

use crate::coord::TileCoord;

/// Payload format of an encoded tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFormat {
    /// RGBA PNG image.
    Png,
    /// Little-endian u16 coordinate pairs.
    Vector,
}

impl TileFormat {
    /// File extension used by directory sinks.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Vector => "bin",
        }
    }
}

impl std::fmt::Display for TileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileFormat::Png => write!(f, "png"),
            TileFormat::Vector => write!(f, "vector"),
        }
    }
}

/// An encoded tile addressed in the internal XYZ scheme.
///
/// Records are produced by the pyramid generator and consumed by a sink
/// immediately; nothing keeps them around.
///
/// # Example
///
/// ```
/// use geotiles::coord::TileCoord;
/// use geotiles::tile::{TileFormat, TileRecord};
///
/// let record = TileRecord::new(TileCoord::root(), TileFormat::Png, vec![1, 2, 3]);
/// assert_eq!(record.coord().z, 0);
/// assert_eq!(record.data(), &[1, 2, 3]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    coord: TileCoord,
    format: TileFormat,
    data: Vec<u8>,
}

impl TileRecord {
    pub fn new(coord: TileCoord, format: TileFormat, data: Vec<u8>) -> Self {
        Self {
            coord,
            format,
            data,
        }
    }

    /// Tile address (XYZ scheme).
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn format(&self) -> TileFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
