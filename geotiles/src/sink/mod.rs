//! Tile persistence.
//!
//! A [`TileSink`] receives encoded tiles addressed in the internal XYZ
//! scheme and stores them under their TMS address. Two sinks exist:
//!
//! - [`MbtilesSink`] - a single SQLite file in the MBTiles layout
//! - [`DirectorySink`] - one file per tile, for inspection
//!
//! Writing a key twice keeps the later payload. Sinks refuse to open a
//! destination that already exists, and must be closed exactly once;
//! `close` consumes the sink.
//!
//! # Dyn Compatibility
//!
//! Async methods return `Pin<Box<dyn Future>>` so the generator can hold a
//! `Box<dyn TileSink>` chosen at runtime.

mod directory;
mod mbtiles;

pub use directory::{DirectorySink, METADATA_FILE};
pub use mbtiles::MbtilesSink;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::Serialize;
use thiserror::Error;

use crate::tile::TileRecord;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur while persisting tiles.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The destination path is already taken.
    #[error("Destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Metadata could not be serialized.
    #[error("Metadata serialization failed: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Descriptive information about a generated tileset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TilesetMetadata {
    pub name: String,
    pub description: String,
    /// Format of the raster levels.
    pub format: String,
    pub minzoom: u8,
    pub maxzoom: u8,
    /// `[west, south, east, north]` in degrees, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[f64; 4]>,
}

impl TilesetMetadata {
    pub fn new(name: impl Into<String>, maxzoom: u8) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            format: "png".to_string(),
            minzoom: 0,
            maxzoom,
            bounds: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_bounds(mut self, bounds: [f64; 4]) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Name/value rows in the MBTiles `metadata` table layout.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("name", self.name.clone()),
            ("type", "overlay".to_string()),
            ("version", "1".to_string()),
            ("description", self.description.clone()),
            ("format", self.format.clone()),
            ("minzoom", self.minzoom.to_string()),
            ("maxzoom", self.maxzoom.to_string()),
        ];
        if let Some([west, south, east, north]) = self.bounds {
            pairs.push(("bounds", format!("{},{},{},{}", west, south, east, north)));
        }
        pairs
    }
}

/// Destination for encoded tiles.
///
/// Implementations must be `Send + Sync`; concurrent writers are serialized
/// by the sink itself.
pub trait TileSink: Send + Sync {
    /// Store a tile, replacing any tile previously stored at its address.
    ///
    /// # Errors
    ///
    /// Returns `SinkError` if the underlying storage fails or the sink was
    /// closed.
    fn write<'a>(&'a self, tile: &'a TileRecord) -> BoxFuture<'a, Result<(), SinkError>>;

    /// Store tileset metadata, replacing existing values.
    fn write_metadata<'a>(
        &'a self,
        metadata: &'a TilesetMetadata,
    ) -> BoxFuture<'a, Result<(), SinkError>>;

    /// Number of tiles written so far.
    fn tiles_written(&self) -> u64;

    /// Flush everything and release the destination.
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), SinkError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_pairs() {
        let metadata = TilesetMetadata::new("commons", 11)
            .with_description("Geotagged images")
            .with_bounds([-10.5, -20.0, 30.0, 40.25]);
        let pairs = metadata.to_pairs();

        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("name"), Some("commons"));
        assert_eq!(get("format"), Some("png"));
        assert_eq!(get("minzoom"), Some("0"));
        assert_eq!(get("maxzoom"), Some("11"));
        assert_eq!(get("bounds"), Some("-10.5,-20,30,40.25"));
    }

    #[test]
    fn test_metadata_without_bounds() {
        let pairs = TilesetMetadata::new("x", 3).to_pairs();
        assert!(pairs.iter().all(|(k, _)| *k != "bounds"));
    }

    #[test]
    fn test_sink_error_display() {
        let err = SinkError::AlreadyExists(PathBuf::from("/tmp/out.mbtiles"));
        assert_eq!(err.to_string(), "Destination already exists: /tmp/out.mbtiles");
    }

    #[test]
    fn test_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TileSink>();
    }
}
