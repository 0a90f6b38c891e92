//! Error types for tile encoding operations.

use thiserror::Error;

use crate::coord::TileCoord;

/// Errors that can occur during tile encoding.
#[derive(Debug, Error)]
pub enum TileError {
    /// Writing the image container failed.
    #[error("Encoding failed for tile {tile}: {source}")]
    EncodingFailed {
        tile: TileCoord,
        #[source]
        source: image::ImageError,
    },

    /// Encoder parameters are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_invalid_config_display() {
        let err = TileError::InvalidConfig("offset too large".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: offset too large");
    }

    #[test]
    fn test_encoding_failed_has_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = TileError::EncodingFailed {
            tile: TileCoord::root(),
            source: image::ImageError::IoError(io),
        };
        assert!(err.to_string().starts_with("Encoding failed for tile 0/0/0"));
        assert!(err.source().is_some());
    }
}
