//! One-file-per-tile sink.
//!
//! Files are named `{zoom}_{tms_row}_{column}.{ext}` directly inside the
//! output directory, so a tile can be looked up without opening a database.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use super::{BoxFuture, SinkError, TileSink, TilesetMetadata};
use crate::tile::TileRecord;

/// Name of the metadata document inside the output directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Writes each tile to its own file.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    written: AtomicU64,
}

impl DirectorySink {
    /// Create the output directory.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::AlreadyExists` if `path` exists.
    pub async fn create(path: &Path) -> Result<Self, SinkError> {
        if path.exists() {
            return Err(SinkError::AlreadyExists(path.to_path_buf()));
        }
        tokio::fs::create_dir_all(path).await?;
        info!(path = %path.display(), "Created tile directory");

        Ok(Self {
            root: path.to_path_buf(),
            written: AtomicU64::new(0),
        })
    }

    /// Path a tile is stored at.
    pub fn tile_path(&self, tile: &TileRecord) -> PathBuf {
        let coord = tile.coord();
        self.root.join(format!(
            "{}_{}_{}.{}",
            coord.z,
            coord.tms_row(),
            coord.x,
            tile.format().extension()
        ))
    }
}

impl TileSink for DirectorySink {
    fn write<'a>(&'a self, tile: &'a TileRecord) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            tokio::fs::write(self.tile_path(tile), tile.data()).await?;
            self.written.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }

    fn write_metadata<'a>(
        &'a self,
        metadata: &'a TilesetMetadata,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            let json = serde_json::to_vec_pretty(metadata)?;
            tokio::fs::write(self.root.join(METADATA_FILE), json).await?;
            debug!(name = %metadata.name, "Wrote tileset metadata");
            Ok(())
        })
    }

    fn tiles_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), SinkError>> {
        Box::pin(async move {
            info!(
                path = %self.root.display(),
                tiles = self.tiles_written(),
                "Closed tile directory"
            );
            Ok(())
        })
    }
}
