//! MBTiles (SQLite) sink.
//!
//! All tiles are written inside one transaction that is committed on
//! [`close`](TileSink::close). The database is tuned for bulk loading:
//! no rollback journal and no fsync. A crash mid-run leaves an unusable
//! file, which is acceptable for a regenerable artifact.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{BoxFuture, SinkError, TileSink, TilesetMetadata};
use crate::tile::TileRecord;

const BUSY_TIMEOUT: Duration = Duration::from_millis(10_000);

const CREATE_TILES: &str = "CREATE TABLE IF NOT EXISTS tiles (\
    zoom_level INTEGER NOT NULL, \
    tile_column INTEGER NOT NULL, \
    tile_row INTEGER NOT NULL, \
    tile_data BLOB NOT NULL, \
    UNIQUE (zoom_level, tile_column, tile_row) ON CONFLICT REPLACE)";

const CREATE_METADATA: &str = "CREATE TABLE IF NOT EXISTS metadata (\
    name TEXT NOT NULL, \
    value TEXT, \
    UNIQUE (name) ON CONFLICT REPLACE)";

const INSERT_TILE: &str =
    "INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?, ?, ?, ?)";

const INSERT_METADATA: &str = "INSERT INTO metadata (name, value) VALUES (?, ?)";

/// Writes tiles into a new MBTiles file.
pub struct MbtilesSink {
    path: PathBuf,
    pool: SqlitePool,
    tx: Mutex<Transaction<'static, Sqlite>>,
    written: AtomicU64,
}

impl MbtilesSink {
    /// Create the database at `path` and open the write transaction.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::AlreadyExists` if anything exists at `path`,
    /// or `SinkError::Database` if SQLite fails.
    pub async fn create(path: &Path) -> Result<Self, SinkError> {
        if path.exists() {
            return Err(SinkError::AlreadyExists(path.to_path_buf()));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Off)
            .synchronous(SqliteSynchronous::Off)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TILES).execute(&pool).await?;
        sqlx::query(CREATE_METADATA).execute(&pool).await?;

        let tx = pool.begin().await?;
        info!(path = %path.display(), "Created MBTiles database");

        Ok(Self {
            path: path.to_path_buf(),
            pool,
            tx: Mutex::new(tx),
            written: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TileSink for MbtilesSink {
    fn write<'a>(&'a self, tile: &'a TileRecord) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            let coord = tile.coord();
            let mut tx = self.tx.lock().await;

            sqlx::query(INSERT_TILE)
                .bind(coord.z as i64)
                .bind(coord.x as i64)
                .bind(coord.tms_row() as i64)
                .bind(tile.data())
                .execute(&mut **tx)
                .await?;

            self.written.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }

    fn write_metadata<'a>(
        &'a self,
        metadata: &'a TilesetMetadata,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            let mut tx = self.tx.lock().await;

            for (name, value) in metadata.to_pairs() {
                sqlx::query(INSERT_METADATA)
                    .bind(name)
                    .bind(value)
                    .execute(&mut **tx)
                    .await?;
            }
            debug!(name = %metadata.name, "Wrote tileset metadata");
            Ok(())
        })
    }

    fn tiles_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), SinkError>> {
        Box::pin(async move {
            let Self {
                path,
                pool,
                tx,
                written,
            } = *self;

            tx.into_inner().commit().await?;
            pool.close().await;

            info!(
                path = %path.display(),
                tiles = written.into_inner(),
                "Committed MBTiles database"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use crate::tile::TileFormat;
    use tempfile::TempDir;

    type TileRow = (i64, i64, i64, Vec<u8>);

    async fn read_tiles(path: &Path) -> Vec<TileRow> {
        let pool = SqlitePool::connect_with(SqliteConnectOptions::new().filename(path))
            .await
            .unwrap();
        let rows = sqlx::query_as::<_, TileRow>(
            "SELECT zoom_level, tile_column, tile_row, tile_data FROM tiles \
             ORDER BY zoom_level, tile_column, tile_row",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        pool.close().await;
        rows
    }

    fn record(x: u32, y: u32, z: u8, data: &[u8]) -> TileRecord {
        TileRecord::new(TileCoord::new(x, y, z).unwrap(), TileFormat::Png, data.to_vec())
    }

    #[tokio::test]
    async fn test_refuses_existing_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mbtiles");
        std::fs::write(&path, b"taken").unwrap();

        let result = MbtilesSink::create(&path).await;
        assert!(matches!(result, Err(SinkError::AlreadyExists(_))));
        assert_eq!(std::fs::read(&path).unwrap(), b"taken");
    }

    #[tokio::test]
    async fn test_rows_are_stored_in_tms_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mbtiles");

        let sink = MbtilesSink::create(&path).await.unwrap();
        sink.write(&record(0, 0, 0, b"root")).await.unwrap();
        sink.write(&record(1, 0, 2, b"north")).await.unwrap();
        assert_eq!(sink.tiles_written(), 2);
        Box::new(sink).close().await.unwrap();

        let rows = read_tiles(&path).await;
        assert_eq!(
            rows,
            vec![(0, 0, 0, b"root".to_vec()), (2, 1, 3, b"north".to_vec())]
        );
    }

    #[tokio::test]
    async fn test_rewrite_keeps_later_payload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mbtiles");

        let sink = MbtilesSink::create(&path).await.unwrap();
        sink.write(&record(3, 5, 4, b"first")).await.unwrap();
        sink.write(&record(3, 5, 4, b"second")).await.unwrap();
        Box::new(sink).close().await.unwrap();

        let rows = read_tiles(&path).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].3, b"second".to_vec());
    }

    #[tokio::test]
    async fn test_metadata_is_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mbtiles");

        let sink = MbtilesSink::create(&path).await.unwrap();
        let metadata = TilesetMetadata::new("commons", 11).with_description("test");
        sink.write_metadata(&metadata).await.unwrap();
        Box::new(sink).close().await.unwrap();

        let pool = SqlitePool::connect_with(SqliteConnectOptions::new().filename(&path))
            .await
            .unwrap();
        let (value,): (String,) =
            sqlx::query_as("SELECT value FROM metadata WHERE name = 'maxzoom'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(value, "11");
        pool.close().await;
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mbtiles");

        let sink = std::sync::Arc::new(MbtilesSink::create(&path).await.unwrap());
        let mut handles = Vec::new();
        for x in 0..8u32 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                sink.write(&record(x, 0, 3, &[x as u8])).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let sink = std::sync::Arc::try_unwrap(sink).ok().unwrap();
        Box::new(sink).close().await.unwrap();
        assert_eq!(read_tiles(&path).await.len(), 8);
    }
}
