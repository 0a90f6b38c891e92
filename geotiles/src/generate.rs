//! End-to-end tile generation.
//!
//! A run has three phases:
//!
//! 1. **Pages** (optional) - read the page dump and keep the ids of JPEG
//!    file pages as an [`EntityFilter`].
//! 2. **Geotags** - read the geotag dump, project every usable coordinate
//!    and collect distinct positions into a [`PointIndex`].
//! 3. **Tiles** - walk the [`TilePyramid`] and hand every tile to a
//!    [`TileSink`].
//!
//! Dump reading is blocking and runs on the blocking thread pool. The sink
//! is created by the caller before the run starts, so an unusable output
//! path fails before any input is read.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use geotiles::config::GeneratorConfig;
//! use geotiles::generate::Generator;
//! use geotiles::sink::MbtilesSink;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = MbtilesSink::create(Path::new("geotags.mbtiles")).await?;
//! let summary = Generator::new(GeneratorConfig::default())
//!     .run(Path::new("geo_tags.sql.gz"), None, Box::new(sink))
//!     .await?;
//! println!("{} tiles", summary.tiles_written);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::coord::{unproject, CoordError, ProjectedPoint};
use crate::dump::{open_dump, DumpReader, GeoTag, PageRecord, ParseError};
use crate::points::{CollectStats, EntityFilter, PointCollector, PointIndex};
use crate::pyramid::{PyramidStats, TilePyramid};
use crate::sink::{SinkError, TileSink, TilesetMetadata};
use crate::tile::{Marker, RasterEncoder, TileError, TileRecord, VectorEncoder};

/// Rows between two progress callbacks.
const ROW_REPORT_INTERVAL: u64 = 10_000;

/// Errors that can end a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The dump could not be read or tokenized.
    #[error("Failed to read dump: {0}")]
    Parse(#[from] ParseError),

    /// A row did not match its table layout.
    #[error("Invalid row near line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: ParseError,
    },

    /// A coordinate could not be projected.
    #[error("Projection failed: {0}")]
    Coord(#[from] CoordError),

    /// A tile could not be encoded.
    #[error("Tile encoding failed: {0}")]
    Tile(#[from] TileError),

    /// The sink rejected a write.
    #[error("Failed to store tiles: {0}")]
    Sink(#[from] SinkError),

    /// A blocking reader task panicked or was cancelled.
    #[error("Reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Stage of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pages,
    GeoTags,
    Tiles,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Pages => write!(f, "pages"),
            Phase::GeoTags => write!(f, "geotags"),
            Phase::Tiles => write!(f, "tiles"),
        }
    }
}

/// Receives progress notifications during a run.
///
/// All methods have empty default implementations.
pub trait ProgressObserver: Send + Sync {
    /// A phase is starting.
    fn on_phase(&self, _phase: Phase) {}

    /// `rows` rows of the current dump have been read.
    fn on_rows(&self, _phase: Phase, _rows: u64) {}

    /// A tile was stored; `written` counts all tiles stored so far.
    fn on_tile(&self, _tile: &TileRecord, _written: u64) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateSummary {
    /// Qualifying entities, when a page dump was used.
    pub filter_size: Option<usize>,
    pub points: CollectStats,
    pub pyramid: PyramidStats,
    pub tiles_written: u64,
}

/// Read a page dump into the set of qualifying entity ids.
///
/// # Errors
///
/// Fails on the first unreadable line or malformed row.
pub fn load_filter<R: BufRead>(
    reader: &mut DumpReader<R>,
    observer: &dyn ProgressObserver,
) -> Result<EntityFilter, GenerateError> {
    let mut filter = EntityFilter::new();
    let mut rows = 0u64;

    while let Some(row) = reader.next() {
        let page = PageRecord::from_row(row?).map_err(|source| GenerateError::Record {
            line: reader.line_number(),
            source,
        })?;
        if page.is_qualifying() {
            filter.insert(page.id);
        }

        rows += 1;
        if rows % ROW_REPORT_INTERVAL == 0 {
            observer.on_rows(Phase::Pages, rows);
        }
    }
    observer.on_rows(Phase::Pages, rows);

    info!(rows, entities = filter.len(), "Loaded entity filter");
    if filter.is_empty() {
        warn!("Page dump has no qualifying entities; no points will be kept");
    }
    Ok(filter)
}

/// Read a geotag dump into `collector` and build the point index.
///
/// Rows without a usable coordinate are skipped.
///
/// # Errors
///
/// Fails on the first unreadable line or malformed row.
pub fn collect_points<R: BufRead>(
    reader: &mut DumpReader<R>,
    mut collector: PointCollector,
    observer: &dyn ProgressObserver,
) -> Result<PointIndex, GenerateError> {
    let mut rows = 0u64;
    let mut skipped = 0u64;

    while let Some(row) = reader.next() {
        let tag = GeoTag::from_row(row?).map_err(|source| GenerateError::Record {
            line: reader.line_number(),
            source,
        })?;

        match tag.position() {
            Some((lon, lat)) => {
                let point = ProjectedPoint::from_lon_lat(lon, lat)?.with_entity(tag.entity_id);
                collector.add(point);
            }
            None => skipped += 1,
        }

        rows += 1;
        if rows % ROW_REPORT_INTERVAL == 0 {
            observer.on_rows(Phase::GeoTags, rows);
        }
    }
    observer.on_rows(Phase::GeoTags, rows);

    info!(rows, skipped, points = collector.len(), "Read geotag dump");
    Ok(collector.finalize())
}

/// Build the raster and vector encoders described by `config`.
///
/// # Errors
///
/// Returns an error for a vector level above the maximum zoom or an
/// unusable vector offset.
pub fn build_pyramid(config: &GeneratorConfig) -> Result<TilePyramid, GenerateError> {
    let raster = RasterEncoder::new(Marker::new(config.marker_radius)?)
        .with_color(config.marker_color);
    let vector = VectorEncoder::new(config.vector_offset, config.marker_radius as f64)?;
    Ok(TilePyramid::new(
        Box::new(raster),
        Box::new(vector),
        config.vector_level,
    )?)
}

/// Encode every tile of the pyramid and store it in `sink`.
///
/// # Errors
///
/// Stops at the first encoding or storage failure.
pub async fn write_tiles(
    pyramid: &TilePyramid,
    points: &PointIndex,
    sink: &dyn TileSink,
    observer: &dyn ProgressObserver,
) -> Result<PyramidStats, GenerateError> {
    let mut tiles = pyramid.tiles(points);
    while let Some(tile) = tiles.next() {
        let tile = tile?;
        sink.write(&tile).await?;
        observer.on_tile(&tile, sink.tiles_written());
    }

    let stats = tiles.stats();
    info!(
        emitted = stats.emitted,
        pruned = stats.pruned,
        max_zoom = ?stats.max_zoom,
        "Wrote tile pyramid"
    );
    Ok(stats)
}

/// Geographic bounds `[west, south, east, north]` of the indexed points.
pub fn point_bounds(points: &PointIndex) -> Option<[f64; 4]> {
    let extent = points.extent()?;
    let (west, south) = unproject(extent.min_x, extent.min_y);
    let (east, north) = unproject(extent.max_x, extent.max_y);
    Some([west, south, east, north])
}

/// Runs the three phases with a fixed configuration.
pub struct Generator {
    config: GeneratorConfig,
    observer: Arc<dyn ProgressObserver>,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            observer: Arc::new(NoProgress),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the tileset for `geotags` into `sink`, optionally keeping
    /// only entities listed as JPEG file pages in `pages`.
    ///
    /// The sink is closed on success. On failure it is dropped without
    /// committing.
    ///
    /// # Errors
    ///
    /// Returns the first error of any phase.
    pub async fn run(
        &self,
        geotags: &Path,
        pages: Option<&Path>,
        sink: Box<dyn TileSink>,
    ) -> Result<GenerateSummary, GenerateError> {
        let pyramid = build_pyramid(&self.config)?;
        debug!(config = ?self.config, "Starting generation");

        let filter = match pages {
            Some(path) => {
                self.observer.on_phase(Phase::Pages);
                Some(self.read_filter(path.to_path_buf()).await?)
            }
            None => None,
        };
        let filter_size = filter.as_ref().map(EntityFilter::len);

        self.observer.on_phase(Phase::GeoTags);
        let points = self.read_points(geotags.to_path_buf(), filter).await?;

        self.observer.on_phase(Phase::Tiles);
        let stats = write_tiles(&pyramid, &points, sink.as_ref(), self.observer.as_ref()).await?;

        let mut metadata = TilesetMetadata::new(
            self.config.name.clone(),
            stats.max_zoom.unwrap_or(pyramid.vector_level()),
        )
        .with_description(self.config.description.clone());
        if let Some(bounds) = point_bounds(&points) {
            metadata = metadata.with_bounds(bounds);
        }
        sink.write_metadata(&metadata).await?;

        let tiles_written = sink.tiles_written();
        sink.close().await?;

        Ok(GenerateSummary {
            filter_size,
            points: points.stats(),
            pyramid: stats,
            tiles_written,
        })
    }

    async fn read_filter(&self, path: PathBuf) -> Result<EntityFilter, GenerateError> {
        let observer = Arc::clone(&self.observer);
        tokio::task::spawn_blocking(move || {
            info!(path = %path.display(), "Reading page dump");
            let mut reader = open_dump(&path)?;
            load_filter(&mut reader, observer.as_ref())
        })
        .await?
    }

    async fn read_points(
        &self,
        path: PathBuf,
        filter: Option<EntityFilter>,
    ) -> Result<PointIndex, GenerateError> {
        let observer = Arc::clone(&self.observer);
        tokio::task::spawn_blocking(move || {
            info!(path = %path.display(), "Reading geotag dump");
            let mut reader = open_dump(&path)?;
            let collector = match filter {
                Some(filter) => PointCollector::with_filter(filter),
                None => PointCollector::new(),
            };
            collect_points(&mut reader, collector, observer.as_ref())
        })
        .await?
    }
}
