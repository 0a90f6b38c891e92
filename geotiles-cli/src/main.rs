//! geotiles CLI - Command-line interface
//!
//! Renders a geotag dump into an MBTiles database (or a tile directory).

mod error;
mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use geotiles::config::{parse_color, ConfigFile, GeneratorConfig};
use geotiles::generate::{GenerateSummary, Generator};
use geotiles::logging;
use geotiles::sink::{DirectorySink, MbtilesSink, TileSink};
use geotiles::tile::MAX_MARKER_RADIUS;
use tracing::info;

use crate::error::CliError;
use crate::progress::SpinnerProgress;

#[derive(Debug, Parser)]
#[command(name = "geotiles")]
#[command(about = "Render geotag dumps into tile pyramids", long_about = None)]
struct Args {
    /// Geotag table dump (.sql or .sql.gz)
    #[arg(value_name = "GEOTAG_DUMP")]
    geotags: PathBuf,

    /// Optional page table dump restricting points to JPEG file pages,
    /// followed by the output path
    #[arg(value_name = "[PAGE_DUMP] OUTPUT", num_args = 1..=2, required = true)]
    paths: Vec<PathBuf>,

    /// INI configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Zoom level written as vector tiles (default: 11)
    #[arg(long, value_name = "N")]
    vector_level: Option<u8>,

    /// Marker radius in pixels (default: 5)
    #[arg(long, value_name = "PX")]
    marker_radius: Option<u32>,

    /// Marker colour as six hex digits (default: ff00ff)
    #[arg(long, value_name = "RRGGBB")]
    marker_color: Option<String>,

    /// Write a directory of tile files instead of an MBTiles database
    #[arg(long)]
    directory: bool,

    /// Tileset name written to metadata
    #[arg(long)]
    name: Option<String>,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// `(page_dump, output)`
    fn page_dump_and_output(&self) -> Result<(Option<&Path>, &Path), CliError> {
        match self.paths.as_slice() {
            [pages, output] => Ok((Some(pages.as_path()), output.as_path())),
            [output] => Ok((None, output.as_path())),
            _ => Err(CliError::Usage(
                "Expected GEOTAG_DUMP [PAGE_DUMP] OUTPUT".to_string(),
            )),
        }
    }

    /// Defaults, overlaid by the config file, overlaid by flags.
    fn to_config(&self) -> Result<GeneratorConfig, CliError> {
        let mut config = GeneratorConfig::default();
        if let Some(path) = &self.config {
            config = ConfigFile::load_from(path)?.apply(config);
        }

        if let Some(level) = self.vector_level {
            config = config.with_vector_level(level);
        }
        if let Some(radius) = self.marker_radius {
            if radius > MAX_MARKER_RADIUS {
                return Err(CliError::Usage(format!(
                    "Invalid marker radius {}: must be at most {}",
                    radius, MAX_MARKER_RADIUS
                )));
            }
            config = config.with_marker_radius(radius);
        }
        if let Some(color) = &self.marker_color {
            let rgb = parse_color(color).ok_or_else(|| {
                CliError::Usage(format!(
                    "Invalid marker colour '{}': expected six hex digits like 'ff00ff'",
                    color
                ))
            })?;
            config = config.with_marker_color(rgb);
        }
        if let Some(name) = &self.name {
            config = config.with_name(name.clone());
        }
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();

    let _guard = match logging::init_logging(args.verbose, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e).exit(),
    };

    if let Err(e) = run(args) {
        e.exit();
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = args.to_config()?;
    let (pages, output) = args.page_dump_and_output()?;

    check_paths(&args.geotags, pages, output)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let progress = Arc::new(SpinnerProgress::new());
    let generator = Generator::new(config).with_observer(progress.clone());

    let summary = runtime.block_on(async {
        let sink: Box<dyn TileSink> = if args.directory {
            Box::new(DirectorySink::create(output).await?)
        } else {
            Box::new(MbtilesSink::create(output).await?)
        };
        let summary = generator.run(&args.geotags, pages, sink).await?;
        Ok::<_, CliError>(summary)
    })?;

    progress.finish(format!("{} tiles written", summary.tiles_written));
    report(&summary, output);
    Ok(())
}

/// Fail before any parsing if the inputs are missing or the output is taken.
fn check_paths(geotags: &Path, pages: Option<&Path>, output: &Path) -> Result<(), CliError> {
    if output.exists() {
        return Err(CliError::OutputExists(output.to_path_buf()));
    }
    for input in std::iter::once(geotags).chain(pages) {
        if !input.is_file() {
            return Err(CliError::InputMissing(input.to_path_buf()));
        }
    }
    Ok(())
}

fn report(summary: &GenerateSummary, output: &Path) {
    if let Some(entities) = summary.filter_size {
        info!(entities, "Qualifying entities");
    }
    info!(
        points = summary.points.accepted,
        duplicates = summary.points.duplicates,
        filtered = summary.points.filtered,
        "Collected points"
    );
    info!(
        tiles = summary.tiles_written,
        pruned = summary.pyramid.pruned,
        output = %output.display(),
        "Done"
    );
}
