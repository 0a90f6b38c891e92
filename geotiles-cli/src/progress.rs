//! Terminal progress spinner.

use std::time::Duration;

use geotiles::generate::{Phase, ProgressObserver};
use geotiles::tile::TileRecord;
use indicatif::{ProgressBar, ProgressStyle};

const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Tiles between two message updates.
const TILE_REPORT_INTERVAL: u64 = 256;

/// Spinner showing the current phase and its counters.
///
/// Hidden automatically when stderr is not a terminal.
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.magenta} {prefix:>8.bold} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(TICK_INTERVAL);
        Self { bar }
    }

    pub fn finish(&self, message: String) {
        self.bar.finish_with_message(message);
    }
}

impl ProgressObserver for SpinnerProgress {
    fn on_phase(&self, phase: Phase) {
        self.bar.set_prefix(phase.to_string());
        self.bar.set_message("starting");
    }

    fn on_rows(&self, _phase: Phase, rows: u64) {
        self.bar.set_message(format!("{} rows", rows));
    }

    fn on_tile(&self, tile: &TileRecord, written: u64) {
        if written % TILE_REPORT_INTERVAL == 0 {
            self.bar
                .set_message(format!("{} tiles, at {}", written, tile.coord()));
        }
    }
}
