//! geotiles - Tile pyramids from geotag dumps
//!
//! This library turns the geotag table of a wiki database dump into a tile
//! pyramid of marker overlays: PNG raster tiles for the overview levels and
//! compact binary point tiles at the deepest level, stored in an MBTiles
//! database.
//!
//! # Modules
//!
//! - [`dump`] - streaming reader for SQL dumps
//! - [`coord`] - Web Mercator projection and tile addressing
//! - [`points`] - deduplicating point collection and spatial index
//! - [`tile`] - raster and vector tile encoders
//! - [`pyramid`] - pruned quadtree traversal
//! - [`sink`] - MBTiles and directory output
//! - [`generate`] - the end-to-end run

pub mod config;
pub mod coord;
pub mod dump;
pub mod generate;
pub mod logging;
pub mod points;
pub mod pyramid;
pub mod sink;
pub mod tile;
