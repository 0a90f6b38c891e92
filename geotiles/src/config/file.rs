//! INI configuration file.
//!
//! ```ini
//! [tiles]
//! vector_level = 11
//! marker_radius = 5
//! marker_color = ff00ff
//! vector_offset = 5000
//!
//! [metadata]
//! name = commons
//! description = Geotagged images
//! ```
//!
//! Every key is optional. Unknown keys are ignored.

use std::path::Path;
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

use super::GeneratorConfig;
use crate::coord::MAX_ZOOM;
use crate::tile::MAX_MARKER_RADIUS;

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Values read from a configuration file. `None` leaves the default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub vector_level: Option<u8>,
    pub marker_radius: Option<u32>,
    pub marker_color: Option<[u8; 3]>,
    pub vector_offset: Option<u16>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ConfigFile {
    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigFileError::ReadError` if the file cannot be read or is
    /// not valid INI, and `ConfigFileError::InvalidValue` for out-of-range
    /// values.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Overlay the values present in this file onto `config`.
    pub fn apply(&self, mut config: GeneratorConfig) -> GeneratorConfig {
        if let Some(v) = self.vector_level {
            config.vector_level = v;
        }
        if let Some(v) = self.marker_radius {
            config.marker_radius = v;
        }
        if let Some(v) = self.marker_color {
            config.marker_color = v;
        }
        if let Some(v) = self.vector_offset {
            config.vector_offset = v;
        }
        if let Some(v) = &self.name {
            config.name = v.clone();
        }
        if let Some(v) = &self.description {
            config.description = v.clone();
        }
        config
    }
}

impl FromStr for ConfigFile {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ini = Ini::load_from_str(s).map_err(ini::Error::Parse)?;
        parse_ini(&ini)
    }
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [tiles] section
    if let Some(section) = ini.section(Some("tiles")) {
        if let Some(v) = section.get("vector_level") {
            let level: u8 = parse_number("tiles", "vector_level", v)?;
            if level > MAX_ZOOM {
                return Err(invalid(
                    "tiles",
                    "vector_level",
                    v,
                    format!("must be at most {}", MAX_ZOOM),
                ));
            }
            config.vector_level = Some(level);
        }
        if let Some(v) = section.get("marker_radius") {
            let radius: u32 = parse_number("tiles", "marker_radius", v)?;
            if radius > MAX_MARKER_RADIUS {
                return Err(invalid(
                    "tiles",
                    "marker_radius",
                    v,
                    format!("must be at most {}", MAX_MARKER_RADIUS),
                ));
            }
            config.marker_radius = Some(radius);
        }
        if let Some(v) = section.get("marker_color") {
            config.marker_color = Some(parse_color(v).ok_or_else(|| {
                invalid(
                    "tiles",
                    "marker_color",
                    v,
                    "expected six hex digits like 'ff00ff'".to_string(),
                )
            })?);
        }
        if let Some(v) = section.get("vector_offset") {
            let offset: u16 = parse_number("tiles", "vector_offset", v)?;
            if offset >= u16::MAX / 2 {
                return Err(invalid(
                    "tiles",
                    "vector_offset",
                    v,
                    format!("must be below {}", u16::MAX / 2),
                ));
            }
            config.vector_offset = Some(offset);
        }
    }

    // [metadata] section
    if let Some(section) = ini.section(Some("metadata")) {
        if let Some(v) = section.get("name") {
            let v = v.trim();
            if !v.is_empty() {
                config.name = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("description") {
            config.description = Some(v.trim().to_string());
        }
    }

    Ok(config)
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "expected a non-negative integer".to_string()))
}

fn invalid(section: &str, key: &str, value: &str, reason: String) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

/// Parse an RGB colour written as six hex digits, with or without `#`.
pub fn parse_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}
