//! Typed interpretations of dump rows.
//!
//! Two tables are understood: the geotag table (one coordinate per row)
//! and the page table (used to decide which pages qualify as images).

use std::str::FromStr;

use super::{ParseError, Row};

/// Number of columns in a geotag row.
pub const GEOTAG_FIELD_COUNT: usize = 11;

/// Minimum number of columns in a page row (id, namespace, title).
pub const PAGE_MIN_FIELD_COUNT: usize = 3;

/// Globe value accepted for projection.
pub const EARTH_GLOBE: &str = "earth";

/// Latitudes at or beyond this magnitude are rejected.
pub const MAX_LATITUDE: f64 = 85.06;

/// Longitudes beyond this magnitude are rejected.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Namespace value of file description pages.
pub const FILE_NAMESPACE: &str = "6";

/// Title extension (case-insensitive) of qualifying file pages.
pub const QUALIFYING_EXTENSION: &str = "jpg";

/// A row of the geotag table.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTag {
    pub id: u64,
    /// Page the coordinate belongs to.
    pub entity_id: u64,
    pub globe: Option<String>,
    pub primary: bool,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub dim: Option<String>,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
}

impl GeoTag {
    /// Interpret a dump row as a geotag.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::FieldCount` unless the row has exactly
    /// [`GEOTAG_FIELD_COUNT`] fields, and `ParseError::InvalidField` when a
    /// numeric column does not parse.
    pub fn from_row(row: Row) -> Result<Self, ParseError> {
        if row.len() != GEOTAG_FIELD_COUNT {
            return Err(ParseError::FieldCount {
                expected: "exactly 11",
                found: row.len(),
            });
        }

        let mut fields = row.into_iter();
        let mut next = || fields.next().flatten();

        Ok(Self {
            id: required(next(), "gt_id")?,
            entity_id: required(next(), "gt_page_id")?,
            globe: next(),
            primary: next().as_deref() == Some("1"),
            lat: optional(next(), "gt_lat")?,
            lon: optional(next(), "gt_lon")?,
            dim: next(),
            kind: next(),
            name: next(),
            country: next(),
            region: next(),
        })
    }

    /// The `(lon, lat)` pair if this geotag should be drawn.
    pub fn position(&self) -> Option<(f64, f64)> {
        if self.globe.as_deref() != Some(EARTH_GLOBE) || !self.primary {
            return None;
        }
        let (lat, lon) = (self.lat?, self.lon?);
        is_projectable(lat, lon).then_some((lon, lat))
    }
}

/// Whether a coordinate pair is plausible and inside the projection.
///
/// Zero on either axis and pairs where both values are whole degrees are
/// treated as placeholders.
pub fn is_projectable(lat: f64, lon: f64) -> bool {
    if lat == 0.0 || lon == 0.0 {
        return false;
    }
    if !(lat.abs() < MAX_LATITUDE) || !(lon.abs() <= MAX_LONGITUDE) {
        return false;
    }
    !(lat.fract() == 0.0 && lon.fract() == 0.0)
}

/// A row of the page table, reduced to the columns used for filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub id: u64,
    pub namespace: Option<String>,
    pub title: Option<String>,
}

impl PageRecord {
    /// Interpret a dump row as a page.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::FieldCount` for rows with fewer than
    /// [`PAGE_MIN_FIELD_COUNT`] fields.
    pub fn from_row(row: Row) -> Result<Self, ParseError> {
        if row.len() < PAGE_MIN_FIELD_COUNT {
            return Err(ParseError::FieldCount {
                expected: "at least 3",
                found: row.len(),
            });
        }

        let mut fields = row.into_iter();
        let mut next = || fields.next().flatten();

        Ok(Self {
            id: required(next(), "page_id")?,
            namespace: next(),
            title: next(),
        })
    }

    /// Whether this page is a JPEG file page.
    pub fn is_qualifying(&self) -> bool {
        if self.namespace.as_deref() != Some(FILE_NAMESPACE) {
            return false;
        }
        let Some(title) = self.title.as_deref() else {
            return false;
        };
        match title.rsplit_once('.') {
            Some((base, ext)) => !base.is_empty() && ext.eq_ignore_ascii_case(QUALIFYING_EXTENSION),
            None => false,
        }
    }
}

fn required<T: FromStr>(value: Option<String>, field: &'static str) -> Result<T, ParseError> {
    match value {
        Some(v) => v.parse().map_err(|_| ParseError::InvalidField { field, value: v }),
        None => Err(ParseError::InvalidField {
            field,
            value: "NULL".to_string(),
        }),
    }
}

fn optional<T: FromStr>(value: Option<String>, field: &'static str) -> Result<Option<T>, ParseError> {
    value
        .map(|v| v.parse().map_err(|_| ParseError::InvalidField { field, value: v }))
        .transpose()
}
