//! Reading relational dumps of the geotag and page tables.
//!
//! The dumps are the `INSERT`-per-line SQL files produced by `mysqldump`
//! with extended inserts, usually gzip-compressed. [`DumpReader`] turns one
//! into a stream of [`Row`]s; [`GeoTag`] and [`PageRecord`] interpret rows of
//! the two tables this crate understands.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use geotiles::dump::{DumpReader, GeoTag};
//!
//! let dump = "INSERT INTO `geo_tags` VALUES \
//!     (1,10,'earth',1,52.5163,13.3777,1000,NULL,NULL,'DE',NULL);\n";
//! let mut rows = DumpReader::new(Cursor::new(dump));
//! let tag = GeoTag::from_row(rows.next().unwrap().unwrap()).unwrap();
//! assert_eq!(tag.position(), Some((13.3777, 52.5163)));
//! ```

mod error;
mod reader;
mod records;

pub use error::ParseError;
pub use reader::{DumpReader, Row};
pub use records::{
    is_projectable, GeoTag, PageRecord, EARTH_GLOBE, FILE_NAMESPACE, GEOTAG_FIELD_COUNT,
    MAX_LATITUDE, MAX_LONGITUDE, PAGE_MIN_FIELD_COUNT, QUALIFYING_EXTENSION,
};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

/// Dump lines are single INSERT statements of up to a few megabytes.
const READ_BUFFER_SIZE: usize = 1 << 20;

/// Open a dump file, decompressing it when the name ends in `.gz`.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be opened.
pub fn open_dump(path: &Path) -> Result<DumpReader<Box<dyn BufRead + Send>>, ParseError> {
    let file = File::open(path)?;
    let gzipped = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    let reader: Box<dyn BufRead + Send> = if gzipped {
        Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            MultiGzDecoder::new(file),
        ))
    } else {
        Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file))
    };

    Ok(DumpReader::new(reader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const SAMPLE: &str = "INSERT INTO `page` VALUES (1,6,'A.jpg'),(2,0,'B');\n";

    #[test]
    fn test_open_plain_dump() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page.sql");
        std::fs::write(&path, SAMPLE).unwrap();

        let rows: Vec<Row> = open_dump(&path).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_open_gzipped_dump() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page.sql.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::fast());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let rows: Vec<Row> = open_dump(&path).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows[0][2].as_deref(), Some("A.jpg"));
    }

    #[test]
    fn test_open_missing_file() {
        let result = open_dump(Path::new("/nonexistent/geo_tags.sql.gz"));
        assert!(matches!(result, Err(ParseError::Io(_))));
    }
}
