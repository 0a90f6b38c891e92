//! Error types for dump parsing.

use thiserror::Error;

/// Errors that can occur while reading or interpreting a dump.
///
/// All variants are fatal: a dump that deviates from the expected shape
/// anywhere is not trusted for the remainder of the file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Reading the (possibly compressed) input failed.
    #[error("I/O error reading dump: {0}")]
    Io(#[from] std::io::Error),

    /// An INSERT line without a recognizable VALUES clause.
    #[error("line {line}: INSERT statement has no VALUES clause")]
    MissingValues { line: usize },

    /// Tokenization of the VALUES clause failed.
    #[error("line {line}, byte {offset}: {reason}")]
    Malformed {
        line: usize,
        offset: usize,
        reason: &'static str,
    },

    /// A row does not have the number of fields its table requires.
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: &'static str, found: usize },

    /// A field could not be converted to the type its column requires.
    #[error("invalid {field} value '{value}'")]
    InvalidField { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_includes_position() {
        let err = ParseError::Malformed {
            line: 12,
            offset: 40,
            reason: "unterminated string",
        };
        assert_eq!(err.to_string(), "line 12, byte 40: unterminated string");
    }

    #[test]
    fn test_field_count_display() {
        let err = ParseError::FieldCount {
            expected: "exactly 11",
            found: 9,
        };
        assert_eq!(err.to_string(), "expected exactly 11 fields, found 9");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated gzip");
        let err: ParseError = io_err.into();
        assert!(matches!(err, ParseError::Io(_)));
    }
}
