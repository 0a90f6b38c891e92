//! Streaming tokenizer for extended-INSERT dump lines.
//!
//! A dump line of interest looks like:
//!
//! ```text
//! INSERT INTO `geo_tags` VALUES (1,2,'earth',1,...),(2,3,'moon',0,...);
//! ```
//!
//! Everything else (comments, DDL, `LOCK TABLES`) is skipped. Each INSERT
//! line is tokenized completely before its rows are handed out, so a
//! malformed statement never yields a partial batch.

use std::collections::VecDeque;
use std::io::BufRead;

use tracing::trace;

use super::ParseError;

/// One row of an INSERT statement, in column order.
///
/// `None` is the SQL `NULL` keyword; an empty quoted string is `Some("")`.
pub type Row = Vec<Option<String>>;

const INSERT_PREFIX: &[u8] = b"INSERT INTO ";
const VALUES_MARKER: &[u8] = b"` VALUES ";
const NULL_KEYWORD: &[u8] = b"NULL";

/// Iterator over the rows of every INSERT statement in a dump.
///
/// The first error ends iteration.
pub struct DumpReader<R> {
    reader: R,
    line: Vec<u8>,
    line_number: usize,
    pending: VecDeque<Row>,
    finished: bool,
}

impl<R: BufRead> DumpReader<R> {
    /// Create a reader over decompressed dump text.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            line_number: 0,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Number of input lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Advance to the next INSERT line and queue its rows.
    ///
    /// Returns `Ok(false)` at end of input.
    fn read_statement(&mut self) -> Result<bool, ParseError> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(false);
            }
            self.line_number += 1;

            if !self.line.starts_with(INSERT_PREFIX) {
                continue;
            }

            let line = self.line_number;
            let start = find(&self.line, VALUES_MARKER)
                .map(|pos| pos + VALUES_MARKER.len())
                .ok_or(ParseError::MissingValues { line })?;
            let values = trim_line_end(&self.line[start..]);

            let rows = parse_values(values).map_err(|e| ParseError::Malformed {
                line,
                offset: start + e.offset,
                reason: e.reason,
            })?;
            trace!(line, rows = rows.len(), "Parsed INSERT statement");
            self.pending.extend(rows);
            return Ok(true);
        }
    }
}

impl<R: BufRead> Iterator for DumpReader<R> {
    type Item = Result<Row, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Some(Ok(row));
            }
            if self.finished {
                return None;
            }
            match self.read_statement() {
                Ok(true) => {}
                Ok(false) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Position and cause of a tokenization failure within a VALUES clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub offset: usize,
    pub reason: &'static str,
}

/// Tokenize the tuple list following `VALUES`.
///
/// The input must run up to and including the terminating `;`.
pub(crate) fn parse_values(input: &[u8]) -> Result<Vec<Row>, SyntaxError> {
    let mut cursor = Cursor { input, pos: 0 };
    let mut rows = Vec::new();

    loop {
        cursor.expect(b'(', "expected '(' to open a row")?;
        rows.push(cursor.row()?);

        match cursor.bump() {
            // `),(` boundary
            Some(b',') => continue,
            // `);` ends the statement
            Some(b';') => {
                if cursor.pos != input.len() {
                    return Err(cursor.error("unexpected data after ';'"));
                }
                return Ok(rows);
            }
            Some(_) => return Err(cursor.error_at(cursor.pos - 1, "expected ',' or ';' after row")),
            None => return Err(cursor.error("statement is not terminated by ';'")),
        }
    }
}

struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn expect(&mut self, expected: u8, reason: &'static str) -> Result<(), SyntaxError> {
        match self.peek() {
            Some(byte) if byte == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error(reason)),
        }
    }

    fn error(&self, reason: &'static str) -> SyntaxError {
        self.error_at(self.pos, reason)
    }

    fn error_at(&self, offset: usize, reason: &'static str) -> SyntaxError {
        SyntaxError { offset, reason }
    }

    /// Fields up to and including the row's closing paren.
    fn row(&mut self) -> Result<Row, SyntaxError> {
        let mut fields = Vec::new();
        loop {
            fields.push(self.field()?);
            match self.bump() {
                Some(b',') => continue,
                Some(b')') => return Ok(fields),
                Some(_) => return Err(self.error_at(self.pos - 1, "expected ',' or ')' after field")),
                None => return Err(self.error("row is not closed")),
            }
        }
    }

    fn field(&mut self) -> Result<Option<String>, SyntaxError> {
        if self.peek() == Some(b'\'') {
            return self.quoted().map(Some);
        }

        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == b',' || byte == b')' {
                break;
            }
            self.pos += 1;
        }

        let token = &self.input[start..self.pos];
        if token.is_empty() {
            return Err(self.error("empty unquoted field"));
        }
        if token == NULL_KEYWORD {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(token).into_owned()))
    }

    fn quoted(&mut self) -> Result<String, SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = Vec::new();

        loop {
            match self.bump() {
                Some(b'\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error_at(start, "unterminated string"))?;
                    value.push(unescape(escaped));
                }
                // A doubled quote is a literal quote.
                Some(b'\'') if self.peek() == Some(b'\'') => {
                    self.pos += 1;
                    value.push(b'\'');
                }
                Some(b'\'') => break,
                Some(byte) => value.push(byte),
                None => return Err(self.error_at(start, "unterminated string")),
            }
        }

        Ok(String::from_utf8_lossy(&value).into_owned())
    }
}

fn unescape(byte: u8) -> u8 {
    match byte {
        b'0' => 0,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'b' => 0x08,
        b'Z' => 0x1a,
        other => other,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn trim_line_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}
