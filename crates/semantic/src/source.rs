//! Source positions for diagnostics.
//!
//! Spans in the tree are byte ranges into the original source. The line
//! index converts them to the one-based `file:line:col` form diagnostics
//! print.

use serde::{Deserialize, Serialize};
use std::fmt;
use text_size::{TextRange, TextSize};

/// Line-start table for one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineIndex {
    /// Byte offset of the start of each line, first entry always 0.
    line_starts: Vec<u32>,
}

impl Default for LineIndex {
    fn default() -> Self {
        LineIndex {
            line_starts: vec![0],
        }
    }
}

impl LineIndex {
    /// Build the index from source text.
    pub fn from_source(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        LineIndex { line_starts }
    }

    /// Rebuild from line starts the front-end already computed.
    pub fn from_line_starts(line_starts: Vec<u32>) -> Self {
        debug_assert_eq!(line_starts.first(), Some(&0));
        LineIndex { line_starts }
    }

    /// One-based line and column for a byte offset.
    pub fn line_col(&self, offset: TextSize) -> (u32, u32) {
        let offset = u32::from(offset);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let col = offset - self.line_starts[line];
        (line as u32 + 1, col + 1)
    }
}

/// A `file:line:col` position, the prefix every compilation error carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            col,
        }
    }

    /// Resolve a span against a file's line index.
    pub fn resolve(file: &str, index: &LineIndex, range: TextRange) -> Self {
        let (line, col) = index.line_col(range.start());
        SourceLocation::new(file, line, col)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}
