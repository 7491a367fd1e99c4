//! Source text model for tabfmt.
//!
//! This crate provides byte positions, spans, and the [`Source`] type that
//! the rest of the formatter reads token text and line information from.
//! It also hosts the tab-width-aware column arithmetic used when re-laying
//! out tokens that span several source lines.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// A byte offset into a source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BytePos(pub u32);

impl BytePos {
    /// The zero position.
    pub const ZERO: Self = Self(0);

    /// Create a new byte position.
    #[must_use]
    pub const fn new(pos: u32) -> Self {
        Self(pos)
    }

    /// Get the raw byte offset as usize.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// A span of source text, represented as a half-open byte range [lo, hi).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// The start of the span (inclusive).
    pub lo: BytePos,
    /// The end of the span (exclusive).
    pub hi: BytePos,
}

impl Span {
    /// A dummy span for synthesized text with no source location.
    pub const DUMMY: Self = Self {
        lo: BytePos::ZERO,
        hi: BytePos::ZERO,
    };

    /// Create a new span from byte positions.
    #[must_use]
    pub const fn new(lo: BytePos, hi: BytePos) -> Self {
        Self { lo, hi }
    }

    /// Create a span from raw byte offsets.
    #[must_use]
    pub const fn from_raw(lo: u32, hi: u32) -> Self {
        Self {
            lo: BytePos(lo),
            hi: BytePos(hi),
        }
    }

    /// Get the length of the span in bytes.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.hi.0 - self.lo.0
    }

    /// Check if the span is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.lo.0 == self.hi.0
    }

    /// Check if this span ends at or before another begins.
    #[must_use]
    pub const fn precedes(self, other: Self) -> bool {
        self.hi.0 <= other.lo.0
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::DUMMY
    }
}

/// Line and column information for a source location, both 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineCol {
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number (in bytes).
    pub col: u32,
}

impl LineCol {
    /// Create a new line/column pair.
    #[must_use]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// A source file's text together with its line table.
#[derive(Clone, Debug)]
pub struct Source {
    /// The file name or path, for diagnostics only.
    pub name: String,
    /// The source text.
    src: String,
    /// One span per line, with the trailing newline excluded. The final
    /// line is always present, even when empty.
    lines: Vec<Span>,
}

impl Source {
    /// Create a new source from a name and its text.
    #[must_use]
    pub fn new(name: impl Into<String>, src: impl Into<String>) -> Self {
        let src = src.into();
        let mut lines = Vec::new();
        let mut line_start = 0u32;
        for (pos, byte) in src.bytes().enumerate() {
            if byte == b'\n' {
                lines.push(Span::from_raw(line_start, pos as u32));
                line_start = pos as u32 + 1;
            }
        }
        lines.push(Span::from_raw(line_start, src.len() as u32));

        Self {
            name: name.into(),
            src,
            lines,
        }
    }

    /// The whole source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.src
    }

    /// The length of the source in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.src.len()
    }

    /// Whether the source is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// Get the source text for a span.
    ///
    /// # Panics
    ///
    /// Panics if the span is out of bounds or not on a char boundary.
    #[must_use]
    pub fn text(&self, span: Span) -> &str {
        &self.src[span.lo.as_usize()..span.hi.as_usize()]
    }

    /// Get the 1-based line/column for a byte position.
    ///
    /// A position on a newline byte counts as one past the end of the
    /// line it terminates.
    #[must_use]
    pub fn line_col(&self, pos: BytePos) -> LineCol {
        // The last line starting at or before `pos`.
        let line_idx = match self.lines.binary_search_by(|line| line.lo.cmp(&pos)) {
            Ok(idx) => idx,
            Err(next) => next.max(1) - 1,
        };
        LineCol {
            line: line_idx as u32 + 1,
            col: pos.0 - self.lines[line_idx].lo.0 + 1,
        }
    }

    /// Get the number of lines in the source.
    #[must_use]
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Get the content of a specific line (0-indexed), without the
    /// trailing newline.
    #[must_use]
    pub fn line_content(&self, line_idx: usize) -> Option<&str> {
        self.line_span(line_idx).map(|span| self.text(span))
    }

    /// Get the span of a specific line (0-indexed), excluding the
    /// trailing newline.
    #[must_use]
    pub fn line_span(&self, line_idx: usize) -> Option<Span> {
        self.lines.get(line_idx).copied()
    }

    /// Iterate over the spans of all lines, in order.
    pub fn line_ranges(&self) -> impl Iterator<Item = Span> + '_ {
        self.lines.iter().copied()
    }
}

/// Display width of `prefix` with literal tabs expanded to the next
/// multiple of `tab_width`. All other characters count one column.
///
/// `tab_width` must be at least 1.
#[must_use]
pub fn effective_offset(tab_width: usize, prefix: &str) -> usize {
    debug_assert!(tab_width >= 1);
    let mut width = 0;
    for ch in prefix.chars() {
        if ch == '\t' {
            width += tab_width - width % tab_width;
        } else {
            width += 1;
        }
    }
    width
}

/// Strip leading blank characters from `line` until `remove_at_most`
/// display columns have been consumed or a non-blank character is reached.
///
/// Spaces consume one column; literal tabs advance to the next multiple of
/// `tab_width`. A tab that would overshoot the budget is still removed,
/// matching how an editor outdents past a partial tab stop.
#[must_use]
pub fn strip_effective_whitespace(tab_width: usize, remove_at_most: usize, line: &str) -> &str {
    debug_assert!(tab_width >= 1);
    let mut removed = 0;
    let mut rest = line;
    while removed < remove_at_most {
        match rest.chars().next() {
            Some(' ') => {
                removed += 1;
                rest = &rest[1..];
            }
            Some('\t') => {
                removed += tab_width - removed % tab_width;
                rest = &rest[1..];
            }
            _ => break,
        }
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_operations() {
        let span = Span::from_raw(10, 20);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert!(span.precedes(Span::from_raw(20, 25)));
        assert!(!span.precedes(Span::from_raw(15, 25)));
    }

    #[test]
    fn test_line_col_lookup() {
        let src = Source::new("test.sml", "line 1\nline 2\nline 3");
        assert_eq!(src.line_col(BytePos::new(0)), LineCol::new(1, 1));
        assert_eq!(src.line_col(BytePos::new(7)), LineCol::new(2, 1));
        assert_eq!(src.line_col(BytePos::new(10)), LineCol::new(2, 4));
        // A newline byte belongs to the line it terminates.
        assert_eq!(src.line_col(BytePos::new(6)), LineCol::new(1, 7));
    }

    #[test]
    fn test_line_content() {
        let src = Source::new("test.sml", "first\nsecond\nthird");
        assert_eq!(src.line_content(0), Some("first"));
        assert_eq!(src.line_content(1), Some("second"));
        assert_eq!(src.line_content(2), Some("third"));
        assert_eq!(src.line_content(3), None);
    }

    #[test]
    fn test_line_ranges() {
        let src = Source::new("test.sml", "ab\ncd\n");
        let ranges: Vec<Span> = src.line_ranges().collect();
        assert_eq!(
            ranges,
            vec![
                Span::from_raw(0, 2),
                Span::from_raw(3, 5),
                Span::from_raw(6, 6)
            ]
        );
    }

    #[test]
    fn test_effective_offset() {
        assert_eq!(effective_offset(4, ""), 0);
        assert_eq!(effective_offset(4, "abc"), 3);
        assert_eq!(effective_offset(4, "\t"), 4);
        assert_eq!(effective_offset(4, "ab\t"), 4);
        assert_eq!(effective_offset(4, "abcd\t"), 8);
        assert_eq!(effective_offset(2, "a\tb"), 3);
    }

    #[test]
    fn test_strip_effective_whitespace() {
        assert_eq!(strip_effective_whitespace(4, 4, "    body"), "body");
        assert_eq!(strip_effective_whitespace(4, 2, "    body"), "  body");
        assert_eq!(strip_effective_whitespace(4, 4, "\tbody"), "body");
        assert_eq!(strip_effective_whitespace(4, 8, "  body"), "body");
        assert_eq!(strip_effective_whitespace(4, 0, "  body"), "  body");
        // A tab may overshoot the budget and is still removed.
        assert_eq!(strip_effective_whitespace(4, 2, "\tbody"), "body");
        // Stripping stops at the first non-blank character.
        assert_eq!(strip_effective_whitespace(4, 6, "  x   "), "x   ");
    }
}
