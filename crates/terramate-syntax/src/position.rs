//! Source positions and file ranges.

use std::fmt;
use std::path::PathBuf;

/// A position inside a source file.
///
/// `line` and `column` are 1-based and count characters; `byte` is the
/// 0-based byte offset from the start of the file.
///
/// # Examples
/// ```
/// use terramate_syntax::Pos;
/// let pos = Pos::new(2, 5, 17);
/// assert_eq!(pos.line, 2);
/// assert_eq!(Pos::START.column, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pos {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    /// 0-based byte offset.
    pub byte: usize,
}

impl Pos {
    /// The first position of any file.
    pub const START: Self = Self {
        line: 1,
        column: 1,
        byte: 0,
    };

    /// Create a position from its components.
    #[must_use]
    pub const fn new(line: usize, column: usize, byte: usize) -> Self {
        Self { line, column, byte }
    }

    /// Advance past `ch`, returning the position of the following character.
    #[must_use]
    pub(crate) fn advance(self, ch: char) -> Self {
        if ch == '\n' {
            Self {
                line: self.line + 1,
                column: 1,
                byte: self.byte + 1,
            }
        } else {
            Self {
                line: self.line,
                column: self.column + 1,
                byte: self.byte + ch.len_utf8(),
            }
        }
    }
}

impl Default for Pos {
    fn default() -> Self {
        Self::START
    }
}

/// A half-open range `[start, end)` within a named file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRange {
    /// Path of the file the range belongs to, as it was added to the parser.
    pub path: PathBuf,
    /// First position covered by the range.
    pub start: Pos,
    /// Position just past the end of the range.
    pub end: Pos,
}

impl FileRange {
    /// Create a range within `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, start: Pos, end: Pos) -> Self {
        Self {
            path: path.into(),
            start,
            end,
        }
    }
}

impl fmt::Display for FileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{},{}-{},{}",
            self.path.display(),
            self.start.line,
            self.start.column,
            self.end.line,
            self.end.column
        )
    }
}
