//! Error types reported by the checker.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::position::{FileRange, Pos};

/// The class of problem a [`SyntaxError`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source is not well-formed HCL.
    Syntax,
    /// The source is well-formed but violates the Terramate block schema.
    Schema,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => f.write_str("HCL syntax error"),
            Self::Schema => f.write_str("terramate schema error"),
        }
    }
}

/// A single problem located in one file.
///
/// # Examples
/// ```
/// use terramate_syntax::{ErrorKind, FileRange, Pos, SyntaxError};
/// let err = SyntaxError::new(
///     ErrorKind::Syntax,
///     FileRange::new("a.tm", Pos::START, Pos::new(1, 4, 3)),
///     "unexpected end of file",
/// );
/// assert_eq!(err.to_string(), "HCL syntax error: unexpected end of file");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct SyntaxError {
    /// Whether this is a syntax or schema problem.
    pub kind: ErrorKind,
    /// Where the problem is.
    pub range: FileRange,
    /// Human-readable description without the kind prefix.
    pub detail: String,
}

impl SyntaxError {
    /// Create a located error.
    #[must_use]
    pub fn new(kind: ErrorKind, range: FileRange, detail: impl Into<String>) -> Self {
        Self {
            kind,
            range,
            detail: detail.into(),
        }
    }
}

/// Failure returned by [`crate::TerramateParser`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// One or more problems with known file ranges, in reporting order.
    #[error("{}", summarise(.0))]
    Located(Vec<SyntaxError>),
    /// A file could not be decoded as UTF-8; no range can be given.
    #[error("{}: file is not valid UTF-8", .0.display())]
    InvalidUtf8(PathBuf),
    /// The same path was added to the parser twice.
    #[error("{}: file added more than once", .0.display())]
    DuplicateFile(PathBuf),
}

impl ParseError {
    /// The located errors, if this failure carries any.
    #[must_use]
    pub fn located(&self) -> Option<&[SyntaxError]> {
        match self {
            Self::Located(errors) => Some(errors),
            Self::InvalidUtf8(_) | Self::DuplicateFile(_) => None,
        }
    }
}

fn summarise(errors: &[SyntaxError]) -> String {
    match errors {
        [] => "no errors".to_owned(),
        [only] => format!("{}: {only}", only.range),
        [first, rest @ ..] => format!(
            "{}: {first} (and {} more)",
            first.range,
            rest.len()
        ),
    }
}

/// A problem found while lexing or parsing a single source, before the
/// file path is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LocalError {
    pub(crate) kind: ErrorKind,
    pub(crate) start: Pos,
    pub(crate) end: Pos,
    pub(crate) detail: String,
}

impl LocalError {
    pub(crate) fn syntax(start: Pos, end: Pos, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            start,
            end,
            detail: detail.into(),
        }
    }

    pub(crate) fn schema(start: Pos, end: Pos, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Schema,
            start,
            end,
            detail: detail.into(),
        }
    }

    pub(crate) fn located(self, path: impl Into<PathBuf>) -> SyntaxError {
        SyntaxError::new(
            self.kind,
            FileRange::new(path, self.start, self.end),
            self.detail,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_at(path: &str, detail: &str) -> SyntaxError {
        SyntaxError::new(
            ErrorKind::Schema,
            FileRange::new(path, Pos::START, Pos::new(1, 2, 1)),
            detail,
        )
    }

    #[test]
    fn located_display_mentions_remaining_count() {
        let err = ParseError::Located(vec![error_at("a.tm", "first"), error_at("b.tm", "second")]);
        assert_eq!(
            err.to_string(),
            "a.tm:1,1-1,2: terramate schema error: first (and 1 more)"
        );
    }

    #[test]
    fn unlocated_variants_have_no_ranges() {
        let err = ParseError::InvalidUtf8(PathBuf::from("bin.tm"));
        assert!(err.located().is_none());
        assert_eq!(err.to_string(), "bin.tm: file is not valid UTF-8");
    }

    #[test]
    fn local_error_takes_path() {
        let err = LocalError::syntax(Pos::START, Pos::new(1, 4, 3), "oops").located("x.tm");
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(err.range.path, PathBuf::from("x.tm"));
        assert_eq!(err.to_string(), "HCL syntax error: oops");
    }
}
