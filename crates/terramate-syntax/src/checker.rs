//! Multi-file parser entry point.

use std::path::{Path, PathBuf};

use crate::errors::{ParseError, SyntaxError};
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::schema::check_file;

/// Parser for the configuration files of one directory.
///
/// Files are added with [`TerramateParser::add_file`] and checked together
/// by [`TerramateParser::parse`]. Errors are reported file by file, in the
/// order the files were added: a file with a syntax error contributes that
/// single error, a well-formed file contributes all its schema violations.
///
/// # Examples
/// ```
/// use terramate_syntax::TerramateParser;
///
/// let mut parser = TerramateParser::new();
/// parser.add_file("/stack/stack.tm", "stack {\n  name = \"app\"\n}\n").unwrap();
/// assert!(parser.parse().is_ok());
///
/// let mut parser = TerramateParser::new();
/// parser.add_file("/stack/bug.tm", "bug").unwrap();
/// let err = parser.parse().unwrap_err();
/// assert_eq!(err.located().map(<[_]>::len), Some(1));
/// ```
#[derive(Debug, Default)]
pub struct TerramateParser {
    files: Vec<(PathBuf, Vec<u8>)>,
}

impl TerramateParser {
    /// Create a parser with no files.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to be checked by the next [`TerramateParser::parse`] call.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::DuplicateFile`] if `path` was already added.
    pub fn add_file(
        &mut self,
        path: impl Into<PathBuf>,
        content: impl Into<Vec<u8>>,
    ) -> Result<(), ParseError> {
        let path = path.into();
        if self.files.iter().any(|(existing, _)| *existing == path) {
            return Err(ParseError::DuplicateFile(path));
        }
        self.files.push((path, content.into()));
        Ok(())
    }

    /// Paths added so far, in insertion order.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|(path, _)| path.as_path())
    }

    /// Check every added file.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidUtf8`] for the first file that is not
    /// UTF-8, otherwise [`ParseError::Located`] with every syntax and schema
    /// problem found.
    pub fn parse(&self) -> Result<(), ParseError> {
        let mut sources = Vec::with_capacity(self.files.len());
        for (path, content) in &self.files {
            let source = std::str::from_utf8(content)
                .map_err(|_| ParseError::InvalidUtf8(path.clone()))?;
            sources.push((path, source));
        }

        let mut errors: Vec<SyntaxError> = Vec::new();
        for (path, source) in sources {
            match tokenize(source).and_then(|tokens| parse(&tokens)) {
                Ok(body) => errors.extend(
                    check_file(&body)
                        .into_iter()
                        .map(|err| err.located(path.clone())),
                ),
                Err(err) => errors.push(err.located(path.clone())),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ParseError::Located(errors))
        }
    }
}
