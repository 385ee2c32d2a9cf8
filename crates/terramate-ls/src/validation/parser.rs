//! The parser seam used by validation passes.

use terramate_syntax::{ParseError, TerramateParser};

use crate::workspace::FileSet;

/// Parses a whole [`FileSet`] in one go.
///
/// Implementations must report errors against the paths of the files they
/// were given. Errors are returned in a stable order; the session preserves
/// that order when grouping diagnostics.
pub trait ConfigParser: Send + Sync {
    /// Check every file in `files`.
    ///
    /// # Errors
    ///
    /// Returns the structured parse failure. [`ParseError::Located`] carries
    /// file ranges; every other variant is treated as having none.
    fn parse(&self, files: &FileSet) -> Result<(), ParseError>;
}

/// [`ConfigParser`] backed by the `terramate-syntax` checker.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerramateChecker;

impl ConfigParser for TerramateChecker {
    fn parse(&self, files: &FileSet) -> Result<(), ParseError> {
        let mut parser = TerramateParser::new();
        for file in files.iter() {
            parser.add_file(file.path.clone(), file.content.clone())?;
        }
        parser.parse()
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use crate::workspace::{DocumentOverride, scan_directory};
    use tempfile::TempDir;

    #[test]
    fn checker_accepts_valid_files() {
        let dir = TempDir::new().expect("temp dir");
        let overlay = DocumentOverride::new(dir.path().join("stack.tm"), "stack {}\n");
        let files = scan_directory(dir.path(), Some(&overlay)).expect("scan");

        assert!(TerramateChecker.parse(&files).is_ok());
    }

    #[test]
    fn checker_reports_against_file_set_paths() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("bug.tm");
        let overlay = DocumentOverride::new(&path, "bug");
        let files = scan_directory(dir.path(), Some(&overlay)).expect("scan");

        let err = TerramateChecker.parse(&files).expect_err("syntax error");
        let located = err.located().expect("located error");

        assert_eq!(located.len(), 1);
        assert!(located.iter().all(|e| e.range.path == path));
    }
}
