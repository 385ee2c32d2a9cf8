//! Per-connection validation state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lsp_types::Url;
use terramate_syntax::{ParseError, SyntaxError};
use tracing::{Span, debug, field, info, info_span, warn};

use crate::error::ServerError;
use crate::workspace::{DocumentOverride, FileSet, scan_directory};

use super::parser::ConfigParser;
use super::translate::{DiagnosticBatch, to_diagnostic};

/// Runs validation passes for one client connection.
///
/// The session owns the workspace root reported by `initialize` and the
/// parser used for every pass. Its span scopes all log records emitted on
/// behalf of the connection.
pub struct ValidationSession {
    parser: Arc<dyn ConfigParser>,
    root: Option<PathBuf>,
    span: Span,
}

impl fmt::Debug for ValidationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSession")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl ValidationSession {
    /// Create an uninitialised session that checks files with `parser`.
    #[must_use]
    pub fn new(parser: Arc<dyn ConfigParser>) -> Self {
        Self {
            parser,
            root: None,
            span: info_span!("session", workspace = field::Empty),
        }
    }

    /// Record the workspace root.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyInitialised`] if a root was already set.
    pub fn initialize(&mut self, root: PathBuf) -> Result<(), ServerError> {
        if self.root.is_some() {
            return Err(ServerError::AlreadyInitialised);
        }
        self.span
            .record("workspace", field::display(root.display()));
        let _entered = self.span.enter();
        info!(root = %root.display(), "workspace root set");
        self.root = Some(root);
        Ok(())
    }

    /// The workspace root, once initialised.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Whether `initialize` has succeeded.
    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.root.is_some()
    }

    /// The span that scopes this connection's log records.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Validate the directory containing `changed`, using `content` as the
    /// current text of `changed`.
    ///
    /// Returns the batches to publish, in order:
    ///
    /// - a clean parse yields a single empty batch for `changed`;
    /// - located errors yield one batch per offending file, in the order the
    ///   files first appear among the errors, followed by an empty batch for
    ///   `changed` when it had no errors of its own;
    /// - errors naming files outside the scanned set are dropped, and when
    ///   every error is dropped nothing is returned;
    /// - a parse failure without a location returns nothing, leaving the
    ///   client's diagnostics as they were.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotInitialised`] before `initialize`,
    /// [`ServerError::InvalidPath`] when `changed` is not an absolute file
    /// path, and the scanner's errors when the directory cannot be read.
    pub fn validate(
        &self,
        changed: &Path,
        content: impl Into<String>,
    ) -> Result<Vec<DiagnosticBatch>, ServerError> {
        let _entered = self.span.enter();
        if self.root.is_none() {
            return Err(ServerError::NotInitialised);
        }

        let changed_uri = path_to_uri(changed)?;
        let dir = changed
            .parent()
            .ok_or_else(|| ServerError::InvalidPath(changed.to_path_buf()))?;
        let overlay = DocumentOverride::new(changed, content);
        let files = scan_directory(dir, Some(&overlay))?;
        debug!(dir = %dir.display(), files = files.len(), "validating directory");

        match self.parser.parse(&files) {
            Ok(()) => Ok(vec![DiagnosticBatch::empty(changed_uri)]),
            Err(ParseError::Located(errors)) => Ok(group_errors(errors, &files, changed_uri)),
            Err(err) => {
                warn!(error = %err, "parse failed without a location; diagnostics left unchanged");
                Ok(Vec::new())
            }
        }
    }
}

fn path_to_uri(path: &Path) -> Result<Url, ServerError> {
    Url::from_file_path(path).map_err(|()| ServerError::InvalidPath(path.to_path_buf()))
}

fn group_errors(errors: Vec<SyntaxError>, files: &FileSet, changed_uri: Url) -> Vec<DiagnosticBatch> {
    let located: Vec<SyntaxError> = errors
        .into_iter()
        .filter(|error| {
            let known = files.contains(&error.range.path);
            if !known {
                warn!(range = %error.range, error = %error, "dropping error for file outside the scanned set");
            }
            known
        })
        .collect();

    let mut order: Vec<&Path> = Vec::new();
    for error in &located {
        if !order.contains(&error.range.path.as_path()) {
            order.push(&error.range.path);
        }
    }

    let mut batches: Vec<DiagnosticBatch> = order
        .into_iter()
        .filter_map(|path| {
            let Ok(uri) = Url::from_file_path(path) else {
                warn!(path = %path.display(), "cannot convert path to URI");
                return None;
            };
            let diagnostics = located
                .iter()
                .filter(|error| error.range.path == path)
                .map(to_diagnostic)
                .collect();
            Some(DiagnosticBatch::new(uri, diagnostics))
        })
        .collect();

    if batches.iter().all(|batch| batch.uri != changed_uri) {
        batches.push(DiagnosticBatch::empty(changed_uri));
    }
    debug!(batches = batches.len(), errors = located.len(), "grouped diagnostics");
    batches
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    clippy::indexing_slicing,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use terramate_syntax::{ErrorKind, FileRange, Pos};

    /// Parser double that returns a canned outcome and records what it saw.
    #[derive(Default)]
    struct FakeParser {
        errors: Vec<SyntaxError>,
        unlocated: bool,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl FakeParser {
        fn located(errors: Vec<SyntaxError>) -> Self {
            Self {
                errors,
                ..Self::default()
            }
        }

        fn unlocated() -> Self {
            Self {
                unlocated: true,
                ..Self::default()
            }
        }
    }

    impl ConfigParser for FakeParser {
        fn parse(&self, files: &FileSet) -> Result<(), ParseError> {
            let mut seen = self.seen.lock().expect("lock seen paths");
            *seen = files.paths().map(Path::to_path_buf).collect();
            if self.unlocated {
                return Err(ParseError::InvalidUtf8(seen.first().cloned().unwrap_or_default()));
            }
            if self.errors.is_empty() {
                Ok(())
            } else {
                Err(ParseError::Located(self.errors.clone()))
            }
        }
    }

    fn schema_error(path: &Path, line: usize) -> SyntaxError {
        SyntaxError::new(
            ErrorKind::Schema,
            FileRange::new(path, Pos::new(line, 1, 0), Pos::new(line, 2, 1)),
            format!("problem on line {line}"),
        )
    }

    fn session_with(parser: FakeParser, root: &Path) -> ValidationSession {
        let mut session = ValidationSession::new(Arc::new(parser));
        session.initialize(root.to_path_buf()).expect("initialise");
        session
    }

    fn uri(path: &Path) -> Url {
        Url::from_file_path(path).expect("file URI")
    }

    #[fixture]
    fn workspace() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("a.tm"), "").expect("write a.tm");
        fs::write(dir.path().join("b.tm"), "").expect("write b.tm");
        dir
    }

    #[test]
    fn validate_before_initialise_is_rejected() {
        let session = ValidationSession::new(Arc::new(FakeParser::default()));
        let err = session
            .validate(Path::new("/stack/a.tm"), "")
            .expect_err("not initialised");
        assert!(matches!(err, ServerError::NotInitialised));
    }

    #[test]
    fn second_initialise_is_rejected() {
        let mut session = ValidationSession::new(Arc::new(FakeParser::default()));
        session.initialize(PathBuf::from("/work")).expect("first");

        let err = session
            .initialize(PathBuf::from("/other"))
            .expect_err("second initialise");

        assert!(matches!(err, ServerError::AlreadyInitialised));
        assert_eq!(session.root(), Some(Path::new("/work")));
    }

    #[rstest]
    fn clean_pass_publishes_one_empty_batch(workspace: TempDir) {
        let changed = workspace.path().join("a.tm");
        let session = session_with(FakeParser::default(), workspace.path());

        let batches = session.validate(&changed, "stack {}").expect("validate");

        assert_eq!(batches, vec![DiagnosticBatch::empty(uri(&changed))]);
    }

    #[rstest]
    fn parser_sees_every_sibling_once(workspace: TempDir) {
        let changed = workspace.path().join("new.tm");
        let parser = Arc::new(FakeParser::default());
        let mut session = ValidationSession::new(parser.clone());
        session
            .initialize(workspace.path().to_path_buf())
            .expect("initialise");

        session.validate(&changed, "").expect("validate");

        let seen = parser.seen.lock().expect("lock").clone();
        assert_eq!(
            seen,
            vec![
                workspace.path().join("a.tm"),
                workspace.path().join("b.tm"),
                changed
            ]
        );
    }

    #[rstest]
    fn errors_in_sibling_are_followed_by_clearing_batch(workspace: TempDir) {
        let changed = workspace.path().join("a.tm");
        let sibling = workspace.path().join("b.tm");
        let session = session_with(
            FakeParser::located(vec![schema_error(&sibling, 1), schema_error(&sibling, 3)]),
            workspace.path(),
        );

        let batches = session.validate(&changed, "").expect("validate");

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].uri, uri(&sibling));
        assert_eq!(batches[0].diagnostics.len(), 2);
        assert_eq!(batches[0].diagnostics[1].range.start.line, 2);
        assert_eq!(batches[1], DiagnosticBatch::empty(uri(&changed)));
    }

    #[rstest]
    fn batches_follow_first_appearance_order(workspace: TempDir) {
        let a = workspace.path().join("a.tm");
        let b = workspace.path().join("b.tm");
        let session = session_with(
            FakeParser::located(vec![
                schema_error(&b, 1),
                schema_error(&a, 2),
                schema_error(&b, 4),
            ]),
            workspace.path(),
        );

        let batches = session.validate(&a, "").expect("validate");

        let uris: Vec<_> = batches.iter().map(|batch| batch.uri.clone()).collect();
        assert_eq!(uris, vec![uri(&b), uri(&a)]);
        assert_eq!(batches[0].diagnostics.len(), 2);
        assert_eq!(batches[1].diagnostics.len(), 1);
    }

    #[rstest]
    fn errors_outside_the_file_set_are_dropped(workspace: TempDir) {
        let changed = workspace.path().join("a.tm");
        let stray = workspace.path().join("elsewhere").join("x.tm");

        let session = session_with(FakeParser::located(vec![schema_error(&stray, 1)]), workspace.path());
        let batches = session.validate(&changed, "").expect("validate");
        assert_eq!(batches, vec![DiagnosticBatch::empty(uri(&changed))]);

        let session = session_with(
            FakeParser::located(vec![schema_error(&stray, 1), schema_error(&changed, 2)]),
            workspace.path(),
        );
        let batches = session.validate(&changed, "").expect("validate");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].uri, uri(&changed));
        assert_eq!(batches[0].diagnostics.len(), 1);
    }

    #[rstest]
    fn unlocated_failure_publishes_nothing(workspace: TempDir) {
        let changed = workspace.path().join("a.tm");
        let session = session_with(FakeParser::unlocated(), workspace.path());

        let batches = session.validate(&changed, "").expect("validate");

        assert!(batches.is_empty());
    }

    #[rstest]
    fn relative_path_is_rejected(workspace: TempDir) {
        let session = session_with(FakeParser::default(), workspace.path());

        let err = session
            .validate(Path::new("a.tm"), "")
            .expect_err("relative path");

        assert!(matches!(err, ServerError::InvalidPath(_)));
    }

    #[test]
    fn missing_directory_aborts_the_pass() {
        let dir = TempDir::new().expect("temp dir");
        let changed = dir.path().join("gone").join("a.tm");
        let session = session_with(FakeParser::default(), dir.path());

        let err = session.validate(&changed, "").expect_err("directory missing");

        assert!(matches!(err, ServerError::ReadDirectory { .. }));
    }
}
