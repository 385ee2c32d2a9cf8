//! Translation of parser errors into LSP diagnostics.

use lsp_types::{Diagnostic, DiagnosticSeverity, Position, PublishDiagnosticsParams, Range, Url};
use terramate_syntax::{Pos, SyntaxError};

/// Value of the `source` field on every published diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "terramate";

/// Convert a located parse error into an LSP diagnostic.
///
/// The parser reports 1-based lines and columns; LSP positions are
/// zero-based, so one is subtracted from each (saturating at zero).
#[must_use]
pub fn to_diagnostic(error: &SyntaxError) -> Diagnostic {
    Diagnostic {
        range: Range::new(
            to_position(error.range.start),
            to_position(error.range.end),
        ),
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(DIAGNOSTIC_SOURCE.to_owned()),
        message: error.to_string(),
        ..Diagnostic::default()
    }
}

fn to_position(pos: Pos) -> Position {
    Position::new(zero_based(pos.line), zero_based(pos.column))
}

fn zero_based(value: usize) -> u32 {
    u32::try_from(value.saturating_sub(1)).unwrap_or(u32::MAX)
}

/// The complete set of diagnostics for one document.
///
/// Publishing a batch replaces whatever the client showed for `uri`; an
/// empty batch clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticBatch {
    /// Document the diagnostics belong to.
    pub uri: Url,
    /// Diagnostics in parser order.
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBatch {
    /// A batch carrying `diagnostics` for `uri`.
    #[must_use]
    pub fn new(uri: Url, diagnostics: Vec<Diagnostic>) -> Self {
        Self { uri, diagnostics }
    }

    /// A batch reporting that `uri` has no known problems.
    #[must_use]
    pub fn empty(uri: Url) -> Self {
        Self::new(uri, Vec::new())
    }

    /// Whether the batch clears the document's diagnostics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Build the `textDocument/publishDiagnostics` parameters.
    #[must_use]
    pub fn into_params(self) -> PublishDiagnosticsParams {
        PublishDiagnosticsParams::new(self.uri, self.diagnostics, None)
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::rstest;
    use terramate_syntax::{ErrorKind, FileRange};

    fn error(kind: ErrorKind, start: (usize, usize), end: (usize, usize)) -> SyntaxError {
        SyntaxError::new(
            kind,
            FileRange::new(
                "/stack/terramate.tm",
                Pos::new(start.0, start.1, 0),
                Pos::new(end.0, end.1, 0),
            ),
            "detail",
        )
    }

    #[rstest]
    #[case((1, 1), (1, 4), Range::new(Position::new(0, 0), Position::new(0, 3)))]
    #[case((1, 12), (1, 16), Range::new(Position::new(0, 11), Position::new(0, 15)))]
    #[case((7, 2), (7, 11), Range::new(Position::new(6, 1), Position::new(6, 10)))]
    #[case((0, 0), (0, 0), Range::new(Position::new(0, 0), Position::new(0, 0)))]
    fn range_is_shifted_to_zero_based(
        #[case] start: (usize, usize),
        #[case] end: (usize, usize),
        #[case] expected: Range,
    ) {
        let diagnostic = to_diagnostic(&error(ErrorKind::Syntax, start, end));
        assert_eq!(diagnostic.range, expected);
    }

    #[rstest]
    #[case(ErrorKind::Syntax, "HCL syntax error: detail")]
    #[case(ErrorKind::Schema, "terramate schema error: detail")]
    fn diagnostic_carries_fixed_metadata(#[case] kind: ErrorKind, #[case] message: &str) {
        let diagnostic = to_diagnostic(&error(kind, (1, 1), (1, 2)));

        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostic.source.as_deref(), Some(DIAGNOSTIC_SOURCE));
        assert_eq!(diagnostic.message, message);
    }

    #[test]
    fn empty_batch_publishes_no_diagnostics() {
        let uri = Url::parse("file:///stack/terramate.tm").expect("valid URI");
        let batch = DiagnosticBatch::empty(uri.clone());
        assert!(batch.is_empty());

        let params = batch.into_params();
        assert_eq!(params.uri, uri);
        assert!(params.diagnostics.is_empty());
        assert!(params.version.is_none());
    }
}
