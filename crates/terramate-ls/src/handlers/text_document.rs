//! Text document notification handlers.
//!
//! `didOpen`, `didChange` and `didSave` each trigger a validation pass over
//! the document's directory. Their parameters arrive undecoded (see
//! [`Undecoded`]) so that a malformed notification is logged and dropped
//! rather than tearing down the connection.

use std::fs;
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::path::PathBuf;

use lsp_types::notification::Notification;
use lsp_types::{
    DidChangeTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams, Url,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ServerError;
use crate::server::ServerState;
use crate::validation::DiagnosticBatch;

use super::diagnostics::publish_batches;

/// Notification `N` registered with raw JSON parameters.
///
/// The router decodes typed parameters itself and stops the main loop when
/// that fails; routing through this wrapper leaves decoding to the handler.
pub struct Undecoded<N>(PhantomData<fn() -> N>);

impl<N: Notification> Notification for Undecoded<N> {
    type Params = Value;
    const METHOD: &'static str = N::METHOD;
}

/// A document lifecycle event that triggers validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// The editor opened a document.
    Opened {
        /// Path of the document.
        path: PathBuf,
        /// Text the editor holds.
        text: String,
    },
    /// The editor replaced the document's text.
    Changed {
        /// Path of the document.
        path: PathBuf,
        /// Full new text.
        text: String,
    },
    /// The editor saved the document; its text is read back from disk.
    Saved {
        /// Path of the document.
        path: PathBuf,
    },
}

impl DocumentEvent {
    /// Build an [`DocumentEvent::Opened`] event.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidUri`] for non-`file://` URIs.
    pub fn from_did_open(params: DidOpenTextDocumentParams) -> Result<Self, ServerError> {
        let path = uri_to_path(&params.text_document.uri)?;
        Ok(Self::Opened {
            path,
            text: params.text_document.text,
        })
    }

    /// Build a [`DocumentEvent::Changed`] event.
    ///
    /// Only full-document sync is advertised, so exactly one content change
    /// carrying the whole text is expected.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ContentChangeCount`] unless there is exactly one
    /// content change, and [`ServerError::InvalidUri`] for non-`file://` URIs.
    pub fn from_did_change(params: DidChangeTextDocumentParams) -> Result<Self, ServerError> {
        let count = params.content_changes.len();
        let mut changes = params.content_changes.into_iter();
        let (Some(change), None) = (changes.next(), changes.next()) else {
            return Err(ServerError::ContentChangeCount(count));
        };
        let path = uri_to_path(&params.text_document.uri)?;
        Ok(Self::Changed {
            path,
            text: change.text,
        })
    }

    /// Build a [`DocumentEvent::Saved`] event. Any text in the payload is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidUri`] for non-`file://` URIs.
    pub fn from_did_save(params: DidSaveTextDocumentParams) -> Result<Self, ServerError> {
        let path = uri_to_path(&params.text_document.uri)?;
        Ok(Self::Saved { path })
    }

    /// Path of the document the event concerns.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Opened { path, .. } | Self::Changed { path, .. } | Self::Saved { path } => path,
        }
    }

    /// Resolve the document path and the text to validate.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::ReadFile`] when a saved document cannot be read
    /// back from disk.
    pub fn into_content(self) -> Result<(PathBuf, String), ServerError> {
        match self {
            Self::Opened { path, text } | Self::Changed { path, text } => Ok((path, text)),
            Self::Saved { path } => match fs::read_to_string(&path) {
                Ok(text) => Ok((path, text)),
                Err(source) => Err(ServerError::ReadFile { path, source }),
            },
        }
    }
}

fn uri_to_path(uri: &Url) -> Result<PathBuf, ServerError> {
    uri.to_file_path()
        .map_err(|()| ServerError::InvalidUri(uri.to_string()))
}

/// Run the validation pass for `event`.
///
/// Returns `None` when the pass could not run; the reason is logged and
/// nothing should be published.
pub fn process_event(state: &ServerState, event: DocumentEvent) -> Option<Vec<DiagnosticBatch>> {
    debug!(path = %event.path().display(), "processing document event");
    event
        .into_content()
        .and_then(|(path, text)| state.session().validate(&path, text))
        .inspect_err(|err| warn!(error = %err, "validation pass skipped"))
        .ok()
}

/// Handle `textDocument/didOpen` notifications.
pub fn handle_did_open_text_document(
    state: &mut ServerState,
    params: Value,
) -> ControlFlow<async_lsp::Result<()>> {
    let event = decode::<DidOpenTextDocumentParams>(params).and_then(DocumentEvent::from_did_open);
    dispatch(state, event)
}

/// Handle `textDocument/didChange` notifications.
pub fn handle_did_change_text_document(
    state: &mut ServerState,
    params: Value,
) -> ControlFlow<async_lsp::Result<()>> {
    let event =
        decode::<DidChangeTextDocumentParams>(params).and_then(DocumentEvent::from_did_change);
    dispatch(state, event)
}

/// Handle `textDocument/didSave` notifications.
pub fn handle_did_save_text_document(
    state: &mut ServerState,
    params: Value,
) -> ControlFlow<async_lsp::Result<()>> {
    let event = decode::<DidSaveTextDocumentParams>(params).and_then(DocumentEvent::from_did_save);
    dispatch(state, event)
}

fn decode<P: DeserializeOwned>(params: Value) -> Result<P, ServerError> {
    Ok(serde_json::from_value(params)?)
}

fn dispatch(
    state: &ServerState,
    event: Result<DocumentEvent, ServerError>,
) -> ControlFlow<async_lsp::Result<()>> {
    let span = state.session().span().clone();
    let _entered = span.enter();
    match event {
        Ok(event) => process_event(state, event)
            .map_or(ControlFlow::Continue(()), |batches| {
                publish_batches(state, batches)
            }),
        Err(err) => {
            warn!(error = %err, "ignoring document notification");
            ControlFlow::Continue(())
        }
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use lsp_types::{
        TextDocumentContentChangeEvent, TextDocumentIdentifier, TextDocumentItem,
        VersionedTextDocumentIdentifier,
    };
    use rstest::rstest;
    use serde_json::json;

    fn file_uri() -> Url {
        Url::parse("file:///stack/terramate.tm").expect("valid URI")
    }

    fn change(text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: text.to_owned(),
        }
    }

    fn did_change(changes: Vec<TextDocumentContentChangeEvent>) -> DidChangeTextDocumentParams {
        DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier::new(file_uri(), 2),
            content_changes: changes,
        }
    }

    #[test]
    fn did_open_carries_document_text() {
        let params = DidOpenTextDocumentParams {
            text_document: TextDocumentItem::new(file_uri(), "terramate".into(), 1, "stack {}".into()),
        };

        let event = DocumentEvent::from_did_open(params).expect("open event");

        assert_eq!(
            event,
            DocumentEvent::Opened {
                path: PathBuf::from("/stack/terramate.tm"),
                text: "stack {}".to_owned(),
            }
        );
    }

    #[test]
    fn did_change_with_single_change_is_accepted() {
        let event = DocumentEvent::from_did_change(did_change(vec![change("a = 1")]))
            .expect("change event");
        assert!(matches!(event, DocumentEvent::Changed { text, .. } if text == "a = 1"));
    }

    #[rstest]
    #[case(0)]
    #[case(2)]
    #[case(3)]
    fn did_change_rejects_other_change_counts(#[case] count: usize) {
        let changes = (0..count).map(|i| change(&i.to_string())).collect();

        let err = DocumentEvent::from_did_change(did_change(changes)).expect_err("rejected");

        assert!(matches!(err, ServerError::ContentChangeCount(n) if n == count));
    }

    #[test]
    fn did_save_ignores_payload_text() {
        let params = DidSaveTextDocumentParams {
            text_document: TextDocumentIdentifier::new(file_uri()),
            text: Some("ignored".to_owned()),
        };

        let event = DocumentEvent::from_did_save(params).expect("save event");

        assert_eq!(
            event,
            DocumentEvent::Saved {
                path: PathBuf::from("/stack/terramate.tm")
            }
        );
    }

    #[test]
    fn non_file_uri_is_rejected() {
        let params = DidSaveTextDocumentParams {
            text_document: TextDocumentIdentifier::new(
                Url::parse("untitled:Untitled-1").expect("valid URI"),
            ),
            text: None,
        };

        let err = DocumentEvent::from_did_save(params).expect_err("not a file");

        assert!(matches!(err, ServerError::InvalidUri(_)));
    }

    #[test]
    fn saved_event_reads_disk_content() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("stack.tm");
        fs::write(&path, "stack {}").expect("write file");

        let (resolved, text) = DocumentEvent::Saved { path: path.clone() }
            .into_content()
            .expect("readable");

        assert_eq!(resolved, path);
        assert_eq!(text, "stack {}");
    }

    #[test]
    fn saved_event_for_missing_file_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let event = DocumentEvent::Saved {
            path: dir.path().join("gone.tm"),
        };

        assert!(matches!(
            event.into_content(),
            Err(ServerError::ReadFile { .. })
        ));
    }

    #[test]
    fn malformed_params_fail_to_decode() {
        let err = decode::<DidOpenTextDocumentParams>(json!({ "textDocument": 42 }))
            .expect_err("malformed");
        assert!(matches!(err, ServerError::Decode(_)));
    }
}
