//! Diagnostic publishing via LSP.
//!
//! Each [`DiagnosticBatch`] becomes one `textDocument/publishDiagnostics`
//! notification, sent in the order the session produced them.

use std::ops::ControlFlow;

use async_lsp::lsp_types::notification;
use tracing::{debug, error};

use crate::server::ServerState;
use crate::validation::DiagnosticBatch;

/// Publish `batches` to the client, in order.
///
/// A failed send means the connection is gone, so the main loop is asked to
/// stop with the send error.
pub fn publish_batches(
    state: &ServerState,
    batches: Vec<DiagnosticBatch>,
) -> ControlFlow<async_lsp::Result<()>> {
    let Some(client) = state.client() else {
        debug!("no client socket available for publishing diagnostics");
        return ControlFlow::Continue(());
    };

    for batch in batches {
        debug!(
            uri = %batch.uri,
            diagnostics = batch.diagnostics.len(),
            "publishing diagnostics"
        );
        if let Err(err) = client.notify::<notification::PublishDiagnostics>(batch.into_params()) {
            error!(error = %err, "failed to publish diagnostics");
            return ControlFlow::Break(Err(err));
        }
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use async_lsp::ClientSocket;
    use lsp_types::Url;

    fn batch() -> DiagnosticBatch {
        DiagnosticBatch::empty(Url::parse("file:///stack/a.tm").expect("valid URI"))
    }

    #[test]
    fn publishing_without_client_is_a_no_op() {
        let state = ServerState::new(ServerConfig::default());
        assert!(matches!(publish_batches(&state, vec![batch()]), ControlFlow::Continue(())));
    }

    #[test]
    fn send_failure_stops_the_main_loop() {
        let state = ServerState::new(ServerConfig::default()).with_client(ClientSocket::new_closed());
        let flow = publish_batches(&state, vec![batch()]);
        assert!(matches!(flow, ControlFlow::Break(Err(_))));
    }

    #[test]
    fn nothing_to_publish_never_touches_the_socket() {
        let state = ServerState::new(ServerConfig::default()).with_client(ClientSocket::new_closed());
        assert!(matches!(publish_batches(&state, Vec::new()), ControlFlow::Continue(())));
    }
}
