//! Core language server state and router construction.
//!
//! This module defines the state shared across all LSP handlers and the
//! method-name table that dispatches incoming messages to them.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use async_lsp::router::Router;
use async_lsp::{AnyNotification, ClientSocket};
use lsp_types::notification::{
    DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument, DidSaveTextDocument, Exit,
    Initialized,
};
use lsp_types::request::{Initialize, Shutdown};
use lsp_types::{
    SaveOptions, ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, TextDocumentSyncSaveOptions,
};
use tracing::debug;

use crate::config::ServerConfig;
use crate::handlers::{
    Undecoded, handle_did_change_text_document, handle_did_open_text_document,
    handle_did_save_text_document, handle_initialise, handle_initialised, handle_shutdown,
};
use crate::validation::{ConfigParser, TerramateChecker, ValidationSession};

/// Central state shared across all LSP handlers.
///
/// The router hands every handler a mutable reference to this state, one
/// message at a time.
pub struct ServerState {
    /// Socket for notifications sent to the client.
    client: Option<ClientSocket>,
    /// Workspace root and parser for validation passes.
    session: ValidationSession,
    /// Configuration loaded from environment and CLI.
    config: ServerConfig,
}

impl fmt::Debug for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerState")
            .field("connected", &self.client.is_some())
            .field("session", &self.session)
            .field("config", &self.config)
            .finish()
    }
}

impl ServerState {
    /// Create a server state that validates with the built-in checker.
    ///
    /// # Examples
    ///
    /// ```
    /// use terramate_ls::config::ServerConfig;
    /// use terramate_ls::server::ServerState;
    ///
    /// let state = ServerState::new(ServerConfig::default());
    /// assert!(state.session().root().is_none());
    /// ```
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::with_parser(config, Arc::new(TerramateChecker))
    }

    /// Create a server state that validates with `parser`.
    #[must_use]
    pub fn with_parser(config: ServerConfig, parser: Arc<dyn ConfigParser>) -> Self {
        Self {
            client: None,
            session: ValidationSession::new(parser),
            config,
        }
    }

    /// Attach the socket used to notify the client.
    #[must_use]
    pub fn with_client(mut self, client: ClientSocket) -> Self {
        self.client = Some(client);
        self
    }

    /// Access the client socket, if one is attached.
    #[must_use]
    pub fn client(&self) -> Option<&ClientSocket> {
        self.client.as_ref()
    }

    /// Access the validation session.
    #[must_use]
    pub fn session(&self) -> &ValidationSession {
        &self.session
    }

    /// Mutable access to the validation session.
    pub fn session_mut(&mut self) -> &mut ValidationSession {
        &mut self.session
    }

    /// Access the current server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Build the server capabilities to advertise to the client.
///
/// Documents are synchronised in full on open, change and close; saves are
/// reported without text because the server re-reads the file from disk.
#[must_use]
pub fn build_server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(false),
                })),
                ..TextDocumentSyncOptions::default()
            },
        )),
        ..ServerCapabilities::default()
    }
}

/// Build the router that dispatches LSP messages to their handlers.
///
/// Unknown requests receive the router's `MethodNotFound` reply; unknown
/// notifications are logged and ignored.
#[must_use]
pub fn build_router(state: ServerState) -> Router<ServerState> {
    let mut router = Router::new(state);
    router
        .request::<Initialize, _>(|st, params| {
            let result = handle_initialise(st, params);
            std::future::ready(result)
        })
        .request::<Shutdown, _>(|st, _params| {
            let result = handle_shutdown(st);
            std::future::ready(result)
        })
        .notification::<Undecoded<Initialized>>(|st, _params| handle_initialised(st))
        .notification::<Exit>(|_, ()| ControlFlow::Break(Ok(())))
        .notification::<Undecoded<DidOpenTextDocument>>(handle_did_open_text_document)
        .notification::<Undecoded<DidChangeTextDocument>>(handle_did_change_text_document)
        .notification::<Undecoded<DidSaveTextDocument>>(handle_did_save_text_document)
        .notification::<Undecoded<DidCloseTextDocument>>(|_, _| ControlFlow::Continue(()))
        .unhandled_notification(|_, notif: AnyNotification| {
            debug!(method = %notif.method, "ignoring unhandled notification");
            ControlFlow::Continue(())
        });
    router
}
