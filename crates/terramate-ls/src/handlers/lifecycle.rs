//! LSP lifecycle handlers for initialization and shutdown.
//!
//! This module implements the core lifecycle protocol handlers required by
//! the LSP specification: `initialize`, `initialized`, and `shutdown`.

use std::ops::ControlFlow;
use std::path::PathBuf;

use async_lsp::ResponseError;
use async_lsp::lsp_types::notification;
use lsp_types::{
    InitializeParams, InitializeResult, MessageType, ServerInfo, ShowMessageParams, Url,
    WorkspaceFolder,
};
use tracing::{error, info};

use crate::error::ServerError;
use crate::server::{ServerState, build_server_capabilities};

/// Name reported in `serverInfo` and in the greeting message.
pub const SERVER_NAME: &str = "terramate-ls";

/// Handle the `initialize` request from the client.
///
/// Records the workspace root and returns the server's capabilities. The
/// root is taken from `rootUri`, falling back to the first workspace folder.
///
/// # Errors
///
/// Returns `INVALID_REQUEST` when the server is already initialised and
/// `INVALID_PARAMS` when no `file://` root can be found.
pub fn handle_initialise(
    state: &mut ServerState,
    params: InitializeParams,
) -> Result<InitializeResult, ResponseError> {
    if state.session().is_initialised() {
        return Err(response_error(
            &ServerError::AlreadyInitialised,
            async_lsp::ErrorCode::INVALID_REQUEST,
        ));
    }

    #[expect(
        deprecated,
        reason = "Terramate clients report the workspace through root_uri."
    )]
    let InitializeParams {
        process_id,
        root_uri,
        workspace_folders,
        ..
    } = params;

    let root = extract_workspace_path(root_uri.as_ref(), workspace_folders.as_deref())
        .ok_or_else(|| {
            response_error(
                &ServerError::MissingWorkspaceRoot,
                async_lsp::ErrorCode::INVALID_PARAMS,
            )
        })?;

    state
        .session_mut()
        .initialize(root)
        .map_err(|err| response_error(&err, async_lsp::ErrorCode::INVALID_REQUEST))?;

    let _entered = state.session().span().enter();
    info!(
        process_id = ?process_id,
        log_level = state.config().log_level.as_filter_str(),
        "client initialised"
    );

    Ok(InitializeResult {
        capabilities: build_server_capabilities(),
        server_info: Some(ServerInfo {
            name: SERVER_NAME.to_owned(),
            version: Some(env!("CARGO_PKG_VERSION").to_owned()),
        }),
    })
}

/// Handle the `initialized` notification from the client.
///
/// The client sends this once it has processed the `initialize` reply, so
/// the greeting sent here always follows that reply on the wire. A failed
/// send stops the main loop.
pub fn handle_initialised(state: &mut ServerState) -> ControlFlow<async_lsp::Result<()>> {
    let _entered = state.session().span().enter();
    info!("server initialised");

    let Some(client) = state.client() else {
        return ControlFlow::Continue(());
    };
    let params = ShowMessageParams {
        typ: MessageType::INFO,
        message: format!("connected to {SERVER_NAME}"),
    };
    match client.notify::<notification::ShowMessage>(params) {
        Ok(()) => ControlFlow::Continue(()),
        Err(err) => {
            error!(error = %err, "failed to send greeting");
            ControlFlow::Break(Err(err))
        }
    }
}

/// Handle the `shutdown` request from the client.
///
/// Per the LSP specification, the server keeps running until the `exit`
/// notification arrives.
///
/// # Errors
///
/// Always returns `Ok(())`; the signature matches the router's request
/// handlers.
pub fn handle_shutdown(state: &mut ServerState) -> Result<(), ResponseError> {
    let _entered = state.session().span().enter();
    info!("shutdown request received");
    Ok(())
}

/// Pick the workspace root: `root_uri` first, then the first workspace
/// folder. Non-`file://` URIs are skipped.
fn extract_workspace_path(
    root_uri: Option<&Url>,
    workspace_folders: Option<&[WorkspaceFolder]>,
) -> Option<PathBuf> {
    root_uri.and_then(url_to_path).or_else(|| {
        workspace_folders
            .and_then(<[WorkspaceFolder]>::first)
            .and_then(|folder| url_to_path(&folder.uri))
    })
}

/// Convert a URL to a file system path.
///
/// Only handles `file://` URLs; returns `None` for other schemes.
fn url_to_path(url: &Url) -> Option<PathBuf> {
    url.to_file_path().ok()
}

/// Convert a server error to an LSP response error.
fn response_error(err: &ServerError, code: async_lsp::ErrorCode) -> ResponseError {
    ResponseError::new(code, err.to_string())
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
    use lsp_types::{
        SaveOptions, TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
        TextDocumentSyncSaveOptions,
    };
    use rstest::{fixture, rstest};
    use std::path::Path;
    use std::str::FromStr;

    #[fixture]
    fn state() -> ServerState {
        ServerState::new(ServerConfig::default())
    }

    #[expect(deprecated, reason = "exercising the root_uri field clients still send")]
    fn init_params(root: Option<&str>, folders: &[&str]) -> InitializeParams {
        InitializeParams {
            root_uri: root.map(|uri| Url::from_str(uri).expect("valid URI")),
            workspace_folders: (!folders.is_empty()).then(|| {
                folders
                    .iter()
                    .map(|uri| WorkspaceFolder {
                        uri: Url::from_str(uri).expect("valid URI"),
                        name: "folder".to_owned(),
                    })
                    .collect()
            }),
            ..Default::default()
        }
    }

    #[rstest]
    fn initialise_advertises_full_sync_and_server_info(mut state: ServerState) {
        let result = handle_initialise(&mut state, init_params(Some("file:///work"), &[]))
            .expect("initialization should succeed");

        assert_eq!(
            result.capabilities.text_document_sync,
            Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(false),
                })),
                ..TextDocumentSyncOptions::default()
            }))
        );
        let info = result.server_info.expect("should have server info");
        assert_eq!(info.name, SERVER_NAME);
        assert!(info.version.is_some());
        assert_eq!(state.session().root(), Some(Path::new("/work")));
    }

    #[rstest]
    fn initialise_falls_back_to_first_workspace_folder(mut state: ServerState) {
        handle_initialise(
            &mut state,
            init_params(None, &["file:///first", "file:///second"]),
        )
        .expect("initialization should succeed");

        assert_eq!(state.session().root(), Some(Path::new("/first")));
    }

    #[rstest]
    #[case(None, &[])]
    #[case(Some("https://example.com/work"), &[])]
    #[case(None, &["untitled:folder"])]
    fn initialise_without_file_root_is_invalid_params(
        mut state: ServerState,
        #[case] root: Option<&str>,
        #[case] folders: &[&str],
    ) {
        let err = handle_initialise(&mut state, init_params(root, folders))
            .expect_err("no usable root");

        assert_eq!(err.code, async_lsp::ErrorCode::INVALID_PARAMS);
        assert!(!state.session().is_initialised());
    }

    #[rstest]
    fn second_initialise_is_invalid_request(mut state: ServerState) {
        handle_initialise(&mut state, init_params(Some("file:///work"), &[])).expect("first");

        let err = handle_initialise(&mut state, init_params(Some("file:///other"), &[]))
            .expect_err("second initialise");

        assert_eq!(err.code, async_lsp::ErrorCode::INVALID_REQUEST);
        assert_eq!(state.session().root(), Some(Path::new("/work")));
    }

    #[rstest]
    fn initialised_without_client_continues(mut state: ServerState) {
        assert!(matches!(
            handle_initialised(&mut state),
            ControlFlow::Continue(())
        ));
    }

    #[test]
    fn initialised_stops_when_greeting_cannot_be_sent() {
        let mut state =
            ServerState::new(ServerConfig::default()).with_client(ClientSocket::new_closed());
        assert!(matches!(
            handle_initialised(&mut state),
            ControlFlow::Break(Err(_))
        ));
    }

    #[rstest]
    fn shutdown_returns_ok(mut state: ServerState) {
        assert!(handle_shutdown(&mut state).is_ok());
    }

    #[test]
    fn root_uri_takes_precedence_over_folders() {
        let root = Url::from_str("file:///root").expect("valid URI");
        let folders = [WorkspaceFolder {
            uri: Url::from_str("file:///folder").expect("valid URI"),
            name: "folder".to_owned(),
        }];

        let path = extract_workspace_path(Some(&root), Some(&folders));

        assert_eq!(path, Some(PathBuf::from("/root")));
    }

    #[test]
    fn url_to_path_returns_none_for_non_file_url() {
        let url = Url::from_str("https://example.com/path").expect("valid URL");
        assert!(url_to_path(&url).is_none());
    }
}
