//! End-to-end smoke tests for the `terramate-ls` binary.
//!
//! These tests start the language server as a child process, send JSON-RPC
//! messages over stdin/stdout, and verify responses and published
//! diagnostics. They cover CLI argument parsing, server startup, the
//! lifecycle handshake, validation on open/change/save, and graceful
//! shutdown.

#![expect(
    clippy::expect_used,
    clippy::indexing_slicing,
    reason = "smoke tests use explicit panics and indexing for clarity"
)]

mod wire;

use std::io::BufReader;
use std::process::{Child, ChildStdin, Command};

use serde_json::{Value, json};
use tempfile::TempDir;

use wire::{
    MessageReceiver, did_change, did_open, did_save, file_uri, initialize, send,
    shutdown_and_exit, spawn_server,
};

/// A running server after the initialize handshake.
struct Session {
    child: Child,
    stdin: ChildStdin,
    receiver: MessageReceiver,
    init_response: Value,
    greeting: Value,
}

/// Spawn the LSP server and perform the initialize handshake.
fn setup_server(root: &TempDir) -> Session {
    let mut child = spawn_server(&[]);
    let mut stdin = child.stdin.take().expect("stdin");
    let stdout = child.stdout.take().expect("stdout");
    let receiver = MessageReceiver::spawn(BufReader::new(stdout));

    let (init_response, greeting) = initialize(&mut stdin, &receiver, &file_uri(root.path()));

    Session {
        child,
        stdin,
        receiver,
        init_response,
        greeting,
    }
}

impl Session {
    fn finish(mut self, request_id: u64) {
        shutdown_and_exit(&mut self.stdin, &self.receiver, &mut self.child, request_id);
    }
}

fn diagnostic_ranges(params: &Value) -> Vec<Value> {
    params["diagnostics"]
        .as_array()
        .expect("diagnostics array")
        .iter()
        .map(|d| d["range"].clone())
        .collect()
}

#[test]
fn initialize_advertises_capabilities_then_greets() {
    let dir = TempDir::new().expect("temp dir");
    let session = setup_server(&dir);

    let result = &session.init_response["result"];
    assert_eq!(result["serverInfo"]["name"], "terramate-ls");
    assert_eq!(
        result["capabilities"]["textDocumentSync"],
        json!({
            "openClose": true,
            "change": 1,
            "save": { "includeText": false },
        })
    );

    assert_eq!(session.greeting["method"], "window/showMessage");
    assert_eq!(session.greeting["params"]["type"], 3);
    assert_eq!(session.greeting["params"]["message"], "connected to terramate-ls");

    session.finish(2);
}

#[test]
fn open_change_and_save_publish_diagnostics() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("bug.tm"), "bug").expect("write bug.tm");
    let mut session = setup_server(&dir);
    let edited = dir.path().join("terramate.tm");

    // Opening a new file reports the broken sibling, then clears the file.
    did_open(&mut session.stdin, &edited, "");
    let sibling = session.receiver.recv_publish();
    assert_eq!(sibling["uri"], file_uri(&dir.path().join("bug.tm")));
    assert_eq!(
        diagnostic_ranges(&sibling),
        vec![json!({ "start": { "line": 0, "character": 0 }, "end": { "line": 0, "character": 3 } })]
    );
    assert_eq!(sibling["diagnostics"][0]["severity"], 1);
    assert_eq!(sibling["diagnostics"][0]["source"], "terramate");
    let own = session.receiver.recv_publish();
    assert_eq!(own["uri"], file_uri(&edited));
    assert_eq!(own["diagnostics"], json!([]));

    // The sibling is fixed on disk; a schema error in the buffer is reported.
    std::fs::write(dir.path().join("bug.tm"), "stack {}").expect("fix bug.tm");
    did_change(&mut session.stdin, &edited, 2, &["terramate {test=1}"]);
    let own = session.receiver.recv_publish();
    assert_eq!(own["uri"], file_uri(&edited));
    assert_eq!(
        diagnostic_ranges(&own),
        vec![json!({ "start": { "line": 0, "character": 11 }, "end": { "line": 0, "character": 15 } })]
    );

    // Saving validates what is on disk, not the last buffer.
    std::fs::write(&edited, "terramate {}").expect("write terramate.tm");
    did_save(&mut session.stdin, &edited);
    let own = session.receiver.recv_publish();
    assert_eq!(own["uri"], file_uri(&edited));
    assert_eq!(own["diagnostics"], json!([]));

    session.finish(2);
}

#[test]
fn malformed_and_multi_change_notifications_are_dropped() {
    let dir = TempDir::new().expect("temp dir");
    let mut session = setup_server(&dir);
    let edited = dir.path().join("terramate.tm");

    did_change(&mut session.stdin, &edited, 2, &["bug", "bug2"]);
    did_change(&mut session.stdin, &edited, 3, &[]);
    send(
        &mut session.stdin,
        &json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didOpen",
            "params": { "textDocument": 42 }
        }),
    );
    send(
        &mut session.stdin,
        &json!({ "jsonrpc": "2.0", "method": "$/unknownNotification", "params": {} }),
    );

    // Notifications are handled in order, so the next publish belongs to
    // this open: nothing was published for the rejected ones above.
    did_open(&mut session.stdin, &edited, "bug");
    let own = session.receiver.recv_publish();
    assert_eq!(own["uri"], file_uri(&edited));
    assert_eq!(own["diagnostics"].as_array().map(Vec::len), Some(1));

    session.finish(2);
}

#[test]
fn unknown_request_is_method_not_found() {
    let dir = TempDir::new().expect("temp dir");
    let mut session = setup_server(&dir);

    send(
        &mut session.stdin,
        &json!({ "jsonrpc": "2.0", "id": 7, "method": "textDocument/hover", "params": {} }),
    );
    let (response, _) = session.receiver.recv_response_for_id(7, 10);
    assert_eq!(response["error"]["code"], -32601);

    session.finish(8);
}

#[test]
fn malformed_initialize_params_are_invalid_params() {
    let mut child = spawn_server(&[]);
    let mut stdin = child.stdin.take().expect("stdin");
    let stdout = child.stdout.take().expect("stdout");
    let receiver = MessageReceiver::spawn(BufReader::new(stdout));

    send(
        &mut stdin,
        &json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": { "processId": "x" }
        }),
    );
    let (response, _) = receiver.recv_response_for_id(1, 10);
    assert_eq!(response["error"]["code"], -32602);

    // The server is still serving requests afterwards.
    shutdown_and_exit(&mut stdin, &receiver, &mut child, 2);
}

#[test]
fn unsupported_mode_is_a_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_terramate-ls"))
        .args(["--mode", "tcp"])
        .output()
        .expect("run terramate-ls");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn invalid_log_level_in_environment_exits_with_config_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_terramate-ls"))
        .env("TERRAMATE_LS_LOG_LEVEL", "verbose")
        .output()
        .expect("run terramate-ls");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn version_flag_prints_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_terramate-ls"))
        .arg("--version")
        .output()
        .expect("run terramate-ls");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
