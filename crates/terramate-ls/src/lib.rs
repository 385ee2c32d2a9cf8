//! Language Server Protocol implementation for Terramate configuration.
//!
//! This crate provides an LSP server that validates Terramate configuration
//! files (`*.tm` and `*.tm.hcl`) as they are edited and reports problems to
//! the editor as diagnostics.
//!
//! # Overview
//!
//! The server communicates via JSON-RPC over stdin/stdout. Every open,
//! change or save of a document triggers a validation pass over the
//! document's directory:
//!
//! - [`workspace::scan_directory`] collects the configuration files,
//!   substituting the editor's buffer for the document being edited;
//! - a [`validation::ConfigParser`] checks them together;
//! - [`validation::ValidationSession`] groups the errors into per-file
//!   diagnostic batches, which the handlers publish in order.
//!
//! # Configuration
//!
//! The server can be configured via environment variables:
//!
//! - `TERRAMATE_LS_LOG_LEVEL`: Log verbosity (trace, debug, info, warn,
//!   error)
//! - `TERRAMATE_LS_LOG_FMT`: Log format (console, text, json)
//!
//! # Example
//!
//! ```
//! use terramate_ls::config::ServerConfig;
//! use terramate_ls::server::{ServerState, build_router};
//!
//! let state = ServerState::new(ServerConfig::default());
//! let _router = build_router(state);
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod server;
pub mod validation;
pub mod workspace;

/// Test support utilities for unit and integration tests.
///
/// This module is hidden from documentation as it's intended for internal
/// test use only.
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;
