//! Semantic error types for the language server.
//!
//! This module defines error types that provide meaningful context about
//! failures during language server operations. Errors are designed to be
//! inspectable by callers for appropriate handling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during language server operations.
///
/// Each variant provides specific context about the failure, enabling
/// appropriate error handling and user-facing messages.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A validation pass was requested before `initialize`.
    #[error("server not initialised")]
    NotInitialised,

    /// Server received a duplicate initialisation request.
    #[error("server already initialised")]
    AlreadyInitialised,

    /// The `initialize` request carried no usable `file://` root.
    #[error("initialize request carries no file root URI")]
    MissingWorkspaceRoot,

    /// An invalid configuration value was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A document URI does not name a local file.
    #[error("URI is not a local file path: {0}")]
    InvalidUri(String),

    /// A document path has no parent directory to scan.
    #[error("path has no parent directory: {}", .0.display())]
    InvalidPath(PathBuf),

    /// A `didChange` notification carried other than one content change.
    #[error("expected exactly one content change, got {0}")]
    ContentChangeCount(usize),

    /// Notification parameters could not be decoded.
    #[error("failed to decode parameters: {0}")]
    Decode(#[from] serde_json::Error),

    /// The directory being validated could not be listed.
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDirectory {
        /// Directory that was being scanned.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// A configuration file could not be read.
    #[error("failed to read file {}: {source}", path.display())]
    ReadFile {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}
