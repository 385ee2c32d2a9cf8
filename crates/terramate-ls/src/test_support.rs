//! Shared test support utilities for terramate-ls tests.
//!
//! This module provides common infrastructure for both unit and integration
//! tests, including:
//! - Temporary workspace directories populated with configuration files
//! - An initialised [`ServerState`] rooted at that workspace
//! - Helpers that drive validation the way document notifications do
//! - Newtype wrappers for improved type safety

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lsp_types::Url;
use tempfile::TempDir;

use crate::config::ServerConfig;
use crate::handlers::{DocumentEvent, process_event};
use crate::server::ServerState;
use crate::validation::{ConfigParser, DiagnosticBatch, TerramateChecker};

/// Newtype wrapper for test file names to improve type safety.
#[derive(Debug, Clone)]
pub struct Filename(pub(crate) String);

impl From<&str> for Filename {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for Filename {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Filename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Newtype wrapper for file contents to improve type safety.
#[derive(Debug, Clone)]
pub struct FileContent(pub(crate) String);

impl From<&str> for FileContent {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl From<String> for FileContent {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for FileContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builder for a temporary workspace with an initialised server state.
pub struct WorkspaceBuilder {
    dir: TempDir,
    files: Vec<(String, String)>,
    parser: Arc<dyn ConfigParser>,
}

impl WorkspaceBuilder {
    /// Create a builder over a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[expect(clippy::expect_used, reason = "test helper panics on setup failure")]
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
            files: Vec::new(),
            parser: Arc::new(TerramateChecker),
        }
    }

    /// Add a file to be written, relative to the workspace root.
    #[must_use]
    pub fn with_file(mut self, filename: impl Into<Filename>, content: impl Into<FileContent>) -> Self {
        self.files.push((filename.into().0, content.into().0));
        self
    }

    /// Validate with `parser` instead of the built-in checker.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn ConfigParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Write every file and initialise a server state rooted at the
    /// workspace.
    ///
    /// # Panics
    ///
    /// Panics if any file cannot be written or the session cannot be
    /// initialised.
    #[expect(clippy::expect_used, reason = "builder panics on setup failure")]
    #[must_use]
    pub fn build(self) -> TestWorkspace {
        for (filename, content) in &self.files {
            let path = self.dir.path().join(filename);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create parent directory");
            }
            std::fs::write(&path, content).expect("write workspace file");
        }
        let mut state = ServerState::with_parser(ServerConfig::default(), self.parser);
        state
            .session_mut()
            .initialize(self.dir.path().to_path_buf())
            .expect("initialise session");
        TestWorkspace {
            dir: self.dir,
            state,
        }
    }
}

impl Default for WorkspaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A populated temporary workspace and the server state rooted at it.
pub struct TestWorkspace {
    /// Temporary directory holding the files; removed on drop.
    pub dir: TempDir,
    /// Server state with an initialised session and no client.
    pub state: ServerState,
}

impl TestWorkspace {
    /// Absolute path of `filename` inside the workspace.
    #[must_use]
    pub fn path(&self, filename: &str) -> PathBuf {
        self.dir.path().join(filename)
    }

    /// `file://` URI of `filename` inside the workspace.
    ///
    /// # Panics
    ///
    /// Panics if the path cannot be expressed as a URI.
    #[expect(clippy::expect_used, reason = "temp paths are always absolute")]
    #[must_use]
    pub fn uri(&self, filename: &str) -> Url {
        Url::from_file_path(self.path(filename)).expect("file URI")
    }

    /// Overwrite `filename` on disk.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    #[expect(clippy::expect_used, reason = "test helper panics on write failure")]
    pub fn write(&self, filename: &str, content: &str) {
        std::fs::write(self.path(filename), content).expect("write workspace file");
    }

    /// Batches a `didOpen` of `filename` with `text` would publish.
    #[must_use]
    pub fn open(&self, filename: &str, text: &str) -> Vec<DiagnosticBatch> {
        self.run(DocumentEvent::Opened {
            path: self.path(filename),
            text: text.to_owned(),
        })
    }

    /// Batches a `didChange` of `filename` to `text` would publish.
    #[must_use]
    pub fn change(&self, filename: &str, text: &str) -> Vec<DiagnosticBatch> {
        self.run(DocumentEvent::Changed {
            path: self.path(filename),
            text: text.to_owned(),
        })
    }

    /// Batches a `didSave` of `filename` would publish.
    #[must_use]
    pub fn save(&self, filename: &str) -> Vec<DiagnosticBatch> {
        self.run(DocumentEvent::Saved {
            path: self.path(filename),
        })
    }

    /// Run `event`, treating a skipped pass as publishing nothing.
    #[must_use]
    pub fn run(&self, event: DocumentEvent) -> Vec<DiagnosticBatch> {
        process_event(&self.state, event).unwrap_or_default()
    }

    /// Root of the workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}
