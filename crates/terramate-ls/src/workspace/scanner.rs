//! Directory scanning for configuration files.
//!
//! A validation pass always covers a whole directory: every sibling
//! configuration file is read from disk, except the document being edited,
//! whose in-memory content replaces the disk copy.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::ServerError;

/// File name suffixes recognised as Terramate configuration files.
pub const CONFIG_FILE_SUFFIXES: [&str; 2] = [".tm", ".tm.hcl"];

/// Buffer content supplied by the editor for one file.
///
/// The content may differ from the bytes on disk (unsaved edits) and the
/// file may not exist on disk at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOverride {
    /// Absolute path of the document.
    pub path: PathBuf,
    /// Current text of the document.
    pub content: String,
}

impl DocumentOverride {
    /// Create an override for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// One file fed to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// File content, from the override or from disk.
    pub content: Vec<u8>,
}

/// The ordered set of files checked together in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<SourceFile>,
}

impl FileSet {
    /// Iterate over the files in parse order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    /// Iterate over the file paths in parse order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|file| file.path.as_path())
    }

    /// Whether `path` is part of the set.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths().any(|candidate| candidate == path)
    }

    /// Number of files in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the set has no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Whether a file name ends in one of [`CONFIG_FILE_SUFFIXES`].
///
/// # Examples
///
/// ```
/// use std::ffi::OsStr;
/// use terramate_ls::workspace::is_config_file_name;
///
/// assert!(is_config_file_name(OsStr::new("stack.tm")));
/// assert!(is_config_file_name(OsStr::new("config.tm.hcl")));
/// assert!(!is_config_file_name(OsStr::new("main.tf")));
/// ```
#[must_use]
pub fn is_config_file_name(name: &OsStr) -> bool {
    name.to_str()
        .is_some_and(|name| CONFIG_FILE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
}

/// Build the [`FileSet`] for `dir`.
///
/// Lists `dir` without recursing, keeps regular entries whose names carry a
/// configuration suffix and sorts them by path. When `overlay` names one of
/// them, its content is used instead of the disk copy; otherwise the overlay
/// is appended so that an unsaved document is still validated.
///
/// # Errors
///
/// Returns [`ServerError::ReadDirectory`] if `dir` cannot be listed and
/// [`ServerError::ReadFile`] if any kept file cannot be read. No partial set
/// is ever returned.
pub fn scan_directory(
    dir: &Path,
    overlay: Option<&DocumentOverride>,
) -> Result<FileSet, ServerError> {
    let read_dir_error = |source| ServerError::ReadDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let name = entry.file_name();
        if entry.file_type().map_err(read_dir_error)?.is_dir() {
            trace!(entry = ?name, "ignoring directory");
            continue;
        }
        if !is_config_file_name(&name) {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len() + 1);
    let mut overlay_applied = false;
    for path in paths {
        let content = match overlay {
            Some(doc) if doc.path == path => {
                overlay_applied = true;
                doc.content.clone().into_bytes()
            }
            _ => fs::read(&path).map_err(|source| ServerError::ReadFile {
                path: path.clone(),
                source,
            })?,
        };
        files.push(SourceFile { path, content });
    }

    if let Some(doc) = overlay.filter(|_| !overlay_applied) {
        files.push(SourceFile {
            path: doc.path.clone(),
            content: doc.content.clone().into_bytes(),
        });
    }

    trace!(dir = %dir.display(), files = files.len(), "scanned directory");
    Ok(FileSet { files })
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn workspace() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("stack.tm"), "stack {}").expect("write stack.tm");
        fs::write(dir.path().join("globals.tm.hcl"), "globals {}").expect("write globals");
        fs::write(dir.path().join("main.tf"), "resource {}").expect("write main.tf");
        fs::write(dir.path().join("notes.tm.bak"), "junk").expect("write notes");
        fs::create_dir(dir.path().join("child.tm")).expect("create child dir");
        dir
    }

    fn names(files: &FileSet) -> Vec<String> {
        files
            .paths()
            .filter_map(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    #[rstest]
    #[case("a.tm", true)]
    #[case("a.tm.hcl", true)]
    #[case("a.hcl", false)]
    #[case("a.tm.bak", false)]
    #[case("tm", false)]
    fn recognises_config_suffixes(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_config_file_name(OsStr::new(name)), expected);
    }

    #[rstest]
    fn keeps_only_config_files_sorted(workspace: TempDir) {
        let files = scan_directory(workspace.path(), None).expect("scan");
        assert_eq!(names(&files), vec!["globals.tm.hcl", "stack.tm"]);
    }

    #[rstest]
    fn override_replaces_disk_content(workspace: TempDir) {
        let path = workspace.path().join("stack.tm");
        let overlay = DocumentOverride::new(&path, "stack {\n  name = \"x\"\n}\n");

        let files = scan_directory(workspace.path(), Some(&overlay)).expect("scan");

        assert_eq!(files.len(), 2);
        let stack = files
            .iter()
            .find(|file| file.path == path)
            .expect("stack.tm in set");
        assert_eq!(stack.content, overlay.content.as_bytes());
    }

    #[rstest]
    fn unsaved_override_is_appended(workspace: TempDir) {
        let path = workspace.path().join("new.tm");
        let overlay = DocumentOverride::new(&path, "");

        let files = scan_directory(workspace.path(), Some(&overlay)).expect("scan");

        assert_eq!(names(&files), vec!["globals.tm.hcl", "stack.tm", "new.tm"]);
        assert!(files.contains(&path));
    }

    #[test]
    fn empty_directory_with_override_yields_only_override() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("terramate.tm");
        let overlay = DocumentOverride::new(&path, "");

        let files = scan_directory(dir.path(), Some(&overlay)).expect("scan");

        assert_eq!(files.len(), 1);
        assert!(files.contains(&path));
    }

    #[test]
    fn missing_directory_is_a_hard_error() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("gone");

        let err = scan_directory(&missing, None).expect_err("directory does not exist");

        assert!(matches!(err, ServerError::ReadDirectory { path, .. } if path == missing));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_sibling_aborts_the_scan() {
        let dir = TempDir::new().expect("temp dir");
        // A dangling symlink lists as a non-directory entry but cannot be read.
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("broken.tm"))
            .expect("create symlink");

        let err = scan_directory(dir.path(), None).expect_err("sibling is unreadable");

        assert!(matches!(err, ServerError::ReadFile { .. }));
    }
}
