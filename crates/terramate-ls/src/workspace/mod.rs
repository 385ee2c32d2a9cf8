//! Workspace file scanning.
//!
//! This module locates the Terramate configuration files that take part in
//! a validation pass and merges the editor's unsaved buffer into that set.

mod scanner;

pub use scanner::{
    CONFIG_FILE_SUFFIXES, DocumentOverride, FileSet, SourceFile, is_config_file_name,
    scan_directory,
};
