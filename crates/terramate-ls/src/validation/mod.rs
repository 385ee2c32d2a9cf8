//! Validation passes and their translation into LSP diagnostics.
//!
//! A pass scans the directory of the changed document, hands the resulting
//! [`crate::workspace::FileSet`] to a [`ConfigParser`] and turns whatever it
//! reports into per-file [`DiagnosticBatch`]es ready for publishing.

mod parser;
mod session;
mod translate;

pub use parser::{ConfigParser, TerramateChecker};
pub use session::ValidationSession;
pub use translate::{DIAGNOSTIC_SOURCE, DiagnosticBatch, to_diagnostic};
