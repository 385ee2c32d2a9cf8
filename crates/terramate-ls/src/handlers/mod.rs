//! LSP request and notification handlers.
//!
//! Lifecycle requests set up the validation session; document
//! notifications run validation passes and publish their diagnostics.

mod diagnostics;
mod lifecycle;
mod text_document;

pub use diagnostics::publish_batches;
pub use lifecycle::{SERVER_NAME, handle_initialise, handle_initialised, handle_shutdown};
pub use text_document::{
    DocumentEvent, Undecoded, handle_did_change_text_document, handle_did_open_text_document,
    handle_did_save_text_document, process_event,
};
