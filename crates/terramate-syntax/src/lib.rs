//! Structural checker for Terramate configuration files.
//!
//! The crate lexes and parses `.tm` / `.tm.hcl` sources into a block and
//! attribute tree and validates the tree against the Terramate block schema.
//! It does not evaluate expressions. Every problem is reported with the file
//! it belongs to and a 1-based line/column range so callers can map it onto
//! their own coordinate system.

mod checker;
mod errors;
mod lexer;
mod parser;
mod position;
mod schema;

pub use checker::TerramateParser;
pub use errors::{ErrorKind, ParseError, SyntaxError};
pub use position::{FileRange, Pos};
