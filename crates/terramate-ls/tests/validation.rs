//! Validation passes over real workspaces using the built-in checker.
//!
//! Each test builds a temporary workspace, replays a document event the way
//! the notification handlers do, and checks the diagnostic batches that
//! would be published.

#![expect(
    clippy::expect_used,
    clippy::indexing_slicing,
    reason = "integration tests use explicit panics and indexing for clarity"
)]

use std::path::PathBuf;
use std::sync::Arc;

use lsp_types::{DiagnosticSeverity, Position, Range, Url};
use rstest::rstest;
use terramate_ls::test_support::{TestWorkspace, WorkspaceBuilder};
use terramate_ls::validation::{ConfigParser, DIAGNOSTIC_SOURCE, DiagnosticBatch};
use terramate_ls::workspace::FileSet;
use terramate_syntax::{ErrorKind, FileRange, ParseError, Pos, SyntaxError};

/// Parser that blames a file the scanner never listed.
struct BlamesElsewhere;

impl ConfigParser for BlamesElsewhere {
    fn parse(&self, _files: &FileSet) -> Result<(), ParseError> {
        Err(ParseError::Located(vec![SyntaxError::new(
            ErrorKind::Syntax,
            FileRange::new(
                PathBuf::from("/elsewhere/imported.tm"),
                Pos::START,
                Pos::new(1, 2, 1),
            ),
            "unexpected token",
        )]))
    }
}

fn range(start: (u32, u32), end: (u32, u32)) -> Range {
    Range::new(Position::new(start.0, start.1), Position::new(end.0, end.1))
}

fn ranges(batch: &DiagnosticBatch) -> Vec<Range> {
    batch.diagnostics.iter().map(|d| d.range).collect()
}

fn uris(batches: &[DiagnosticBatch]) -> Vec<Url> {
    batches.iter().map(|batch| batch.uri.clone()).collect()
}

#[test]
fn opening_new_file_in_empty_workspace_clears_it() {
    let workspace = WorkspaceBuilder::new().build();

    let batches = workspace.open("terramate.tm", "");

    assert_eq!(batches, vec![DiagnosticBatch::empty(workspace.uri("terramate.tm"))]);
}

#[test]
fn valid_workspace_publishes_only_for_the_changed_file() {
    let workspace = WorkspaceBuilder::new()
        .with_file("stack.tm", "stack {}")
        .with_file("globals.tm", "globals {}")
        .with_file("config.tm", "terramate {}")
        .build();

    let batches = workspace.change("empty.tm", "");

    assert_eq!(batches, vec![DiagnosticBatch::empty(workspace.uri("empty.tm"))]);
}

#[test]
fn broken_sibling_is_reported_before_clearing_the_edited_file() {
    let workspace = WorkspaceBuilder::new().with_file("bug.tm", "bug").build();

    let batches = workspace.change("terramate.tm", "");

    assert_eq!(uris(&batches), vec![workspace.uri("bug.tm"), workspace.uri("terramate.tm")]);
    let diagnostic = &batches[0].diagnostics[0];
    assert_eq!(batches[0].diagnostics.len(), 1);
    assert_eq!(diagnostic.range, range((0, 0), (0, 3)));
    assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
    assert_eq!(diagnostic.source.as_deref(), Some(DIAGNOSTIC_SOURCE));
    assert!(diagnostic.message.starts_with("HCL syntax error"));
    assert!(batches[1].is_empty());
}

#[test]
fn edited_file_with_errors_gets_its_own_batch() {
    let workspace = WorkspaceBuilder::new().with_file("bug.tm", "bug").build();

    let batches = workspace.change("terramate.tm", "bug2");

    assert_eq!(uris(&batches), vec![workspace.uri("bug.tm"), workspace.uri("terramate.tm")]);
    assert_eq!(ranges(&batches[0]), vec![range((0, 0), (0, 3))]);
    assert_eq!(ranges(&batches[1]), vec![range((0, 0), (0, 4))]);
}

#[test]
fn syntax_and_schema_errors_in_siblings_are_reported_in_file_order() {
    let workspace = WorkspaceBuilder::new()
        .with_file("bug1.tm", "bug1")
        .with_file("bug2.tm", "terramate {test=1}")
        .build();

    let batches = workspace.change("terramate.tm", "stack {}");

    assert_eq!(
        uris(&batches),
        vec![
            workspace.uri("bug1.tm"),
            workspace.uri("bug2.tm"),
            workspace.uri("terramate.tm"),
        ]
    );
    assert_eq!(ranges(&batches[0]), vec![range((0, 0), (0, 4))]);
    assert!(batches[0].diagnostics[0].message.starts_with("HCL syntax error"));
    assert_eq!(ranges(&batches[1]), vec![range((0, 11), (0, 15))]);
    assert!(batches[1].diagnostics[0].message.starts_with("terramate schema error"));
    assert!(batches[2].is_empty());
}

#[test]
fn every_schema_violation_in_one_file_is_reported_in_parser_order() {
    let workspace = WorkspaceBuilder::new().build();
    let text = concat!(
        "\n",
        "terramate {\n",
        "    a = 1\n",
        "\tconfig {\n",
        "\t\tb = 1\n",
        "\t}\n",
        "\tinvalid {\n",
        "\n",
        "\t}\n",
        "}\n",
        "stack {\n",
        "\tn = \"a\"\n",
        "}\n",
    );

    let batches = workspace.change("terramate.tm", text);

    assert_eq!(uris(&batches), vec![workspace.uri("terramate.tm")]);
    assert_eq!(
        ranges(&batches[0]),
        vec![
            range((2, 4), (2, 5)),
            range((6, 1), (6, 10)),
            range((4, 2), (4, 3)),
            range((11, 1), (11, 2)),
        ]
    );
    assert!(batches[0]
        .diagnostics
        .iter()
        .all(|d| d.message.starts_with("terramate schema error")));
}

#[test]
fn multiple_schema_errors_in_a_sibling_share_one_batch() {
    let workspace = WorkspaceBuilder::new()
        .with_file("bug1.tm", "terramate {\n\ta = 1\n\tb = 2\n}\n")
        .build();

    let batches = workspace.change("terramate.tm", "");

    assert_eq!(uris(&batches), vec![workspace.uri("bug1.tm"), workspace.uri("terramate.tm")]);
    assert_eq!(
        ranges(&batches[0]),
        vec![range((1, 1), (1, 2)), range((2, 1), (2, 2))]
    );
}

#[test]
fn save_validates_disk_content_not_the_last_buffer() {
    let workspace = WorkspaceBuilder::new().with_file("stack.tm", "stack {}").build();

    let batches = workspace.change("stack.tm", "bug");
    assert_eq!(batches[0].diagnostics.len(), 1);

    // The editor saved a different, valid text than the last buffer.
    workspace.write("stack.tm", "stack {}\n");
    let batches = workspace.save("stack.tm");
    assert_eq!(batches, vec![DiagnosticBatch::empty(workspace.uri("stack.tm"))]);

    workspace.write("stack.tm", "bug");
    let batches = workspace.save("stack.tm");
    assert_eq!(batches.len(), 1);
    assert_eq!(ranges(&batches[0]), vec![range((0, 0), (0, 3))]);
}

#[test]
fn saving_a_missing_file_publishes_nothing() {
    let workspace = WorkspaceBuilder::new().build();

    assert!(workspace.save("gone.tm").is_empty());
}

#[test]
fn repeated_passes_are_identical() {
    let workspace = WorkspaceBuilder::new()
        .with_file("bug1.tm", "bug1")
        .with_file("globals.tm", "globals {}")
        .build();

    let first = workspace.change("terramate.tm", "terramate {test=1}");
    let second = workspace.change("terramate.tm", "terramate {test=1}");

    assert_eq!(first, second);
}

#[test]
fn fixing_the_last_error_clears_the_file() {
    let workspace = WorkspaceBuilder::new().build();

    let broken = workspace.change("terramate.tm", "bug");
    assert_eq!(broken.len(), 1);
    assert!(!broken[0].is_empty());

    let fixed = workspace.change("terramate.tm", "terramate {}");
    assert_eq!(fixed, vec![DiagnosticBatch::empty(workspace.uri("terramate.tm"))]);
}

#[rstest]
#[case::plain_hcl("main.hcl")]
#[case::terraform("main.tf")]
#[case::backup("stack.tm.bak")]
#[case::no_suffix("tm")]
fn files_without_config_suffix_are_never_checked(#[case] name: &str) {
    let workspace = WorkspaceBuilder::new().with_file(name, "bug").build();

    let batches = workspace.change("terramate.tm", "");

    assert_eq!(batches, vec![DiagnosticBatch::empty(workspace.uri("terramate.tm"))]);
}

#[test]
fn subdirectories_are_not_scanned() {
    let workspace = WorkspaceBuilder::new()
        .with_file("child/bug.tm", "bug")
        .with_file("stack.tm.hcl", "stack {}")
        .build();

    let batches = workspace.change("terramate.tm", "");

    assert_eq!(batches, vec![DiagnosticBatch::empty(workspace.uri("terramate.tm"))]);
}

#[test]
fn long_suffix_files_are_checked() {
    let workspace = WorkspaceBuilder::new()
        .with_file("config.tm.hcl", "bug")
        .build();

    let batches = workspace.change("terramate.tm", "");

    assert_eq!(
        uris(&batches),
        vec![workspace.uri("config.tm.hcl"), workspace.uri("terramate.tm")]
    );
}

#[test]
fn edits_in_a_nested_directory_scan_only_that_directory() {
    let workspace: TestWorkspace = WorkspaceBuilder::new()
        .with_file("bug.tm", "bug")
        .with_file("stacks/app/stack.tm", "stack {}")
        .build();

    let batches = workspace.change("stacks/app/stack.tm", "stack {}");

    assert_eq!(
        batches,
        vec![DiagnosticBatch::empty(workspace.uri("stacks/app/stack.tm"))]
    );
    assert!(workspace.root().join("bug.tm").exists());
}

#[test]
fn pathologically_nested_sibling_is_reported_not_fatal() {
    let depth = 100_000;
    let deep = format!("{}{}", "globals {\n".repeat(depth), "}\n".repeat(depth));
    let workspace = WorkspaceBuilder::new().with_file("deep.tm", deep.as_str()).build();

    let batches = workspace.change("terramate.tm", "");

    assert_eq!(uris(&batches), vec![workspace.uri("deep.tm"), workspace.uri("terramate.tm")]);
    assert_eq!(batches[0].diagnostics.len(), 1);
    assert!(batches[0].diagnostics[0].message.contains("nested too deeply"));
}

#[test]
fn errors_only_in_unscanned_files_still_clear_the_edited_file() {
    let workspace = WorkspaceBuilder::new()
        .with_file("stack.tm", "stack {}")
        .with_parser(Arc::new(BlamesElsewhere))
        .build();

    let batches = workspace.change("stack.tm", "stack {}");

    assert_eq!(batches, vec![DiagnosticBatch::empty(workspace.uri("stack.tm"))]);
}
