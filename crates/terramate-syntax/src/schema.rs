//! Terramate block schema.
//!
//! Each body is checked in three passes: attributes first, then the block
//! types it contains, then the bodies of the recognised child blocks. The
//! resulting error order is the order problems are reported to callers.

use std::collections::HashSet;

use crate::errors::LocalError;
use crate::parser::{Block, Body};

enum Names {
    Any,
    Only(&'static [&'static str]),
}

enum Labels {
    None,
    Exactly(usize),
    Any,
}

struct Child {
    name: &'static str,
    labels: Labels,
    schema: &'static Schema,
}

enum Blocks {
    Any,
    Only(&'static [Child]),
}

struct Schema {
    attributes: Names,
    blocks: Blocks,
}

const UNCHECKED: Schema = Schema {
    attributes: Names::Any,
    blocks: Blocks::Any,
};

const CONFIG: Schema = Schema {
    attributes: Names::Only(&["experiments", "disable_safeguards"]),
    blocks: Blocks::Only(&[
        Child {
            name: "git",
            labels: Labels::None,
            schema: &UNCHECKED,
        },
        Child {
            name: "run",
            labels: Labels::None,
            schema: &UNCHECKED,
        },
        Child {
            name: "cloud",
            labels: Labels::None,
            schema: &UNCHECKED,
        },
        Child {
            name: "generate",
            labels: Labels::None,
            schema: &UNCHECKED,
        },
        Child {
            name: "change_detection",
            labels: Labels::None,
            schema: &UNCHECKED,
        },
    ]),
};

const TERRAMATE: Schema = Schema {
    attributes: Names::Only(&["required_version", "required_version_allow_prereleases"]),
    blocks: Blocks::Only(&[Child {
        name: "config",
        labels: Labels::None,
        schema: &CONFIG,
    }]),
};

const STACK: Schema = Schema {
    attributes: Names::Only(&[
        "id",
        "name",
        "description",
        "tags",
        "after",
        "before",
        "wants",
        "wanted_by",
        "watch",
    ]),
    blocks: Blocks::Only(&[]),
};

const FILE_ROOT: Schema = Schema {
    attributes: Names::Only(&[]),
    blocks: Blocks::Only(&[
        Child {
            name: "terramate",
            labels: Labels::None,
            schema: &TERRAMATE,
        },
        Child {
            name: "stack",
            labels: Labels::None,
            schema: &STACK,
        },
        Child {
            name: "globals",
            labels: Labels::Any,
            schema: &UNCHECKED,
        },
        Child {
            name: "generate_hcl",
            labels: Labels::Exactly(1),
            schema: &UNCHECKED,
        },
        Child {
            name: "generate_file",
            labels: Labels::Exactly(1),
            schema: &UNCHECKED,
        },
        Child {
            name: "import",
            labels: Labels::None,
            schema: &UNCHECKED,
        },
        Child {
            name: "script",
            labels: Labels::Any,
            schema: &UNCHECKED,
        },
        Child {
            name: "assert",
            labels: Labels::None,
            schema: &UNCHECKED,
        },
        Child {
            name: "vendor",
            labels: Labels::None,
            schema: &UNCHECKED,
        },
    ]),
};

/// Check a parsed file against the Terramate schema.
pub(crate) fn check_file(body: &Body) -> Vec<LocalError> {
    let mut errors = Vec::new();
    check_body(body, &FILE_ROOT, "the top level", &mut errors);
    errors
}

fn check_body(body: &Body, schema: &Schema, context: &str, errors: &mut Vec<LocalError>) {
    let mut seen = HashSet::new();
    for attribute in &body.attributes {
        if let Names::Only(allowed) = schema.attributes {
            if !allowed.contains(&attribute.name.as_str()) {
                errors.push(LocalError::schema(
                    attribute.start,
                    attribute.end,
                    format!("unrecognized attribute `{}` in {context}", attribute.name),
                ));
                continue;
            }
        }
        if !seen.insert(attribute.name.as_str()) {
            errors.push(LocalError::schema(
                attribute.start,
                attribute.end,
                format!("attribute `{}` redefined in {context}", attribute.name),
            ));
        }
    }

    let Blocks::Only(children) = schema.blocks else {
        return;
    };

    let mut recognised: Vec<(&Block, &Child)> = Vec::new();
    for block in &body.blocks {
        let Some(child) = children.iter().find(|child| child.name == block.kind) else {
            errors.push(LocalError::schema(
                block.start,
                block.end,
                format!("unrecognized block `{}` in {context}", block.kind),
            ));
            continue;
        };
        if let Some(problem) = label_problem(&child.labels, block.labels.len()) {
            errors.push(LocalError::schema(
                block.start,
                block.end,
                format!("`{}` block {problem}", block.kind),
            ));
            continue;
        }
        recognised.push((block, child));
    }

    for (block, child) in recognised {
        let context = format!("`{}` block", block.kind);
        check_body(&block.body, child.schema, &context, errors);
    }
}

fn label_problem(expected: &Labels, found: usize) -> Option<String> {
    match expected {
        Labels::Any => None,
        Labels::None if found == 0 => None,
        Labels::None => Some(format!("must not have labels, found {found}")),
        Labels::Exactly(count) if *count == found => None,
        Labels::Exactly(count) => Some(format!(
            "expects exactly {count} label(s), found {found}"
        )),
    }
}
