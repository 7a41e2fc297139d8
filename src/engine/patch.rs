use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::lines::{append_text, find_line_containing, splice_lines, split_lines};
use crate::error::{CodestepError, ErrorCode};
use crate::models::directive::{ChangeDirective, ChangeType};
use crate::models::file::{FileEntry, FileSet};
use crate::models::metadata::ChangeMetadata;

/// Per-file metadata for one batch, keyed by file name.
pub type MetadataMap = BTreeMap<String, ChangeMetadata>;

/// A directive the engine refused to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedDirective {
    /// Position of the directive in the batch (0-based)
    pub index: usize,
    pub file: String,
    pub change_type: ChangeType,
    pub error: CodestepError,
}

/// A non-fatal condition met while applying a directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchWarning {
    pub index: usize,
    pub file: String,
    pub code: ErrorCode,
    pub message: String,
}

/// Result of applying one batch of directives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchOutcome {
    pub files: FileSet,
    pub metadata: MetadataMap,
    /// First file the batch created, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_created: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedDirective>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PatchWarning>,
}

/// Validated form of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit<'a> {
    Replace(&'a str),
    Append(&'a str),
    Insert {
        index: usize,
        content: &'a str,
    },
    InsertAfter {
        pattern: Option<&'a str>,
        content: &'a str,
    },
    InsertBefore {
        pattern: Option<&'a str>,
        content: &'a str,
    },
}

impl<'a> TryFrom<&'a ChangeDirective> for Edit<'a> {
    type Error = CodestepError;

    fn try_from(d: &'a ChangeDirective) -> Result<Self, Self::Error> {
        let content = d.content.as_str();
        Ok(match &d.change_type {
            ChangeType::Replace => Edit::Replace(content),
            ChangeType::Append => Edit::Append(content),
            ChangeType::Insert => Edit::Insert {
                index: insert_index(d.line_number),
                content,
            },
            ChangeType::InsertAfter => Edit::InsertAfter {
                pattern: d.insert_after.as_deref(),
                content,
            },
            ChangeType::InsertBefore => Edit::InsertBefore {
                pattern: d.insert_before.as_deref(),
                content,
            },
            ChangeType::Unsupported(other) => {
                return Err(CodestepError::unsupported_change_type(other, &d.file));
            }
        })
    }
}

/// Zero-based splice index for a 1-based `line_number`; absent or < 1 means the top.
pub fn insert_index(line_number: Option<i64>) -> usize {
    match line_number {
        Some(n) if n >= 1 => usize::try_from(n - 1).unwrap_or(usize::MAX),
        _ => 0,
    }
}

struct Applied {
    content: String,
    anchor: Option<usize>,
    pattern_missing: bool,
}

impl Applied {
    fn plain(content: String) -> Self {
        Self {
            content,
            anchor: None,
            pattern_missing: false,
        }
    }
}

fn transform(current: &str, edit: Edit<'_>) -> Applied {
    match edit {
        Edit::Replace(content) => Applied::plain(content.to_string()),
        Edit::Append(content) => Applied::plain(append_text(current, content)),
        Edit::Insert { index, content } => {
            let lines = split_lines(current);
            Applied::plain(splice_lines(&lines, index, content))
        }
        Edit::InsertAfter { pattern, content } => insert_relative(current, pattern, content, 1),
        Edit::InsertBefore { pattern, content } => insert_relative(current, pattern, content, 0),
    }
}

/// Splice `content` at `matched + offset`; falls back to appending when the pattern is absent.
fn insert_relative(current: &str, pattern: Option<&str>, content: &str, offset: usize) -> Applied {
    let lines = split_lines(current);
    match pattern.and_then(|p| find_line_containing(&lines, p)) {
        Some(matched) => Applied {
            content: splice_lines(&lines, matched + offset, content),
            anchor: Some(matched + offset + 1),
            pattern_missing: false,
        },
        None => Applied {
            content: append_text(current, content),
            anchor: None,
            pattern_missing: true,
        },
    }
}

/// Apply `directives` in order to a copy of `files`.
///
/// Directives with an unrecognised change type are rejected one by one; the
/// rest of the batch still applies. The inputs are never modified.
pub fn apply_changes(files: &FileSet, directives: &[ChangeDirective]) -> PatchOutcome {
    let mut out = PatchOutcome {
        files: files.clone(),
        ..Default::default()
    };

    for (index, directive) in directives.iter().enumerate() {
        match Edit::try_from(directive) {
            Ok(edit) => apply_one(&mut out, index, directive, edit),
            Err(error) => {
                warn!(
                    index,
                    file = directive.file.as_str(),
                    change_type = directive.change_type.as_str(),
                    "directive rejected: unsupported change type"
                );
                out.rejected.push(RejectedDirective {
                    index,
                    file: directive.file.clone(),
                    change_type: directive.change_type.clone(),
                    error,
                });
            }
        }
    }

    debug!(
        directives = directives.len(),
        touched = out.metadata.len(),
        rejected = out.rejected.len(),
        warnings = out.warnings.len(),
        "apply_changes completed"
    );
    out
}

fn apply_one(out: &mut PatchOutcome, index: usize, directive: &ChangeDirective, edit: Edit<'_>) {
    let name = directive.file.as_str();
    let existing = out.files.content(name);
    let original = existing.unwrap_or_default().to_string();

    let (applied, created) = match existing {
        // Unknown files are created with the directive text, whatever the change type.
        None => (Applied::plain(directive.content.clone()), true),
        Some(current) => (transform(current, edit), false),
    };

    if applied.pattern_missing {
        let pattern = match edit {
            Edit::InsertAfter { pattern, .. } | Edit::InsertBefore { pattern, .. } => pattern,
            _ => None,
        };
        warn!(
            index,
            file = name,
            change_type = directive.change_type.as_str(),
            pattern = ?pattern,
            "pattern not found, appended to end of file"
        );
        out.warnings.push(PatchWarning {
            index,
            file: name.to_string(),
            code: ErrorCode::PatternNotFound,
            message: match pattern {
                Some(p) => format!("Pattern \"{p}\" not found in {name}; content appended"),
                None => format!("No pattern given for {name}; content appended"),
            },
        });
    }

    if created {
        debug!(index, file = name, "creating new file");
        out.files
            .upsert(FileEntry::new(name, applied.content).with_purpose(""));
        if out.first_created.is_none() {
            out.first_created = Some(name.to_string());
        }
    } else {
        out.files.set_content(name, applied.content);
    }

    let line_number = match edit {
        Edit::Insert { .. } => directive.line_number,
        _ => None,
    };

    match out.metadata.get_mut(name) {
        Some(meta) => {
            meta.change_type = directive.change_type.clone();
            meta.content = directive.content.clone();
            meta.line_number = line_number;
            meta.calculated_line_number = applied.anchor;
        }
        None => {
            out.metadata.insert(
                name.to_string(),
                ChangeMetadata {
                    change_type: directive.change_type.clone(),
                    original_content: original,
                    content: directive.content.clone(),
                    line_number,
                    calculated_line_number: applied.anchor,
                    created,
                },
            );
        }
    }
}
