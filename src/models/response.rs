use serde::Serialize;

use super::file::FileSet;
use super::metadata::{DiffStats, HighlightRange};
use crate::engine::decode::DecodeIssue;
use crate::engine::patch::{MetadataMap, PatchWarning, RejectedDirective};

/// The response envelope for the apply command.
#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub files: FileSet,
    pub metadata: MetadataMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_created: Option<String>,
    /// One entry per touched file, in file-set order
    pub changes: Vec<FileChangeReport>,
    pub totals: DiffStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedDirective>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PatchWarning>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DecodeIssue>,
}

/// Display annotations for one touched file.
#[derive(Debug, Clone, Serialize)]
pub struct FileChangeReport {
    pub file: String,
    pub hash: String,
    pub highlight: Option<HighlightRange>,
    pub stats: DiffStats,
}

/// Response for the highlight command.
#[derive(Debug, Clone, Serialize)]
pub struct HighlightReport {
    pub highlight: Option<HighlightRange>,
}
