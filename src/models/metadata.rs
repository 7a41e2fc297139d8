use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::AddAssign;

use super::directive::ChangeType;

/// What happened to one file during a single patch batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMetadata {
    /// Change type of the last directive applied to the file
    pub change_type: ChangeType,
    /// File content before the first directive of the batch (empty for new files)
    #[serde(default)]
    pub original_content: String,
    /// Text carried by the last directive applied to the file
    #[serde(default)]
    pub content: String,
    /// Requested line for `insert` (1-based)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    /// Anchor line found by pattern search (1-based); absent when the pattern was missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_line_number: Option<usize>,
    /// The batch created this file
    #[serde(default)]
    pub created: bool,
}

/// Zero-based, half-open line interval of the patched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
}

/// "+added / -removed" counters shown next to a changed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
}

impl AddAssign for DiffStats {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.removed += rhs.removed;
    }
}

impl Sum for DiffStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, s| {
            acc += s;
            acc
        })
    }
}
