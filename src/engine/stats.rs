use super::lines::line_count;
use crate::models::directive::ChangeType;
use crate::models::metadata::{ChangeMetadata, DiffStats};

/// Coarse "+added / -removed" counters for one change.
///
/// Only `replace` reports removals. Every other kind counts the whole new
/// file as added rather than the inserted delta; consumers rely on this.
pub fn diff_stats(
    change_type: &ChangeType,
    created: bool,
    original_lines: usize,
    new_lines: usize,
) -> DiffStats {
    if created {
        return DiffStats {
            added: new_lines,
            removed: 0,
        };
    }
    match change_type {
        ChangeType::Replace => DiffStats {
            added: new_lines,
            removed: original_lines,
        },
        _ => DiffStats {
            added: new_lines,
            removed: 0,
        },
    }
}

/// Counters for a file given its metadata and patched content.
pub fn stats_for(content_after: &str, meta: &ChangeMetadata) -> DiffStats {
    diff_stats(
        &meta.change_type,
        meta.created,
        line_count(&meta.original_content),
        line_count(content_after),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_counts_both_sides() {
        let s = diff_stats(&ChangeType::Replace, false, 10, 4);
        assert_eq!(s, DiffStats { added: 4, removed: 10 });
    }

    #[test]
    fn non_replace_counts_whole_file_as_added() {
        for t in [
            ChangeType::Append,
            ChangeType::Insert,
            ChangeType::InsertAfter,
            ChangeType::InsertBefore,
        ] {
            assert_eq!(diff_stats(&t, false, 10, 12), DiffStats { added: 12, removed: 0 });
        }
    }

    #[test]
    fn created_file_has_no_removals() {
        let s = diff_stats(&ChangeType::Replace, true, 1, 3);
        assert_eq!(s, DiffStats { added: 3, removed: 0 });
    }

    #[test]
    fn totals_sum() {
        let total: DiffStats = [
            DiffStats { added: 1, removed: 2 },
            DiffStats { added: 3, removed: 0 },
        ]
        .into_iter()
        .sum();
        assert_eq!(total, DiffStats { added: 4, removed: 2 });
    }
}
