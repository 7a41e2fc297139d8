use super::lines::line_count;
use super::patch::insert_index;
use crate::models::directive::ChangeType;
use crate::models::metadata::{ChangeMetadata, HighlightRange};

/// Lines of the patched file produced by the batch's last change.
///
/// A file created by the batch is highlighted whole, like `replace`, whatever
/// its change type. The per-type rules apply only to files that already existed.
///
/// Returns `None` when there is nothing sensible to highlight: an unresolved
/// anchor, an unsupported change type, or a range that is empty or runs past
/// the end of the file.
pub fn highlight_range(content_after: &str, meta: &ChangeMetadata) -> Option<HighlightRange> {
    let total = line_count(content_after);
    let inserted = line_count(&meta.content);

    let (start, end) = if meta.created {
        (0, total)
    } else {
        match &meta.change_type {
            ChangeType::Replace => (0, total),
            ChangeType::Append => (line_count(&meta.original_content), total),
            ChangeType::Insert => {
                let start = insert_index(meta.line_number);
                (start, start.saturating_add(inserted))
            }
            ChangeType::InsertAfter | ChangeType::InsertBefore => {
                let start = meta.calculated_line_number?.checked_sub(1)?;
                (start, start + inserted)
            }
            ChangeType::Unsupported(_) => return None,
        }
    };

    if end <= start || end > total {
        return None;
    }
    Some(HighlightRange { start, end })
}
