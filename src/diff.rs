//! Line-based edit computation between two versions of a document.

use similar::{DiffOp, TextDiff};
use tower_lsp::lsp_types::{Position, Range, TextEdit};

fn line_range(start: usize, end: usize) -> Range {
    Range {
        start: Position::new(start as u32, 0),
        end: Position::new(end as u32, 0),
    }
}

/// Compute the minimal set of whole-line edits turning `before` into `after`.
///
/// Edits are expressed against `before` and ordered by position.
pub fn compute_edits(before: &str, after: &str) -> Vec<TextEdit> {
    let diff = TextDiff::from_lines(before, after);
    let new_lines: Vec<&str> = diff.new_slices().to_vec();
    let joined = |from: usize, len: usize| new_lines[from..from + len].concat();

    diff.ops()
        .iter()
        .filter_map(|op| match *op {
            DiffOp::Equal { .. } => None,
            DiffOp::Delete {
                old_index, old_len, ..
            } => Some(TextEdit::new(line_range(old_index, old_index + old_len), String::new())),
            DiffOp::Insert {
                old_index,
                new_index,
                new_len,
            } => Some(TextEdit::new(line_range(old_index, old_index), joined(new_index, new_len))),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => Some(TextEdit::new(
                line_range(old_index, old_index + old_len),
                joined(new_index, new_len),
            )),
        })
        .collect()
}
