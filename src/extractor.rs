//! Statement extraction from parsed offsets, plus the naive fallback split.
//!
//! The extractor slices the *original* script text with the byte offsets the
//! grammar reported, preserving exact original formatting. That matters for
//! dollar-quoted bodies spanning many lines and for comments that sit inside
//! a statement's boundary and are displayed with it.

use crate::parser::StatementNode;

/// Slice the original text into one trimmed statement per node.
///
/// Offset handling, per node `i`:
/// - missing location means 0; offsets are clamped into the text;
/// - the end comes from a positive `len`, else the next node's location,
///   else the end of the text;
/// - offsets are byte offsets and may come from an external collaborator, so
///   they are snapped down to UTF-8 character boundaries before slicing.
///
/// Empty or whitespace-only slices are dropped.
pub fn extract_statements(original_sql: &str, statements: &[StatementNode]) -> Vec<String> {
    let total = original_sql.len();
    let mut extracted = Vec::with_capacity(statements.len());

    for (i, node) in statements.iter().enumerate() {
        let start = node.location.unwrap_or(0).min(total);

        let end = match node.len {
            Some(len) if len > 0 => start.saturating_add(len),
            _ => match statements.get(i + 1).and_then(|next| next.location) {
                Some(next_start) => next_start,
                None => total,
            },
        };
        let end = end.clamp(start, total);

        let start = snap_to_char_boundary(original_sql, start);
        let end = snap_to_char_boundary(original_sql, end).max(start);

        let text = original_sql[start..end].trim();
        if !text.is_empty() {
            extracted.push(text.to_string());
        }
    }

    extracted
}

/// Largest char boundary at or below `index`.
fn snap_to_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Naive `;`-based splitter, used only when grammar parsing crashes.
///
/// Intentionally crude: semicolons embedded in function bodies or literals
/// are mis-split in this mode. That is an accepted degradation in exchange
/// for availability; the primary path handles those correctly.
pub fn fallback_split(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}
