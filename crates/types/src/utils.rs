//! Utility functions for dotted namespace paths and source positions

use crate::error::SourcePosition;

/// Split a dotted namespace path (`tool.coverage.run`) into its segments
pub fn split_path(path: &str) -> Vec<String> {
    path.split('.')
        .map(|segment| segment.trim().to_string())
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Render path segments back into dotted form, quoting segments that
/// would otherwise be ambiguous
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|segment| quote_key(segment.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}

/// Append a key to a dotted path
pub fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        quote_key(key)
    } else {
        format!("{}.{}", parent, quote_key(key))
    }
}

fn quote_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_string()
    } else {
        format!("\"{}\"", key.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Whether `prefix` is a proper prefix of `path`
pub fn is_proper_prefix<S: AsRef<str>, T: AsRef<str>>(prefix: &[S], path: &[T]) -> bool {
    prefix.len() < path.len()
        && prefix
            .iter()
            .zip(path.iter())
            .all(|(a, b)| a.as_ref() == b.as_ref())
}

/// Convert a byte offset into a 1-based line/column position
pub fn position_at(source: &str, offset: usize) -> SourcePosition {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }

    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = source[line_start..offset].chars().count() + 1;

    SourcePosition { line, column }
}

/// Human-readable, compact rendering of a value for diagnostics
pub fn truncate_for_display(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars).collect();
    format!("{}...", head)
}
