//! Helpers for turning paths and error text into log- and record-safe strings.

use std::path::{Component, Path};

/// Maximum length of error text embedded in a failure reason code.
pub const MAX_REASON_DETAIL: usize = 50;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: reveals the job or archive name without exposing
/// the mount layout.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Builds a machine-readable reason code embedding error text.
///
/// Spaces become underscores and the text is cut to [`MAX_REASON_DETAIL`]
/// characters, so `reason_code("erro_mover", "No space left")` yields
/// `erro_mover_No_space_left`.
pub fn reason_code(prefix: &str, detail: &str) -> String {
    let detail: String = detail
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .take(MAX_REASON_DETAIL)
        .collect();
    format!("{}_{}", prefix, detail)
}

/// Returns true if `segment` can be used as one directory name: non-empty,
/// not `.` or `..`, and free of separators and NUL.
pub fn is_safe_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

/// Returns true if `path` lies strictly below `root` without climbing
/// through `..` components.
pub fn is_within(root: &Path, path: &Path) -> bool {
    path != root
        && path.starts_with(root)
        && !path.components().any(|c| matches!(c, Component::ParentDir))
}
