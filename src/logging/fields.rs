//! Field helpers for structured log lines

/// Characters kept by [`truncate_preview`].
pub const PREVIEW_CHARS: usize = 100;

/// Shorten prompt or response text for a log preview.
///
/// Keeps the first [`PREVIEW_CHARS`] characters and appends `...` when
/// something was cut. Counts characters, not bytes, so multi-byte text is
/// never split.
///
/// ```
/// use llmdeck::logging::truncate_preview;
///
/// assert_eq!(truncate_preview("short"), "short");
/// assert!(truncate_preview(&"x".repeat(500)).ends_with("..."));
/// ```
pub fn truncate_preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// `"success"` or `"error"`, used as the `status` label of request counters.
pub fn outcome_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}
