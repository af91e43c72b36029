/// Bounds API error bodies before they are embedded in error messages.
pub fn truncate_for_error(raw: &str, max_chars: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let kept = trimmed.chars().take(max_chars).collect::<String>();
    format!("{kept}...")
}

/// Returns the first line of a commit or message body.
pub fn first_line(raw: &str) -> &str {
    raw.lines().next().unwrap_or_default()
}

/// Returns up to `max_words` leading whitespace-separated words, re-joined
/// with single spaces. Used for deriving issue titles from report bodies.
pub fn leading_words(raw: &str, max_words: usize) -> String {
    raw.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shortens a commit SHA to the conventional seven-character form.
pub fn short_sha(sha: &str) -> &str {
    if sha.len() <= 7 {
        sha
    } else {
        &sha[..7]
    }
}

/// Maps arbitrary identifiers onto a filesystem-safe name.
pub fn sanitize_for_path(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
