//! Foundational low-level utilities shared across triage crates.
//!
//! Provides atomic file-write helpers, time utilities, text helpers for
//! rendering and error truncation, and the append-only JSONL event log used
//! by the bridge runtime for durable inbound/outbound records.

pub mod atomic_io;
pub mod event_log;
pub mod text_utils;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use event_log::JsonlEventLog;
pub use text_utils::{first_line, leading_words, sanitize_for_path, short_sha, truncate_for_error};
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms};

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use serde_json::json;

    use super::*;

    #[test]
    fn time_utils_ms_and_seconds_agree() {
        let now_s = current_unix_timestamp();
        let now_ms = current_unix_timestamp_ms();
        let now_ms_s = now_ms / 1_000;
        assert!(now_ms_s >= now_s);
        assert!(now_ms_s <= now_s.saturating_add(1));
    }

    #[test]
    fn write_text_atomic_writes_content() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("state.json");
        write_text_atomic(&path, "{}\n").expect("write");
        assert_eq!(read_to_string(&path).expect("read"), "{}\n");
    }

    #[test]
    fn write_text_atomic_replaces_existing_content() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("state.json");
        write_text_atomic(&path, "first").expect("write first");
        write_text_atomic(&path, "second").expect("write second");
        assert_eq!(read_to_string(&path).expect("read"), "second");
    }

    #[test]
    fn jsonl_event_log_appends_one_line_per_event() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("events.jsonl");
        let log = JsonlEventLog::open(path.clone()).expect("open");
        log.append(&json!({"kind": "first"})).expect("append");
        log.append(&json!({"kind": "second"})).expect("append");
        let contents = read_to_string(&path).expect("read");
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("first"));
        assert!(lines[1].contains("second"));
    }

    #[test]
    fn unit_leading_words_caps_word_count() {
        assert_eq!(leading_words("one two three four", 2), "one two");
        assert_eq!(leading_words("  spaced   out  ", 3), "spaced out");
        assert_eq!(leading_words("short", 10), "short");
        assert_eq!(leading_words("", 10), "");
    }

    #[test]
    fn unit_first_line_drops_trailing_lines() {
        assert_eq!(first_line("subject\nbody\nmore"), "subject");
        assert_eq!(first_line("single"), "single");
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn unit_short_sha_truncates_to_seven() {
        assert_eq!(short_sha("abcdef1234567890"), "abcdef1");
        assert_eq!(short_sha("abc"), "abc");
    }

    #[test]
    fn unit_truncate_for_error_bounds_length() {
        assert_eq!(truncate_for_error("short", 32), "short");
        let long = "x".repeat(64);
        let truncated = truncate_for_error(&long, 16);
        assert!(truncated.len() < long.len());
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn unit_sanitize_for_path_replaces_unsafe_characters() {
        assert_eq!(sanitize_for_path("owner/repo"), "owner_repo");
        assert_eq!(sanitize_for_path("plain-name_1.2"), "plain-name_1.2");
    }
}
