//! Retry/backoff helpers for GitHub API calls.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

const MAX_BACKOFF_SHIFT: usize = 6;

pub fn is_retryable_github_status(status: u16) -> bool {
    status == 408 || status == 429 || status >= 500
}

pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

/// Parses a `Retry-After` header as either delay-seconds or an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let retry_at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    let delay_ms = retry_at.signed_duration_since(Utc::now()).num_milliseconds();
    if delay_ms <= 0 {
        return Some(Duration::ZERO);
    }
    u64::try_from(delay_ms).ok().map(Duration::from_millis)
}

/// Exponential backoff from `base_delay_ms`, floored by any server-provided
/// `Retry-After` value.
pub fn retry_delay(base_delay_ms: u64, attempt: usize, retry_after: Option<Duration>) -> Duration {
    let shift = attempt.min(MAX_BACKOFF_SHIFT);
    let backoff = Duration::from_millis(base_delay_ms.max(1).saturating_mul(1_u64 << shift));
    match retry_after {
        Some(retry_after) => backoff.max(retry_after),
        None => backoff,
    }
}
