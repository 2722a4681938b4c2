//! Log Redaction
//!
//! Scrubs API keys, bearer tokens, and base64 image payloads from strings
//! before they are logged.

use regex::Regex;
use std::sync::LazyLock;

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-or-v1-[a-zA-Z0-9]{16,})|(sk-[a-zA-Z0-9]{32,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)")
        .unwrap()
});
static DATA_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data:[a-z]+/[a-z0-9.+-]+;base64,[A-Za-z0-9+/=]+").unwrap());

/// Longest redacted string emitted; upstream error bodies can be large.
const MAX_LOGGED_CHARS: usize = 2_000;

/// Redacts sensitive patterns in a string and caps its length.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]");
    let redacted = DATA_URL_RE.replace_all(&redacted, "[INLINE_DATA]");

    if redacted.chars().count() > MAX_LOGGED_CHARS {
        let mut cut: String = redacted.chars().take(MAX_LOGGED_CHARS).collect();
        cut.push_str("...[truncated]");
        cut
    } else {
        redacted.into_owned()
    }
}
