//! Plain-text projection over the raw tag stream.
//!
//! Deliberately independent of the structured parser: it works on whatever
//! the model actually produced, so it still yields readable text when the
//! stream is malformed or truncated. All tags are stripped, each run of
//! content between tags is trimmed, and non-empty runs are joined with
//! newlines.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]+>").expect("tag pattern is valid"));

/// Strip every tag from a raw DocTags stream and join the remaining text
/// segments with newlines.
pub fn extract_plain_text(stream: &str) -> String {
    TAG.split(stream)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
