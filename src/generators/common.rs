//! Common utilities for document generation.
//!
//! Filename policy and the markup helpers both engines share.

use chrono::Utc;

use crate::models::RequestRecord;

/// Upper bound on a sanitized filename component.
pub const MAX_FILENAME_LEN: usize = 80;

/// Record fields tried, in order, for the human part of a filename.
const HOLDER_FIELDS: [&str; 3] = ["holder_name", "applicant_name", "business_name"];

fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, '-' | '_' | '.' | '/' | '\\' | ',' | ':' | ';' | '|' | '+')
}

/// Sanitize a string for use in filenames.
///
/// Keeps ASCII alphanumerics (case preserved), turns separator runs into a
/// single `_`, drops everything else, trims underscores and truncates to
/// [`MAX_FILENAME_LEN`]. Returns `fallback` when nothing survives.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let mut result = String::new();
    let mut pending_separator = false;

    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !result.is_empty() {
                result.push('_');
            }
            pending_separator = false;
            result.push(ch);
        } else if is_separator(ch) {
            pending_separator = true;
        }
    }

    // Only ASCII is left, so byte truncation is safe.
    result.truncate(MAX_FILENAME_LEN);
    let result = result.trim_matches('_');

    if result.is_empty() {
        fallback.to_string()
    } else {
        result.to_string()
    }
}

/// `[prefix_]segment_holder_id.pdf`, with a UTC timestamp standing in for a
/// missing id.
pub fn document_filename(prefix: Option<&str>, segment: &str, record: &RequestRecord) -> String {
    let holder = HOLDER_FIELDS
        .iter()
        .find_map(|field| record.non_empty(field))
        .unwrap_or_default();

    let id = record
        .id()
        .unwrap_or_else(|| Utc::now().format("%Y%m%d%H%M%S").to_string());

    let mut parts = Vec::with_capacity(4);
    if let Some(prefix) = prefix.filter(|p| !p.trim().is_empty()) {
        parts.push(sanitize_filename(prefix, "doc"));
    }
    parts.push(sanitize_filename(segment, "default"));
    parts.push(sanitize_filename(&holder, "Holder"));
    parts.push(sanitize_filename(&id, "document"));

    format!("{}.pdf", parts.join("_"))
}

/// Insert stylesheets as a `<style>` block right before `</head>`, or at the
/// very top when the markup has no head.
pub fn inject_styles(markup: &str, stylesheets: &[&str]) -> String {
    let css: Vec<&str> = stylesheets
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if css.is_empty() {
        return markup.to_string();
    }

    let block = format!("<style>\n{}\n</style>", css.join("\n"));
    match find_ascii_case_insensitive(markup, "</head>") {
        Some(pos) => {
            let mut out = String::with_capacity(markup.len() + block.len());
            out.push_str(&markup[..pos]);
            out.push_str(&block);
            out.push_str(&markup[pos..]);
            out
        }
        None => format!("{block}\n{markup}"),
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
