//! Identifier derivation for resources the tool creates
//!
//! RDS identifiers must start with a letter, contain only ASCII letters,
//! digits and single hyphens, must not end with a hyphen and are limited
//! to 63 characters.

use crate::tags::{APP_NAME, format_time_token};
use chrono::{DateTime, Utc};

/// Maximum length of an RDS instance or snapshot identifier
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Derive an identifier of the form `<app>-<source>-<time token>`.
///
/// The source part is sanitized and shortened so the time token always
/// survives truncation.
pub fn derive_identifier(source: &str, now: DateTime<Utc>) -> String {
    let token = format_time_token(now);
    let room = MAX_IDENTIFIER_LEN - APP_NAME.len() - token.len() - 2;

    let source = sanitize(source);
    let source = source[..source.len().min(room)].trim_end_matches('-');

    if source.is_empty() {
        format!("{APP_NAME}-{token}")
    } else {
        format!("{APP_NAME}-{source}-{token}")
    }
}

/// Lowercase, replace disallowed characters with hyphens and collapse runs.
fn sanitize(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for c in source.chars() {
        let c = if c.is_ascii_alphanumeric() {
            c.to_ascii_lowercase()
        } else {
            '-'
        };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    out.trim_end_matches('-').to_string()
}
