//! # Header Sanitization
//!
//! HTTP header values must stay within Latin-1 (code points 0–255). API keys
//! and custom header values pasted from rich-text sources routinely carry
//! smart quotes, em-dashes, and other typographic characters that the HTTP
//! client will reject. This module normalizes the common offenders and
//! reports the rest precisely.
//!
//! The asymmetry here is deliberate and load-bearing: sanitizing a single
//! value fails loudly with the offending code points, while sanitizing a
//! whole header set drops the bad entry with a warning and keeps going,
//! because callers assemble header sets from several independent sources and
//! one bad static header should not kill an otherwise valid request.

use crate::errors::DispatchError;
use tracing::warn;

/// Typographic characters that have an obvious Latin-1 stand-in.
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('\u{2018}', "'"),   // left single quote
    ('\u{2019}', "'"),   // right single quote
    ('\u{201C}', "\""),  // left double quote
    ('\u{201D}', "\""),  // right double quote
    ('\u{2013}', "-"),   // en dash
    ('\u{2014}', "-"),   // em dash
    ('\u{00A0}', " "),   // non-breaking space
    ('\u{2026}', "..."), // ellipsis
    ('\u{2022}', "*"),   // bullet
];

/// Returns true iff every character fits in a single Latin-1 byte.
pub fn is_valid_header_value(value: &str) -> bool {
    value.chars().all(|c| (c as u32) <= 255)
}

/// Sanitizes one header value.
///
/// Valid values pass through unchanged. Invalid ones get the fixed
/// substitution table applied; if characters outside Latin-1 remain after
/// that, the error names the header and each offending character by code
/// point so the user can find it in what they pasted.
pub fn sanitize_header_value(value: &str, header_name: &str) -> Result<String, DispatchError> {
    if is_valid_header_value(value) {
        return Ok(value.to_string());
    }

    let mut sanitized = String::with_capacity(value.len());
    for c in value.chars() {
        match SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
            Some((_, replacement)) => sanitized.push_str(replacement),
            None => sanitized.push(c),
        }
    }

    if is_valid_header_value(&sanitized) {
        return Ok(sanitized);
    }

    let offending: Vec<String> = sanitized
        .chars()
        .filter(|c| (*c as u32) > 255)
        .map(|c| format!("'{c}' (U+{:04X})", c as u32))
        .collect();
    Err(DispatchError::InvalidHeaderValue {
        header: header_name.to_string(),
        detail: offending.join(", "),
    })
}

/// Sanitizes a whole header set.
///
/// Entries that cannot be sanitized are dropped with a logged warning rather
/// than aborting the request.
pub fn sanitize_headers(headers: Vec<(String, String)>) -> Vec<(String, String)> {
    headers
        .into_iter()
        .filter_map(|(name, value)| match sanitize_header_value(&value, &name) {
            Ok(clean) => Some((name, clean)),
            Err(e) => {
                warn!("Dropping header '{name}' with unsanitizable value: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_values_are_valid() {
        assert!(is_valid_header_value("Bearer sk-abc123"));
        assert!(is_valid_header_value("It's a test"));
    }

    #[test]
    fn latin1_values_are_valid() {
        // 0xE9 fits in Latin-1 even though it is outside ASCII.
        assert!(is_valid_header_value("r\u{00E9}sum\u{00E9}"));
    }

    #[test]
    fn values_beyond_latin1_are_invalid() {
        assert!(!is_valid_header_value("It\u{2019}s a test"));
        assert!(!is_valid_header_value("\u{4F60}\u{597D}"));
    }

    #[test]
    fn valid_values_pass_through_unchanged() {
        let value = "It's a test";
        assert_eq!(
            sanitize_header_value(value, "Authorization").unwrap(),
            value
        );
    }

    #[test]
    fn smart_punctuation_is_substituted() {
        assert_eq!(
            sanitize_header_value("It\u{2019}s a test", "Authorization").unwrap(),
            "It's a test"
        );
        assert_eq!(
            sanitize_header_value("key\u{2014}with\u{2026}extras", "X-Key").unwrap(),
            "key-with...extras"
        );
    }

    #[test]
    fn unsubstitutable_characters_fail_with_code_points() {
        let err = sanitize_header_value("key\u{4F60}", "X-Api-Key").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("X-Api-Key"), "got: {message}");
        assert!(message.contains("U+4F60"), "got: {message}");
    }

    #[test]
    fn bulk_sanitize_drops_only_the_bad_entry() {
        let headers = vec![
            ("a".to_string(), "valid".to_string()),
            ("b".to_string(), "bad\u{4F60}value".to_string()),
            ("c".to_string(), "cur\u{2019}able".to_string()),
        ];
        let sanitized = sanitize_headers(headers);
        assert_eq!(
            sanitized,
            vec![
                ("a".to_string(), "valid".to_string()),
                ("c".to_string(), "cur'able".to_string()),
            ]
        );
    }
}
