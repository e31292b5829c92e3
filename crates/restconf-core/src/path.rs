//! Resource path decoding.
//!
//! RESTCONF resource paths are split on `/` before percent-decoding, so an
//! escaped `%2F` inside a key value stays part of its segment. Everything
//! else is decoded before the segment grammar is applied: an escaped `,`
//! separates keys and an escaped `=` or `:` is read as a delimiter exactly
//! like the literal character. Escapes are decoded as ISO-8859-1: every
//! `%XX` yields exactly the character `U+00XX`, never a multi-byte UTF-8
//! sequence.

use crate::error::{RestconfError, RestconfResult};

/// Split a slash-delimited path into percent-decoded segments.
///
/// Empty segments produced by leading, trailing or doubled slashes are
/// discarded. Order is preserved.
///
/// ```
/// # use restconf_core::path::decode_path;
/// let segments = decode_path("/test:top//list=a%2Cb/").unwrap();
/// assert_eq!(segments, vec!["test:top", "list=a,b"]);
/// ```
pub fn decode_path(path: &str) -> RestconfResult<Vec<String>> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(decode_segment)
        .collect()
}

/// Percent-decode a single segment.
///
/// Fails with [`RestconfError::Decode`] when a `%` is not followed by two
/// hexadecimal digits.
pub fn decode_segment(segment: &str) -> RestconfResult<String> {
    let mut decoded = String::with_capacity(segment.len());
    let mut chars = segment.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            decoded.push(c);
            continue;
        }

        let hi = chars.next().and_then(|h| h.to_digit(16));
        let lo = chars.next().and_then(|l| l.to_digit(16));
        match (hi, lo) {
            (Some(hi), Some(lo)) => decoded.push(char::from((hi * 16 + lo) as u8)),
            _ => {
                return Err(RestconfError::Decode {
                    segment: segment.to_string(),
                    reason: "'%' must be followed by two hex digits".to_string(),
                })
            }
        }
    }

    Ok(decoded)
}

/// Percent-encode a name or key so it can be placed back into a segment.
///
/// Unreserved characters pass through. Every other character in the
/// single-byte range is escaped, which keeps a `/` or `%` inside its
/// segment. Segments are decoded before keys are split, so an escaped `,`
/// or `=` still acts as a delimiter on the next parse. Characters outside
/// ISO-8859-1 cannot be represented by the codec and are emitted unchanged.
pub fn encode_segment(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for c in text.chars() {
        let code = c as u32;
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~') || code > 0xFF {
            encoded.push(c);
        } else {
            encoded.push_str(&format!("%{:02X}", code));
        }
    }
    encoded
}
