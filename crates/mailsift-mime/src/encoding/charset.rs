//! Charset-aware conversion of decoded content to text.

use encoding_rs::{Encoding, UTF_8};

/// Labels that name plain ASCII. Mail labelled this way frequently carries
/// unlabelled 8-bit UTF-8, so valid UTF-8 is preferred for these.
const ASCII_LABELS: &[&str] = &["us-ascii", "ascii", "ansi_x3.4-1968", "iso646-us", "646"];

/// Converts `bytes` in the charset named by `label` to a string.
///
/// Labels are matched case-insensitively, surrounding quotes and an RFC 2231
/// language suffix (`utf-8*en`) are ignored. Unknown labels fall back to
/// lossy UTF-8.
#[must_use]
pub fn decode_charset(bytes: &[u8], label: &str) -> String {
    let label = normalize_label(label);

    if label.is_empty() || ASCII_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return text.to_string();
        }
    }

    let encoding = lookup(label).unwrap_or_else(|| {
        tracing::debug!(charset = label, "Unknown charset, decoding as UTF-8");
        UTF_8
    });

    encoding.decode_with_bom_removal(bytes).0.into_owned()
}

/// Resolves a charset label to its encoding, so that aliases such as `utf-8`
/// and `UTF8` compare equal.
pub(crate) fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    lookup(normalize_label(label))
}

fn lookup(label: &str) -> Option<&'static Encoding> {
    if label.is_empty() {
        return None;
    }
    Encoding::for_label_no_replacement(label.as_bytes())
}

fn normalize_label(label: &str) -> &str {
    let label = label.trim().trim_matches('"').trim();
    label.split_once('*').map_or(label, |(charset, _language)| charset)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8() {
        assert_eq!(decode_charset("cöntäct".as_bytes(), "UTF-8"), "cöntäct");
        assert_eq!(decode_charset("cöntäct".as_bytes(), "utf8"), "cöntäct");
    }

    #[test]
    fn test_latin1() {
        assert_eq!(decode_charset(b"Andr\xe9", "ISO-8859-1"), "André");
        assert_eq!(decode_charset(b"Andr\xe9", "iso-8859-1*fr"), "André");
        assert_eq!(decode_charset(b"Andr\xe9", "\"latin1\""), "André");
    }

    #[test]
    fn test_shift_jis() {
        // "テスト" in Shift_JIS
        let bytes = [0x83, 0x65, 0x83, 0x58, 0x83, 0x67];
        assert_eq!(decode_charset(&bytes, "Shift_JIS"), "テスト");
        assert_eq!(decode_charset(&bytes, "shift-jis"), "テスト");
    }

    #[test]
    fn test_iso_8859_8() {
        assert_eq!(decode_charset(&[0xf9, 0xec, 0xe5, 0xed], "iso-8859-8"), "שלום");
    }

    #[test]
    fn test_ascii_label_prefers_valid_utf8() {
        assert_eq!(decode_charset("naïve".as_bytes(), "us-ascii"), "naïve");
        assert_eq!(decode_charset("naïve".as_bytes(), ""), "naïve");
        // Not UTF-8: decoded as windows-1252
        assert_eq!(decode_charset(b"na\xefve", "US-ASCII"), "naïve");
    }

    #[test]
    fn test_unknown_charset_falls_back_to_utf8() {
        assert_eq!(decode_charset("héllo".as_bytes(), "x-made-up"), "héllo");
        assert_eq!(decode_charset(b"h\xffllo", "x-made-up"), "h\u{FFFD}llo");
    }
}
