//! RFC 2047 encoded-word decoding for header values.

use super::charset::encoding_for_label;
use super::{decode_base64, decode_charset, decode_quoted_printable};

/// Longest token considered as an encoded word. RFC 2047 allows 75
/// characters; longer words from broken mailers are still accepted.
const MAX_WORD_LEN: usize = 1024;

/// A run of header text: literal text or one decoded encoded word.
enum Segment<'a> {
    Text(&'a str),
    Word { charset: &'a str, bytes: Vec<u8> },
}

/// Decodes every `=?charset?encoding?payload?=` token in a header value.
///
/// Encoding `B` is Base64, encoding `Q` is Quoted-Printable with `_` standing
/// for a space. Whitespace between two adjacent encoded words is removed.
/// Adjacent words in the same charset have their bytes joined before charset
/// conversion, so a multi-byte character split across words (emoji are the
/// usual suspects) comes out whole. Everything else passes through unchanged,
/// including tokens that merely look like encoded words.
#[must_use]
pub fn decode_encoded_words(raw: &str) -> String {
    if !raw.contains("=?") {
        return raw.to_string();
    }

    let mut result = String::with_capacity(raw.len());
    let mut pending: Option<(&str, Vec<u8>)> = None;
    let mut segments = split_segments(raw).into_iter().peekable();

    while let Some(segment) = segments.next() {
        match segment {
            Segment::Word { charset, bytes } => {
                let same_charset = pending
                    .as_ref()
                    .is_some_and(|(current, _)| same_charset(current, charset));
                if same_charset {
                    if let Some((_, buffer)) = pending.as_mut() {
                        buffer.extend_from_slice(&bytes);
                    }
                } else {
                    flush(&mut result, pending.take());
                    pending = Some((charset, bytes));
                }
            }
            Segment::Text(text) => {
                let between_words = pending.is_some()
                    && text.chars().all(char::is_whitespace)
                    && matches!(segments.peek(), Some(Segment::Word { .. }));
                if between_words {
                    continue;
                }
                flush(&mut result, pending.take());
                result.push_str(text);
            }
        }
    }
    flush(&mut result, pending);

    result
}

/// Checks whether two labels name the same charset, resolving aliases.
fn same_charset(a: &str, b: &str) -> bool {
    match (encoding_for_label(a), encoding_for_label(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.eq_ignore_ascii_case(b),
    }
}

fn flush(result: &mut String, pending: Option<(&str, Vec<u8>)>) {
    if let Some((charset, bytes)) = pending {
        result.push_str(&decode_charset(&bytes, charset));
    }
}

fn split_segments(raw: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while let Some(offset) = raw[pos..].find("=?") {
        let start = pos + offset;
        if let Some((charset, bytes, len)) = parse_word(&raw[start..]) {
            if literal_start < start {
                segments.push(Segment::Text(&raw[literal_start..start]));
            }
            segments.push(Segment::Word { charset, bytes });
            pos = start + len;
            literal_start = pos;
        } else {
            pos = start + 2;
        }
    }
    if literal_start < raw.len() {
        segments.push(Segment::Text(&raw[literal_start..]));
    }

    segments
}

/// Parses one encoded word at the start of `input`.
///
/// Returns the charset, the transfer-decoded bytes and the token length.
fn parse_word(input: &str) -> Option<(&str, Vec<u8>, usize)> {
    // Encoded words never contain whitespace
    let end = input
        .char_indices()
        .take_while(|&(i, c)| i < MAX_WORD_LEN && !c.is_whitespace())
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    let rest = input[..end].strip_prefix("=?")?;
    let charset_end = rest.find('?')?;
    let charset = &rest[..charset_end];
    if charset.is_empty() {
        return None;
    }

    let after_charset = &rest[charset_end + 1..];
    let encoding = *after_charset.as_bytes().first()?;
    if !encoding.is_ascii_alphabetic() || after_charset.as_bytes().get(1) != Some(&b'?') {
        return None;
    }

    let payload_area = &after_charset[2..];
    let payload_end = payload_area.find("?=")?;
    let payload = &payload_area[..payload_end];

    let bytes = match encoding.to_ascii_uppercase() {
        b'B' => decode_base64(payload, false).0,
        b'Q' => decode_quoted_printable(payload.replace('_', " ").as_bytes()),
        _ => return None,
    };

    let len = 2 + charset_end + 1 + 2 + payload_end + 2;
    Some((charset, bytes, len))
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
    use proptest::prelude::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(decode_encoded_words("Hello"), "Hello");
        assert_eq!(decode_encoded_words("a =? b ?= c"), "a =? b ?= c");
    }

    #[test]
    fn test_base64_word() {
        assert_eq!(decode_encoded_words("=?utf-8?B?SMOpbGxv?="), "Héllo");
        assert_eq!(decode_encoded_words("=?UTF-8?b?SGVsbG8=?="), "Hello");
    }

    #[test]
    fn test_q_word() {
        assert_eq!(decode_encoded_words("=?utf-8?Q?H=C3=A9llo?="), "Héllo");
        assert_eq!(decode_encoded_words("=?US-ASCII?Q?Keith_Moore?="), "Keith Moore");
        assert_eq!(
            decode_encoded_words("=?ISO-8859-1?Q?Keld_J=F8rn_Simonsen?="),
            "Keld Jørn Simonsen"
        );
    }

    #[test]
    fn test_rfc2047_examples() {
        // Examples from RFC 2047 section 8
        assert_eq!(decode_encoded_words("(=?ISO-8859-1?Q?a?=)"), "(a)");
        assert_eq!(decode_encoded_words("(=?ISO-8859-1?Q?a?= b)"), "(a b)");
        assert_eq!(decode_encoded_words("(=?ISO-8859-1?Q?a?= =?ISO-8859-1?Q?b?=)"), "(ab)");
        assert_eq!(decode_encoded_words("(=?ISO-8859-1?Q?a?=  =?ISO-8859-1?Q?b?=)"), "(ab)");
        assert_eq!(
            decode_encoded_words("(=?ISO-8859-1?Q?a?=\r\n    =?ISO-8859-1?Q?b?=)"),
            "(ab)"
        );
        assert_eq!(decode_encoded_words("(=?ISO-8859-1?Q?a_b?=)"), "(a b)");
        assert_eq!(
            decode_encoded_words("(=?ISO-8859-1?Q?a?= =?ISO-8859-2?Q?_b?=)"),
            "(a b)"
        );
    }

    #[test]
    fn test_mixed_text_and_words() {
        assert_eq!(decode_encoded_words("Hello =?UTF-8?B?V29ybGQ=?=!"), "Hello World!");
        assert_eq!(
            decode_encoded_words("=?utf-8?Q?one?= two =?utf-8?Q?three?="),
            "one two three"
        );
    }

    #[test]
    fn test_emoji_split_across_words() {
        // "😃" is F0 9F 98 83, split between two words
        let raw = "=?UTF-8?Q?subject_with_emojis_=F0=9F?= =?UTF-8?Q?=98=83=F0=9F=98=87?=";
        assert_eq!(decode_encoded_words(raw), "subject with emojis 😃😇");

        let raw = "=?UTF-8?B?c3ViamVjdCB3aXRoIGVtb2ppcyDw?=\r\n =?UTF-8?B?n5iD8J+Yhw==?=";
        assert_eq!(decode_encoded_words(raw), "subject with emojis 😃😇");
    }

    #[test]
    fn test_legacy_charsets() {
        assert_eq!(
            decode_encoded_words("=?iso-8859-8?b?7eXs+SDv4SDp7Oj08A==?="),
            "םולש ןב ילטפנ"
        );
        assert_eq!(decode_encoded_words("=?Shift_JIS?B?g2WDWINn?="), "テスト");
    }

    #[test]
    fn test_malformed_words_pass_through() {
        assert_eq!(decode_encoded_words("=?utf-8?X?abc?="), "=?utf-8?X?abc?=");
        assert_eq!(decode_encoded_words("=?utf-8?Q?abc"), "=?utf-8?Q?abc");
        assert_eq!(decode_encoded_words("=??Q?abc?="), "=??Q?abc?=");
    }

    #[test]
    fn test_charset_aliases_are_merged() {
        // "😃" split between two spellings of UTF-8
        assert_eq!(decode_encoded_words("=?utf-8?B?8J+Y?= =?UTF8?B?gw==?="), "😃");
        assert_eq!(decode_encoded_words("=?latin1?Q?caf?= =?ISO-8859-1?Q?=E9?="), "café");
    }

    #[test]
    fn test_words_do_not_span_whitespace() {
        assert_eq!(decode_encoded_words("=?utf-8?Q?a b?="), "=?utf-8?Q?a b?=");
        assert_eq!(
            decode_encoded_words("=?utf-8?Q?broken =?utf-8?Q?ok?="),
            "=?utf-8?Q?broken ok"
        );
    }

    #[test]
    fn test_many_unterminated_words() {
        let raw = "=?a?Q?x ".repeat(100_000);
        assert_eq!(decode_encoded_words(&raw), raw);

        let raw = "=?a?Q?x".repeat(20_000);
        assert_eq!(decode_encoded_words(&raw), raw);
    }

    proptest! {
        #[test]
        fn decode_never_panics(s in "(=\\?|\\?=|[a-zA-Z0-9_ =?é😃-]){0,40}") {
            let _ = decode_encoded_words(&s);
        }

        #[test]
        fn decode_without_marker_is_identity(s in "[^=]*") {
            prop_assert_eq!(decode_encoded_words(&s), s);
        }
    }
}
