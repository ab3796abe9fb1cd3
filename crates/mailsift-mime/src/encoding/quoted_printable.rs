//! Quoted-Printable content decoding (RFC 2045 section 6.7).

/// Decodes one chunk of Quoted-Printable text into raw bytes.
///
/// Every `=XX` hex escape (either case) becomes the byte it names, and every
/// soft line break (`=` followed by optional spaces or tabs and then a line
/// terminator or the end of input) is removed. Malformed escapes are passed
/// through literally.
///
/// Quoted-Printable carries no state across lines, so chunks can be decoded
/// independently.
#[must_use]
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        let byte = input[pos];
        if byte != b'=' {
            result.push(byte);
            pos += 1;
            continue;
        }

        // Hex encoded byte
        let hi = input.get(pos + 1).copied().and_then(hex_value);
        let lo = input.get(pos + 2).copied().and_then(hex_value);
        if let (Some(hi), Some(lo)) = (hi, lo) {
            result.push((hi << 4) | lo);
            pos += 3;
            continue;
        }

        // Soft line break, possibly with trailing whitespace before the terminator
        let mut end = pos + 1;
        while matches!(input.get(end), Some(b' ' | b'\t')) {
            end += 1;
        }
        match input.get(end) {
            None => pos = end,
            Some(b'\n') => pos = end + 1,
            Some(b'\r') if input.get(end + 1) == Some(&b'\n') => pos = end + 2,
            Some(b'\r') => pos = end + 1,
            Some(_) => {
                result.push(b'=');
                pos += 1;
            }
        }
    }

    result
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
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
    fn test_decode_hex_escapes() {
        assert_eq!(decode_quoted_printable(b"H=C3=A9llo"), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable(b"H=c3=a9llo"), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable(b"a=3Db"), b"a=b");
    }

    #[test]
    fn test_soft_line_break_crlf() {
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld"), b"HelloWorld");
    }

    #[test]
    fn test_soft_line_break_variants() {
        assert_eq!(decode_quoted_printable(b"Hello=\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=\rWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello= \t\r\nWorld"), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello="), b"Hello");
        assert_eq!(decode_quoted_printable(b"Hello=  "), b"Hello");
    }

    #[test]
    fn test_hard_line_breaks_kept() {
        assert_eq!(decode_quoted_printable(b"line one\r\nline two"), b"line one\r\nline two");
    }

    #[test]
    fn test_malformed_escapes_pass_through() {
        assert_eq!(decode_quoted_printable(b"50% =ZZ off"), b"50% =ZZ off");
        assert_eq!(decode_quoted_printable(b"=4"), b"=4");
        assert_eq!(decode_quoted_printable(b"a = b"), b"a = b");
    }

    #[test]
    fn test_binary_bytes() {
        assert_eq!(decode_quoted_printable(b"=00=FF=80"), vec![0x00, 0xFF, 0x80]);
    }

    proptest! {
        #[test]
        fn decode_without_equals_is_identity(s in "[^=]*") {
            prop_assert_eq!(decode_quoted_printable(s.as_bytes()), s.as_bytes());
        }

        #[test]
        fn decode_never_grows(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert!(decode_quoted_printable(&data).len() <= data.len());
        }
    }
}
