//! Lenient, chunked Base64 content decoding (RFC 2045 section 6.8).

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// Engine used once the input has been sanitized: padding is stripped before
/// decoding and stray low bits in the final quantum are tolerated.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Decodes one chunk of Base64 text.
///
/// Characters outside `[A-Za-z0-9+/=]` are ignored, and `=` runs that are
/// followed by more data are dropped. Base64 decodes in 4-character quanta:
/// when `more` is true, an incomplete trailing quantum is returned as the
/// leftover, which the caller prepends to the next chunk. When `more` is
/// false the incomplete quantum is discarded and the leftover is empty.
///
/// Returns the decoded bytes and the leftover.
#[must_use]
pub fn decode_base64(chunk: &str, more: bool) -> (Vec<u8>, String) {
    let mut sanitized = String::with_capacity(chunk.len());
    let mut padding = 0;
    for ch in chunk.chars() {
        match ch {
            '=' => padding += 1,
            'A'..='Z' | 'a'..='z' | '0'..='9' | '+' | '/' => {
                // Padding is only legal as a terminal run
                padding = 0;
                sanitized.push(ch);
            }
            _ => {}
        }
    }
    sanitized.extend(std::iter::repeat_n('=', padding));

    let excess = sanitized.len() % 4;
    let leftover = if excess != 0 && more {
        sanitized[sanitized.len() - excess..].to_string()
    } else {
        if excess != 0 {
            tracing::debug!(excess, "Discarding incomplete base64 quantum");
        }
        String::new()
    };
    sanitized.truncate(sanitized.len() - excess);

    let data = sanitized.trim_end_matches('=');
    // A lone sextet cannot encode a byte
    let data = if data.len() % 4 == 1 {
        &data[..data.len() - 1]
    } else {
        data
    };

    let decoded = LENIENT.decode(data).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Undecodable base64 chunk");
        Vec::new()
    });

    (decoded, leftover)
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
    use base64::engine::general_purpose::STANDARD;
    use proptest::prelude::*;

    #[test]
    fn test_decode_base64() {
        let (decoded, leftover) = decode_base64("SGVsbG8sIFdvcmxkIQ==", false);
        assert_eq!(decoded, b"Hello, World!");
        assert_eq!(leftover, "");
    }

    #[test]
    fn test_decode_ignores_foreign_characters() {
        let (decoded, _) = decode_base64("SGVs\r\nbG8s IFdv\tcmxk*IQ==\r\n", false);
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_decode_drops_padding_in_the_middle() {
        // "QQ==" followed by more data: the inner padding is removed
        let (decoded, leftover) = decode_base64("QQ==QUJD", true);
        assert_eq!(leftover, "JD");
        assert_eq!(decoded, b"A\x04\x14");
    }

    #[test]
    fn test_decode_streaming_leftover() {
        let (first, leftover) = decode_base64("QUJD\r\nRE", true);
        assert_eq!(first, b"ABC");
        assert_eq!(leftover, "RE");

        let (second, leftover) = decode_base64(&format!("{leftover}VG"), false);
        assert_eq!(second, b"DEF");
        assert_eq!(leftover, "");
    }

    #[test]
    fn test_decode_discards_incomplete_quantum_at_end() {
        let (decoded, leftover) = decode_base64("QUJDRA", false);
        assert_eq!(decoded, b"ABC");
        assert_eq!(leftover, "");
    }

    #[test]
    fn test_decode_collapses_excess_padding() {
        let (decoded, _) = decode_base64("QUJD====", false);
        assert_eq!(decoded, b"ABC");

        let (decoded, _) = decode_base64("QQ======", false);
        assert_eq!(decoded, b"A");
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode_base64("", false), (Vec::new(), String::new()));
        assert_eq!(decode_base64("\r\n", true), (Vec::new(), String::new()));
    }

    proptest! {
        #[test]
        fn decode_matches_standard_engine(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = STANDARD.encode(&data);
            prop_assert_eq!(decode_base64(&encoded, false), (data, String::new()));
        }

        #[test]
        fn decode_chunked_matches_whole(data in proptest::collection::vec(any::<u8>(), 0..256), split in 0usize..400) {
            let encoded = STANDARD.encode(&data);
            let split = split.min(encoded.len());
            let (mut decoded, leftover) = decode_base64(&encoded[..split], true);
            let (rest, leftover) = decode_base64(&format!("{leftover}{}", &encoded[split..]), false);
            decoded.extend(rest);
            prop_assert_eq!(decoded, data);
            prop_assert_eq!(leftover, "");
        }

        #[test]
        fn decode_never_panics(s in "\\PC*", more in any::<bool>()) {
            let _ = decode_base64(&s, more);
        }
    }
}
