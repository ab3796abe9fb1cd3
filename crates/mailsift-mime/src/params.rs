//! MIME header parameter lists (`; key=value; ...`).
//!
//! Handles quoted values, RFC 2231 extended values and continuations, and
//! RFC 2047 encoded words inside values (widely produced for `filename`).

use crate::encoding::{decode_charset, decode_encoded_words};
use std::collections::HashMap;

/// One RFC 2231 section (`name*N` or `name*N*`).
struct Section {
    index: u32,
    encoded: bool,
    value: String,
}

/// Splits a header value at top-level `;` separators, honoring quotes.
///
/// The first element is the value before any parameter.
pub(crate) fn split_params(input: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                pieces.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&input[start..]);

    pieces
}

/// Parses `key=value` pieces into a lower-cased parameter map.
pub(crate) fn parse_params<'a>(pieces: impl IntoIterator<Item = &'a str>) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    let mut sections: HashMap<String, Vec<Section>> = HashMap::new();

    for piece in pieces {
        let Some((key, value)) = piece.split_once('=') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        let value = unquote(value.trim());

        match key.split_once('*') {
            None => {
                parameters.insert(key, value);
            }
            Some((name, suffix)) => {
                let encoded = suffix.ends_with('*') || suffix.is_empty();
                let index = suffix.trim_end_matches('*').parse().unwrap_or(0);
                sections.entry(name.to_string()).or_default().push(Section {
                    index,
                    encoded,
                    value,
                });
            }
        }
    }

    for (name, sections) in sections {
        parameters.insert(name, join_sections(sections));
    }

    for value in parameters.values_mut() {
        if value.contains("=?") {
            *value = decode_encoded_words(value);
        }
    }

    parameters
}

/// Joins RFC 2231 sections in index order and decodes the result.
fn join_sections(mut sections: Vec<Section>) -> String {
    sections.sort_by_key(|section| section.index);

    let mut charset = None;
    let mut bytes = Vec::new();
    for (position, section) in sections.iter().enumerate() {
        if !section.encoded {
            bytes.extend_from_slice(section.value.as_bytes());
            continue;
        }
        let mut value = section.value.as_str();
        if position == 0 {
            // charset'language'value
            let mut fields = value.splitn(3, '\'');
            if let (Some(cs), Some(_language), Some(rest)) = (fields.next(), fields.next(), fields.next()) {
                charset = Some(cs.to_string());
                value = rest;
            }
        }
        bytes.extend(percent_encoding::percent_decode_str(value));
    }

    decode_charset(&bytes, charset.as_deref().unwrap_or("utf-8"))
}

/// Strips surrounding quotes and resolves backslash escapes.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"') else {
        return value.to_string();
    };

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            }
            '"' => break,
            _ => result.push(ch),
        }
    }

    result
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

    fn params(input: &str) -> HashMap<String, String> {
        parse_params(split_params(input).into_iter().skip(1))
    }

    #[test]
    fn test_split_honors_quotes() {
        let pieces = split_params("multipart/mixed; boundary=\"a;b\"; charset=utf-8");
        assert_eq!(pieces, vec!["multipart/mixed", " boundary=\"a;b\"", " charset=utf-8"]);
    }

    #[test]
    fn test_simple_params() {
        let p = params("text/plain; charset=UTF-8; format=flowed");
        assert_eq!(p.get("charset").unwrap(), "UTF-8");
        assert_eq!(p.get("format").unwrap(), "flowed");
    }

    #[test]
    fn test_trailing_semicolon_and_empty_pieces() {
        let p = params("text/plain; charset=UTF-8;;  ;");
        assert_eq!(p.len(), 1);
        assert_eq!(p.get("charset").unwrap(), "UTF-8");
    }

    #[test]
    fn test_quoted_value_with_escapes() {
        let p = params(r#"attachment; filename="my \"quoted\" file.txt""#);
        assert_eq!(p.get("filename").unwrap(), "my \"quoted\" file.txt");
    }

    #[test]
    fn test_keys_are_lowercased() {
        let p = params("text/plain; Charset=utf-8");
        assert_eq!(p.get("charset").unwrap(), "utf-8");
    }

    #[test]
    fn test_rfc2231_extended_value() {
        let p = params("attachment; filename*=iso-8859-1'en'%A3%20rates.txt");
        assert_eq!(p.get("filename").unwrap(), "£ rates.txt");
    }

    #[test]
    fn test_rfc2231_continuations() {
        let p = params(
            "attachment; filename*1*=%C3%A9.txt; filename*0*=utf-8''r%C3%A9sum; title*0=\"plain \"; title*1=text",
        );
        assert_eq!(p.get("filename").unwrap(), "résumé.txt");
        assert_eq!(p.get("title").unwrap(), "plain text");
    }

    #[test]
    fn test_encoded_word_value() {
        let p = params("image/png; name=\"=?UTF-8?B?w6lsw6h2ZS5wbmc=?=\"");
        assert_eq!(p.get("name").unwrap(), "élève.png");
    }
}
