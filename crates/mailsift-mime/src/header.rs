//! Message header handling.

use crate::address::{AddressListEntry, parse_address_list};
use crate::date::parse_date;
use crate::encoding::decode_encoded_words;
use chrono::{DateTime, FixedOffset};
use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// One unfolded header line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HeaderField {
    /// Lower-cased header name.
    pub name: String,
    /// Raw (undecoded) value, unfolded and trimmed.
    pub value: String,
}

/// A header value interpreted according to its header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// Address list (`From`, `To`, `Cc`, ...).
    AddressList(Vec<AddressListEntry>),
    /// Parsed date (`Date`, `Resent-Date`).
    Date(DateTime<FixedOffset>),
    /// Unstructured text with encoded words decoded (`Subject`, ...).
    Text(String),
    /// Any other header, or a date that could not be parsed.
    Raw(String),
}

/// Collection of message headers in the order they appeared.
///
/// Names are case-insensitive. Repeated headers are all retained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<HeaderField>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(HeaderField {
            name: name.into().to_lowercase(),
            value: value.into(),
        });
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
            .map(|field| field.value.as_str())
    }

    /// Gets all values for a header, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| field.name.eq_ignore_ascii_case(name))
            .map(|field| field.value.as_str())
            .collect()
    }

    /// Checks if a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Checks if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the header lines in order.
    #[must_use]
    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    /// Returns an iterator over all `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|field| (field.name.as_str(), field.value.as_str()))
    }

    /// Groups values by name. Names keep the order of their first occurrence.
    #[must_use]
    pub fn grouped(&self) -> Vec<(&str, Vec<&str>)> {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (name, value) in self.iter() {
            match positions.entry(name) {
                Entry::Occupied(entry) => groups[*entry.get()].1.push(value),
                Entry::Vacant(entry) => {
                    entry.insert(groups.len());
                    groups.push((name, vec![value]));
                }
            }
        }
        groups
    }

    /// Returns the first value of a header with encoded words decoded.
    #[must_use]
    pub fn decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_encoded_words)
    }

    /// Parses the first value of an address list header.
    ///
    /// Returns `None` only when the header is absent; a present header that
    /// holds no addresses yields an empty list.
    #[must_use]
    pub fn address_list(&self, name: &str) -> Option<Vec<AddressListEntry>> {
        self.get(name).map(parse_address_list)
    }

    /// Parses the first value of a date header.
    #[must_use]
    pub fn date(&self, name: &str) -> Option<DateTime<FixedOffset>> {
        self.get(name).and_then(parse_date)
    }

    /// Returns the first value of a header, interpreted by header name.
    #[must_use]
    pub fn typed(&self, name: &str) -> Option<HeaderValue> {
        let value = self.get(name)?;
        let name = name.to_lowercase();

        let typed = match name.as_str() {
            "from" | "sender" | "reply-to" | "to" | "cc" | "bcc" | "resent-from" | "resent-sender"
            | "resent-to" | "resent-cc" | "resent-bcc" => {
                HeaderValue::AddressList(parse_address_list(value))
            }
            "date" | "resent-date" => {
                parse_date(value).map_or_else(|| HeaderValue::Raw(value.to_string()), HeaderValue::Date)
            }
            "subject" | "comments" | "keywords" => HeaderValue::Text(decode_encoded_words(value)),
            _ => HeaderValue::Raw(value.to_string()),
        };

        Some(typed)
    }

    /// Parses the header block at the start of `raw`.
    ///
    /// The block ends at the first empty line. Lines starting with a space or
    /// tab continue the previous header; lines without a colon are dropped.
    /// Returns the headers and the offset at which the body starts. Without
    /// an empty line, all of `raw` is headers and the body is empty.
    #[must_use]
    pub fn parse(raw: &[u8]) -> (Self, usize) {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;
        let mut pos = 0;

        let body_offset = loop {
            if pos >= raw.len() {
                break raw.len();
            }
            let (line, next) = next_line(raw, pos);
            pos = next;

            if line.is_empty() {
                break next;
            }

            // Check for continuation line (starts with space or tab)
            if line[0] == b' ' || line[0] == b'\t' {
                if let Some((_, value)) = current.as_mut() {
                    let continuation = header_text(line);
                    let continuation = continuation.trim();
                    if !continuation.is_empty() {
                        if !value.is_empty() {
                            value.push(' ');
                        }
                        value.push_str(continuation);
                    }
                } else {
                    tracing::trace!("Dropping continuation line without a header");
                }
                continue;
            }

            // Save previous header if exists
            if let Some((name, value)) = current.take() {
                headers.add(name, value);
            }

            let text = header_text(line);
            match text.split_once(':') {
                Some((name, value)) if is_valid_name(name.trim()) => {
                    current = Some((name.trim().to_string(), value.trim().to_string()));
                }
                _ => tracing::trace!(line = %text, "Dropping malformed header line"),
            }
        };

        if let Some((name, value)) = current {
            headers.add(name, value);
        }

        (headers, body_offset)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Headers {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.grouped())
    }
}

/// Returns the line starting at `pos` without its terminator, and the
/// position after the terminator. Accepts both CRLF and bare LF.
pub(crate) fn next_line(raw: &[u8], pos: usize) -> (&[u8], usize) {
    let rest = &raw[pos..];
    match rest.iter().position(|&b| b == b'\n') {
        Some(newline) => {
            let line = &rest[..newline];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            (line, pos + newline + 1)
        }
        None => {
            let line = rest.strip_suffix(b"\r").unwrap_or(rest);
            (line, raw.len())
        }
    }
}

/// Interprets header bytes as UTF-8, falling back to ISO-8859-1.
fn header_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(|c: char| c.is_whitespace() || c.is_control())
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
    use crate::address::Address;
    use proptest::prelude::*;

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
        assert_eq!(headers.fields()[0].name, "content-type");
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Body"
        );

        let (headers, offset) = Headers::parse(text.as_bytes());
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(headers.get("Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(&text[offset..], "Body");
    }

    #[test]
    fn test_headers_parse_lf_and_tab_continuation() {
        let text = "Content-Type: multipart/mixed;\n\tboundary=\"abc\"\nX-Empty:\n\nbody\n";
        let (headers, offset) = Headers::parse(text.as_bytes());
        assert_eq!(headers.get("content-type"), Some("multipart/mixed; boundary=\"abc\""));
        assert_eq!(headers.get("x-empty"), Some(""));
        assert_eq!(&text[offset..], "body\n");
    }

    #[test]
    fn test_headers_parse_duplicates_retained() {
        let text = "Received: one\nSubject: s\nReceived: two\n\n";
        let (headers, _) = Headers::parse(text.as_bytes());
        assert_eq!(headers.get_all("received"), vec!["one", "two"]);
        assert_eq!(
            headers.grouped(),
            vec![("received", vec!["one", "two"]), ("subject", vec!["s"])]
        );
    }

    #[test]
    fn test_grouped_many_names() {
        let mut headers = Headers::new();
        for round in 0..2 {
            for i in 0..5_000 {
                headers.add(format!("X-Header-{i}"), format!("{round}"));
            }
        }

        let groups = headers.grouped();
        assert_eq!(groups.len(), 5_000);
        assert_eq!(groups[0], ("x-header-0", vec!["0", "1"]));
        assert_eq!(groups[4_999], ("x-header-4999", vec!["0", "1"]));
    }

    #[test]
    fn test_headers_parse_drops_malformed_lines() {
        let text = " orphan continuation\nnot a header\nFrom a@b Sat Jan 3 01:05:34 1996\nSubject: ok\n\n";
        let (headers, _) = Headers::parse(text.as_bytes());
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("subject"), Some("ok"));
    }

    #[test]
    fn test_headers_parse_without_blank_line() {
        let text = "Subject: only headers\r\nX-Other: value";
        let (headers, offset) = Headers::parse(text.as_bytes());
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("x-other"), Some("value"));
        assert_eq!(offset, text.len());
    }

    #[test]
    fn test_headers_parse_leading_blank_line() {
        let (headers, offset) = Headers::parse(b"\r\nbody");
        assert!(headers.is_empty());
        assert_eq!(offset, 2);
    }

    #[test]
    fn test_headers_parse_latin1_bytes() {
        let (headers, _) = Headers::parse(b"Subject: caf\xe9\n\n");
        assert_eq!(headers.get("subject"), Some("café"));
    }

    #[test]
    fn test_headers_typed() {
        let text = concat!(
            "From: Some One <someone@test.com>\n",
            "Date: Sun, 12 Jun 2022 17:21:02 +0200\n",
            "Subject: =?utf-8?Q?caf=C3=A9?=\n",
            "Resent-Date: whenever\n",
            "X-Mailer: test\n",
            "\n"
        );
        let (headers, _) = Headers::parse(text.as_bytes());

        assert_eq!(
            headers.typed("From"),
            Some(HeaderValue::AddressList(vec![AddressListEntry::Address(Address::new(
                "Some One",
                "someone@test.com"
            ))]))
        );
        assert!(matches!(headers.typed("date"), Some(HeaderValue::Date(_))));
        assert_eq!(headers.typed("subject"), Some(HeaderValue::Text("café".to_string())));
        assert_eq!(headers.typed("resent-date"), Some(HeaderValue::Raw("whenever".to_string())));
        assert_eq!(headers.typed("x-mailer"), Some(HeaderValue::Raw("test".to_string())));
        assert_eq!(headers.typed("cc"), None);
    }

    #[test]
    fn test_next_line() {
        assert_eq!(next_line(b"ab\r\ncd", 0), (&b"ab"[..], 4));
        assert_eq!(next_line(b"ab\r\ncd", 4), (&b"cd"[..], 6));
        assert_eq!(next_line(b"ab\ncd", 0), (&b"ab"[..], 3));
    }

    proptest! {
        #[test]
        fn parse_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let (_, offset) = Headers::parse(&data);
            prop_assert!(offset <= data.len());
        }
    }
}
