//! Parsed message assembly.

use crate::address::{Address, AddressListEntry};
use crate::config::{ParserConfig, TextPartPolicy};
use crate::content_type::ContentDisposition;
use crate::encoding::decode_charset;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::part::Part;
use chrono::{DateTime, FixedOffset};

/// Message body text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Body {
    /// Plain-text body, empty if the message has none.
    pub text: String,
    /// HTML body, `None` if the message has no HTML part.
    pub html: Option<String>,
}

/// A decoded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Attachment {
    /// Transfer-decoded content. Never charset-converted.
    pub content: Vec<u8>,
    /// Lower-cased `type/subtype`.
    pub content_type: String,
    /// `Content-ID` header value.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub content_id: Option<String>,
    /// File name, empty if none was declared.
    pub file_name: String,
    /// Content length in bytes.
    pub size: usize,
    /// Whether the part was explicitly marked `inline`.
    pub inline: bool,
}

impl Attachment {
    fn from_part(part: Part) -> Self {
        let file_name = part.file_name().unwrap_or_default().to_string();
        let inline = part
            .disposition
            .as_ref()
            .is_some_and(ContentDisposition::is_inline);
        let content_type = part.content_type.mime_type();
        let content = part.content().map(<[u8]>::to_vec).unwrap_or_default();

        Self {
            size: content.len(),
            content,
            content_type,
            content_id: part.content_id,
            file_name,
            inline,
        }
    }
}

/// A fully parsed message.
///
/// Optional address fields distinguish a missing header (`None`) from a
/// present header that holds no addresses (`Some(vec![])`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ParsedMessage {
    /// Decoded subject, empty if absent.
    pub subject: String,
    /// All top-level headers.
    pub headers: Headers,
    /// First mailbox of the `From` header.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub from: Option<Address>,
    /// `To` recipients.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub to: Option<Vec<AddressListEntry>>,
    /// `Cc` recipients.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub cc: Option<Vec<AddressListEntry>>,
    /// `Bcc` recipients.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub bcc: Option<Vec<AddressListEntry>>,
    /// `Reply-To` addresses.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub reply_to: Option<Vec<AddressListEntry>>,
    /// Raw `Message-ID` value.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub message_id: Option<String>,
    /// Parsed `Date` header.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub date: Option<DateTime<FixedOffset>>,
    /// Body text and HTML.
    pub body: Body,
    /// Attachments in tree order.
    pub attachments: Vec<Attachment>,
}

/// Parses a raw message with the default configuration.
///
/// # Errors
///
/// Returns [`Error::Empty`] for blank input and [`Error::NotAMessage`] when
/// no header line can be parsed. Every other irregularity is recovered from.
pub fn parse(raw: impl AsRef<[u8]>) -> Result<ParsedMessage> {
    parse_with(raw, &ParserConfig::default())
}

/// Parses a raw message.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_with(raw: impl AsRef<[u8]>, config: &ParserConfig) -> Result<ParsedMessage> {
    let raw = raw.as_ref();
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::Empty);
    }

    let (headers, offset) = Headers::parse(raw);
    if headers.is_empty() {
        return Err(Error::NotAMessage);
    }
    tracing::trace!(headers = headers.len(), body_len = raw.len() - offset, "Parsed header block");

    let mut root = Part::parse(headers, &raw[offset..], config);
    let headers = std::mem::take(&mut root.headers);

    let from = headers
        .address_list("from")
        .and_then(|entries| entries.iter().flat_map(AddressListEntry::mailboxes).next().cloned());

    let mut texts = Vec::new();
    let mut html = None;
    let mut attachments = Vec::new();

    for leaf in root.into_leaves() {
        if leaf.is_attachment() {
            attachments.push(Attachment::from_part(leaf));
        } else if leaf.content_type.is("text", "html") {
            if html.is_none() {
                html = Some(leaf_text(&leaf, config));
            }
        } else {
            texts.push(leaf_text(&leaf, config));
        }
    }

    let text = match config.text_parts {
        TextPartPolicy::Concatenate => texts.join(line_break(raw)),
        TextPartPolicy::First => texts.into_iter().next().unwrap_or_default(),
    };

    Ok(ParsedMessage {
        subject: headers.decoded("subject").unwrap_or_default(),
        from,
        to: headers.address_list("to"),
        cc: headers.address_list("cc"),
        bcc: headers.address_list("bcc"),
        reply_to: headers.address_list("reply-to"),
        message_id: headers.get("message-id").map(str::to_string),
        date: headers.date("date"),
        body: Body { text, html },
        attachments,
        headers,
    })
}

/// Returns the line terminator of the first header line.
fn line_break(raw: &[u8]) -> &'static str {
    match raw.iter().position(|&b| b == b'\n') {
        Some(newline) if newline > 0 && raw[newline - 1] == b'\r' => "\r\n",
        _ => "\n",
    }
}

/// Converts a body leaf to text using its declared charset.
fn leaf_text(part: &Part, config: &ParserConfig) -> String {
    let charset = part
        .content_type
        .charset()
        .unwrap_or(config.default_charset.as_str());
    decode_charset(part.content().unwrap_or_default(), charset)
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

    const ALTERNATIVE: &str = concat!(
        "From: Sender <sender@example.com>\r\n",
        "Subject: Alternative\r\n",
        "Content-Type: multipart/alternative; boundary=\"alt\"\r\n",
        "\r\n",
        "--alt\r\n",
        "Content-Type: text/html; charset=utf-8\r\n",
        "\r\n",
        "<p>first</p>\r\n",
        "--alt\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "\r\n",
        "one\r\n",
        "--alt\r\n",
        "Content-Type: text/html\r\n",
        "\r\n",
        "<p>second</p>\r\n",
        "--alt\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "two\r\n",
        "--alt--\r\n"
    );

    #[test]
    fn test_parse_simple_message() {
        let raw = "From: a@example.com\nSubject: Hello\n\nBody text\n";
        let message = parse(raw).unwrap();
        assert_eq!(message.subject, "Hello");
        assert_eq!(message.from, Some(Address::new("", "a@example.com")));
        assert_eq!(message.body.text, "Body text\n");
        assert_eq!(message.body.html, None);
        assert!(message.attachments.is_empty());
        assert_eq!(message.to, None);
        assert_eq!(message.date, None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse(""), Err(Error::Empty)));
        assert!(matches!(parse(" \r\n\t"), Err(Error::Empty)));
        assert!(matches!(parse("\r\nno headers here"), Err(Error::NotAMessage)));
        assert!(matches!(parse(b"\x00\x01\x02"), Err(Error::NotAMessage)));
    }

    #[test]
    fn test_text_parts_concatenated_first_html_wins() {
        let message = parse(ALTERNATIVE).unwrap();
        assert_eq!(message.body.html.as_deref(), Some("<p>first</p>"));
        assert_eq!(message.body.text, "one\r\ntwo");
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn test_text_parts_joined_with_message_line_break() {
        let lf = ALTERNATIVE.replace("\r\n", "\n");
        assert_eq!(parse(&lf).unwrap().body.text, "one\ntwo");

        assert_eq!(line_break(b"Subject: x\r\n\r\n"), "\r\n");
        assert_eq!(line_break(b"Subject: x\n\n"), "\n");
        assert_eq!(line_break(b"Subject: x"), "\n");
    }

    #[test]
    fn test_text_parts_first_policy() {
        let config = ParserConfig::builder().text_parts(TextPartPolicy::First).build();
        let message = parse_with(ALTERNATIVE, &config).unwrap();
        assert_eq!(message.body.text, "one");
    }

    #[test]
    fn test_attachment_fields() {
        let raw = concat!(
            "Subject: files\n",
            "Content-Type: multipart/mixed; boundary=b\n",
            "\n",
            "--b\n",
            "Content-Type: text/plain; name=\"notes.txt\"\n",
            "Content-Disposition: attachment\n",
            "\n",
            "café\n",
            "--b\n",
            "Content-Type: image/gif\n",
            "Content-Disposition: inline; filename=\"dot.gif\"\n",
            "Content-ID: <dot@x>\n",
            "Content-Transfer-Encoding: base64\n",
            "\n",
            "R0lG\n",
            "--b--\n"
        );
        let message = parse(raw).unwrap();
        assert_eq!(message.body.text, "");
        assert_eq!(message.attachments.len(), 2);

        let notes = &message.attachments[0];
        assert_eq!(notes.content_type, "text/plain");
        assert_eq!(notes.file_name, "notes.txt");
        assert_eq!(notes.content, "café".as_bytes());
        assert_eq!(notes.size, 5);
        assert!(!notes.inline);

        let gif = &message.attachments[1];
        assert_eq!(gif.content, b"GIF");
        assert_eq!(gif.file_name, "dot.gif");
        assert_eq!(gif.content_id.as_deref(), Some("<dot@x>"));
        assert!(gif.inline);
    }

    #[test]
    fn test_charset_conversion() {
        let raw = b"Content-Type: text/plain; charset=iso-8859-1\n\ncaf\xe9";
        assert_eq!(parse(raw).unwrap().body.text, "café");

        let raw = b"Content-Type: text/plain\n\ncaf\xc3\xa9";
        assert_eq!(parse(raw).unwrap().body.text, "café");

        let config = ParserConfig::builder().default_charset("iso-8859-1").build();
        let raw = b"Content-Type: text/plain\n\ncaf\xe9";
        assert_eq!(parse_with(raw, &config).unwrap().body.text, "café");
    }

    #[test]
    fn test_header_fields() {
        let raw = concat!(
            "From: =?utf-8?Q?J=C3=B6rg?= <joerg@example.com>, other@example.com\n",
            "To: team: a@example.com;\n",
            "Bcc:\n",
            "Reply-To: replies@example.com\n",
            "Message-ID: <id@example.com>\n",
            "Date: Sun, 12 Jun 2022 17:21:02 +0200\n",
            "\n",
            "hi"
        );
        let message = parse(raw).unwrap();
        assert_eq!(message.from, Some(Address::new("Jörg", "joerg@example.com")));
        assert_eq!(message.to.as_ref().unwrap()[0].mailboxes().len(), 1);
        assert_eq!(message.bcc, Some(Vec::new()));
        assert_eq!(message.cc, None);
        assert_eq!(
            message.reply_to,
            Some(vec![AddressListEntry::Address(Address::new("", "replies@example.com"))])
        );
        assert_eq!(message.message_id.as_deref(), Some("<id@example.com>"));
        assert_eq!(message.date.unwrap().timestamp(), 1_655_047_262);
        assert_eq!(message.headers.get("date"), Some("Sun, 12 Jun 2022 17:21:02 +0200"));
    }

    #[test]
    fn test_from_without_mailbox() {
        let message = parse("From: undisclosed:;\n\nx").unwrap();
        assert_eq!(message.from, None);
    }

    #[test]
    fn test_headers_only_message() {
        let message = parse("Subject: no body").unwrap();
        assert_eq!(message.subject, "no body");
        assert_eq!(message.body.text, "");
        assert_eq!(message.body.html, None);
    }
}
