//! MIME part tree construction.

use crate::config::ParserConfig;
use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{decode_base64, decode_quoted_printable};
use crate::header::{Headers, next_line};

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string. Unknown values mean no encoding.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }

    /// Decodes a complete body in this encoding.
    #[must_use]
    pub fn decode(self, raw: &[u8]) -> Vec<u8> {
        match self {
            Self::Base64 => decode_base64(&String::from_utf8_lossy(raw), false).0,
            Self::QuotedPrintable => decode_quoted_printable(raw),
            Self::SevenBit | Self::EightBit | Self::Binary => raw.to_vec(),
        }
    }
}

/// Content of a MIME part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    /// Child parts of a multipart, in order. May be empty.
    Multipart(Vec<Part>),
    /// Transfer-decoded content of a leaf.
    Leaf(Vec<u8>),
}

/// MIME message part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Content type. Without a `Content-Type` header this is `text/plain`
    /// with the configured default charset (`us-ascii` unless changed).
    pub content_type: ContentType,
    /// Content transfer encoding.
    pub transfer_encoding: TransferEncoding,
    /// Content disposition, if declared.
    pub disposition: Option<ContentDisposition>,
    /// `Content-ID` header value, if present.
    pub content_id: Option<String>,
    /// Children or decoded content.
    pub body: PartBody,
}

impl Part {
    /// Builds the part tree for a body with the given headers.
    ///
    /// Multipart bodies are split at their boundary and each segment is parsed
    /// recursively. Leaves are transfer-decoded. A multipart without a
    /// boundary, or nested deeper than `config.max_depth`, is kept as an
    /// opaque leaf.
    #[must_use]
    pub fn parse(headers: Headers, raw_body: &[u8], config: &ParserConfig) -> Self {
        Self::parse_at_depth(headers, raw_body, 0, config)
    }

    fn parse_at_depth(headers: Headers, raw_body: &[u8], depth: usize, config: &ParserConfig) -> Self {
        let content_type = headers.get("content-type").map_or_else(
            || ContentType::default().with_parameter("charset", config.default_charset.as_str()),
            ContentType::parse_lenient,
        );
        let transfer_encoding = headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse);
        let disposition = headers.get("content-disposition").map(ContentDisposition::parse);
        let content_id = headers.get("content-id").map(str::to_string);

        let body = match content_type.boundary() {
            Some(boundary) if content_type.is_multipart() && depth < config.max_depth => {
                let children = split_multipart(raw_body, boundary)
                    .into_iter()
                    .map(|segment| {
                        let (child_headers, offset) = Headers::parse(segment);
                        Self::parse_at_depth(child_headers, &segment[offset..], depth + 1, config)
                    })
                    .collect();
                PartBody::Multipart(children)
            }
            boundary => {
                if content_type.is_multipart() {
                    if boundary.is_none() {
                        tracing::debug!("Multipart without boundary, keeping as opaque leaf");
                    } else {
                        tracing::debug!(depth, "MIME nesting limit reached, keeping as opaque leaf");
                    }
                }
                PartBody::Leaf(transfer_encoding.decode(raw_body))
            }
        };

        Self {
            headers,
            content_type,
            transfer_encoding,
            disposition,
            content_id,
            body,
        }
    }

    /// Checks if this part holds child parts.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self.body, PartBody::Multipart(_))
    }

    /// Returns the child parts (empty for leaves).
    #[must_use]
    pub fn children(&self) -> &[Part] {
        match &self.body {
            PartBody::Multipart(children) => children,
            PartBody::Leaf(_) => &[],
        }
    }

    /// Returns the decoded content of a leaf.
    #[must_use]
    pub fn content(&self) -> Option<&[u8]> {
        match &self.body {
            PartBody::Leaf(content) => Some(content),
            PartBody::Multipart(_) => None,
        }
    }

    /// Checks if this leaf is an attachment rather than body text.
    ///
    /// Only `text/plain` and `text/html` leaves without an attachment
    /// disposition count as body text.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        if self.is_multipart() {
            return false;
        }
        let is_body_type =
            self.content_type.is("text", "plain") || self.content_type.is("text", "html");
        !is_body_type || self.disposition.as_ref().is_some_and(ContentDisposition::is_attachment)
    }

    /// Returns the file name: the disposition `filename`, then the
    /// content type `name`.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.disposition
            .as_ref()
            .and_then(ContentDisposition::filename)
            .or_else(|| self.content_type.name())
    }

    /// Iterates over this part and all descendants, depth-first, pre-order.
    pub fn walk(&self) -> impl Iterator<Item = &Part> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let part = stack.pop()?;
            stack.extend(part.children().iter().rev());
            Some(part)
        })
    }

    /// Consumes the tree and returns its leaves, depth-first, pre-order.
    #[must_use]
    pub fn into_leaves(self) -> Vec<Part> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];
        while let Some(mut part) = stack.pop() {
            match std::mem::replace(&mut part.body, PartBody::Multipart(Vec::new())) {
                PartBody::Multipart(children) => stack.extend(children.into_iter().rev()),
                leaf @ PartBody::Leaf(_) => {
                    part.body = leaf;
                    leaves.push(part);
                }
            }
        }
        leaves
    }
}

/// Splits a multipart body into the raw segments between its delimiters.
///
/// The preamble and epilogue are discarded. The line break before each
/// delimiter belongs to the delimiter. Without a closing delimiter the last
/// segment runs to the end of input.
fn split_multipart<'a>(raw: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let mut segments = Vec::new();
    let mut segment_start: Option<usize> = None;
    let mut pos = 0;

    while pos < raw.len() {
        let line_start = pos;
        let (line, next) = next_line(raw, pos);
        pos = next;

        let Some(kind) = delimiter_kind(line, delimiter.as_bytes()) else {
            continue;
        };
        if let Some(start) = segment_start {
            segments.push(&raw[start..segment_end(raw, start, line_start)]);
        }
        if kind == Delimiter::Close {
            return segments;
        }
        segment_start = Some(next);
    }

    if let Some(start) = segment_start {
        tracing::debug!(boundary, "Multipart without closing delimiter");
        segments.push(&raw[start.min(raw.len())..]);
    }

    segments
}

#[derive(Debug, PartialEq, Eq)]
enum Delimiter {
    Separator,
    Close,
}

fn delimiter_kind(line: &[u8], delimiter: &[u8]) -> Option<Delimiter> {
    let rest = line.strip_prefix(delimiter)?;
    let (close, rest) = match rest.strip_prefix(b"--") {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    // Transport padding may follow a delimiter
    if !rest.iter().all(|b| matches!(b, b' ' | b'\t')) {
        return None;
    }
    Some(if close { Delimiter::Close } else { Delimiter::Separator })
}

/// End of a segment that is followed by a delimiter line at `line_start`.
fn segment_end(raw: &[u8], start: usize, line_start: usize) -> usize {
    let mut end = line_start;
    if end > start && raw[end - 1] == b'\n' {
        end -= 1;
        if end > start && raw[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end.max(start)
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

    fn parse(raw: &str) -> Part {
        parse_with(raw, &ParserConfig::default())
    }

    fn parse_with(raw: &str, config: &ParserConfig) -> Part {
        let (headers, offset) = Headers::parse(raw.as_bytes());
        Part::parse(headers, &raw.as_bytes()[offset..], config)
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse(" Base64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse("x-uuencode"), TransferEncoding::SevenBit);
    }

    #[test]
    fn test_transfer_encoding_decode() {
        assert_eq!(TransferEncoding::Base64.decode(b"AQID\r\n"), vec![1, 2, 3]);
        assert_eq!(TransferEncoding::QuotedPrintable.decode(b"a=3Db=\r\nc"), b"a=bc");
        assert_eq!(TransferEncoding::Binary.decode(b"\x00\xff"), vec![0, 255]);
    }

    #[test]
    fn test_leaf_defaults() {
        let part = parse("Subject: hi\n\nHello\n");
        assert!(part.content_type.is("text", "plain"));
        assert_eq!(part.content_type.charset(), Some("us-ascii"));
        assert_eq!(part.content(), Some(&b"Hello\n"[..]));
    }

    #[test]
    fn test_multipart_split() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n",
            "\r\n",
            "preamble\r\n",
            "--XYZ\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "first\r\n",
            "--XYZ\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AQID\r\n",
            "--XYZ--\r\n",
            "epilogue\r\n"
        );
        let part = parse(raw);
        assert!(part.is_multipart());
        let children = part.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].content(), Some(&b"first"[..]));
        assert_eq!(children[1].content(), Some(&[1u8, 2, 3][..]));
        assert!(children[1].is_attachment());
        assert!(!children[0].is_attachment());
    }

    #[test]
    fn test_nested_multipart_walk_order() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=outer\n",
            "\n",
            "--outer\n",
            "Content-Type: multipart/alternative; boundary=inner\n",
            "\n",
            "--inner\n",
            "Content-Type: text/plain\n",
            "\n",
            "plain\n",
            "--inner\n",
            "Content-Type: text/html\n",
            "\n",
            "<p>html</p>\n",
            "--inner--\n",
            "--outer\n",
            "Content-Type: image/png\n",
            "Content-Disposition: attachment; filename=a.png\n",
            "\n",
            "png\n",
            "--outer--\n"
        );
        let part = parse(raw);
        let types: Vec<String> = part.walk().map(|p| p.content_type.mime_type()).collect();
        assert_eq!(
            types,
            vec![
                "multipart/mixed",
                "multipart/alternative",
                "text/plain",
                "text/html",
                "image/png"
            ]
        );

        let leaves = part.into_leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[2].file_name(), Some("a.png"));
        assert_eq!(leaves[1].content(), Some(&b"<p>html</p>"[..]));
    }

    #[test]
    fn test_missing_terminator_closes_at_end() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\n\nfirst\n--b\n\nsecond\n";
        let part = parse(raw);
        let children = part.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].content(), Some(&b"second\n"[..]));
    }

    #[test]
    fn test_missing_boundary_is_opaque_leaf() {
        let raw = "Content-Type: multipart/mixed\n\n--b\n\nbody\n--b--\n";
        let part = parse(raw);
        assert!(!part.is_multipart());
        assert_eq!(part.content(), Some(raw.split_once("\n\n").unwrap().1.as_bytes()));
        assert!(part.is_attachment());
    }

    #[test]
    fn test_empty_multipart() {
        let part = parse("Content-Type: multipart/mixed; boundary=b\n\nno delimiters here\n");
        assert!(part.is_multipart());
        assert!(part.children().is_empty());
        assert!(part.into_leaves().is_empty());
    }

    #[test]
    fn test_nesting_limit() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=a\n",
            "\n",
            "--a\n",
            "Content-Type: multipart/mixed; boundary=b\n",
            "\n",
            "--b\n",
            "\n",
            "deep\n",
            "--b--\n",
            "--a--\n"
        );
        let config = ParserConfig::builder().max_depth(1).build();
        let part = parse_with(raw, &config);
        let child = &part.children()[0];
        assert!(!child.is_multipart());
        assert_eq!(child.content(), Some(&b"--b\n\ndeep\n--b--"[..]));

        let part = parse(raw);
        assert_eq!(part.children()[0].children()[0].content(), Some(&b"deep"[..]));
    }

    #[test]
    fn test_boundary_prefix_is_not_delimiter() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\n\n--bogus line\n--b--\n";
        let part = parse(raw);
        assert_eq!(part.children().len(), 1);
        assert_eq!(part.children()[0].content(), Some(&b"--bogus line"[..]));
    }

    #[test]
    fn test_empty_segment() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\nContent-Type: text/rfc822-headers\n\n--b--\n";
        let part = parse(raw);
        let child = &part.children()[0];
        assert!(child.content_type.is("text", "rfc822-headers"));
        assert_eq!(child.content(), Some(&b""[..]));
    }

    #[test]
    fn test_content_id_and_name_fallback() {
        let raw = concat!(
            "Content-Type: image/png; name=\"logo.png\"\n",
            "Content-ID: <logo@example.com>\n",
            "\n",
            "png"
        );
        let part = parse(raw);
        assert_eq!(part.content_id.as_deref(), Some("<logo@example.com>"));
        assert_eq!(part.file_name(), Some("logo.png"));
    }

    #[test]
    fn test_text_attachment_disposition() {
        let part = parse("Content-Type: text/plain\nContent-Disposition: attachment\n\nnotes");
        assert!(part.is_attachment());
        let part = parse("Content-Type: text/html\nContent-Disposition: inline\n\n<b>hi</b>");
        assert!(!part.is_attachment());
    }
}
