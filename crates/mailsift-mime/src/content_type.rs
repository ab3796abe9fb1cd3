//! MIME content type and content disposition handling.

use crate::error::{Error, Result};
use crate::params::{parse_params, split_params};
use std::collections::HashMap;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart"), lower-cased.
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg"), lower-cased.
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx). Keys are lower-cased.
    pub parameters: HashMap<String, String>,
}

impl Default for ContentType {
    /// `text/plain; charset=us-ascii`, the RFC 2045 default.
    fn default() -> Self {
        Self::new("text", "plain").with_parameter("charset", "us-ascii")
    }
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present and non-empty.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters
            .get("boundary")
            .map(String::as_str)
            .filter(|b| !b.is_empty())
    }

    /// Returns the name parameter if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.parameters.get("name").map(String::as_str)
    }

    /// Returns the `type/subtype` string.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks for an exact `type/subtype` match.
    #[must_use]
    pub fn is(&self, main_type: &str, sub_type: &str) -> bool {
        self.main_type == main_type && self.sub_type == sub_type
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let pieces = split_params(s);
        let type_str = pieces.first().map_or("", |t| t.trim());

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype: {s}")))?;
        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidContentType(format!("Missing type: {s}")));
        }

        Ok(Self {
            main_type,
            sub_type,
            parameters: parse_params(pieces.into_iter().skip(1)),
        })
    }

    /// Parses a content type, falling back to the default on syntax errors.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Using default content type");
            Self::default()
        })
    }
}

/// Disposition type of a `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionKind {
    /// Displayed as part of the message.
    Inline,
    /// Offered as a separate file.
    Attachment,
    /// Any other token, lower-cased.
    Other(String),
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type.
    pub kind: DispositionKind,
    /// Parameters (e.g., filename). Keys are lower-cased.
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a content disposition. Never fails: an empty type is
    /// reported as [`DispositionKind::Other`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let pieces = split_params(s);
        let kind = pieces.first().map_or_else(String::new, |k| k.trim().to_lowercase());
        let kind = match kind.as_str() {
            "inline" => DispositionKind::Inline,
            "attachment" => DispositionKind::Attachment,
            _ => DispositionKind::Other(kind),
        };

        Self {
            kind,
            parameters: parse_params(pieces.into_iter().skip(1)),
        }
    }

    /// Returns the filename parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameters.get("filename").map(String::as_str)
    }

    /// Checks if this disposition marks an attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == DispositionKind::Attachment
    }

    /// Checks if this disposition is explicitly inline.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.kind == DispositionKind::Inline
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

    #[test]
    fn test_content_type_default() {
        let ct = ContentType::default();
        assert!(ct.is("text", "plain"));
        assert_eq!(ct.charset(), Some("us-ascii"));
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/Plain; charset=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert_eq!(ct.mime_type(), "text/plain");
    }

    #[test]
    fn test_content_type_parse_quoted_boundary() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("----=_Part_123"));
    }

    #[test]
    fn test_content_type_parse_unfolded_params() {
        let ct = ContentType::parse(
            "multipart/mixed; boundary=\"------------P7E1gxp6rCvfn0to5n3PZ2h0\"; protected-headers=\"v1\"",
        )
        .unwrap();
        assert_eq!(ct.boundary(), Some("------------P7E1gxp6rCvfn0to5n3PZ2h0"));
        assert_eq!(ct.parameters.get("protected-headers").unwrap(), "v1");
    }

    #[test]
    fn test_content_type_parse_errors() {
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("/plain").is_err());
    }

    #[test]
    fn test_content_type_parse_lenient() {
        assert_eq!(ContentType::parse_lenient("garbage"), ContentType::default());
        assert!(ContentType::parse_lenient("image/PNG").is("image", "png"));
    }

    #[test]
    fn test_empty_boundary_is_missing() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"\"").unwrap();
        assert_eq!(ct.boundary(), None);
    }

    #[test]
    fn test_content_disposition_parse() {
        let cd = ContentDisposition::parse("attachment; filename=\"test.png\"");
        assert!(cd.is_attachment());
        assert_eq!(cd.filename(), Some("test.png"));

        let cd = ContentDisposition::parse("INLINE");
        assert!(cd.is_inline());
        assert_eq!(cd.filename(), None);
    }

    #[test]
    fn test_content_disposition_other() {
        let cd = ContentDisposition::parse("form-data; name=field");
        assert_eq!(cd.kind, DispositionKind::Other("form-data".to_string()));
        assert!(!cd.is_attachment());
    }
}
