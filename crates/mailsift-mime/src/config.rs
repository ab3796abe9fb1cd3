//! Parser configuration types.

/// Default bound on MIME nesting.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Default charset for text parts without a `charset` parameter.
pub const DEFAULT_CHARSET: &str = "us-ascii";

/// How multiple plain-text body parts are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextPartPolicy {
    /// Join every plain-text body part, in tree order, with a line break.
    /// The line break is the message's own: CRLF when its first line ends
    /// in CRLF, LF otherwise.
    #[default]
    Concatenate,
    /// Keep only the first plain-text body part.
    First,
}

/// Message parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum multipart nesting depth. Deeper branches become opaque leaves.
    pub max_depth: usize,
    /// Charset assumed for text parts that do not declare one.
    pub default_charset: String,
    /// Plain-text body combination policy.
    pub text_parts: TextPartPolicy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            default_charset: DEFAULT_CHARSET.to_string(),
            text_parts: TextPartPolicy::default(),
        }
    }
}

impl ParserConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder::new()
    }
}

/// Builder for parser configuration.
#[derive(Debug, Clone, Default)]
pub struct ParserConfigBuilder {
    max_depth: Option<usize>,
    default_charset: Option<String>,
    text_parts: TextPartPolicy,
}

impl ParserConfigBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets the fallback charset for undeclared text parts.
    #[must_use]
    pub fn default_charset(mut self, charset: impl Into<String>) -> Self {
        self.default_charset = Some(charset.into());
        self
    }

    /// Sets the plain-text body policy.
    #[must_use]
    pub const fn text_parts(mut self, policy: TextPartPolicy) -> Self {
        self.text_parts = policy;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ParserConfig {
        ParserConfig {
            max_depth: self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            default_charset: self
                .default_charset
                .unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
            text_parts: self.text_parts,
        }
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
    fn test_config_default() {
        let config = ParserConfig::default();
        assert_eq!(config.max_depth, 50);
        assert_eq!(config.default_charset, "us-ascii");
        assert_eq!(config.text_parts, TextPartPolicy::Concatenate);
    }

    #[test]
    fn test_config_builder() {
        let config = ParserConfig::builder()
            .max_depth(4)
            .default_charset("iso-8859-1")
            .text_parts(TextPartPolicy::First)
            .build();

        assert_eq!(config.max_depth, 4);
        assert_eq!(config.default_charset, "iso-8859-1");
        assert_eq!(config.text_parts, TextPartPolicy::First);
    }

    #[test]
    fn test_config_builder_defaults() {
        assert_eq!(ParserConfig::builder().build(), ParserConfig::default());
    }
}
