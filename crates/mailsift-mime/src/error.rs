//! Error types for message parsing.

/// Result type alias for parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Parse error types.
///
/// Parsing is lenient: almost every irregularity is recovered from locally.
/// Only input that is not shaped like a message at all is reported.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input was empty or contained only whitespace.
    #[error("Empty message")]
    Empty,

    /// No header line could be parsed from the input.
    #[error("Not a message: no parseable header block")]
    NotAMessage,

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),
}
