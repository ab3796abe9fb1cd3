//! MIME decoding utilities.
//!
//! Supports Base64 and Quoted-Printable content transfer encodings, charset
//! conversion and RFC 2047 header encoded words. Every decoder here is a pure
//! function: the only state, the Base64 leftover, is passed in and returned
//! explicitly.

mod base64;
mod charset;
mod quoted_printable;
mod rfc2047;

pub use self::base64::decode_base64;
pub use charset::decode_charset;
pub use quoted_printable::decode_quoted_printable;
pub use rfc2047::decode_encoded_words;
