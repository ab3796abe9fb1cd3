//! # mailsift-mime
//!
//! Lenient RFC 5322/MIME message parsing.
//!
//! ## Features
//!
//! - **Message parsing**: Headers, nested multipart trees, body text and HTML
//! - **Attachments**: Byte-exact decoded content with file name and Content-ID
//! - **Encoding/Decoding**: Base64 (streaming), Quoted-Printable, RFC 2047 headers
//! - **Charsets**: UTF-8 and legacy charsets such as Shift-JIS and ISO-8859-x
//! - **Addresses**: Address lists with display names, comments and groups
//!
//! Malformed input is recovered from wherever possible. Only input that is
//! not shaped like a message at all yields an [`Error`].
//!
//! ## Quick Start
//!
//! ```
//! let raw = "From: Some One <someone@test.com>\r\n\
//!            To: receiver@test.com\r\n\
//!            Subject: =?UTF-8?Q?caf=C3=A9?=\r\n\
//!            \r\n\
//!            Hello, World!";
//!
//! let message = mailsift_mime::parse(raw)?;
//! assert_eq!(message.subject, "café");
//! assert_eq!(message.from.unwrap().name, "Some One");
//! assert_eq!(message.body.text, "Hello, World!");
//! assert!(message.body.html.is_none());
//! # Ok::<(), mailsift_mime::Error>(())
//! ```
//!
//! ### Configuration
//!
//! ```
//! use mailsift_mime::{ParserConfig, TextPartPolicy};
//!
//! let config = ParserConfig::builder()
//!     .max_depth(10)
//!     .default_charset("iso-8859-1")
//!     .text_parts(TextPartPolicy::First)
//!     .build();
//!
//! let message = mailsift_mime::parse_with(b"Subject: x\r\n\r\ncaf\xe9", &config)?;
//! assert_eq!(message.body.text, "café");
//! # Ok::<(), mailsift_mime::Error>(())
//! ```
//!
//! ### Encoding/Decoding
//!
//! ```
//! use mailsift_mime::encoding::{decode_base64, decode_encoded_words, decode_quoted_printable};
//!
//! // Streaming base64: incomplete quads are carried over
//! let (bytes, leftover) = decode_base64("SGVsbG8", true);
//! assert_eq!(bytes, b"Hel");
//! assert_eq!(leftover, "bG8");
//!
//! assert_eq!(decode_quoted_printable(b"caf=C3=A9=\r\n!"), "café!".as_bytes());
//! assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?a?= =?ISO-8859-1?Q?b?="), "ab");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod content_type;
mod error;
mod header;
mod message;
mod params;
mod part;

pub mod address;
pub mod date;
pub mod encoding;

pub use address::{Address, AddressListEntry, Group};
pub use config::{ParserConfig, ParserConfigBuilder, TextPartPolicy};
pub use content_type::{ContentDisposition, ContentType, DispositionKind};
pub use error::{Error, Result};
pub use header::{HeaderField, HeaderValue, Headers};
pub use message::{Attachment, Body, ParsedMessage, parse, parse_with};
pub use part::{Part, PartBody, TransferEncoding};
