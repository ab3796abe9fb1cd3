//! `mailsift` - Parse an email message and print it as JSON
//!
//! Reads a raw RFC 5322/MIME message from a file or stdin.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mailsift_mime::{ParserConfig, TextPartPolicy, parse_with};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Message file to parse. Reads stdin when omitted or `-`.
    path: Option<PathBuf>,

    /// Maximum MIME nesting depth
    #[arg(long, default_value_t = ParserConfig::default().max_depth)]
    max_depth: usize,

    /// Keep only the first plain-text part as body text
    #[arg(long)]
    first_text: bool,

    /// Charset for text parts that do not declare one
    #[arg(long)]
    default_charset: Option<String>,

    /// Print compact instead of pretty JSON
    #[arg(long)]
    compact: bool,
}

impl Cli {
    fn parser_config(&self) -> ParserConfig {
        let mut builder = ParserConfig::builder().max_depth(self.max_depth);
        if self.first_text {
            builder = builder.text_parts(TextPartPolicy::First);
        }
        if let Some(charset) = &self.default_charset {
            builder = builder.default_charset(charset.as_str());
        }
        builder.build()
    }

    fn read_input(&self) -> Result<Vec<u8>> {
        match self.path.as_deref() {
            Some(path) if path.as_os_str() != "-" => {
                std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
            }
            _ => {
                let mut raw = Vec::new();
                io::stdin()
                    .read_to_end(&mut raw)
                    .context("Failed to read stdin")?;
                Ok(raw)
            }
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging on stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailsift=info,mailsift_mime=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.parser_config();
    debug!(?config, "Parser configuration");

    let raw = cli.read_input()?;
    info!(bytes = raw.len(), "Parsing message");

    let message = parse_with(&raw, &config).context("Failed to parse message")?;
    info!(
        attachments = message.attachments.len(),
        has_html = message.body.html.is_some(),
        "Parsed message"
    );

    let mut stdout = io::stdout().lock();
    let written = if cli.compact {
        serde_json::to_writer(&mut stdout, &message)
    } else {
        serde_json::to_writer_pretty(&mut stdout, &message)
    };
    written.context("Failed to write JSON")?;
    writeln!(stdout)?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parser_config() {
        let cli = Cli::parse_from(["mailsift", "--max-depth", "3", "--first-text", "msg.eml"]);
        let config = cli.parser_config();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.text_parts, TextPartPolicy::First);
        assert_eq!(config.default_charset, "us-ascii");
        assert_eq!(cli.path.unwrap(), PathBuf::from("msg.eml"));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["mailsift", "--default-charset", "iso-8859-1"]);
        let config = cli.parser_config();
        assert_eq!(config, ParserConfig::builder().default_charset("iso-8859-1").build());
        assert!(cli.path.is_none());
    }

    #[test]
    fn test_json_output_shape() {
        let raw = "From: Some One <someone@test.com>\nTo: g:;\n\nhi";
        let message = parse_with(raw, &ParserConfig::default()).unwrap();
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["from"]["email"], "someone@test.com");
        assert_eq!(json["to"][0]["name"], "g");
        assert_eq!(json["to"][0]["members"], serde_json::json!([]));
        assert!(json["body"]["html"].is_null());
        assert!(json.get("bcc").is_none());
        assert_eq!(json["headers"]["from"][0], "Some One <someone@test.com>");
    }
}
