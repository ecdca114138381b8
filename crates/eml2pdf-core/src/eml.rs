//! EML (Email Message) parser
//!
//! Parses RFC 5322 email messages using the mailparse crate.
//! Extracts the printable headers and the preferred text body.

use crate::body::{extract_body, Part};
use crate::error::{ConvertError, Result};
use crate::header::{decode_header, decode_text};
use log::debug;
use mailparse::{MailHeaderMap, ParsedMail};
use std::path::Path;

/// Subject used when a message has none
pub const DEFAULT_NO_SUBJECT: &str = "(No Subject)";

/// Parsed email message
///
/// Header values are decoded text. `subject` is never empty and `body` has no
/// leading or trailing whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParsedMessage {
    /// Subject header, or the placeholder
    pub subject: String,
    /// From header
    pub from: String,
    /// To header
    pub to: String,
    /// Cc header (may be empty)
    pub cc: String,
    /// Date header as written
    pub date: String,
    /// Plain text body
    pub body: String,
}

/// Parse an EML file from bytes, using [`DEFAULT_NO_SUBJECT`] for a missing
/// subject
///
/// # Errors
///
/// Returns [`ConvertError::MalformedMessage`] if the header section cannot be
/// parsed.
pub fn parse_eml(content: &[u8]) -> Result<ParsedMessage> {
    parse_eml_with_placeholder(content, DEFAULT_NO_SUBJECT)
}

/// Parse an EML file from bytes
///
/// # Errors
///
/// Returns [`ConvertError::MalformedMessage`] if the content is empty, does
/// not start with a header field, or mailparse rejects the header section.
pub fn parse_eml_with_placeholder(content: &[u8], no_subject: &str) -> Result<ParsedMessage> {
    let content = header_section_start(content)?;
    let message = mailparse::parse_mail(content)
        .map_err(|e| ConvertError::MalformedMessage(e.to_string()))?;

    Ok(extract_message_data(&message, no_subject))
}

/// Read and parse an EML file
///
/// # Errors
///
/// Returns [`ConvertError::FileRead`] if the file cannot be read, or
/// [`ConvertError::MalformedMessage`] as for [`parse_eml_with_placeholder`].
pub fn parse_eml_file(path: &Path, no_subject: &str) -> Result<ParsedMessage> {
    let content = std::fs::read(path).map_err(|source| ConvertError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_eml_with_placeholder(&content, no_subject)
}

/// Skip a UTF-8 byte order mark and an mbox `From ` envelope line, then
/// check that a header field follows.
fn header_section_start(content: &[u8]) -> Result<&[u8]> {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err(ConvertError::MalformedMessage("empty message".to_string()));
    }

    let mut rest = content;
    if rest.starts_with(b"From ") {
        rest = rest
            .iter()
            .position(|&b| b == b'\n')
            .map_or(&[][..], |nl| &rest[nl + 1..]);
    }

    let first_line = rest.split(|&b| b == b'\n').next().unwrap_or_default();
    let field_name = first_line
        .iter()
        .position(|&b| b == b':')
        .map(|colon| &first_line[..colon]);

    match field_name {
        Some(name) if !name.is_empty() && name.iter().all(|b| (33..=126).contains(b)) => Ok(rest),
        _ => Err(ConvertError::MalformedMessage(
            "no header section found".to_string(),
        )),
    }
}

/// Extract structured data from parsed message
fn extract_message_data(message: &ParsedMail<'_>, no_subject: &str) -> ParsedMessage {
    let subject = header_value(message, "Subject");
    let subject = if subject.is_empty() {
        no_subject.to_string()
    } else {
        subject
    };

    let tree = Part::from_parsed(message);
    let body = extract_body(&tree).trim().to_string();
    debug!("parsed message {subject:?}, body {} chars", body.chars().count());

    ParsedMessage {
        subject,
        from: header_value(message, "From"),
        to: header_value(message, "To"),
        cc: header_value(message, "Cc"),
        date: header_value(message, "Date"),
        body,
    }
}

/// First header with `name`, decoded and unfolded; empty when absent.
///
/// Raw bytes go through the charset chain first so unencoded 8-bit headers
/// (common with Shift-JIS mail) still read correctly.
fn header_value(message: &ParsedMail<'_>, name: &str) -> String {
    message
        .headers
        .get_first_header(name)
        .map(|header| {
            let raw = decode_text(header.get_value_raw(), None);
            let unfolded: String = raw.chars().filter(|&c| c != '\r' && c != '\n').collect();
            decode_header(&unfolded).trim().to_string()
        })
        .unwrap_or_default()
}
