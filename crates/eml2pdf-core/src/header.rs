//! RFC 2047 header decoding
//!
//! Header values may mix literal text with encoded words
//! (`=?charset?B|Q?payload?=`). Each encoded payload is decoded with its
//! declared charset first, then with a fixed list of fallback charsets; Latin-1
//! terminates the chain because it maps every byte to a character.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use encoding_rs::{Encoding, EUC_JP, ISO_2022_JP, SHIFT_JIS, UTF_8};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Charsets tried after the declared one, in order. Latin-1 follows as the
/// terminal decoder.
fn fallback_charsets() -> [&'static Encoding; 4] {
    [UTF_8, SHIFT_JIS, ISO_2022_JP, EUC_JP]
}

static ENCODED_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"=\?([^?\s]+)\?([BbQq])\?([^?\s]*)\?=").expect("encoded-word pattern is valid")
});

/// Base64 engine that accepts payloads with or without trailing padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Encoded { charset: String, bytes: Vec<u8> },
}

/// Decode a header value containing zero or more encoded words.
///
/// Values without encoded words are returned unchanged. Otherwise the decoded
/// segments are joined in order with single spaces; whitespace between two
/// adjacent encoded words is dropped, and adjacent encoded words sharing a
/// charset are decoded together so multi-byte characters split across words
/// survive. Encoded words whose payload cannot be transfer-decoded are kept
/// verbatim. Never fails.
#[must_use]
pub fn decode_header(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let segments = split_segments(raw);
    if !segments
        .iter()
        .any(|s| matches!(s, Segment::Encoded { .. }))
    {
        return raw.to_string();
    }

    let parts: Vec<String> = merge_segments(segments)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Literal(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Segment::Encoded { charset, bytes } => Some(decode_text(&bytes, Some(&charset))),
        })
        .collect();

    parts.join(" ")
}

/// Decode bytes to text trying `declared` first, then UTF-8, Shift-JIS,
/// ISO-2022-JP, EUC-JP and finally Latin-1.
///
/// The first charset that decodes without error wins. Unknown charset labels
/// are skipped.
#[must_use]
pub fn decode_text(bytes: &[u8], declared: Option<&str>) -> String {
    if let Some(label) = declared {
        if let Some(text) = decode_declared(label, bytes) {
            return text;
        }
        debug!("declared charset {label:?} did not decode, trying fallbacks");
    }

    for encoding in fallback_charsets() {
        if let Some(text) = decode_strict(encoding, bytes) {
            return text;
        }
    }

    decode_latin1(bytes)
}

/// Decode with a declared charset label. `None` when the label is unknown or
/// the bytes are not valid in that charset.
fn decode_declared(label: &str, bytes: &[u8]) -> Option<String> {
    // RFC 2231 language suffix: utf-8*en
    let label = label.split('*').next().unwrap_or(label).trim();
    let normalized = label.to_ascii_lowercase();

    // encoding_rs follows WHATWG and maps these labels to windows-1252 and
    // friends; mail means the strict charsets.
    if is_latin1_label(&normalized) {
        return Some(decode_latin1(bytes));
    }
    match normalized.as_str() {
        "us-ascii" | "ascii" => {
            return bytes
                .is_ascii()
                .then(|| String::from_utf8_lossy(bytes).into_owned());
        }
        _ => {}
    }

    let Some(encoding) = Encoding::for_label(normalized.as_bytes()) else {
        debug!("unknown charset label {label:?}");
        return None;
    };
    decode_strict(encoding, bytes)
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(std::borrow::Cow::into_owned)
}

/// Whether `label` names ISO-8859-1 itself rather than windows-1252.
pub(crate) fn is_latin1_label(label: &str) -> bool {
    matches!(
        label.trim().to_ascii_lowercase().as_str(),
        "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1"
    )
}

/// ISO-8859-1: every byte is the code point of the same value.
pub(crate) fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn split_segments(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in ENCODED_WORD.captures_iter(raw) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            segments.push(Segment::Literal(raw[last..whole.start()].to_string()));
        }
        last = whole.end();

        let charset = &caps[1];
        let payload = &caps[3];
        let bytes = match &caps[2] {
            "B" | "b" => LENIENT_BASE64.decode(payload).ok(),
            _ => decode_q(payload),
        };

        match bytes {
            Some(bytes) => segments.push(Segment::Encoded {
                charset: charset.to_string(),
                bytes,
            }),
            None => {
                debug!("malformed encoded word kept verbatim: {}", whole.as_str());
                segments.push(Segment::Literal(whole.as_str().to_string()));
            }
        }
    }

    if last < raw.len() {
        segments.push(Segment::Literal(raw[last..].to_string()));
    }
    segments
}

/// Drop whitespace between encoded words and join same-charset neighbours.
fn merge_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    let mut iter = segments.into_iter().peekable();

    while let Some(segment) = iter.next() {
        match segment {
            Segment::Literal(text) => {
                let between_words = text.trim().is_empty()
                    && matches!(merged.last(), Some(Segment::Encoded { .. }))
                    && matches!(iter.peek(), Some(Segment::Encoded { .. }));
                if !between_words {
                    merged.push(Segment::Literal(text));
                }
            }
            Segment::Encoded { charset, bytes } => match merged.last_mut() {
                Some(Segment::Encoded {
                    charset: prev_charset,
                    bytes: prev_bytes,
                }) if prev_charset.eq_ignore_ascii_case(&charset) => {
                    prev_bytes.extend_from_slice(&bytes);
                }
                _ => merged.push(Segment::Encoded { charset, bytes }),
            },
        }
    }

    merged
}

/// RFC 2047 "Q" encoding: `_` is a space, `=XX` a hex byte.
fn decode_q(payload: &str) -> Option<Vec<u8>> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' => {
                let hex = bytes.get(i + 1..i + 3)?;
                let hex = std::str::from_utf8(hex).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }

    Some(out)
}
