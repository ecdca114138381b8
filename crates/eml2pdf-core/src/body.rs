//! Message part tree and body text selection
//!
//! A message is modelled as a tree of [`Part`]s: leaves carry a content type,
//! a declared charset and transfer-decoded bytes; containers hold ordered
//! children. [`extract_body`] walks the tree pre-order and prefers
//! `text/plain`, falling back to `text/html` with tags stripped.

use crate::header::{decode_latin1, is_latin1_label};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};
use mailparse::ParsedMail;
use once_cell::sync::Lazy;
use regex::Regex;

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Content part with no children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaf {
    /// Lowercased MIME type, e.g. `text/plain`
    pub content_type: String,
    /// Declared charset parameter, if any
    pub charset: Option<String>,
    /// Body after Content-Transfer-Encoding has been undone
    pub content: Vec<u8>,
}

impl Leaf {
    /// Build a leaf from its MIME type, charset and decoded content
    #[must_use]
    pub fn new(content_type: &str, charset: Option<&str>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.to_ascii_lowercase(),
            charset: charset.map(str::to_string),
            content: content.into(),
        }
    }

    /// Whether the content type is `text/*`
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.content_type.starts_with("text/")
    }

    /// Decode the content with the declared charset.
    ///
    /// Undecodable bytes become U+FFFD. A missing, unknown or `us-ascii`
    /// charset decodes as UTF-8 since unlabeled 8-bit mail is almost always
    /// UTF-8. ISO-8859-1 decodes byte for byte, as in headers.
    #[must_use]
    pub fn text(&self) -> String {
        if self.charset.as_deref().is_some_and(is_latin1_label) {
            return decode_latin1(&self.content).replace("\r\n", "\n");
        }

        let encoding = self
            .charset
            .as_deref()
            .map(|label| label.trim().to_ascii_lowercase())
            .filter(|label| label != "us-ascii" && label != "ascii")
            .and_then(|label| {
                let found = Encoding::for_label(label.as_bytes());
                if found.is_none() {
                    warn!("unknown body charset {label:?}, decoding as UTF-8");
                }
                found
            })
            .unwrap_or(UTF_8);

        let (text, had_errors) = encoding.decode_without_bom_handling(&self.content);
        if had_errors {
            debug!(
                "{} part contained bytes invalid in {}",
                self.content_type,
                encoding.name()
            );
        }
        text.replace("\r\n", "\n")
    }
}

/// Node in a message's part tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Part with content
    Leaf(Leaf),
    /// Multipart container (or an embedded message) with ordered children
    Container(Vec<Part>),
}

impl Part {
    /// Convert a `mailparse` tree into owned parts.
    ///
    /// `multipart/*` becomes a container; an attached `message/rfc822` is
    /// parsed and becomes a container holding the embedded message.
    #[must_use]
    pub fn from_parsed(mail: &ParsedMail<'_>) -> Self {
        let mimetype = mail.ctype.mimetype.to_ascii_lowercase();

        if mimetype.starts_with("multipart/") {
            return Self::Container(mail.subparts.iter().map(Self::from_parsed).collect());
        }

        let content = match mail.get_body_raw() {
            Ok(content) => content,
            Err(e) => {
                warn!("could not undo transfer encoding of {mimetype} part: {e}");
                Vec::new()
            }
        };

        if mimetype == "message/rfc822" {
            match mailparse::parse_mail(&content) {
                Ok(inner) => return Self::Container(vec![Self::from_parsed(&inner)]),
                Err(e) => debug!("embedded message not parseable, kept as leaf: {e}"),
            }
        }

        // mailparse reports us-ascii when no charset was declared
        Self::Leaf(Leaf::new(&mimetype, Some(&mail.ctype.charset), content))
    }

    /// Pre-order iterator over the leaves beneath this part
    pub fn leaves(&self) -> Box<dyn Iterator<Item = &Leaf> + '_> {
        match self {
            Self::Leaf(leaf) => Box::new(std::iter::once(leaf)),
            Self::Container(children) => Box::new(children.iter().flat_map(Self::leaves)),
        }
    }

    fn find_leaf(&self, content_type: &str) -> Option<&Leaf> {
        self.leaves().find(|leaf| leaf.content_type == content_type)
    }
}

/// Pick the best textual body of a message.
///
/// 1. A single leaf yields its decoded text when it is `text/*`, else empty.
/// 2. Otherwise the first `text/plain` leaf in pre-order wins.
/// 3. Failing that (or when that part is empty) the first `text/html` leaf is
///    used with markup tags removed and the result trimmed.
/// 4. Empty when nothing textual exists.
#[must_use]
pub fn extract_body(message: &Part) -> String {
    if let Part::Leaf(leaf) = message {
        return if leaf.is_text() {
            leaf.text()
        } else {
            debug!("single {} part has no text body", leaf.content_type);
            String::new()
        };
    }

    if let Some(plain) = message.find_leaf("text/plain") {
        let text = plain.text();
        if !text.is_empty() {
            return text;
        }
    }

    if let Some(html) = message.find_leaf("text/html") {
        debug!("no text/plain part, stripping tags from text/html");
        return strip_tags(&html.text());
    }

    String::new()
}

/// Remove `<...>` tags and trim. Entities are left as they are.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    HTML_TAG.replace_all(html, "").trim().to_string()
}
