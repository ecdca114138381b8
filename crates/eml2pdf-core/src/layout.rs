//! Message to layout blocks
//!
//! The renderer consumes text with a small inline markup (character entities),
//! so every piece of message text is escaped here before it is placed in a
//! block.

use crate::eml::ParsedMessage;
use crate::settings::{Labels, MM};

/// Space around the horizontal rule, in points
pub const SEPARATOR_SPACE: f32 = 5.0 * MM;
/// Space standing in for a blank body line, in points
pub const BLANK_LINE_SPACE: f32 = 3.0 * MM;

/// One renderable unit of output
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutBlock {
    /// Subject line
    Title(String),
    /// `label: value` header line
    HeaderLine(String, String),
    /// Full-width horizontal rule
    Rule,
    /// Vertical gap in points
    Spacer(f32),
    /// One non-blank body line
    BodyLine(String),
}

/// Document metadata carried alongside the blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Document title (the subject)
    pub title: String,
    /// Document author (the sender)
    pub author: String,
}

impl DocumentInfo {
    /// Metadata for a parsed message
    #[must_use]
    pub fn for_message(message: &ParsedMessage) -> Self {
        Self {
            title: message.subject.clone(),
            author: message.from.clone(),
        }
    }
}

/// Lay out a parsed message.
///
/// Title, header lines (CC only when present), spacer, rule, spacer, then one
/// block per body line: blank lines become spacers.
#[must_use]
pub fn build(message: &ParsedMessage, labels: &Labels) -> Vec<LayoutBlock> {
    let mut blocks = vec![LayoutBlock::Title(escape_markup(&message.subject))];

    let mut headers = vec![(&labels.from, &message.from), (&labels.to, &message.to)];
    if !message.cc.is_empty() {
        headers.push((&labels.cc, &message.cc));
    }
    headers.push((&labels.date, &message.date));

    blocks.extend(
        headers
            .into_iter()
            .map(|(label, value)| LayoutBlock::HeaderLine(escape_markup(label), escape_markup(value))),
    );

    blocks.push(LayoutBlock::Spacer(SEPARATOR_SPACE));
    blocks.push(LayoutBlock::Rule);
    blocks.push(LayoutBlock::Spacer(SEPARATOR_SPACE));

    for line in message.body.split('\n') {
        if line.trim().is_empty() {
            blocks.push(LayoutBlock::Spacer(BLANK_LINE_SPACE));
        } else {
            blocks.push(LayoutBlock::BodyLine(escape_markup(line)));
        }
    }

    blocks
}

/// Escape text for the renderer's inline markup.
///
/// `&`, `<`, `>` and `"` become entities; each run of two spaces becomes
/// `&nbsp; ` so the renderer keeps the visible width.
#[must_use]
pub fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace("  ", "&nbsp; ")
}
