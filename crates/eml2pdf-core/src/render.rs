//! PDF output
//!
//! [`PdfRenderer`] lays [`LayoutBlock`]s onto fixed-size pages with `lopdf`.
//! Text is set in the non-embedded Adobe-Japan1 CID fonts every PDF viewer
//! ships (`HeiseiKakuGo-W5` for title and headers, `HeiseiMin-W3` for the
//! body) through the `UniJIS-UTF16-H` CMap, which covers Latin and Japanese
//! text alike, including characters outside the BMP.

use crate::error::{ConvertError, Result};
use crate::layout::{DocumentInfo, LayoutBlock};
use crate::settings::{PageSetup, MM};
use chrono::Local;
use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;

/// Lays out blocks and writes a document file
pub trait Renderer {
    /// Render `blocks` into a new document at `path`
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::Render`] if the document cannot be produced or
    /// written.
    fn render(&self, info: &DocumentInfo, blocks: &[LayoutBlock], path: &Path) -> Result<()>;
}

const CMAP: &str = "UniJIS-UTF16-H";

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb(f32, f32, f32);

impl Rgb {
    fn hex(value: u32) -> Self {
        let channel = |shift: u32| ((value >> shift) & 0xFF) as f32 / 255.0;
        Self(channel(16), channel(8), channel(0))
    }

    fn operands(self) -> Vec<Object> {
        vec![self.0.into(), self.1.into(), self.2.into()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Gothic,
    Mincho,
}

impl Face {
    const fn resource_name(self) -> &'static str {
        match self {
            Self::Gothic => "F1",
            Self::Mincho => "F2",
        }
    }
}

/// Static metrics of an Adobe-Japan1 CID font, in 1/1000 em
struct CidFont {
    name: &'static str,
    flags: i64,
    bbox: [i64; 4],
    ascent: i64,
    descent: i64,
    cap_height: i64,
    stem_v: i64,
}

const GOTHIC: CidFont = CidFont {
    name: "HeiseiKakuGo-W5",
    flags: 4,
    bbox: [-92, -250, 1010, 922],
    ascent: 752,
    descent: -221,
    cap_height: 737,
    stem_v: 114,
};

const MINCHO: CidFont = CidFont {
    name: "HeiseiMin-W3",
    flags: 6,
    bbox: [-123, -257, 1001, 910],
    ascent: 723,
    descent: -241,
    cap_height: 709,
    stem_v: 69,
};

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    face: Face,
    size: f32,
    leading: f32,
    color: Rgb,
    space_after: f32,
}

struct Styles {
    title: TextStyle,
    header: TextStyle,
    body: TextStyle,
    label_color: Rgb,
    rule_color: Rgb,
    rule_thickness: f32,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: TextStyle {
                face: Face::Gothic,
                size: 14.0,
                leading: 20.0,
                color: Rgb::hex(0x11_11_11),
                space_after: 4.0 * MM,
            },
            header: TextStyle {
                face: Face::Gothic,
                size: 9.0,
                leading: 14.0,
                color: Rgb::hex(0x33_33_33),
                space_after: 0.0,
            },
            body: TextStyle {
                face: Face::Mincho,
                size: 10.0,
                leading: 16.0,
                color: Rgb::hex(0x1a_1a_1a),
                space_after: 1.0 * MM,
            },
            label_color: Rgb::hex(0x88_88_88),
            rule_color: Rgb::hex(0xcc_cc_cc),
            rule_thickness: 0.5,
        }
    }
}

/// Character with its fill color
#[derive(Debug, Clone, Copy, PartialEq)]
struct Glyph {
    ch: char,
    color: Rgb,
}

/// Advance width in 1/1000 em under the half-width CMap.
fn char_width(ch: char) -> f32 {
    match ch {
        ' '..='~' | '\u{a0}' | '\u{ff61}'..='\u{ff9f}' => 500.0,
        _ => 1000.0,
    }
}

fn measure(glyphs: &[Glyph], size: f32) -> f32 {
    glyphs.iter().map(|g| char_width(g.ch)).sum::<f32>() * size / 1000.0
}

/// Undo the builder's character entities.
fn unescape_markup(text: &str) -> String {
    text.replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Collapse runs of ordinary whitespace; non-breaking spaces are kept.
fn collapse_whitespace(text: &str) -> String {
    text.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

fn glyphs(text: &str, color: Rgb) -> Vec<Glyph> {
    text.chars().map(|ch| Glyph { ch, color }).collect()
}

/// Greedy line breaking: break at the last space that fits, or between any
/// two characters when a line has no space (CJK text).
fn wrap(glyphs: &[Glyph], size: f32, max_width: f32) -> Vec<Vec<Glyph>> {
    let mut lines = Vec::new();
    let mut line: Vec<Glyph> = Vec::new();
    let mut width = 0.0;
    let mut last_space: Option<usize> = None;

    for &glyph in glyphs {
        let advance = char_width(glyph.ch) * size / 1000.0;

        if width + advance > max_width && !line.is_empty() {
            if glyph.ch == ' ' {
                lines.push(std::mem::take(&mut line));
                width = 0.0;
                last_space = None;
                continue;
            }

            let carry = match last_space.take() {
                Some(idx) => {
                    let rest = line.split_off(idx + 1);
                    line.pop();
                    rest
                }
                None => Vec::new(),
            };
            if line.is_empty() {
                line = carry;
            } else {
                lines.push(std::mem::replace(&mut line, carry));
            }
            width = measure(&line, size);

            if width + advance > max_width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                width = 0.0;
            }
        }

        if glyph.ch == ' ' {
            last_space = Some(line.len());
        }
        line.push(glyph);
        width += advance;
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// UTF-16 big-endian bytes for the CMap; non-breaking spaces print as
/// spaces.
fn encode_utf16be(text: impl IntoIterator<Item = char>) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut units = [0u16; 2];
    for ch in text {
        let ch = if ch == '\u{a0}' { ' ' } else { ch };
        for unit in ch.encode_utf16(&mut units) {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
    }
    bytes
}

/// Document information string: literal for ASCII, UTF-16BE with BOM
/// otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Page-by-page accumulation of content operations
struct PageCursor {
    setup: PageSetup,
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
}

impl PageCursor {
    fn new(setup: PageSetup) -> Self {
        Self {
            setup,
            pages: Vec::new(),
            ops: Vec::new(),
            y: Self::top(setup),
        }
    }

    fn top(setup: PageSetup) -> f32 {
        setup.size.dimensions().1 - setup.margin()
    }

    fn bottom(&self) -> f32 {
        self.setup.margin()
    }

    fn at_page_top(&self) -> bool {
        (self.y - Self::top(self.setup)).abs() < f32::EPSILON
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.y = Self::top(self.setup);
    }

    /// Start a new page unless `height` still fits on this one.
    fn reserve(&mut self, height: f32) {
        if self.y - height < self.bottom() && !self.at_page_top() {
            self.new_page();
        }
    }

    fn paragraph(&mut self, runs: &[(String, Rgb)], style: TextStyle) {
        let glyphs: Vec<Glyph> = runs
            .iter()
            .flat_map(|(text, color)| glyphs(text, *color))
            .collect();

        for line in wrap(&glyphs, style.size, self.setup.frame_width()) {
            self.reserve(style.leading);
            let baseline = self.y - style.size;
            self.text_line(&line, style, baseline);
            self.y -= style.leading;
        }
        self.y -= style.space_after;
    }

    fn text_line(&mut self, line: &[Glyph], style: TextStyle, baseline: f32) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![style.face.resource_name().into(), style.size.into()],
        ));
        self.ops.push(Operation::new(
            "Td",
            vec![self.setup.margin().into(), baseline.into()],
        ));

        // One show-text operation per run of equal color
        let mut start = 0;
        while start < line.len() {
            let color = line[start].color;
            let end = line[start..]
                .iter()
                .position(|g| g.color != color)
                .map_or(line.len(), |n| start + n);
            self.ops.push(Operation::new("rg", color.operands()));
            self.ops.push(Operation::new(
                "Tj",
                vec![Object::String(
                    encode_utf16be(line[start..end].iter().map(|g| g.ch)),
                    StringFormat::Hexadecimal,
                )],
            ));
            start = end;
        }
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn spacer(&mut self, height: f32) {
        if self.y - height < self.bottom() {
            self.new_page();
        } else {
            self.y -= height;
        }
    }

    fn rule(&mut self, color: Rgb, thickness: f32) {
        let height = thickness + 2.0;
        self.reserve(height);
        let y = self.y - height / 2.0;
        let left = self.setup.margin();
        let right = left + self.setup.frame_width();
        self.ops.extend([
            Operation::new("w", vec![thickness.into()]),
            Operation::new("RG", color.operands()),
            Operation::new("m", vec![left.into(), y.into()]),
            Operation::new("l", vec![right.into(), y.into()]),
            Operation::new("S", vec![]),
        ]);
        self.y -= height;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        self.pages
    }
}

/// Renders layout blocks into a PDF file
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer {
    setup: PageSetup,
}

impl PdfRenderer {
    /// Renderer with the given page geometry
    #[must_use]
    pub const fn new(setup: PageSetup) -> Self {
        Self { setup }
    }

    fn lay_out(&self, blocks: &[LayoutBlock]) -> Vec<Vec<Operation>> {
        let styles = Styles::new();
        let mut cursor = PageCursor::new(self.setup);

        for block in blocks {
            match block {
                LayoutBlock::Title(text) => {
                    let text = collapse_whitespace(&unescape_markup(text));
                    cursor.paragraph(&[(text, styles.title.color)], styles.title);
                }
                LayoutBlock::HeaderLine(label, value) => {
                    let label = format!("{}:", collapse_whitespace(&unescape_markup(label)));
                    let value = format!(
                        "\u{a0}\u{a0}{}",
                        collapse_whitespace(&unescape_markup(value))
                    );
                    cursor.paragraph(
                        &[(label, styles.label_color), (value, styles.header.color)],
                        styles.header,
                    );
                }
                LayoutBlock::Rule => cursor.rule(styles.rule_color, styles.rule_thickness),
                LayoutBlock::Spacer(height) => cursor.spacer(*height),
                LayoutBlock::BodyLine(text) => {
                    let text = collapse_whitespace(&unescape_markup(text));
                    cursor.paragraph(&[(text, styles.body.color)], styles.body);
                }
            }
        }

        cursor.finish()
    }

    fn build_document(
        &self,
        info: &DocumentInfo,
        blocks: &[LayoutBlock],
        path: &Path,
    ) -> Result<Document> {
        let render_err = |reason: String| ConvertError::Render {
            path: path.to_path_buf(),
            reason,
        };

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let gothic_id = add_cid_font(&mut doc, &GOTHIC);
        let mincho_id = add_cid_font(&mut doc, &MINCHO);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                Face::Gothic.resource_name() => gothic_id,
                Face::Mincho.resource_name() => mincho_id,
            },
        });

        let mut kids = Vec::new();
        for operations in self.lay_out(blocks) {
            let content = Content { operations };
            let encoded = content.encode().map_err(|e| render_err(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let (width, height) = self.setup.size.dimensions();
        let media_box: Vec<Object> = vec![0.into(), 0.into(), width.into(), height.into()];
        let page_count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => text_string(&info.title),
            "Author" => text_string(&info.author),
            "Producer" => Object::string_literal(concat!("eml2pdf ", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(Local::now().format("D:%Y%m%d%H%M%S").to_string()),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc.compress();

        debug!("laid out {} page(s) for {:?}", page_count, info.title);
        Ok(doc)
    }
}

fn add_cid_font(doc: &mut Document, font: &CidFont) -> ObjectId {
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => font.name,
        "Flags" => font.flags,
        "FontBBox" => font.bbox.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
        "ItalicAngle" => 0,
        "Ascent" => font.ascent,
        "Descent" => font.descent,
        "CapHeight" => font.cap_height,
        "StemV" => font.stem_v,
    });

    // ASCII (1-95, 231-325) and half-width katakana (327-389) advance 500
    let widths: Vec<Object> = [1, 95, 500, 231, 325, 500, 327, 389, 500]
        .into_iter()
        .map(Object::Integer)
        .collect();
    let descendant_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType0",
        "BaseFont" => font.name,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Japan1"),
            "Supplement" => 2,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000,
        "W" => widths,
    });

    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => Object::Name(format!("{}-{CMAP}", font.name).into_bytes()),
        "Encoding" => CMAP,
        "DescendantFonts" => vec![Object::Reference(descendant_id)],
    })
}

impl Renderer for PdfRenderer {
    fn render(&self, info: &DocumentInfo, blocks: &[LayoutBlock], path: &Path) -> Result<()> {
        let render_err = |reason: String| ConvertError::Render {
            path: path.to_path_buf(),
            reason,
        };

        let mut doc = self.build_document(info, blocks, path)?;

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| render_err(e.to_string()))?;
        std::fs::write(path, bytes).map_err(|e| render_err(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eml::ParsedMessage;
    use crate::layout::build;
    use crate::settings::{Labels, PageSize};
    use tempfile::TempDir;

    const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);

    fn text_of(lines: &[Vec<Glyph>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.iter().map(|g| g.ch).collect())
            .collect()
    }

    fn sample(body: &str) -> ParsedMessage {
        ParsedMessage {
            subject: "請求書の送付".to_string(),
            from: "経理部 <billing@example.jp>".to_string(),
            to: "client@example.com".to_string(),
            cc: String::new(),
            date: "Wed, 5 Mar 2025 10:00:00 +0900".to_string(),
            body: body.to_string(),
        }
    }

    fn render_to(dir: &TempDir, message: &ParsedMessage, setup: PageSetup) -> Document {
        let path = dir.path().join("out.pdf");
        let blocks = build(message, &Labels::english());
        PdfRenderer::new(setup)
            .render(&DocumentInfo::for_message(message), &blocks, &path)
            .unwrap();
        Document::load(&path).unwrap()
    }

    #[test]
    fn test_unescape_reverses_escape() {
        let original = r#"<a href="x">&amp;</a>  two"#;
        let escaped = crate::layout::escape_markup(original);
        assert_eq!(
            unescape_markup(&escaped),
            original.replace("  ", "\u{a0} ")
        );
    }

    #[test]
    fn test_collapse_keeps_nbsp() {
        assert_eq!(collapse_whitespace("  a \t b  "), "a b");
        assert_eq!(collapse_whitespace("\u{a0} \u{a0} x"), "\u{a0} \u{a0} x");
    }

    #[test]
    fn test_wrap_at_spaces() {
        // 500/1000 em * 10pt = 5pt per ASCII char; 30pt fits 6 chars
        let lines = wrap(&glyphs("aaa bbb ccc", BLACK), 10.0, 30.0);
        assert_eq!(text_of(&lines), vec!["aaa", "bbb", "ccc"]);
    }

    #[test]
    fn test_wrap_cjk_without_spaces() {
        // 10pt per CJK char; 30pt fits 3
        let lines = wrap(&glyphs("あいうえおか", BLACK), 10.0, 30.0);
        assert_eq!(text_of(&lines), vec!["あいう", "えおか"]);
    }

    #[test]
    fn test_wrap_long_word_hard_breaks() {
        let lines = wrap(&glyphs("abcdefghij", BLACK), 10.0, 20.0);
        assert_eq!(text_of(&lines), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_short_line_untouched() {
        let lines = wrap(&glyphs("short", BLACK), 10.0, 400.0);
        assert_eq!(text_of(&lines), vec!["short"]);
    }

    #[test]
    fn test_encode_utf16be() {
        assert_eq!(encode_utf16be("Aあ".chars()), vec![0x00, 0x41, 0x30, 0x42]);
        assert_eq!(encode_utf16be("\u{a0}".chars()), vec![0x00, 0x20]);
        assert_eq!(encode_utf16be("😀".chars()), vec![0xD8, 0x3D, 0xDE, 0x00]);
    }

    #[test]
    fn test_render_single_page() {
        let dir = TempDir::new().unwrap();
        let message = sample("ご確認ください。\n\nよろしくお願いします。");
        let doc = render_to(&dir, &message, PageSetup::default());
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_render_body_text_in_content() {
        let dir = TempDir::new().unwrap();
        let doc = render_to(&dir, &sample("Total: 100 & tax"), PageSetup::default());

        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let strings: Vec<Vec<u8>> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.clone()),
                _ => None,
            })
            .collect();

        assert!(strings.contains(&encode_utf16be("Total: 100 & tax".chars())));
        assert!(strings.contains(&encode_utf16be("請求書の送付".chars())));
        assert!(strings.contains(&encode_utf16be("From:".chars())));
    }

    #[test]
    fn test_render_keeps_characters_outside_bmp() {
        let dir = TempDir::new().unwrap();
        let doc = render_to(&dir, &sample("Thanks 😀"), PageSetup::default());

        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let expected = encode_utf16be("Thanks 😀".chars());
        assert!(content.operations.iter().any(|op| {
            op.operator == "Tj"
                && matches!(op.operands.first(), Some(Object::String(bytes, _)) if *bytes == expected)
        }));

        let encodings: Vec<Vec<u8>> = doc
            .objects
            .values()
            .filter_map(|object| object.as_dict().ok())
            .filter(|dict| matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Type0"))
            .filter_map(|dict| match dict.get(b"Encoding") {
                Ok(Object::Name(name)) => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(encodings.len(), 2);
        assert!(encodings.iter().all(|name| name == b"UniJIS-UTF16-H"));
    }

    #[test]
    fn test_render_paginates_long_body() {
        let dir = TempDir::new().unwrap();
        let body = (1..=200)
            .map(|i| format!("Line number {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let doc = render_to(&dir, &sample(&body), PageSetup::default());
        // 16pt leading on ~728pt of frame: about 45 lines per page
        assert!(doc.get_pages().len() >= 4);
    }

    #[test]
    fn test_render_letter_media_box() {
        let dir = TempDir::new().unwrap();
        let setup = PageSetup {
            size: PageSize::Letter,
            margin_mm: 10.0,
        };
        let doc = render_to(&dir, &sample("Hi"), setup);
        let catalog = doc.catalog().unwrap();
        let pages_id = catalog.get(b"Pages").unwrap().as_reference().unwrap();
        let pages = doc.get_dictionary(pages_id).unwrap();
        let media_box = pages.get(b"MediaBox").unwrap().as_array().unwrap();
        let width = match &media_box[2] {
            Object::Integer(v) => *v as f32,
            Object::Real(v) => *v as f32,
            other => panic!("unexpected width {other:?}"),
        };
        assert!((width - 612.0).abs() < 0.01);
    }

    #[test]
    fn test_render_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.pdf");
        let result = PdfRenderer::default().render(
            &DocumentInfo::default(),
            &[LayoutBlock::Title("x".to_string())],
            &path,
        );
        assert!(matches!(result, Err(ConvertError::Render { .. })));
    }

    #[test]
    fn test_text_string_encoding() {
        match text_string("plain") {
            Object::String(bytes, StringFormat::Literal) => assert_eq!(bytes, b"plain"),
            other => panic!("unexpected {other:?}"),
        }
        match text_string("件") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![0xFE, 0xFF, 0x4E, 0xF6]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
