//! Integration tests for the conversion pipeline
//!
//! Converts a small directory of messages to PDF and reads the results back
//! with lopdf.

use eml2pdf_core::{BatchConverter, Labels, PageSetup, PageSize, PdfRenderer};
use lopdf::{Document, Object};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PLAIN: &str = "From: Alice <alice@example.com>\r\n\
To: Bob <bob@example.com>\r\n\
Cc: carol@example.com\r\n\
Date: Mon, 3 Mar 2025 09:15:00 +0000\r\n\
Subject: Quarterly report\r\n\
\r\n\
Hi Bob,\r\n\
\r\n\
Please find the numbers below.\r\n\
  Revenue: 100 & rising\r\n\
\r\n\
Alice\r\n";

const ENCODED_SUBJECT: &str = "From: =?UTF-8?B?5bGx55Sw?= <yamada@example.jp>\r\n\
To: team@example.jp\r\n\
Subject: =?UTF-8?B?44GT44KT44Gr44Gh44Gv?=\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
5pys5paH44Gn44GZ44CC\r\n";

const HTML_ONLY: &str = "From: news@example.com\r\n\
To: reader@example.com\r\n\
Subject: Newsletter\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
--outer\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<html><body><h1>Issue 7</h1><p>Read <a href=\"#\">more</a></p></body></html>\r\n\
--outer\r\n\
Content-Type: application/octet-stream\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
AAECAw==\r\n\
--outer--\r\n";

fn info_string(doc: &Document, key: &[u8]) -> String {
    let info_id = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .unwrap();
    let info = doc.get_dictionary(info_id).unwrap();
    match info.get(key).unwrap() {
        Object::String(bytes, _) if bytes.starts_with(&[0xFE, 0xFF]) => {
            let units: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16(&units).unwrap()
        }
        Object::String(bytes, _) => String::from_utf8(bytes.clone()).unwrap(),
        other => panic!("unexpected info value {other:?}"),
    }
}

fn write_inputs(dir: &Path) {
    fs::write(dir.join("01-plain.eml"), PLAIN).unwrap();
    fs::write(dir.join("02-japanese.eml"), ENCODED_SUBJECT).unwrap();
    fs::write(dir.join("03-html.eml"), HTML_ONLY).unwrap();
    fs::write(dir.join("04-broken.eml"), "this is not a message\n").unwrap();
    fs::write(dir.join("readme.txt"), "not picked up").unwrap();
}

#[test]
fn test_directory_to_pdfs() {
    let source = TempDir::new().unwrap();
    write_inputs(source.path());
    let dest = source.path().join("pdf_output");

    let mut events = Vec::new();
    let summary = BatchConverter::new()
        .run_with_progress(source.path(), &dest, |e| events.push(e.clone()))
        .unwrap();

    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.summary, "Converted 3/4 files, 1 failed");
    assert_eq!(events.len(), 4);
    assert_eq!(events[3].file_name, "04-broken.eml");
    assert!(!events[3].ok);

    for name in ["01-plain.pdf", "02-japanese.pdf", "03-html.pdf"] {
        let doc = Document::load(dest.join(name)).unwrap();
        assert_eq!(doc.get_pages().len(), 1, "{name}");
    }
    assert!(!dest.join("04-broken.pdf").exists());
}

#[test]
fn test_metadata_carries_decoded_headers() {
    let source = TempDir::new().unwrap();
    fs::write(source.path().join("jp.eml"), ENCODED_SUBJECT).unwrap();
    let dest = TempDir::new().unwrap();

    BatchConverter::new()
        .run(source.path(), dest.path())
        .unwrap();

    let doc = Document::load(dest.path().join("jp.pdf")).unwrap();
    assert_eq!(info_string(&doc, b"Title"), "こんにちは");
    assert_eq!(info_string(&doc, b"Author"), "山田 <yamada@example.jp>");
    assert!(info_string(&doc, b"Producer").starts_with("eml2pdf"));
}

#[test]
fn test_japanese_labels_and_letter_pages() {
    let source = TempDir::new().unwrap();
    fs::write(source.path().join("plain.eml"), PLAIN).unwrap();
    let dest = TempDir::new().unwrap();

    let renderer = PdfRenderer::new(PageSetup {
        size: PageSize::Letter,
        margin_mm: 15.0,
    });
    let summary = BatchConverter::with_renderer(renderer)
        .labels(Labels::japanese())
        .run(source.path(), dest.path())
        .unwrap();
    assert_eq!(summary.summary, "Converted 1/1 files");

    let doc = Document::load(dest.path().join("plain.pdf")).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn test_long_message_spans_pages() {
    let source = TempDir::new().unwrap();
    let body: String = (0..150)
        .map(|i| format!("Paragraph {i}: the quick brown fox jumps over the lazy dog.\r\n\r\n"))
        .collect();
    let message = format!("From: a@example.com\r\nTo: b@example.com\r\nSubject: Long\r\n\r\n{body}");
    fs::write(source.path().join("long.eml"), message).unwrap();
    let dest = TempDir::new().unwrap();

    BatchConverter::new()
        .run(source.path(), dest.path())
        .unwrap();

    let doc = Document::load(dest.path().join("long.pdf")).unwrap();
    assert!(doc.get_pages().len() > 1);
}
