//! eml2pdf-core - Email message to PDF conversion
//!
//! This crate turns RFC 5322 message files into paginated PDF documents:
//! - **Header decoding** - RFC 2047 encoded words with a charset fallback chain
//!   suited to Japanese mail (UTF-8, Shift_JIS, ISO-2022-JP, EUC-JP, Latin-1)
//! - **Body selection** - first `text/plain` part, else tag-stripped `text/html`
//! - **Layout** - title, header lines, rule and body lines as [`LayoutBlock`]s
//! - **Rendering** - PDF output through `lopdf` with CJK-capable fonts
//! - **Batch conversion** - a whole directory, with per-file progress
//!
//! ## Examples
//!
//! Parse a message and inspect it:
//!
//! ```rust,no_run
//! use eml2pdf_core::parse_eml;
//!
//! let eml_bytes = std::fs::read("message.eml")?;
//! let message = parse_eml(&eml_bytes)?;
//!
//! println!("From: {}", message.from);
//! println!("Subject: {}", message.subject);
//! println!("Body: {}", message.body);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Convert a directory:
//!
//! ```rust,no_run
//! use eml2pdf_core::{BatchConverter, Labels};
//! use std::path::Path;
//!
//! let converter = BatchConverter::new().labels(Labels::japanese());
//! let summary = converter.run_with_progress(
//!     Path::new("inbox"),
//!     Path::new("inbox/pdf_output"),
//!     |event| println!("[{}/{}] {}", event.index, event.total, event.file_name),
//! )?;
//! println!("{}", summary.summary);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! .eml file → Parse headers/body → Layout blocks → Renderer → .pdf file
//! ```

/// Batch conversion of a directory
pub mod batch;
/// Message part tree and body selection
pub mod body;
/// EML (RFC 5322) message parser
pub mod eml;
/// Error types for conversion
pub mod error;
/// RFC 2047 header decoding
pub mod header;
/// Parsed message to layout blocks
pub mod layout;
/// PDF renderer
pub mod render;
/// Labels and page geometry
pub mod settings;

pub use batch::{BatchConverter, BatchSummary, ProgressEvent};
pub use body::{extract_body, Leaf, Part};
pub use eml::{parse_eml, parse_eml_file, parse_eml_with_placeholder, ParsedMessage};
pub use error::{ConvertError, Result};
pub use header::{decode_header, decode_text};
pub use layout::{build, DocumentInfo, LayoutBlock};
pub use render::{PdfRenderer, Renderer};
pub use settings::{LabelPreset, Labels, PageSetup, PageSize};
