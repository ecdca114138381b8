//! Directory batch conversion
//!
//! [`BatchConverter`] converts every message file of a source directory, in
//! file name order and one at a time, into a document in the destination
//! directory. A file that cannot be read, parsed or rendered is counted as a
//! failure and the batch moves on; directory errors end the batch.

use crate::eml::parse_eml_file;
use crate::error::{ConvertError, Result};
use crate::layout::{build, DocumentInfo};
use crate::render::{PdfRenderer, Renderer};
use crate::settings::Labels;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Report emitted after each file of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 1-based position of the file in the batch
    pub index: usize,
    /// Number of files in the batch
    pub total: usize,
    /// File name of the source file
    pub file_name: String,
    /// Whether the file was converted
    pub ok: bool,
    /// Failure description when `ok` is false
    pub error: Option<String>,
}

/// Outcome of a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files converted
    pub succeeded: usize,
    /// Files that failed
    pub failed: usize,
    /// One-line human readable summary
    pub summary: String,
}

impl BatchSummary {
    /// Number of files attempted
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// True when the source directory held no input files
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Converts a directory of message files
#[derive(Debug, Clone)]
pub struct BatchConverter<R = PdfRenderer> {
    labels: Labels,
    renderer: R,
    input_extension: String,
    output_extension: String,
}

impl BatchConverter<PdfRenderer> {
    /// Converter with English labels and an A4 PDF renderer
    #[must_use]
    pub fn new() -> Self {
        Self::with_renderer(PdfRenderer::default())
    }
}

impl Default for BatchConverter<PdfRenderer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Renderer> BatchConverter<R> {
    /// Converter that writes its output through `renderer`
    pub fn with_renderer(renderer: R) -> Self {
        Self {
            labels: Labels::default(),
            renderer,
            input_extension: "eml".to_string(),
            output_extension: "pdf".to_string(),
        }
    }

    /// Use `labels` for header lines and the subject placeholder
    #[must_use]
    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Extension (without dot) of the files to pick up; case-insensitive
    #[must_use]
    pub fn input_extension(mut self, extension: &str) -> Self {
        self.input_extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Extension (without dot) given to output files
    #[must_use]
    pub fn output_extension(mut self, extension: &str) -> Self {
        self.output_extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Input files of `source`, sorted by file name
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::SourceDir`] if the directory cannot be listed.
    pub fn find_inputs(&self, source: &Path) -> Result<Vec<PathBuf>> {
        let dir_err = |source_err| ConvertError::SourceDir {
            path: source.to_path_buf(),
            source: source_err,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(source).map_err(dir_err)? {
            let path = entry.map_err(dir_err)?.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.input_extension));
            if matches && path.is_file() {
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Destination of `input`: same stem, output extension, inside `dest`
    #[must_use]
    pub fn output_path(&self, input: &Path, dest: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map_or_else(|| "message".into(), |s| s.to_string_lossy());
        dest.join(format!("{stem}.{}", self.output_extension))
    }

    /// Parse, lay out and render one file
    ///
    /// # Errors
    ///
    /// Returns the per-file error of whichever stage failed.
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<()> {
        let message = parse_eml_file(input, &self.labels.no_subject)?;
        let blocks = build(&message, &self.labels);
        debug!("{}: {} layout blocks", input.display(), blocks.len());
        self.renderer
            .render(&DocumentInfo::for_message(&message), &blocks, output)
    }

    /// Convert every input file of `source` into `dest`
    ///
    /// # Errors
    ///
    /// See [`Self::run_with_progress`].
    pub fn run(&self, source: &Path, dest: &Path) -> Result<BatchSummary> {
        self.run_with_progress(source, dest, |_| {})
    }

    /// Convert every input file of `source` into `dest`, calling
    /// `on_progress` after each file in processing order.
    ///
    /// `dest` is created first. When no input file exists the summary says
    /// so and `on_progress` is never called.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::OutputDir`] or [`ConvertError::SourceDir`] when
    /// a directory is unusable. Per-file errors are counted, not returned.
    pub fn run_with_progress<F>(
        &self,
        source: &Path,
        dest: &Path,
        mut on_progress: F,
    ) -> Result<BatchSummary>
    where
        F: FnMut(&ProgressEvent),
    {
        fs::create_dir_all(dest).map_err(|source_err| ConvertError::OutputDir {
            path: dest.to_path_buf(),
            source: source_err,
        })?;

        let files = self.find_inputs(source)?;
        if files.is_empty() {
            info!("no .{} files in {}", self.input_extension, source.display());
            return Ok(BatchSummary {
                succeeded: 0,
                failed: 0,
                summary: format!("No .{} files found", self.input_extension),
            });
        }

        let total = files.len();
        let mut succeeded = 0;
        let mut failed = 0;

        for (i, input) in files.iter().enumerate() {
            let file_name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let output = self.output_path(input, dest);

            let error = match self.convert_file(input, &output) {
                Ok(()) => {
                    succeeded += 1;
                    info!("converted {} -> {}", input.display(), output.display());
                    None
                }
                Err(e) if e.is_per_file() => {
                    failed += 1;
                    info!("{file_name} failed: {e}");
                    Some(e.to_string())
                }
                Err(e) => return Err(e),
            };

            on_progress(&ProgressEvent {
                index: i + 1,
                total,
                file_name,
                ok: error.is_none(),
                error,
            });
        }

        let mut summary = format!("Converted {succeeded}/{total} files");
        if failed > 0 {
            summary.push_str(&format!(", {failed} failed"));
        }

        Ok(BatchSummary {
            succeeded,
            failed,
            summary,
        })
    }
}
