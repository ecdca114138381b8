//! Error types for email conversion

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Conversion errors
///
/// The first three variants describe a single input file and are recovered by
/// the batch driver (counted as a failure, the batch continues). Directory
/// errors abort the batch.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Source file missing, unreadable or permission-denied
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Bytes cannot be interpreted as an internet message
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Output document could not be produced
    #[error("Failed to render {}: {reason}", path.display())]
    Render {
        /// Destination document
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Source directory cannot be listed
    #[error("Failed to read source directory {}: {source}", path.display())]
    SourceDir {
        /// Directory that was enumerated
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Destination directory cannot be created
    #[error("Failed to create output directory {}: {source}", path.display())]
    OutputDir {
        /// Directory that was created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    /// Whether this error concerns one input file only.
    ///
    /// Per-file errors are counted and reported by the batch driver; anything
    /// else terminates the batch.
    #[must_use]
    pub const fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::FileRead { .. } | Self::MalformedMessage(_) | Self::Render { .. }
        )
    }
}
