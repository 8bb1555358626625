//! Error types for the docx2dataset library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DatasetError`] is **fatal**: a stage cannot proceed at all (invalid
//!   configuration, unreadable input directory, pdfium unavailable, manifest
//!   not writable). Returned as `Err(DatasetError)` from the stage functions.
//!
//! * [`ItemError`] is **non-fatal**: a single document failed (converter
//!   crashed, corrupt PDF, unreadable `.docx`) but the stage carries on with
//!   the next file. Stored in [`crate::output::StageReport::failures`].
//!
//! The dataset is assembled from whatever the converters managed to produce,
//! so per-file failures are reported rather than propagated.

use crate::pipeline::tool::ToolOutcome;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docx2dataset library.
#[derive(Debug, Error)]
pub enum DatasetError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Filesystem errors ─────────────────────────────────────────────────
    /// A stage input directory could not be listed.
    #[error("Failed to read directory '{path}': {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file or directory.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A markdown page file could not be read as UTF-8 text.
    #[error("Failed to read markdown file '{path}': {source}")]
    MarkdownRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// The `.docx` package is not a readable zip or lacks `word/document.xml`.
    #[error("'{path}' is not a readable DOCX package: {detail}")]
    InvalidDocx { path: PathBuf, detail: String },

    // ── Pairing errors ────────────────────────────────────────────────────
    /// Strict pairing found a different number of images and markdown files.
    #[error("Pairing mismatch for '{scope}': {images} images vs {markdown} markdown files")]
    PairingMismatch {
        scope: String,
        images: usize,
        markdown: usize,
    },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium system-wide, place it in the working directory, or\n\
set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single source file.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The external converter did not succeed.
    #[error("{file}: {outcome}")]
    Tool { file: PathBuf, outcome: ToolOutcome },

    /// The document could not be split into pages.
    #[error("{file}: page split failed: {detail}")]
    Split { file: PathBuf, detail: String },

    /// The PDF could not be opened or a page failed to render.
    #[error("{file}: rasterisation failed: {detail}")]
    Render { file: PathBuf, detail: String },

    /// The converter reported success but its output file is missing.
    #[error("{file}: converter exited cleanly but '{expected}' was not created")]
    MissingOutput { file: PathBuf, expected: PathBuf },
}

impl ItemError {
    /// The source file this failure belongs to.
    pub fn file(&self) -> &std::path::Path {
        match self {
            ItemError::Tool { file, .. }
            | ItemError::Split { file, .. }
            | ItemError::Render { file, .. }
            | ItemError::MissingOutput { file, .. } => file,
        }
    }
}
