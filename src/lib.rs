//! # docx2dataset
//!
//! Prepare an OCR training dataset of (page image, page markdown) pairs from
//! a folder of `.docx` documents.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .docx
//!  │
//!  ├─ 1. PDF       libreoffice --headless --convert-to pdf
//!  ├─ 2. Markdown  pandoc -t markdown_mmd (optionally page by page)
//!  ├─ 3. Images    rasterise every PDF page via pdfium (spawn_blocking)
//!  └─ 4. Manifest  zip images and markdown into dataset.jsonl
//! ```
//!
//! Every stage works on directories under one document root (default
//! `../documents`) and can be run on its own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docx2dataset::{build_dataset, DatasetConfig, Stage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatasetConfig::builder()
//!         .root("documents")
//!         .split_pages(true)
//!         .build()?;
//!     let report = build_dataset(&config, &Stage::ALL).await?;
//!     if let Some(stats) = report.stage(Stage::Manifest).and_then(|r| r.manifest.as_ref()) {
//!         eprintln!("{} records", stats.records);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docx2dataset` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Runtime requirements
//!
//! The PDF and markdown stages shell out to `libreoffice` and `pandoc`; the
//! image stage needs a pdfium shared library (see [`pipeline::render::bind_pdfium`]).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod dataset;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DatasetConfig, DatasetConfigBuilder, PageSelection, Stage};
pub use dataset::{build_dataset, build_dataset_sync, build_manifest, run_stage};
pub use error::{DatasetError, ItemError};
pub use output::{DatasetReport, ManifestRecord, ManifestStats, StageReport};
pub use pipeline::markdown::docx_to_markdown;
pub use pipeline::pdf::docx_to_pdf;
pub use pipeline::render::{
    bind_pdfium, pdf_to_png, rasterize, PageOutput, PdfSource, RasterOutcome, RasterPage,
    RasterTarget,
};
pub use pipeline::split::split_docx;
pub use pipeline::tool::ToolOutcome;
pub use progress::{NoopProgressCallback, ProgressCallback, StageProgressCallback};
