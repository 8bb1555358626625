//! Top-level entry points: run a selection of stages in pipeline order.
//!
//! Each stage reads only what the previous stages left on disk, so any
//! subset can be run on its own. Whatever order the caller lists the stages
//! in, they execute in [`Stage::ALL`] order, each at most once.

use crate::config::{DatasetConfig, Stage};
use crate::error::DatasetError;
use crate::output::{DatasetReport, ManifestStats, StageReport};
use crate::pipeline::{manifest, markdown, pdf, render};
use std::time::Instant;
use tracing::info;

/// Run `stages` against `config`.
///
/// # Returns
/// One [`StageReport`] per executed stage. Per-file failures are listed in
/// the reports and never stop the run.
///
/// # Errors
/// The first fatal error stops the run: an unreadable input directory, a
/// pdfium binding failure, manifest I/O, or a strict-pairing mismatch.
pub async fn build_dataset(
    config: &DatasetConfig,
    stages: &[Stage],
) -> Result<DatasetReport, DatasetError> {
    let total_start = Instant::now();
    let mut report = DatasetReport::default();

    for stage in Stage::ALL.into_iter().filter(|s| stages.contains(s)) {
        report.stages.push(run_stage(config, stage).await?);
    }

    report.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Dataset run finished: {} stage(s), {} failure(s) in {}ms",
        report.stages.len(),
        report.total_failures(),
        report.total_duration_ms
    );
    Ok(report)
}

/// Run a single stage.
pub async fn run_stage(config: &DatasetConfig, stage: Stage) -> Result<StageReport, DatasetError> {
    match stage {
        Stage::DocxToPdf => pdf::docx_to_pdf(config).await,
        Stage::DocxToMarkdown => markdown::docx_to_markdown(config).await,
        Stage::PdfToPng => render::pdf_to_png(config).await,
        Stage::Manifest => manifest::manifest_stage(config),
    }
}

/// Synchronous wrapper around [`build_dataset`].
///
/// Creates a temporary tokio runtime internally. Must not be called from
/// inside an existing runtime.
pub fn build_dataset_sync(
    config: &DatasetConfig,
    stages: &[Stage],
) -> Result<DatasetReport, DatasetError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DatasetError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build_dataset(config, stages))
}

/// Build the manifest only; blocking.
pub fn build_manifest(config: &DatasetConfig) -> Result<ManifestStats, DatasetError> {
    manifest::build_manifest(config)
}
