//! Result types returned by the stages.

use crate::config::Stage;
use crate::error::ItemError;
use serde::{Deserialize, Serialize};

/// Value of the `meta` field of every manifest record.
pub const EMPTY_META: &str = "[]";

/// One training sample: a page image and the markdown text of that page.
///
/// Field order is the key order of the serialised JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// `<images_root>/<document folder>/<image file>`.
    pub image: String,
    /// Full text of the paired markdown file, trimmed.
    pub markdown: String,
    /// Always [`EMPTY_META`].
    pub meta: String,
}

impl ManifestRecord {
    pub fn new(image: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            markdown: markdown.into(),
            meta: EMPTY_META.to_string(),
        }
    }
}

/// Counts produced by the manifest builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestStats {
    /// Records written to the manifest.
    pub records: usize,
    /// Document pairs (image folder, markdown folder) that were zipped.
    pub documents: usize,
    /// Image entries left without a markdown partner.
    pub dropped_images: usize,
    /// Markdown entries left without an image partner.
    pub dropped_markdown: usize,
}

/// Outcome of one conversion stage over its input directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    /// Input files the stage considered.
    pub total: usize,
    /// Inputs converted successfully.
    pub succeeded: usize,
    /// Inputs skipped because their output already existed.
    pub skipped: usize,
    /// Per-file failures; the stage carried on past each of them.
    pub failures: Vec<ItemError>,
    /// Filled by the manifest stage only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ManifestStats>,
    pub duration_ms: u64,
}

impl StageReport {
    pub fn new(stage: Stage, total: usize) -> Self {
        Self {
            stage,
            total,
            succeeded: 0,
            skipped: 0,
            failures: Vec::new(),
            manifest: None,
            duration_ms: 0,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reports of every stage run by [`crate::dataset::build_dataset`], in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetReport {
    pub stages: Vec<StageReport>,
    pub total_duration_ms: u64,
}

impl DatasetReport {
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    pub fn total_failures(&self) -> usize {
        self.stages.iter().map(StageReport::failed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serialises_in_key_order_with_literal_unicode() {
        let rec = ManifestRecord::new("images/a/01.png", "# Überschrift\n\n«texte»");
        let line = serde_json::to_string(&rec).unwrap();
        assert_eq!(
            line,
            r##"{"image":"images/a/01.png","markdown":"# Überschrift\n\n«texte»","meta":"[]"}"##
        );
    }

    #[test]
    fn report_counts() {
        let mut r = StageReport::new(Stage::DocxToPdf, 3);
        r.succeeded = 2;
        r.failures.push(ItemError::Split {
            file: "x.docx".into(),
            detail: "bad zip".into(),
        });
        assert_eq!(r.failed(), 1);
        assert!(!r.is_clean());

        let report = DatasetReport {
            stages: vec![r, StageReport::new(Stage::Manifest, 0)],
            total_duration_ms: 0,
        };
        assert_eq!(report.total_failures(), 1);
        assert!(report.stage(Stage::Manifest).is_some());
        assert!(report.stage(Stage::PdfToPng).is_none());
    }
}
