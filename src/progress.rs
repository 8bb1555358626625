//! Progress-callback trait for per-file stage events.
//!
//! Inject an [`Arc<dyn StageProgressCallback>`] via
//! [`crate::config::DatasetConfigBuilder::progress_callback`] to receive
//! events as each stage walks its input directory.
//!
//! # Example
//!
//! ```rust
//! use docx2dataset::{DatasetConfig, Stage, StageProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl StageProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, stage: Stage, index: usize, total: usize, name: &str) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{stage}] {index}/{total} {name}");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { done: AtomicUsize::new(0) });
//! let config = DatasetConfig::builder()
//!     .progress_callback(cb as Arc<dyn StageProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::config::Stage;
use std::sync::Arc;

/// Called by the stages as they process each input file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait StageProgressCallback: Send + Sync {
    /// Called once a stage knows how many inputs it will process.
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let _ = (stage, total);
    }

    /// Called before an input file is processed.
    fn on_item_start(&self, stage: Stage, index: usize, total: usize, name: &str) {
        let _ = (stage, index, total, name);
    }

    /// Called when an input file was processed successfully.
    fn on_item_complete(&self, stage: Stage, index: usize, total: usize, name: &str) {
        let _ = (stage, index, total, name);
    }

    /// Called when an input file was skipped (its output already exists).
    fn on_item_skipped(&self, stage: Stage, index: usize, total: usize, name: &str) {
        let _ = (stage, index, total, name);
    }

    /// Called when an input file failed; the stage continues.
    fn on_item_error(&self, stage: Stage, index: usize, total: usize, name: &str, error: &str) {
        let _ = (stage, index, total, name, error);
    }

    /// Called once after all inputs have been attempted.
    fn on_stage_complete(&self, stage: Stage, total: usize, success_count: usize) {
        let _ = (stage, total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StageProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DatasetConfig`].
pub type ProgressCallback = Arc<dyn StageProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetConfig;
    use crate::pipeline::pdf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl StageProgressCallback for EventLog {
        fn on_stage_start(&self, stage: Stage, total: usize) {
            self.0.lock().unwrap().push(format!("start {stage} {total}"));
        }

        fn on_item_start(&self, _stage: Stage, index: usize, total: usize, name: &str) {
            self.0.lock().unwrap().push(format!("item {index}/{total} {name}"));
        }

        fn on_item_error(&self, _stage: Stage, index: usize, _total: usize, _name: &str, _error: &str) {
            self.0.lock().unwrap().push(format!("error {index}"));
        }

        fn on_stage_complete(&self, stage: Stage, total: usize, success_count: usize) {
            self.0
                .lock()
                .unwrap()
                .push(format!("done {stage} {success_count}/{total}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::PdfToPng, 2);
        cb.on_item_start(Stage::PdfToPng, 1, 2, "a.pdf");
        cb.on_item_complete(Stage::PdfToPng, 1, 2, "a.pdf");
        cb.on_item_skipped(Stage::PdfToPng, 2, 2, "b.pdf");
        cb.on_item_error(Stage::PdfToPng, 2, 2, "b.pdf", "bad");
        cb.on_stage_complete(Stage::PdfToPng, 2, 1);
    }

    #[tokio::test]
    async fn stage_events_are_one_based_and_ordered() {
        let root = tempfile::tempdir().unwrap();
        let log = Arc::new(EventLog::default());
        let config = DatasetConfig::builder()
            .root(root.path())
            .office_program("docx2dataset-no-such-office")
            .progress_callback(log.clone())
            .build()
            .unwrap();
        std::fs::create_dir_all(&config.docxs_dir).unwrap();
        std::fs::write(config.docxs_dir.join("a.docx"), b"x").unwrap();
        std::fs::write(config.docxs_dir.join("b.docx"), b"x").unwrap();

        pdf::docx_to_pdf(&config).await.unwrap();

        assert_eq!(
            *log.0.lock().unwrap(),
            vec![
                "start docx-to-pdf 2",
                "item 1/2 a.docx",
                "error 1",
                "item 2/2 b.docx",
                "error 2",
                "done docx-to-pdf 0/2",
            ]
        );
    }
}
