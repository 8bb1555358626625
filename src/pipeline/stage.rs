//! Bookkeeping shared by every stage: report counters, progress events and
//! per-item log lines.

use crate::config::{DatasetConfig, Stage};
use crate::error::ItemError;
use crate::output::{ManifestStats, StageReport};
use std::time::Instant;
use tracing::{info, warn};

pub(crate) struct StageRun<'a> {
    config: &'a DatasetConfig,
    report: StageReport,
    started: Instant,
}

impl<'a> StageRun<'a> {
    pub(crate) fn begin(config: &'a DatasetConfig, stage: Stage, total: usize) -> Self {
        info!("[{}] {} input(s)", stage, total);
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage_start(stage, total);
        }
        Self {
            config,
            report: StageReport::new(stage, total),
            started: Instant::now(),
        }
    }

    pub(crate) fn item_start(&self, index: usize, name: &str) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_item_start(self.report.stage, index + 1, self.report.total, name);
        }
    }

    pub(crate) fn succeed(&mut self, index: usize, name: &str) {
        self.report.succeeded += 1;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_item_complete(self.report.stage, index + 1, self.report.total, name);
        }
    }

    pub(crate) fn skip(&mut self, index: usize, name: &str) {
        self.report.skipped += 1;
        info!("[{}] skipping {}: output already exists", self.report.stage, name);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_item_skipped(self.report.stage, index + 1, self.report.total, name);
        }
    }

    pub(crate) fn fail(&mut self, index: usize, name: &str, error: ItemError) {
        let msg = error.to_string();
        warn!("[{}] {}", self.report.stage, msg);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_item_error(self.report.stage, index + 1, self.report.total, name, &msg);
        }
        self.report.failures.push(error);
    }

    pub(crate) fn set_manifest(&mut self, stats: ManifestStats) {
        self.report.manifest = Some(stats);
    }

    pub(crate) fn finish(mut self) -> StageReport {
        self.report.duration_ms = self.started.elapsed().as_millis() as u64;
        info!(
            "[{}] done: {} ok, {} skipped, {} failed in {}ms",
            self.report.stage,
            self.report.succeeded,
            self.report.skipped,
            self.report.failures.len(),
            self.report.duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_complete(self.report.stage, self.report.total, self.report.succeeded);
        }
        self.report
    }
}
