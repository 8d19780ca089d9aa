//! Batch validation: every map upload is settled before any final report is
//! checked against the registry.

mod threading;

pub use threading::ProcessingStats;

use crate::artifact::{UploadKind, UploadedArtifact};
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use crate::validation::{ArtifactOutcome, ValidationEngine};
use anyhow::Result;
use crossbeam_channel::unbounded;
use std::sync::Arc;
use threading::{Done, WorkerPool};
use tracing::info;

/// Persistence seam for per-upload outcomes.
pub trait StatusSink {
    fn record(&mut self, outcome: &ArtifactOutcome) -> Result<()>;
}

impl StatusSink for Vec<ArtifactOutcome> {
    fn record(&mut self, outcome: &ArtifactOutcome) -> Result<()> {
        self.push(outcome.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// One outcome per artifact, in submission order.
    pub outcomes: Vec<ArtifactOutcome>,
    pub stats: ProcessingStats,
}

impl BatchReport {
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn rejected(&self) -> usize {
        self.outcomes.len() - self.accepted()
    }
}

pub struct BatchPipeline {
    engine: Arc<ValidationEngine>,
    workers: usize,
    show_progress: bool,
}

impl BatchPipeline {
    pub fn new(engine: Arc<ValidationEngine>, workers: usize) -> Self {
        Self {
            engine,
            workers: workers.max(1),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }

    pub fn engine(&self) -> &Arc<ValidationEngine> {
        &self.engine
    }

    pub fn run(&self, artifacts: Vec<UploadedArtifact>, sink: &mut dyn StatusSink) -> Result<BatchReport> {
        let total = artifacts.len();
        let (maps, reports): (Vec<_>, Vec<_>) = artifacts
            .into_iter()
            .enumerate()
            .partition(|(_, artifact)| artifact.kind == UploadKind::Map);
        info!(maps = maps.len(), reports = reports.len(), workers = self.workers, "validating batch");

        let progress = ProgressBarBuilder::new("Validating uploads")
            .with_template("{spinner:.green} [{elapsed_precise}] {msg} [{wide_bar}] {pos}/{len}")
            .with_length(total as u64)
            .hidden(!self.show_progress)
            .build()?;

        let mut slots: Vec<Option<ArtifactOutcome>> = vec![None; total];
        let mut stats = ProcessingStats::default();
        for phase in [maps, reports] {
            if phase.is_empty() {
                continue;
            }
            let (phase_stats, done) = self.run_phase(phase)?;
            stats.processed += phase_stats.processed;
            stats.panicked += phase_stats.panicked;
            for (idx, outcome) in done {
                sink.record(&outcome)?;
                progress.set_message(format!("{} {}", outcome.upload_id, outcome.status.code));
                progress.inc(1);
                slots[idx] = Some(outcome);
            }
        }

        progress.finish_with_message(format!("Validated {} uploads", total));
        let report = BatchReport {
            outcomes: slots.into_iter().flatten().collect(),
            stats,
        };
        info!(accepted = report.accepted(), rejected = report.rejected(), "batch complete");
        Ok(report)
    }

    fn run_phase(&self, phase: Vec<(usize, UploadedArtifact)>) -> Result<(ProcessingStats, Vec<Done>)> {
        let (done_tx, done_rx) = unbounded();
        let pool = WorkerPool::new(Arc::clone(&self.engine), self.workers.min(phase.len()), done_tx);
        for (idx, artifact) in phase {
            pool.send(idx, artifact)?;
        }
        let stats = pool.finish()?;
        let mut done: Vec<Done> = done_rx.try_iter().collect();
        done.sort_by_key(|(idx, _)| *idx);
        Ok((stats, done))
    }
}
