use crate::artifact::UploadedArtifact;
use crate::validation::{ArtifactOutcome, ValidationEngine};
use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::error;

pub(crate) type Task = (usize, UploadedArtifact);
pub(crate) type Done = (usize, ArtifactOutcome);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    pub processed: usize,
    pub panicked: usize,
}

/// Fixed set of validation workers fed through a bounded channel.
pub(crate) struct WorkerPool {
    handles: Vec<thread::JoinHandle<ProcessingStats>>,
    tx: Sender<Task>,
}

impl WorkerPool {
    pub(crate) fn new(engine: Arc<ValidationEngine>, num_threads: usize, done: Sender<Done>) -> Self {
        let num_threads = num_threads.max(1);
        let (tx, rx) = bounded::<Task>(num_threads * 2);
        let mut handles = Vec::with_capacity(num_threads);

        for _ in 0..num_threads {
            let rx = rx.clone();
            let done = done.clone();
            let engine = Arc::clone(&engine);
            let handle = thread::spawn(move || {
                let mut local_stats = ProcessingStats::default();
                while let Ok((idx, artifact)) = rx.recv() {
                    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| engine.validate(&artifact))) {
                        Ok(outcome) => outcome,
                        Err(payload) => {
                            let reason = panic_message(payload.as_ref());
                            error!(upload = %artifact.upload_id, %reason, "validation worker panicked");
                            local_stats.panicked += 1;
                            engine.unprocessable(&artifact, format!("validation aborted: {}", reason))
                        }
                    };
                    local_stats.processed += 1;
                    if done.send((idx, outcome)).is_err() {
                        break;
                    }
                }
                local_stats
            });
            handles.push(handle);
        }

        WorkerPool { handles, tx }
    }

    pub(crate) fn send(&self, idx: usize, artifact: UploadedArtifact) -> Result<()> {
        self.tx
            .send((idx, artifact))
            .map_err(|_| anyhow!("validation workers stopped before the batch was queued"))
    }

    pub(crate) fn finish(self) -> Result<ProcessingStats> {
        drop(self.tx);

        let mut stats = ProcessingStats::default();
        for handle in self.handles {
            let worker_stats = handle
                .join()
                .map_err(|_| anyhow!("validation worker terminated abnormally"))?;
            stats.processed += worker_stats.processed;
            stats.panicked += worker_stats.panicked;
        }
        Ok(stats)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
