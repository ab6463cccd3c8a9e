//! Job registry and state machine.
//!
//! The registry is the single owner and sole mutator of job records. Other
//! components read snapshot clones. State transitions:
//!
//!   queued --start--> running --success--> completed
//!                     running --failure--> failed
//!   {queued, running} --cancel--> cancelled
//!
//! Cancellation is cooperative: a cancel while running does not stop the
//! in-flight engine; finalization checks status first and discards the
//! result of a cancelled job.

mod runner;
mod types;

pub use runner::JobRunner;
pub use types::{Job, JobStatus};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;

use morphd_core::{BatchId, Category, Error, JobId, Result};
use morphd_engines::ConvertOptions;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Job lifecycle event for observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum JobEvent {
    Queued {
        #[serde(flatten)]
        job: Job,
    },
    Started {
        id: JobId,
    },
    Progress {
        id: JobId,
        progress: u8,
        eta_seconds: Option<u64>,
    },
    Completed {
        #[serde(flatten)]
        job: Job,
    },
    Failed {
        id: JobId,
        error: String,
    },
    Cancelled {
        id: JobId,
    },
}

/// In-memory job table. Volatile by design: records live from submission
/// until output retrieval or cancellation cleanup.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl JobRegistry {
    pub fn new() -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            jobs: RwLock::new(HashMap::new()),
            event_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast(&self, event: JobEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("No subscribers for job event");
        }
    }

    /// Create a job in the queued state.
    pub fn create(
        &self,
        input_path: PathBuf,
        category: Category,
        output_format: String,
        options: ConvertOptions,
        batch_id: Option<BatchId>,
    ) -> Job {
        let job = Job::new(input_path, category, output_format, options, batch_id);

        {
            let mut jobs = self.jobs.write();
            jobs.insert(job.id, job.clone());
        }

        self.broadcast(JobEvent::Queued { job: job.clone() });
        job
    }

    /// Transition a queued job to running. Returns false if the job is
    /// gone or was cancelled while queued, in which case the caller must
    /// skip execution.
    pub fn start(&self, id: JobId) -> bool {
        let started = {
            let mut jobs = self.jobs.write();
            match jobs.get_mut(&id) {
                Some(job) if job.status == JobStatus::Queued => {
                    job.start();
                    true
                }
                _ => false,
            }
        };

        if started {
            self.broadcast(JobEvent::Started { id });
        }
        started
    }

    /// Apply a progress sample to a running job. Non-running jobs and
    /// regressive samples are ignored, so any observer sees a
    /// non-decreasing progress stream.
    pub fn update_progress(&self, id: JobId, percent: u8) {
        let update = {
            let mut jobs = self.jobs.write();
            match jobs.get_mut(&id) {
                Some(job) if job.status == JobStatus::Running => {
                    job.update_progress(percent);
                    Some((job.progress, job.eta_seconds))
                }
                _ => None,
            }
        };

        if let Some((progress, eta_seconds)) = update {
            self.broadcast(JobEvent::Progress {
                id,
                progress,
                eta_seconds,
            });
        }
    }

    /// Finalize a successful conversion.
    ///
    /// If the job was cancelled while the engine was in flight, the result
    /// is discarded: the produced artifacts are removed best-effort and the
    /// record is left untouched (cancellation wins over a late completion).
    pub fn complete(&self, id: JobId, output_paths: Vec<PathBuf>) {
        let completed = {
            let mut jobs = self.jobs.write();
            match jobs.get_mut(&id) {
                Some(job) if job.status == JobStatus::Running => {
                    job.complete(output_paths.clone());
                    Some(job.clone())
                }
                Some(job) if job.status == JobStatus::Cancelled => None,
                other => {
                    tracing::warn!(
                        "Ignoring completion of job {} in state {:?}",
                        id,
                        other.map(|j| j.status)
                    );
                    return;
                }
            }
        };

        match completed {
            Some(job) => self.broadcast(JobEvent::Completed { job }),
            None => {
                tracing::info!("Job {} was cancelled; discarding conversion result", id);
                remove_artifacts(&output_paths);
            }
        }
    }

    /// Record a failed conversion. Failures of cancelled jobs are dropped
    /// silently; the job already reached a terminal state.
    pub fn fail(&self, id: JobId, error: &str) {
        let failed = {
            let mut jobs = self.jobs.write();
            match jobs.get_mut(&id) {
                Some(job) if job.status == JobStatus::Running => {
                    job.fail(error);
                    true
                }
                _ => false,
            }
        };

        if failed {
            self.broadcast(JobEvent::Failed {
                id,
                error: error.to_string(),
            });
        }
    }

    /// Cancel a non-terminal job, removing its artifacts best-effort.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for unknown ids; [`Error::InvalidState`] when
    /// the job is already terminal.
    pub fn cancel(&self, id: JobId) -> Result<Job> {
        let (job, artifacts) = {
            let mut jobs = self.jobs.write();
            let job = jobs
                .get_mut(&id)
                .ok_or_else(|| Error::not_found(format!("job {id}")))?;

            if job.status.is_terminal() {
                return Err(Error::invalid_state(format!(
                    "job {id} is already {}",
                    job.status
                )));
            }

            job.cancel();
            let mut artifacts = job.output_paths.clone();
            artifacts.push(job.input_path.clone());
            (job.clone(), artifacts)
        };

        remove_artifacts(&artifacts);
        self.broadcast(JobEvent::Cancelled { id });
        Ok(job)
    }

    /// Snapshot of one job.
    pub fn get(&self, id: JobId) -> Option<Job> {
        let jobs = self.jobs.read();
        jobs.get(&id).cloned()
    }

    /// Snapshot of all jobs, newest first.
    pub fn list(&self) -> Vec<Job> {
        let jobs = self.jobs.read();
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Called once the output has been delivered: remove output and input
    /// artifacts best-effort and drop the job record.
    pub fn finalize_and_evict(&self, id: JobId) -> Result<()> {
        let job = {
            let mut jobs = self.jobs.write();
            jobs.remove(&id)
                .ok_or_else(|| Error::not_found(format!("job {id}")))?
        };

        let mut artifacts = job.output_paths.clone();
        artifacts.push(job.input_path.clone());
        remove_artifacts(&artifacts);

        tracing::debug!("Evicted job {}", id);
        Ok(())
    }
}

/// Best-effort artifact deletion: failures are logged, never raised.
fn remove_artifacts(paths: &[PathBuf]) {
    for path in paths {
        remove_artifact(path);
    }
}

fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove artifact {}: {}", path.display(), e),
    }
}
