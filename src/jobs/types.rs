use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use morphd_core::{BatchId, Category, JobId};
use morphd_engines::ConvertOptions;

/// A tracked unit of asynchronous conversion work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub input_path: PathBuf,
    pub file_name: String,
    pub category: Category,
    pub output_format: String,
    pub status: JobStatus,
    /// 0-100, monotonically non-decreasing while running.
    pub progress: u8,
    /// Estimated seconds remaining; `None` until progress is reported.
    pub eta_seconds: Option<u64>,
    /// Produced artifacts; empty until completion.
    pub output_paths: Vec<PathBuf>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Present when the job was submitted as part of a batch.
    pub batch_id: Option<BatchId>,
    pub options: ConvertOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Completed, failed, and cancelled jobs accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl Job {
    pub fn new(
        input_path: PathBuf,
        category: Category,
        output_format: String,
        options: ConvertOptions,
        batch_id: Option<BatchId>,
    ) -> Self {
        let file_name = input_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            id: JobId::new(),
            input_path,
            file_name,
            category,
            output_format,
            status: JobStatus::Queued,
            progress: 0,
            eta_seconds: None,
            output_paths: Vec::new(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            batch_id,
            options,
        }
    }

    pub fn start(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Apply a progress update and refresh the ETA estimate.
    ///
    /// Regressive updates are ignored so observed progress is always
    /// non-decreasing. The ETA is a plain linear extrapolation from the
    /// last observed percentage:
    ///
    ///   rate = elapsed / (p / 100)
    ///   eta  = max(0, round(rate - elapsed))
    ///
    /// Capabilities that report coarse milestones make this jumpy; that is
    /// a known property of the formula, kept as-is rather than smoothed.
    pub fn update_progress(&mut self, percent: u8) {
        if self.status != JobStatus::Running {
            return;
        }
        let percent = percent.min(100);
        if percent < self.progress {
            return;
        }
        self.progress = percent;
        self.eta_seconds = self.estimate_eta(percent);
    }

    fn estimate_eta(&self, percent: u8) -> Option<u64> {
        if percent == 0 {
            return None;
        }
        let started_at = self.started_at?;
        let elapsed = (Utc::now() - started_at).num_milliseconds().max(0) as f64 / 1000.0;
        let rate = elapsed / (percent as f64 / 100.0);
        Some((rate - elapsed).round().max(0.0) as u64)
    }

    pub fn complete(&mut self, output_paths: Vec<PathBuf>) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.eta_seconds = Some(0);
        self.output_paths = output_paths;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: &str) {
        self.status = JobStatus::Failed;
        self.error = Some(error.to_string());
        self.completed_at = Some(Utc::now());
    }

    pub fn cancel(&mut self) {
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }

    /// Primary output artifact, once completed.
    pub fn output_location(&self) -> Option<&PathBuf> {
        self.output_paths.first()
    }
}
