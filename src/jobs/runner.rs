//! Job execution.
//!
//! The runner is the registry's execution routine: it resolves the
//! capability for a job's category, forwards engine progress into the
//! registry, and finalizes the job. Every failure is trapped into the
//! failed state; nothing here can take the process down.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;

use morphd_core::{run_bounded, JobId};
use morphd_engines::{progress_channel, CapabilityRegistry, ConvertRequest};

use crate::config::ConversionConfig;
use crate::jobs::JobRegistry;

/// Executes jobs against the capability registry with a global concurrency
/// bound.
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    capabilities: Arc<CapabilityRegistry>,
    semaphore: Arc<Semaphore>,
    output_dir: PathBuf,
    work_dir: PathBuf,
    batch_concurrency: usize,
}

impl JobRunner {
    pub fn new(
        registry: Arc<JobRegistry>,
        capabilities: Arc<CapabilityRegistry>,
        conversion: &ConversionConfig,
    ) -> Arc<Self> {
        let limit = conversion.max_concurrent_jobs.max(1);
        Arc::new(Self {
            registry,
            capabilities,
            semaphore: Arc::new(Semaphore::new(limit)),
            output_dir: conversion.output_dir.clone(),
            work_dir: conversion.work_dir.clone(),
            batch_concurrency: limit,
        })
    }

    /// Execute one job to a terminal state. Never returns an error: all
    /// failures are recorded on the job.
    pub async fn run(&self, id: JobId) {
        let Some(job) = self.registry.get(id) else {
            tracing::warn!("Job {} vanished before execution", id);
            return;
        };

        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("job semaphore closed");

        // A cancel may have arrived while we waited for a slot; never
        // start the engine for a cancelled job.
        if !self.registry.start(id) {
            tracing::debug!("Job {} no longer startable, skipping", id);
            return;
        }

        tracing::info!(
            "Processing job {}: {} -> {}",
            id,
            job.input_path.display(),
            job.output_format
        );

        let Some(capability) = self.capabilities.capability_for(job.category) else {
            self.registry.fail(
                id,
                &format!("no capability registered for category {}", job.category),
            );
            return;
        };

        let (progress_tx, mut progress_rx) = progress_channel();
        let registry = Arc::clone(&self.registry);
        let forwarder = tokio::spawn(async move {
            while let Some(percent) = progress_rx.recv().await {
                registry.update_progress(id, percent);
            }
        });

        let request = ConvertRequest {
            input: job.input_path.clone(),
            output_format: job.output_format.clone(),
            output_dir: self.output_dir.clone(),
            work_dir: self.work_dir.clone(),
            options: job.options.clone(),
            progress: Some(progress_tx),
        };

        let result = capability.convert(&request).await;

        // Dropping the request closes the progress channel; wait for the
        // forwarder so every sample lands before finalization.
        drop(request);
        let _ = forwarder.await;

        match result {
            Ok(outcome) if outcome.is_empty() => {
                self.registry
                    .fail(id, "conversion produced no output (no pages matched)");
            }
            Ok(outcome) => {
                tracing::info!("Job {} completed ({} artifacts)", id, outcome.len());
                self.registry.complete(id, outcome.into_paths());
            }
            Err(e) => {
                tracing::error!("Job {} failed: {}", id, e);
                self.registry.fail(id, &e.to_string());
            }
        }
    }

    /// Fan a batch out through the bounded worker pool. Individual job
    /// failures are recorded on the jobs and never abort the batch.
    pub async fn run_batch(self: &Arc<Self>, ids: Vec<JobId>) {
        let runner = Arc::clone(self);
        let result = run_bounded(ids, self.batch_concurrency, move |id| {
            let runner = Arc::clone(&runner);
            async move {
                runner.run(id).await;
                Ok(())
            }
        })
        .await;

        if let Err(e) = result {
            tracing::error!("Batch execution error: {}", e);
        }
    }

    /// Detach a single-job execution.
    pub fn spawn(self: &Arc<Self>, id: JobId) {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.run(id).await });
    }

    /// Detach a batch execution.
    pub fn spawn_batch(self: &Arc<Self>, ids: Vec<JobId>) {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.run_batch(ids).await });
    }
}
