//! Result retrieval: stream the output artifact, then evict the job.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures::Stream;
use tokio_util::io::ReaderStream;

use morphd_core::{Error, JobId};

use crate::jobs::{JobRegistry, JobStatus};
use crate::server::routes_api::error_response;
use crate::server::AppContext;

/// Stream a completed job's output. When the stream is dropped (normally:
/// fully sent), the job's artifacts are deleted and the record evicted, so
/// the id subsequently yields 404.
pub(super) async fn download_job(
    State(ctx): State<AppContext>,
    Path(id): Path<JobId>,
) -> Result<Response, (StatusCode, String)> {
    let job = ctx
        .registry
        .get(id)
        .ok_or_else(|| error_response(&Error::not_found(format!("job {id}"))))?;

    if job.status != JobStatus::Completed {
        return Err(error_response(&Error::invalid_state(format!(
            "job {id} is {}, not completed",
            job.status
        ))));
    }

    let output = job
        .output_paths
        .first()
        .cloned()
        .ok_or_else(|| error_response(&Error::internal("completed job has no output")))?;

    if job.output_paths.len() > 1 {
        // Multi-artifact jobs (split, page images) are collected from the
        // output directory; streaming one of several and deleting the rest
        // would lose data.
        return Err(error_response(&Error::invalid_state(format!(
            "job {id} produced {} artifacts; fetch them from the output directory",
            job.output_paths.len()
        ))));
    }

    let file = tokio::fs::File::open(&output).await.map_err(|e| {
        error_response(&Error::internal(format!(
            "failed to open {}: {e}",
            output.display()
        )))
    })?;

    let file_name = output
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());

    let stream = EvictingStream {
        inner: ReaderStream::new(file),
        registry: Arc::clone(&ctx.registry),
        id,
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| error_response(&Error::internal(format!("response build failed: {e}"))))
}

/// File stream that finalizes and evicts the job once dropped.
struct EvictingStream {
    inner: ReaderStream<tokio::fs::File>,
    registry: Arc<JobRegistry>,
    id: JobId,
}

impl Stream for EvictingStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for EvictingStream {
    fn drop(&mut self) {
        if let Err(e) = self.registry.finalize_and_evict(self.id) {
            tracing::debug!("Post-download eviction of {}: {}", self.id, e);
        }
    }
}
