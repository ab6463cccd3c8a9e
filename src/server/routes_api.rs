use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use morphd_core::{BatchId, Error, JobId};
use morphd_engines::ConvertOptions;

use crate::jobs::Job;
use crate::server::{download, AppContext};

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/formats", get(get_formats))
        .route("/jobs", get(list_jobs).post(submit_jobs))
        .route("/jobs/:id", get(get_job).delete(cancel_job))
        .route("/jobs/:id/download", get(download::download_job))
}

/// Map a core error onto an HTTP status per the error taxonomy.
pub(super) fn error_response(err: &Error) -> (StatusCode, String) {
    let status = match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidState(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

async fn get_formats(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.capabilities.formats())
}

async fn list_jobs(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(ctx.registry.list())
}

#[derive(Deserialize)]
struct SubmitRequest {
    /// Single input, or...
    input_path: Option<String>,
    /// ...a batch of inputs.
    #[serde(default)]
    input_paths: Vec<String>,
    output_format: String,
    #[serde(default)]
    options: ConvertOptions,
}

#[derive(Serialize)]
struct SubmitResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_id: Option<BatchId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    job_ids: Vec<JobId>,
}

/// Submit one conversion or a batch. Validation failures reject the whole
/// request with 400 and create no jobs; on success the response returns
/// immediately while conversion proceeds in the background.
async fn submit_jobs(
    State(ctx): State<AppContext>,
    Json(payload): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), (StatusCode, String)> {
    let mut inputs: Vec<PathBuf> = Vec::new();
    if let Some(single) = payload.input_path {
        let single = single.trim().to_string();
        if !single.is_empty() {
            inputs.push(PathBuf::from(single));
        }
    }
    inputs.extend(
        payload
            .input_paths
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from),
    );

    if inputs.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "input_path or input_paths is required".to_string(),
        ));
    }

    let output_format = payload.output_format.trim().to_lowercase();

    // Validate every input up front; a bad batch member means no job is
    // created at all.
    let mut categories = Vec::with_capacity(inputs.len());
    for input in &inputs {
        if !input.is_file() {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Input is not a readable file: {}", input.display()),
            ));
        }
        let category = ctx
            .capabilities
            .validate(input, &output_format)
            .map_err(|e| error_response(&e))?;
        categories.push(category);
    }

    let batch_id = if inputs.len() > 1 {
        Some(BatchId::new())
    } else {
        None
    };

    let jobs: Vec<Job> = inputs
        .into_iter()
        .zip(categories)
        .map(|(input, category)| {
            ctx.registry.create(
                input,
                category,
                output_format.clone(),
                payload.options.clone(),
                batch_id,
            )
        })
        .collect();

    let job_ids: Vec<JobId> = jobs.iter().map(|j| j.id).collect();

    match batch_id {
        Some(batch_id) => {
            tracing::info!("Submitted batch {} with {} jobs", batch_id, job_ids.len());
            ctx.runner.spawn_batch(job_ids.clone());
            Ok((
                StatusCode::ACCEPTED,
                Json(SubmitResponse {
                    job_id: None,
                    batch_id: Some(batch_id),
                    job_ids,
                }),
            ))
        }
        None => {
            let id = job_ids[0];
            tracing::info!("Submitted job {}", id);
            ctx.runner.spawn(id);
            Ok((
                StatusCode::ACCEPTED,
                Json(SubmitResponse {
                    job_id: Some(id),
                    batch_id: None,
                    job_ids: Vec::new(),
                }),
            ))
        }
    }
}

async fn get_job(
    State(ctx): State<AppContext>,
    Path(id): Path<JobId>,
) -> Result<Json<Job>, (StatusCode, String)> {
    ctx.registry
        .get(id)
        .map(Json)
        .ok_or_else(|| error_response(&Error::not_found(format!("job {id}"))))
}

async fn cancel_job(
    State(ctx): State<AppContext>,
    Path(id): Path<JobId>,
) -> Result<Json<Job>, (StatusCode, String)> {
    ctx.registry
        .cancel(id)
        .map(Json)
        .map_err(|e| error_response(&e))
}
