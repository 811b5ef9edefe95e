//! Edit submission and job status handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use retouch_core::{EditJob, EditParams, JobId, ProjectId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::jobs;
use crate::state::AppState;

/// Default aspect ratio when the request omits one.
const DEFAULT_ASPECT_RATIO: &str = "match_input_image";

/// Edit submission request.
#[derive(Debug, Deserialize)]
pub struct SubmitEditRequest {
    /// The edit instruction.
    pub prompt: String,

    /// Optional named style.
    pub style: Option<String>,

    /// Output aspect ratio; defaults to matching the input image.
    pub aspect_ratio: Option<String>,
}

/// Job response.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    /// Job ID.
    pub id: String,
    /// Project the result belongs to.
    pub project_id: String,
    /// Lifecycle state, flattened as `status` plus state fields.
    #[serde(flatten)]
    pub state: retouch_core::JobState,
    /// Submitted timestamp.
    pub created_at: String,
}

impl From<&EditJob> for JobResponse {
    fn from(job: &EditJob) -> Self {
        Self {
            id: job.id.to_string(),
            project_id: job.project_id.to_string(),
            state: job.state.clone(),
            created_at: job.created_at.to_rfc3339(),
        }
    }
}

/// Submit an AI edit against a project's current image.
///
/// Charges one credit up front; a job that later fails refunds it.
pub async fn submit_edit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(project_id): Path<ProjectId>,
    Json(body): Json<SubmitEditRequest>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    if body.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".into()));
    }

    let params = EditParams {
        prompt: body.prompt,
        style: body.style,
        aspect_ratio: body
            .aspect_ratio
            .unwrap_or_else(|| DEFAULT_ASPECT_RATIO.into()),
    };

    let job = jobs::submit_edit(&state, auth.user_id, project_id, params).await?;
    Ok((StatusCode::ACCEPTED, Json(JobResponse::from(&job))))
}

/// Get the current state of an edit job.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(job_id): Path<JobId>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state
        .jobs
        .get(&job_id)
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {job_id}")))?;
    if job.user_id != auth.user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(JobResponse::from(&job)))
}
