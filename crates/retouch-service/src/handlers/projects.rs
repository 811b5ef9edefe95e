//! Project and version handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use retouch_core::{ImageVersion, Project, ProjectId};
use retouch_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Create-project request: the uploaded original image.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    /// Public URL of the already-uploaded original image.
    pub image_ref: String,
}

/// Project response.
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    /// Project ID.
    pub id: String,
    /// Created timestamp.
    pub created_at: String,
    /// The current chain head, when requested with version context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<VersionResponse>,
}

/// Image version response.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    /// Version ID.
    pub id: String,
    /// Parent version ID, absent for the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Public URL of the stored image.
    pub image_ref: String,
    /// The prompt that produced this version.
    pub prompt: String,
    /// Optional named style.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Whether this is the uploaded original.
    pub is_original: bool,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&ImageVersion> for VersionResponse {
    fn from(version: &ImageVersion) -> Self {
        Self {
            id: version.id.to_string(),
            parent_id: version.parent_id.map(|id| id.to_string()),
            image_ref: version.image_ref.clone(),
            prompt: version.prompt.clone(),
            style: version.style.clone(),
            is_original: version.is_original,
            created_at: version.created_at.to_rfc3339(),
        }
    }
}

fn project_response(project: &Project, latest: Option<&ImageVersion>) -> ProjectResponse {
    ProjectResponse {
        id: project.id.to_string(),
        created_at: project.created_at.to_rfc3339(),
        latest_version: latest.map(VersionResponse::from),
    }
}

/// Create a project rooted at an uploaded image.
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiError> {
    if body.image_ref.trim().is_empty() {
        return Err(ApiError::BadRequest("image_ref must not be empty".into()));
    }

    let project = Project::new(auth.user_id);
    let root = ImageVersion::original(project.id, body.image_ref);
    state.store.create_project(&project, &root)?;

    tracing::info!(
        project_id = %project.id,
        user_id = %auth.user_id,
        "Project created"
    );

    Ok((
        StatusCode::CREATED,
        Json(project_response(&project, Some(&root))),
    ))
}

/// List the authenticated user's projects, newest first.
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = state.store.list_projects(&auth.user_id)?;
    Ok(Json(
        projects
            .iter()
            .map(|p| project_response(p, None))
            .collect(),
    ))
}

/// Get one project with its current chain head.
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(project_id): Path<ProjectId>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project = owned_project(&state, &auth, &project_id)?;
    let latest = state.store.latest_version(&project_id)?;
    Ok(Json(project_response(&project, latest.as_ref())))
}

/// List a project's versions in chain order, root first.
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(project_id): Path<ProjectId>,
) -> Result<Json<Vec<VersionResponse>>, ApiError> {
    owned_project(&state, &auth, &project_id)?;
    let versions = state.store.list_versions(&project_id)?;
    Ok(Json(versions.iter().map(VersionResponse::from).collect()))
}

/// Load a project and enforce ownership.
pub(crate) fn owned_project(
    state: &AppState,
    auth: &AuthUser,
    project_id: &ProjectId,
) -> Result<Project, ApiError> {
    let project = state
        .store
        .get_project(project_id)?
        .ok_or_else(|| ApiError::NotFound(format!("project not found: {project_id}")))?;
    if project.user_id != auth.user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(project)
}
