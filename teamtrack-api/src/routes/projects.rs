/// Project endpoints
///
/// All routes are nested under a team; a project id from another team never
/// resolves.
///
/// # Endpoints
///
/// - `GET /v1/teams/{tid}/projects` - List projects
/// - `POST /v1/teams/{tid}/projects` - Create a project
/// - `GET /v1/teams/{tid}/projects/{pid}` - Get a project
/// - `PATCH /v1/teams/{tid}/projects/{pid}` - Partial update
/// - `DELETE /v1/teams/{tid}/projects/{pid}` - Delete a project

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use teamtrack_shared::{
    auth::policy::{self, Principal, TeamScope},
    models::{
        project::{CreateProject, Project, UpdateProject},
        team::Team,
    },
};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Resolves the team and the caller's scope, or 404
async fn load_team(
    state: &AppState,
    principal: &Principal,
    team_id: Uuid,
) -> ApiResult<(Team, TeamScope)> {
    let team = Team::find_by_id(&state.db, team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let scope = team.scope_for(&state.db, principal.id).await?;

    Ok((team, scope))
}

/// Lists a team's projects
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Project>>> {
    let (team, scope) = load_team(&state, &principal, team_id).await?;
    policy::require_view(&principal, &scope)?;

    let projects = Project::list_by_team(&state.db, team.id).await?;

    Ok(Json(projects))
}

/// Creates a project in a team
///
/// # Errors
///
/// - `400 Bad Request`: empty name
/// - `403 Forbidden`: caller cannot manage the team
pub async fn create_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;

    let (team, scope) = load_team(&state, &principal, team_id).await?;
    policy::require_manage(&principal, &scope)?;

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name must not be empty".to_string()));
    }

    let project = Project::create(
        &state.db,
        CreateProject {
            name,
            description: req
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            team_id: team.id,
        },
    )
    .await?;

    tracing::info!(project_id = %project.id, team_id = %team.id, "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}

/// Gets a project
pub async fn get_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((team_id, project_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Project>> {
    let (team, scope) = load_team(&state, &principal, team_id).await?;
    policy::require_view(&principal, &scope)?;

    let project = Project::find_by_id_and_team(&state.db, project_id, team.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// Applies a partial update to a project
///
/// A supplied name that trims to empty is skipped rather than rejected; a
/// supplied description is applied even when empty; a supplied status is
/// applied as-is.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((team_id, project_id)): Path<(Uuid, Uuid)>,
    Json(patch): Json<UpdateProject>,
) -> ApiResult<Json<Project>> {
    let (team, scope) = load_team(&state, &principal, team_id).await?;
    policy::require_manage(&principal, &scope)?;

    let project = Project::update(&state.db, project_id, team.id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    tracing::info!(project_id = %project.id, "Project updated");

    Ok(Json(project))
}

/// Deletes a project
///
/// Tasks and their relation rows cascade away.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((team_id, project_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let (team, scope) = load_team(&state, &principal, team_id).await?;
    policy::require_manage(&principal, &scope)?;

    let deleted = Project::delete(&state.db, project_id, team.id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %project_id, "Project deleted");

    Ok(StatusCode::NO_CONTENT)
}
