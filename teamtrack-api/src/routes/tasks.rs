/// Task endpoints
///
/// Thin HTTP layer over the task graph engine: handlers resolve the team,
/// project, and task (404 on any mismatch), check permissions, and hand the
/// payload to `teamtrack_shared::graph`.
///
/// # Endpoints
///
/// - `GET /v1/teams/{tid}/projects/{pid}/tasks` - List tasks, newest first
/// - `POST /v1/teams/{tid}/projects/{pid}/tasks` - Create a task
/// - `GET .../tasks/{id}` - Task with relations expanded
/// - `PATCH .../tasks/{id}` - Partial update
/// - `DELETE .../tasks/{id}` - Delete a task

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use teamtrack_shared::{
    auth::policy::{self, Principal, TeamScope},
    graph::{self, NewTask, TaskPatch},
    models::{
        project::Project,
        task::{Task, TaskDetail},
        team::{Team, TeamRoster},
    },
};
use uuid::Uuid;

/// Resolves team, scope, and project, or 404
async fn load_project(
    state: &AppState,
    principal: &Principal,
    team_id: Uuid,
    project_id: Uuid,
) -> ApiResult<(Team, TeamScope, Project)> {
    let team = Team::find_by_id(&state.db, team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let scope = team.scope_for(&state.db, principal.id).await?;

    let project = Project::find_by_id_and_team(&state.db, project_id, team.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok((team, scope, project))
}

/// Loads the team roster for assignee/observer validation
async fn load_roster(state: &AppState, team_id: Uuid) -> ApiResult<TeamRoster> {
    Team::roster(&state.db, team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))
}

/// Lists a project's tasks, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((team_id, project_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<Task>>> {
    let (_, scope, project) = load_project(&state, &principal, team_id, project_id).await?;
    policy::require_view(&principal, &scope)?;

    let tasks = Task::list_by_project(&state.db, project.id).await?;

    Ok(Json(tasks))
}

/// Creates a task
///
/// # Errors
///
/// - `400 Bad Request`: empty title, assignee/observer off the roster,
///   parent or related task not in this project
/// - `403 Forbidden`: caller is not a team participant
pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((team_id, project_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<NewTask>,
) -> ApiResult<(StatusCode, Json<TaskDetail>)> {
    let (team, scope, project) = load_project(&state, &principal, team_id, project_id).await?;
    policy::require_edit_tasks(&principal, &scope)?;

    let roster = load_roster(&state, team.id).await?;

    let detail = graph::create_task(&state.db, project.id, &roster, principal.id, input).await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Gets a task with relations expanded
pub async fn get_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((team_id, project_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<TaskDetail>> {
    let (_, scope, project) = load_project(&state, &principal, team_id, project_id).await?;
    policy::require_view(&principal, &scope)?;

    let task = Task::find_by_id_and_project(&state.db, task_id, project.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task.detail(&state.db).await?))
}

/// Applies a partial update to a task
///
/// # Errors
///
/// - `400 Bad Request`: graph validation failed (empty title, roster
///   violation, bad parent/related id, cycle)
/// - `404 Not Found`: team, project, or task did not resolve
pub async fn update_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((team_id, project_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<Json<TaskDetail>> {
    let (team, scope, project) = load_project(&state, &principal, team_id, project_id).await?;
    policy::require_edit_tasks(&principal, &scope)?;

    let task = Task::find_by_id_and_project(&state.db, task_id, project.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let roster = load_roster(&state, team.id).await?;

    let detail = graph::update_task(&state.db, &roster, task, patch).await?;

    Ok(Json(detail))
}

/// Deletes a task
///
/// Allowed for admins, the team lead, and the task's author. Children keep
/// existing with a nulled parent; related edges disappear with the task.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((team_id, project_id, task_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let (_, scope, project) = load_project(&state, &principal, team_id, project_id).await?;

    let task = Task::find_by_id_and_project(&state.db, task_id, project.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    policy::require_delete_task(&principal, &scope, task.author_id)?;

    Task::delete(&state.db, task.id).await?;

    tracing::info!(task_id = %task.id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}
