/// Team and membership endpoints
///
/// # Endpoints
///
/// - `GET /v1/teams` - Role-filtered team list
/// - `POST /v1/teams` - Create a team (admin / team_lead)
/// - `GET /v1/teams/{id}` - Team with members
/// - `DELETE /v1/teams/{id}` - Delete a team
/// - `GET /v1/teams/{id}/members` - List members
/// - `POST /v1/teams/{id}/members` - Add a member
/// - `DELETE /v1/teams/{id}/members?user_id=` - Remove a member

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamtrack_shared::{
    auth::policy::{self, Principal, TeamScope},
    models::{
        team::{CreateTeam, Team},
        user::{PublicUser, UserRole},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Create team request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Lead of the new team; defaults to the caller
    #[serde(default)]
    pub lead_id: Option<Uuid>,
}

/// Team with its member list expanded
#[derive(Debug, Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<PublicUser>,
}

/// Add member request
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

/// Remove member query
#[derive(Debug, Deserialize)]
pub struct RemoveMemberQuery {
    pub user_id: Uuid,
}

/// Resolves a team and the caller's scope, or 404
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

/// Lists teams visible to the caller
///
/// Admins see every team; team leads see the teams they lead; regular users
/// see the teams they belong to. A lead who is also a member of someone
/// else's team does not get that team here.
pub async fn list_teams(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<Team>>> {
    let teams = match principal.role {
        UserRole::Admin => Team::list_all(&state.db).await?,
        UserRole::TeamLead => Team::list_led_by(&state.db, principal.id).await?,
        UserRole::User => Team::list_member_of(&state.db, principal.id).await?,
    };

    Ok(Json(teams))
}

/// Creates a team
///
/// # Errors
///
/// - `400 Bad Request`: empty name, or the lead lacks the team_lead/admin role
/// - `403 Forbidden`: caller is a regular user
pub async fn create_team(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    req.validate()?;

    if !principal.can_create_team() {
        return Err(ApiError::Forbidden(
            "Only admins and team leads may create teams".to_string(),
        ));
    }

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name must not be empty".to_string()));
    }

    let team = Team::create(
        &state.db,
        CreateTeam {
            name,
            description: req
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            lead_id: req.lead_id.unwrap_or(principal.id),
        },
    )
    .await?;

    tracing::info!(team_id = %team.id, lead_id = %team.lead_id, "Team created");

    Ok((StatusCode::CREATED, Json(team)))
}

/// Gets a team with its members
pub async fn get_team(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Json<TeamDetail>> {
    let (team, scope) = load_team(&state, &principal, team_id).await?;
    policy::require_view(&principal, &scope)?;

    let members = Team::list_members(&state.db, team.id).await?;

    Ok(Json(TeamDetail { team, members }))
}

/// Deletes a team
///
/// Projects, tasks, and membership rows cascade away.
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let (team, scope) = load_team(&state, &principal, team_id).await?;
    policy::require_manage(&principal, &scope)?;

    Team::delete(&state.db, team.id).await?;

    tracing::info!(team_id = %team.id, "Team deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Lists a team's members
pub async fn list_members(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let (team, scope) = load_team(&state, &principal, team_id).await?;
    policy::require_view(&principal, &scope)?;

    let members = Team::list_members(&state.db, team.id).await?;

    Ok(Json(members))
}

/// Adds a member to a team
///
/// # Errors
///
/// - `404 Not Found`: team or user missing
/// - `409 Conflict`: user is already a member
pub async fn add_member(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<StatusCode> {
    let (team, scope) = load_team(&state, &principal, team_id).await?;
    policy::require_manage(&principal, &scope)?;

    Team::add_member(&state.db, team.id, req.user_id).await?;

    tracing::info!(team_id = %team.id, user_id = %req.user_id, "Member added");

    Ok(StatusCode::CREATED)
}

/// Removes a member from a team
///
/// Removing a user who is not on the roster succeeds without effect; only
/// the add direction treats duplicates as an error.
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<Uuid>,
    Query(query): Query<RemoveMemberQuery>,
) -> ApiResult<StatusCode> {
    let (team, scope) = load_team(&state, &principal, team_id).await?;
    policy::require_manage(&principal, &scope)?;

    let removed = Team::remove_member(&state.db, team.id, query.user_id).await?;
    if removed {
        tracing::info!(team_id = %team.id, user_id = %query.user_id, "Member removed");
    }

    Ok(StatusCode::NO_CONTENT)
}
