/// User listing endpoint
///
/// # Endpoints
///
/// - `GET /v1/users` - List users (admin and team_lead only)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use teamtrack_shared::{auth::policy::Principal, models::user::{PublicUser, User}};

/// Pagination parameters
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,

    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

/// Lists users for roster assembly
///
/// Only admins and team leads may see the user directory; it backs the
/// member picker when creating teams.
///
/// # Errors
///
/// - `403 Forbidden`: caller is a regular user
pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    if !principal.can_list_users() {
        return Err(ApiError::Forbidden(
            "Only admins and team leads may list users".to_string(),
        ));
    }

    let users = User::list(&state.db, query.limit.clamp(1, 500), query.offset.max(0)).await?;

    Ok(Json(users))
}
