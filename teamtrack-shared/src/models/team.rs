/// Team model, roster, and membership operations
///
/// A team has exactly one lead plus zero or more members, stored as rows in
/// `team_members`. The lead is not duplicated into the member table; code
/// that needs the full roster takes the union via [`TeamRoster`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     lead_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE team_members (
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (team_id, user_id)
/// );
/// ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::policy::TeamScope;
use crate::models::user::{PublicUser, UserRole};

/// Error type for team and membership operations
#[derive(Debug, thiserror::Error)]
pub enum TeamError {
    /// The designated lead does not exist or lacks the team_lead/admin role
    #[error("Lead must be an existing user with the team_lead or admin role")]
    InvalidLead,

    /// The user being added does not exist
    #[error("User not found")]
    UnknownUser,

    /// Duplicate add; removing a non-member is a no-op, adding twice is not
    #[error("User is already a member of this team")]
    AlreadyMember,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Team model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    /// Unique team ID (UUID v4)
    pub id: Uuid,

    /// Team name
    pub name: String,

    /// Team description (empty string if none given)
    pub description: String,

    /// The user leading this team
    pub lead_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a team
#[derive(Debug, Clone)]
pub struct CreateTeam {
    pub name: String,
    pub description: String,
    pub lead_id: Uuid,
}

/// The full roster of a team: the lead plus every member
///
/// Used by the task graph engine to validate assignee and observer lists
/// without further queries.
#[derive(Debug, Clone)]
pub struct TeamRoster {
    pub lead_id: Uuid,
    pub member_ids: HashSet<Uuid>,
}

impl TeamRoster {
    /// Whether a user is on the roster (lead counts)
    pub fn contains(&self, user_id: Uuid) -> bool {
        user_id == self.lead_id || self.member_ids.contains(&user_id)
    }

    /// Whether every given user is on the roster
    ///
    /// An empty slice is trivially contained.
    pub fn contains_all(&self, user_ids: &[Uuid]) -> bool {
        user_ids.iter().all(|id| self.contains(*id))
    }
}

impl Team {
    /// Creates a team
    ///
    /// The lead must exist and hold the `team_lead` or `admin` role.
    ///
    /// # Errors
    ///
    /// Returns `TeamError::InvalidLead` if the lead check fails.
    pub async fn create(pool: &PgPool, data: CreateTeam) -> Result<Self, TeamError> {
        let lead_role: Option<(UserRole,)> =
            sqlx::query_as("SELECT role FROM users WHERE id = $1")
                .bind(data.lead_id)
                .fetch_optional(pool)
                .await?;

        match lead_role {
            Some((UserRole::TeamLead | UserRole::Admin,)) => {}
            _ => return Err(TeamError::InvalidLead),
        }

        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, description, lead_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, lead_id, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.lead_id)
        .fetch_one(pool)
        .await?;

        Ok(team)
    }

    /// Finds a team by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, description, lead_id, created_at, updated_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(team)
    }

    /// Lists every team, newest first
    ///
    /// Admin-only view; other roles go through [`Team::list_led_by`] or
    /// [`Team::list_member_of`].
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let teams = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, description, lead_id, created_at, updated_at
            FROM teams
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(teams)
    }

    /// Lists teams the user leads, newest first
    ///
    /// Membership in other teams does not count; that view belongs to
    /// [`Team::list_member_of`].
    pub async fn list_led_by(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let teams = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, name, description, lead_id, created_at, updated_at
            FROM teams
            WHERE lead_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(teams)
    }

    /// Lists teams the user has a membership row in, newest first
    pub async fn list_member_of(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let teams = sqlx::query_as::<_, Team>(
            r#"
            SELECT t.id, t.name, t.description, t.lead_id, t.created_at, t.updated_at
            FROM teams t
            JOIN team_members tm ON tm.team_id = t.id
            WHERE tm.user_id = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(teams)
    }

    /// Deletes a team
    ///
    /// Membership rows, projects, and their tasks cascade away by FK policy.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Builds the principal's [`TeamScope`] for this team
    pub async fn scope_for(&self, pool: &PgPool, user_id: Uuid) -> Result<TeamScope, sqlx::Error> {
        let is_member = Team::is_member(pool, self.id, user_id).await?;

        Ok(TeamScope {
            lead_id: self.lead_id,
            is_member,
        })
    }

    /// Whether a user has a membership row in this team
    ///
    /// The lead is not a member row; use [`TeamRoster::contains`] when the
    /// lead should count.
    pub async fn is_member(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM team_members
                WHERE team_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Adds a member to the team
    ///
    /// # Errors
    ///
    /// - `TeamError::UnknownUser` if the user does not exist
    /// - `TeamError::AlreadyMember` if the user is already on the roster
    pub async fn add_member(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), TeamError> {
        let (user_exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        if !user_exists {
            return Err(TeamError::UnknownUser);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO team_members (team_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (team_id, user_id) DO NOTHING
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TeamError::AlreadyMember);
        }

        Ok(())
    }

    /// Removes a member from the team
    ///
    /// Removing someone who is not a member is a silent no-op; returns
    /// whether a row was actually deleted.
    pub async fn remove_member(
        pool: &PgPool,
        team_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM team_members
            WHERE team_id = $1 AND user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the team's members as user stubs, ordered by name
    pub async fn list_members(
        pool: &PgPool,
        team_id: Uuid,
    ) -> Result<Vec<PublicUser>, sqlx::Error> {
        let members = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT u.id, u.email, u.name, u.role, u.created_at, u.last_login_at
            FROM team_members tm
            JOIN users u ON u.id = tm.user_id
            WHERE tm.team_id = $1
            ORDER BY u.name ASC
            "#,
        )
        .bind(team_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Loads the full roster (lead plus members) for a team
    ///
    /// Returns `None` if the team does not exist.
    pub async fn roster(pool: &PgPool, team_id: Uuid) -> Result<Option<TeamRoster>, sqlx::Error> {
        let lead: Option<(Uuid,)> = sqlx::query_as("SELECT lead_id FROM teams WHERE id = $1")
            .bind(team_id)
            .fetch_optional(pool)
            .await?;

        let Some((lead_id,)) = lead else {
            return Ok(None);
        };

        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM team_members WHERE team_id = $1")
                .bind(team_id)
                .fetch_all(pool)
                .await?;

        Ok(Some(TeamRoster {
            lead_id,
            member_ids: rows.into_iter().map(|(id,)| id).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_with(members: &[Uuid]) -> TeamRoster {
        TeamRoster {
            lead_id: Uuid::new_v4(),
            member_ids: members.iter().copied().collect(),
        }
    }

    #[test]
    fn test_roster_contains_lead() {
        let roster = roster_with(&[]);
        assert!(roster.contains(roster.lead_id));
    }

    #[test]
    fn test_roster_contains_member() {
        let member = Uuid::new_v4();
        let roster = roster_with(&[member]);

        assert!(roster.contains(member));
        assert!(!roster.contains(Uuid::new_v4()));
    }

    #[test]
    fn test_roster_contains_all() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let roster = roster_with(&[a, b]);

        assert!(roster.contains_all(&[]));
        assert!(roster.contains_all(&[a]));
        assert!(roster.contains_all(&[a, b, roster.lead_id]));
        assert!(!roster.contains_all(&[a, Uuid::new_v4()]));
    }

    #[test]
    fn test_team_error_display() {
        assert!(TeamError::InvalidLead.to_string().contains("team_lead"));
        assert!(TeamError::AlreadyMember
            .to_string()
            .contains("already a member"));
    }
}
