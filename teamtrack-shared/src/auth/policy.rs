/// Authorization policy for team, project, and task operations
///
/// This module implements role-based access control (RBAC) as pure functions
/// over an authenticated principal and a team scope. Handlers load the scope
/// from the database once and then every permission decision is a cheap,
/// deterministic check that can be unit tested without any infrastructure.
///
/// # Permission Model
///
/// 1. **Global role**: `admin` bypasses team checks everywhere; `team_lead`
///    may create teams; `user` has no standing permissions
/// 2. **Team scope**: the team lead and team members gain view/edit access
///    within their team; only admins and the lead may manage it
/// 3. **Authorship**: a task's author may delete their own task
///
/// # Example
///
/// ```
/// use teamtrack_shared::auth::policy::{Principal, TeamScope};
/// use teamtrack_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let lead_id = Uuid::new_v4();
/// let principal = Principal { id: lead_id, role: UserRole::User };
/// let scope = TeamScope { lead_id, is_member: false };
///
/// assert!(principal.can_manage_team(&scope));
/// assert!(principal.can_view_team(&scope));
/// ```

use uuid::Uuid;

use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Principal lacks permission for the operation
    #[error("Insufficient permissions: {0}")]
    Forbidden(&'static str),
}

/// The authenticated caller of an operation
///
/// Built by the authentication middleware from validated JWT claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// User ID (JWT `sub` claim)
    pub id: Uuid,

    /// Global role (JWT `role` claim)
    pub role: UserRole,
}

/// A principal's relationship to one team
///
/// Loaded from the database per request; permission checks never touch the
/// database themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamScope {
    /// The team's lead
    pub lead_id: Uuid,

    /// Whether the principal is on the team roster
    pub is_member: bool,
}

impl Principal {
    /// Whether this principal has the global admin role
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether this principal leads the scoped team
    pub fn is_lead(&self, scope: &TeamScope) -> bool {
        scope.lead_id == self.id
    }

    /// Whether this principal may create a new team
    ///
    /// Admins and team leads may create teams; regular users may not.
    pub fn can_create_team(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::TeamLead)
    }

    /// Whether this principal may list all users
    ///
    /// Used for roster pickers when assembling teams, so it follows the same
    /// rule as team creation.
    pub fn can_list_users(&self) -> bool {
        self.can_create_team()
    }

    /// Whether this principal may view the team and its projects and tasks
    ///
    /// Admins, the team lead, and team members may view.
    pub fn can_view_team(&self, scope: &TeamScope) -> bool {
        self.is_admin() || self.is_lead(scope) || scope.is_member
    }

    /// Whether this principal may create and edit tasks within the team
    ///
    /// Same audience as viewing: admins, the team lead, and team members.
    pub fn can_edit_tasks(&self, scope: &TeamScope) -> bool {
        self.can_view_team(scope)
    }

    /// Whether this principal may manage the team
    ///
    /// Covers editing or deleting the team, changing the roster, and
    /// creating, updating, or deleting projects. Admins and the lead only.
    pub fn can_manage_team(&self, scope: &TeamScope) -> bool {
        self.is_admin() || self.is_lead(scope)
    }

    /// Whether this principal may delete a task
    ///
    /// Admins, the team lead, and the task's author. `author_id` is `None`
    /// when the authoring account has been removed.
    pub fn can_delete_task(&self, scope: &TeamScope, author_id: Option<Uuid>) -> bool {
        self.can_manage_team(scope) || author_id == Some(self.id)
    }
}

/// Requires view access to a team
pub fn require_view(principal: &Principal, scope: &TeamScope) -> Result<(), PolicyError> {
    if principal.can_view_team(scope) {
        Ok(())
    } else {
        Err(PolicyError::Forbidden("no access to this team"))
    }
}

/// Requires management access to a team
pub fn require_manage(principal: &Principal, scope: &TeamScope) -> Result<(), PolicyError> {
    if principal.can_manage_team(scope) {
        Ok(())
    } else {
        Err(PolicyError::Forbidden(
            "only admins and the team lead may manage this team",
        ))
    }
}

/// Requires task edit access within a team
pub fn require_edit_tasks(principal: &Principal, scope: &TeamScope) -> Result<(), PolicyError> {
    if principal.can_edit_tasks(scope) {
        Ok(())
    } else {
        Err(PolicyError::Forbidden("no access to tasks in this team"))
    }
}

/// Requires delete access to a specific task
pub fn require_delete_task(
    principal: &Principal,
    scope: &TeamScope,
    author_id: Option<Uuid>,
) -> Result<(), PolicyError> {
    if principal.can_delete_task(scope, author_id) {
        Ok(())
    } else {
        Err(PolicyError::Forbidden(
            "only admins, the team lead, or the task author may delete a task",
        ))
    }
}
