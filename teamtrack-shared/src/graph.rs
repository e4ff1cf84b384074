/// Task graph engine
///
/// All task mutations go through this module. It validates titles, enforces
/// that assignees and observers come from the team roster, checks that
/// parent and related tasks resolve inside the project, and rejects parent
/// changes that would close a cycle. Authorization happens before the engine
/// runs; storage details live in [`crate::models::task`].
///
/// # Validation order (creation)
///
/// 1. title non-empty after trim
/// 2. assignee/observer lists within the roster
/// 3. parent resolves in the same project (no cycle check needed: a new
///    task has no descendants)
/// 4. every related id resolves in the same project
/// 5. insert with a per-project sequential task number, relations written
///    in the same transaction
///
/// # Validation order (update)
///
/// As above for supplied fields, plus: self-parenting and any parent whose
/// ancestor chain reaches the task itself are rejected as cycles, and the
/// task's own id is silently dropped from the related list.

use serde::{Deserialize, Deserializer};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::task::{
    InsertTask, Task, TaskDetail, TaskFieldPatch, TaskPriority, TaskStatus,
};
use crate::models::team::TeamRoster;

/// Error type for task graph mutations
///
/// Every variant except `DatabaseError` maps to HTTP 400.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A field failed validation
    #[error("{0}")]
    Validation(String),

    /// An assignee is not on the team roster
    #[error("All assignees must be members of the team")]
    InvalidAssignee,

    /// An observer is not on the team roster
    #[error("All observers must be members of the team")]
    InvalidObserver,

    /// The parent task does not exist in this project
    #[error("Parent task not found in this project")]
    InvalidParent,

    /// A related task does not exist in this project
    #[error("Related task not found in this project")]
    InvalidRelatedTask,

    /// The parent change would make the task its own ancestor
    #[error("Task cannot be its own ancestor")]
    CyclicDependency,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Request body for creating a task
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[serde(default)]
    pub parent_id: Option<Uuid>,

    #[serde(default)]
    pub assignee_ids: Vec<Uuid>,

    #[serde(default)]
    pub observer_ids: Vec<Uuid>,

    #[serde(default)]
    pub related_ids: Vec<Uuid>,
}

/// Request body for updating a task
///
/// Every field is optional; for `parent_id` an explicit JSON `null` clears
/// the parent while an absent key leaves it untouched, hence the nested
/// `Option`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[serde(default)]
    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub parent_id: Option<Option<Uuid>>,

    #[serde(default)]
    pub assignee_ids: Option<Vec<Uuid>>,

    #[serde(default)]
    pub observer_ids: Option<Vec<Uuid>>,

    #[serde(default)]
    pub related_ids: Option<Vec<Uuid>>,
}

/// Distinguishes an absent key from an explicit `null`
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Creates a task in a project
///
/// `roster` is the owning team's roster; `author_id` becomes the task's
/// author. The caller has already checked authorization.
pub async fn create_task(
    pool: &PgPool,
    project_id: Uuid,
    roster: &TeamRoster,
    author_id: Uuid,
    input: NewTask,
) -> Result<TaskDetail, GraphError> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(GraphError::Validation("Title must not be empty".to_string()));
    }

    check_roster(roster, &input.assignee_ids, GraphError::InvalidAssignee)?;
    check_roster(roster, &input.observer_ids, GraphError::InvalidObserver)?;

    if let Some(parent_id) = input.parent_id {
        let parent = Task::find_by_id_and_project(pool, parent_id, project_id).await?;
        if parent.is_none() {
            return Err(GraphError::InvalidParent);
        }
    }

    let related_ids = dedup(&input.related_ids);
    check_related_in_project(pool, &related_ids, project_id).await?;

    let task = Task::create(
        pool,
        InsertTask {
            project_id,
            title,
            description: input
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            priority: input.priority.unwrap_or(TaskPriority::Medium),
            author_id,
            parent_id: input.parent_id,
            assignee_ids: input.assignee_ids,
            observer_ids: input.observer_ids,
            related_ids,
        },
    )
    .await?;

    tracing::info!(
        task_id = %task.id,
        project_id = %project_id,
        task_number = task.task_number,
        "Task created"
    );

    Ok(task.detail(pool).await?)
}

/// Updates a task
///
/// The caller has resolved `task` through its team and project, so any
/// cross-project id guess has already 404'd.
pub async fn update_task(
    pool: &PgPool,
    roster: &TeamRoster,
    task: Task,
    patch: TaskPatch,
) -> Result<TaskDetail, GraphError> {
    let title = match patch.title {
        Some(ref raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(GraphError::Validation("Title must not be empty".to_string()));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    if let Some(ref assignees) = patch.assignee_ids {
        check_roster(roster, assignees, GraphError::InvalidAssignee)?;
    }
    if let Some(ref observers) = patch.observer_ids {
        check_roster(roster, observers, GraphError::InvalidObserver)?;
    }

    if let Some(Some(new_parent)) = patch.parent_id {
        if new_parent == task.id {
            return Err(GraphError::CyclicDependency);
        }

        let parent = Task::find_by_id_and_project(pool, new_parent, task.project_id).await?;
        if parent.is_none() {
            return Err(GraphError::InvalidParent);
        }

        if Task::ancestors_contain(pool, new_parent, task.id).await? {
            return Err(GraphError::CyclicDependency);
        }
    }

    let related_ids = match patch.related_ids {
        Some(ref ids) => {
            let filtered = filter_self(task.id, ids);
            check_related_in_project(pool, &filtered, task.project_id).await?;
            Some(filtered)
        }
        None => None,
    };

    let mut tx = pool.begin().await?;

    let updated = Task::update_fields(
        &mut tx,
        task.id,
        TaskFieldPatch {
            title,
            description: patch.description.as_deref().map(str::trim).map(str::to_string),
            priority: patch.priority,
            status: patch.status,
            parent_id: patch.parent_id,
        },
    )
    .await?;

    if let Some(ref assignees) = patch.assignee_ids {
        Task::replace_assignees(&mut tx, task.id, assignees).await?;
    }
    if let Some(ref observers) = patch.observer_ids {
        Task::replace_observers(&mut tx, task.id, observers).await?;
    }
    if let Some(ref related) = related_ids {
        Task::replace_related(&mut tx, task.id, related).await?;
    }

    tx.commit().await?;

    tracing::info!(task_id = %task.id, "Task updated");

    Ok(updated.detail(pool).await?)
}

/// Rejects a non-empty list with a user outside the roster
///
/// An empty list short-circuits so clearing a relation never fails.
fn check_roster(
    roster: &TeamRoster,
    user_ids: &[Uuid],
    error: GraphError,
) -> Result<(), GraphError> {
    if user_ids.is_empty() || roster.contains_all(user_ids) {
        Ok(())
    } else {
        Err(error)
    }
}

/// Verifies every id resolves to a task in the project
async fn check_related_in_project(
    pool: &PgPool,
    related_ids: &[Uuid],
    project_id: Uuid,
) -> Result<(), GraphError> {
    if related_ids.is_empty() {
        return Ok(());
    }

    let found = Task::count_in_project(pool, related_ids, project_id).await?;
    if found != related_ids.len() as i64 {
        return Err(GraphError::InvalidRelatedTask);
    }

    Ok(())
}

/// Drops duplicates while preserving first-seen order
fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Drops the task's own id and duplicates from a related-task list
fn filter_self(task_id: Uuid, ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter()
        .copied()
        .filter(|id| *id != task_id && seen.insert(*id))
        .collect()
}
