/// Task model and database operations
///
/// Tasks live inside a project and carry a per-project sequential
/// `task_number` that never changes once assigned. Assignees, observers, and
/// related tasks are relation tables; the related-task association is stored
/// as a row in each direction so it stays symmetric by construction.
///
/// Validation of rosters, parents, and cycles lives in [`crate::graph`];
/// this module only talks to the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnection;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

/// Task priority
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Task status
///
/// There is no transition guard: any authorized actor may set any status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID (UUID v4)
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Sequential number within the project, assigned at creation
    pub task_number: i32,

    /// Task title
    pub title: String,

    /// Task description (empty string if none given)
    pub description: String,

    pub priority: TaskPriority,
    pub status: TaskStatus,

    /// Author; nulled when the authoring account is deleted
    pub author_id: Option<Uuid>,

    /// Parent task in the same project, if any
    pub parent_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for inserting a task (see [`crate::graph::create_task`])
#[derive(Debug, Clone)]
pub struct InsertTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub assignee_ids: Vec<Uuid>,
    pub observer_ids: Vec<Uuid>,
    pub related_ids: Vec<Uuid>,
}

/// Scalar fields of a task update; relation lists are handled separately
#[derive(Debug, Clone, Default)]
pub struct TaskFieldPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    /// `Some(None)` clears the parent, `Some(Some(id))` re-parents
    pub parent_id: Option<Option<Uuid>>,
}

/// Compact user reference embedded in task reads
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserStub {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Compact task reference embedded in task reads
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskStub {
    pub id: Uuid,
    pub task_number: i32,
    pub title: String,
    pub status: TaskStatus,
}

/// A task with its relations expanded, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub author: Option<UserStub>,
    pub assignees: Vec<UserStub>,
    pub observers: Vec<UserStub>,
    pub parent: Option<TaskStub>,
    pub subtasks: Vec<TaskStub>,
    pub related: Vec<TaskStub>,
}

/// Attempts before giving up when racing for a task number
const TASK_NUMBER_RETRIES: u32 = 3;

impl Task {
    /// Inserts a task together with its relation rows
    ///
    /// The task number is computed as `1 + max(existing)` inside the same
    /// transaction as the insert. A concurrent creator racing for the same
    /// number trips the UNIQUE (project_id, task_number) constraint, in
    /// which case the whole transaction is retried with a fresh number.
    pub async fn create(pool: &PgPool, data: InsertTask) -> Result<Self, sqlx::Error> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match Self::try_create(pool, &data).await {
                Ok(task) => return Ok(task),
                Err(e) if is_task_number_conflict(&e) && attempt < TASK_NUMBER_RETRIES => {
                    tracing::debug!(
                        project_id = %data.project_id,
                        attempt,
                        "Task number conflict, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_create(pool: &PgPool, data: &InsertTask) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let (next_number,): (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(task_number), 0) + 1 FROM tasks WHERE project_id = $1",
        )
        .bind(data.project_id)
        .fetch_one(&mut *tx)
        .await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (project_id, task_number, title, description,
                               priority, author_id, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, project_id, task_number, title, description,
                      priority, status, author_id, parent_id, created_at, updated_at
            "#,
        )
        .bind(data.project_id)
        .bind(next_number)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.priority)
        .bind(data.author_id)
        .bind(data.parent_id)
        .fetch_one(&mut *tx)
        .await?;

        Self::replace_assignees(&mut tx, task.id, &data.assignee_ids).await?;
        Self::replace_observers(&mut tx, task.id, &data.observer_ids).await?;
        Self::replace_related(&mut tx, task.id, &data.related_ids).await?;

        tx.commit().await?;

        Ok(task)
    }

    /// Finds a task by ID within a project
    pub async fn find_by_id_and_project(
        pool: &PgPool,
        id: Uuid,
        project_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, task_number, title, description,
                   priority, status, author_id, parent_id, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND project_id = $2
            "#,
        )
        .bind(id)
        .bind(project_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists a project's tasks, newest first
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, task_number, title, description,
                   priority, status, author_id, parent_id, created_at, updated_at
            FROM tasks
            WHERE project_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Counts how many of the given ids exist in the project
    ///
    /// Lets the caller verify a whole id list with one query.
    pub async fn count_in_project(
        pool: &PgPool,
        ids: &[Uuid],
        project_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tasks WHERE id = ANY($1) AND project_id = $2",
        )
        .bind(ids)
        .bind(project_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Whether `needle` appears in the ancestor chain starting at `start`
    ///
    /// Walks parent links upward. A missing parent ends the walk; a repeated
    /// id stops it too, so a pre-existing loop cannot hang the server.
    pub async fn ancestors_contain(
        pool: &PgPool,
        start: Uuid,
        needle: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let mut seen = HashSet::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if id == needle {
                return Ok(true);
            }
            if !seen.insert(id) {
                break;
            }

            let row: Option<(Option<Uuid>,)> =
                sqlx::query_as("SELECT parent_id FROM tasks WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;

            current = row.and_then(|(parent,)| parent);
        }

        Ok(false)
    }

    /// Applies scalar field changes inside an open transaction
    ///
    /// Returns the updated row; relation lists are replaced separately.
    pub async fn update_fields(
        conn: &mut PgConnection,
        id: Uuid,
        patch: TaskFieldPatch,
    ) -> Result<Self, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if patch.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if patch.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if patch.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if patch.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if patch.parent_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", parent_id = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 \
             RETURNING id, project_id, task_number, title, description, \
             priority, status, author_id, parent_id, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = patch.title {
            q = q.bind(title);
        }
        if let Some(description) = patch.description {
            q = q.bind(description);
        }
        if let Some(priority) = patch.priority {
            q = q.bind(priority);
        }
        if let Some(status) = patch.status {
            q = q.bind(status);
        }
        if let Some(parent_id) = patch.parent_id {
            q = q.bind(parent_id);
        }

        q.fetch_one(conn).await
    }

    /// Replaces the assignee set inside an open transaction
    pub async fn replace_assignees(
        conn: &mut PgConnection,
        task_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_assignees WHERE task_id = $1 AND user_id <> ALL($2)")
            .bind(task_id)
            .bind(user_ids)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO task_assignees (task_id, user_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_ids)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Replaces the observer set inside an open transaction
    pub async fn replace_observers(
        conn: &mut PgConnection,
        task_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_observers WHERE task_id = $1 AND user_id <> ALL($2)")
            .bind(task_id)
            .bind(user_ids)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO task_observers (task_id, user_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_ids)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Replaces the related-task set inside an open transaction
    ///
    /// Maintains both directions of every edge so the association remains
    /// symmetric after any mix of adds and removes.
    pub async fn replace_related(
        conn: &mut PgConnection,
        task_id: Uuid,
        related_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_links WHERE task_id = $1 AND related_id <> ALL($2)")
            .bind(task_id)
            .bind(related_ids)
            .execute(&mut *conn)
            .await?;

        sqlx::query("DELETE FROM task_links WHERE related_id = $1 AND task_id <> ALL($2)")
            .bind(task_id)
            .bind(related_ids)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO task_links (task_id, related_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(related_ids)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO task_links (task_id, related_id)
            SELECT unnest($2::uuid[]), $1
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(related_ids)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Deletes a task
    ///
    /// Children keep existing with a nulled parent; related edges, assignee
    /// and observer rows are removed by FK policy.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Loads the task with all relations expanded
    pub async fn detail(self, pool: &PgPool) -> Result<TaskDetail, sqlx::Error> {
        let author = match self.author_id {
            Some(author_id) => {
                sqlx::query_as::<_, UserStub>(
                    "SELECT id, name, email FROM users WHERE id = $1",
                )
                .bind(author_id)
                .fetch_optional(pool)
                .await?
            }
            None => None,
        };

        let assignees = sqlx::query_as::<_, UserStub>(
            r#"
            SELECT u.id, u.name, u.email
            FROM task_assignees ta
            JOIN users u ON u.id = ta.user_id
            WHERE ta.task_id = $1
            ORDER BY u.name ASC
            "#,
        )
        .bind(self.id)
        .fetch_all(pool)
        .await?;

        let observers = sqlx::query_as::<_, UserStub>(
            r#"
            SELECT u.id, u.name, u.email
            FROM task_observers tob
            JOIN users u ON u.id = tob.user_id
            WHERE tob.task_id = $1
            ORDER BY u.name ASC
            "#,
        )
        .bind(self.id)
        .fetch_all(pool)
        .await?;

        let parent = match self.parent_id {
            Some(parent_id) => {
                sqlx::query_as::<_, TaskStub>(
                    "SELECT id, task_number, title, status FROM tasks WHERE id = $1",
                )
                .bind(parent_id)
                .fetch_optional(pool)
                .await?
            }
            None => None,
        };

        let subtasks = sqlx::query_as::<_, TaskStub>(
            r#"
            SELECT id, task_number, title, status
            FROM tasks
            WHERE parent_id = $1
            ORDER BY task_number ASC
            "#,
        )
        .bind(self.id)
        .fetch_all(pool)
        .await?;

        let related = sqlx::query_as::<_, TaskStub>(
            r#"
            SELECT t.id, t.task_number, t.title, t.status
            FROM task_links tl
            JOIN tasks t ON t.id = tl.related_id
            WHERE tl.task_id = $1
            ORDER BY t.task_number ASC
            "#,
        )
        .bind(self.id)
        .fetch_all(pool)
        .await?;

        Ok(TaskDetail {
            task: self,
            author,
            assignees,
            observers,
            parent,
            subtasks,
            related,
        })
    }
}

/// Whether the error is a violation of UNIQUE (project_id, task_number)
fn is_task_number_conflict(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_err) => {
            db_err.constraint() == Some("tasks_project_task_number_key")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_serde_roundtrip() {
        for priority in [
            TaskPriority::Low,
            TaskPriority::Medium,
            TaskPriority::High,
            TaskPriority::Critical,
        ] {
            let json = serde_json::to_string(&priority).unwrap();
            let back: TaskPriority = serde_json::from_str(&json).unwrap();
            assert_eq!(priority, back);
        }
    }

    #[test]
    fn test_priority_rejects_unknown_value() {
        assert!(serde_json::from_str::<TaskPriority>(r#""urgent""#).is_err());
    }

    #[test]
    fn test_status_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            r#""in_progress""#
        );
        assert!(serde_json::from_str::<TaskStatus>(r#""blocked""#).is_err());
    }

    #[test]
    fn test_task_detail_flattens_task_fields() {
        let task = Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            task_number: 7,
            title: "Ship it".to_string(),
            description: String::new(),
            priority: TaskPriority::High,
            status: TaskStatus::Todo,
            author_id: None,
            parent_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let detail = TaskDetail {
            task,
            author: None,
            assignees: vec![],
            observers: vec![],
            parent: None,
            subtasks: vec![],
            related: vec![],
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["task_number"], 7);
        assert_eq!(json["title"], "Ship it");
        assert!(json["assignees"].as_array().unwrap().is_empty());
    }
}
