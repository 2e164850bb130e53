/// Task model and database operations
///
/// Tasks are the core entity of Tasksphere. Each task has a lifecycle status
/// that only ever moves forward, and a version counter used to reject stale
/// concurrent updates.
///
/// # State Machine
///
/// ```text
/// pending → in-progress → completed
/// ```
///
/// Transitions are enforced with status-conditional updates
/// (`UPDATE … WHERE status = …`), so two concurrent callers cannot both
/// advance the same task.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in-progress', 'completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     due_date TIMESTAMPTZ,
///     status task_status NOT NULL DEFAULT 'pending',
///     created_by UUID NOT NULL REFERENCES users(id),
///     assigned_to UUID REFERENCES users(id),
///     version BIGINT NOT NULL DEFAULT 1,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Newly created, not yet started
    Pending,

    /// Work has started
    InProgress,

    /// Finished; terminal
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Checks if the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Checks whether a transition to `target` is allowed
    ///
    /// Transitions are strictly linear: pending → in-progress → completed.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        matches!(
            (self, target),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Completed)
        )
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Title (required, non-empty)
    pub title: String,

    /// Free-text description
    pub description: Option<String>,

    /// When the task is due
    pub due_date: Option<DateTime<Utc>>,

    /// Current lifecycle status
    pub status: TaskStatus,

    /// User who created the task (owner)
    pub created_by: Uuid,

    /// User the task is assigned to, if any
    pub assigned_to: Option<Uuid>,

    /// Optimistic-concurrency token; bumped on every write
    pub version: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
}

/// Input for a partial task update
///
/// Only non-None fields are written. Status is deliberately absent: the
/// lifecycle moves only through [`Task::transition`].
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.assigned_to.is_none()
    }
}

/// Filters for the admin task listing
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Exact status match
    pub status: Option<TaskStatus>,

    /// Due-date window, half-open: [start, end)
    pub due_between: Option<(DateTime<Utc>, DateTime<Utc>)>,

    /// Case-insensitive substring match on the title
    pub title_contains: Option<String>,

    pub limit: i64,

    pub offset: i64,
}

/// Per-status task count for the dashboard
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: i64,
}

/// Per-assignee task count with joined identity, for the dashboard
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeCount {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub task_count: i64,
}

const TASK_COLUMNS: &str = "id, title, description, due_date, status, created_by, \
                            assigned_to, version, created_at, updated_at";

impl Task {
    /// Creates a new task in pending state
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, due_date, created_by, assigned_to)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, due_date, status, created_by,
                      assigned_to, version, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.due_date)
        .bind(data.created_by)
        .bind(data.assigned_to)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Creates a batch of tasks atomically
    ///
    /// Runs in a single transaction: either every draft is persisted or none
    /// is.
    pub async fn create_many(
        pool: &PgPool,
        drafts: Vec<CreateTask>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut created = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let task = sqlx::query_as::<_, Task>(
                r#"
                INSERT INTO tasks (title, description, due_date, created_by, assigned_to)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, title, description, due_date, status, created_by,
                          assigned_to, version, created_at, updated_at
                "#,
            )
            .bind(draft.title)
            .bind(draft.description)
            .bind(draft.due_date)
            .bind(draft.created_by)
            .bind(draft.assigned_to)
            .fetch_one(&mut *tx)
            .await?;

            created.push(task);
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks matching the given filters, newest first
    pub async fn list(pool: &PgPool, filter: TaskFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE TRUE");
        let mut bind_count = 0;

        if filter.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }
        if filter.due_between.is_some() {
            query.push_str(&format!(
                " AND due_date >= ${} AND due_date < ${}",
                bind_count + 1,
                bind_count + 2
            ));
            bind_count += 2;
        }
        if filter.title_contains.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND title ILIKE ${}", bind_count));
        }

        query.push_str(&format!(
            " ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            bind_count + 1,
            bind_count + 2
        ));

        let mut q = sqlx::query_as::<_, Task>(&query);

        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some((start, end)) = filter.due_between {
            q = q.bind(start).bind(end);
        }
        if let Some(title) = filter.title_contains {
            q = q.bind(format!("%{}%", escape_like(&title)));
        }

        let tasks = q
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await?;

        Ok(tasks)
    }

    /// Lists tasks where the user is creator or assignee, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE created_by = $1 OR assigned_to = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Applies a partial update, guarded by the caller's last-seen version
    ///
    /// The write only lands if the stored version still matches
    /// `expected_version`; the version counter is bumped on success. Returns
    /// None when the row is missing or the version is stale; callers
    /// distinguish the two by re-fetching.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        expected_version: i64,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query =
            String::from("UPDATE tasks SET updated_at = NOW(), version = version + 1");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if data.assigned_to.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assigned_to = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND version = $2 RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(expected_version);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(assigned_to) = data.assigned_to {
            q = q.bind(assigned_to);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Advances the task status, guarded by the required current status
    ///
    /// The update only lands if the stored status equals `from`, making the
    /// transition atomic under concurrency. Returns None when the guard did
    /// not match (missing row or wrong current status).
    pub async fn transition(
        pool: &PgPool,
        id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = $3,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes a task; cascades to its comments and attachments
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a batch of tasks, optionally restricted to a creator
    ///
    /// Admin callers pass `restrict_to_creator = None` and delete any listed
    /// task; other callers only delete listed tasks they created. Returns
    /// the number of rows actually removed.
    pub async fn delete_many(
        pool: &PgPool,
        ids: &[Uuid],
        restrict_to_creator: Option<Uuid>,
    ) -> Result<u64, sqlx::Error> {
        let result = match restrict_to_creator {
            Some(creator) => {
                sqlx::query("DELETE FROM tasks WHERE id = ANY($1) AND created_by = $2")
                    .bind(ids)
                    .bind(creator)
                    .execute(pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM tasks WHERE id = ANY($1)")
                    .bind(ids)
                    .execute(pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    /// Counts all tasks
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    /// Counts tasks grouped by status
    pub async fn count_by_status(pool: &PgPool) -> Result<Vec<StatusCount>, sqlx::Error> {
        let counts = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM tasks GROUP BY status",
        )
        .fetch_all(pool)
        .await?;

        Ok(counts)
    }

    /// Counts tasks whose due date falls within [start, end)
    pub async fn count_due_between(
        pool: &PgPool,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tasks WHERE due_date >= $1 AND due_date < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Top users ranked by assigned-task count, with joined identity
    ///
    /// Unassigned tasks are excluded from the ranking.
    pub async fn top_assignees(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<AssigneeCount>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AssigneeCount>(
            r#"
            SELECT u.id AS user_id, u.name, u.email, COUNT(*) AS task_count
            FROM tasks t
            JOIN users u ON u.id = t.assigned_to
            WHERE t.assigned_to IS NOT NULL
            GROUP BY u.id, u.name, u.email
            ORDER BY task_count DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }
}

/// Escapes LIKE wildcards in user-supplied search text
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(TaskStatus::Pending.as_str(), "pending");
        assert_eq!(TaskStatus::InProgress.as_str(), "in-progress");
        assert_eq!(TaskStatus::Completed.as_str(), "completed");
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(
            serde_json::from_str::<TaskStatus>("\"pending\"").unwrap(),
            TaskStatus::Pending
        );
    }

    #[test]
    fn test_status_transitions_are_linear() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_transition_to(TaskStatus::Completed));

        // Skipping a step is rejected
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));

        // No backwards moves
        assert!(!TaskStatus::InProgress.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::InProgress));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Pending));
    }

    #[test]
    fn test_status_is_terminal() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
    }

    #[test]
    fn test_update_task_is_empty() {
        assert!(UpdateTask::default().is_empty());

        let update = UpdateTask {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let task = Task {
            id: Uuid::new_v4(),
            title: "Ship release".to_string(),
            description: None,
            due_date: None,
            status: TaskStatus::Pending,
            created_by: Uuid::new_v4(),
            assigned_to: None,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"createdBy\""));
        assert!(json.contains("\"dueDate\""));
        assert!(json.contains("\"status\":\"pending\""));
    }
}
