/// Activity log model and database operations
///
/// The activity log is an append-only audit trail: one row per mutating
/// action, recording the actor, the action kind, an optional task reference,
/// and a free-form details payload. Rows are never updated or deleted;
/// deleting a task only detaches the reference (`ON DELETE SET NULL`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Kind of mutating action being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_action", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Comment,
    DeleteComment,
    StatusChange,
    Upload,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Create => "create",
            ActivityAction::Update => "update",
            ActivityAction::Delete => "delete",
            ActivityAction::Comment => "comment",
            ActivityAction::DeleteComment => "delete-comment",
            ActivityAction::StatusChange => "status-change",
            ActivityAction::Upload => "upload",
        }
    }
}

/// One audit-trail entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Uuid,

    /// Acting user
    pub user_id: Uuid,

    pub action: ActivityAction,

    /// Task the action applied to, if any
    pub task_id: Option<Uuid>,

    /// Action-specific payload (e.g. `{"status": "completed"}`)
    pub details: Option<JsonValue>,

    pub created_at: DateTime<Utc>,
}

/// Input for appending a log entry
#[derive(Debug, Clone)]
pub struct CreateActivityLog {
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub task_id: Option<Uuid>,
    pub details: Option<JsonValue>,
}

/// Log entry with joined actor identity and task title, for the admin view
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub action: ActivityAction,
    pub task_id: Option<Uuid>,
    pub task_title: Option<String>,
    pub details: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// Appends an entry to the audit trail
    pub async fn create(pool: &PgPool, data: CreateActivityLog) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs (user_id, action, task_id, details)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, action, task_id, details, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.action)
        .bind(data.task_id)
        .bind(data.details)
        .fetch_one(pool)
        .await?;

        Ok(entry)
    }

    /// Lists entries newest first with joined actor and task info
    pub async fn list(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityLogView>, sqlx::Error> {
        let entries = sqlx::query_as::<_, ActivityLogView>(
            r#"
            SELECT l.id, l.user_id, u.name AS user_name, u.email AS user_email,
                   l.action, l.task_id, t.title AS task_title, l.details, l.created_at
            FROM activity_logs l
            JOIN users u ON u.id = l.user_id
            LEFT JOIN tasks t ON t.id = l.task_id
            ORDER BY l.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_as_str() {
        assert_eq!(ActivityAction::Create.as_str(), "create");
        assert_eq!(ActivityAction::DeleteComment.as_str(), "delete-comment");
        assert_eq!(ActivityAction::StatusChange.as_str(), "status-change");
        assert_eq!(ActivityAction::Upload.as_str(), "upload");
    }

    #[test]
    fn test_action_wire_format() {
        assert_eq!(
            serde_json::to_string(&ActivityAction::StatusChange).unwrap(),
            "\"status-change\""
        );
        assert_eq!(
            serde_json::from_str::<ActivityAction>("\"delete-comment\"").unwrap(),
            ActivityAction::DeleteComment
        );
    }
}
