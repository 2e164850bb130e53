/// Comment model and database operations
///
/// Comments belong to a task and are returned in insertion order. A comment
/// is owned by its poster; only the poster or an admin may remove it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A comment on a task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,

    pub task_id: Uuid,

    pub text: String,

    /// User who wrote the comment
    pub posted_by: Uuid,

    pub created_at: DateTime<Utc>,
}

/// Input for adding a comment
#[derive(Debug, Clone)]
pub struct CreateComment {
    pub task_id: Uuid,
    pub text: String,
    pub posted_by: Uuid,
}

impl Comment {
    /// Appends a comment to a task
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO task_comments (task_id, text, posted_by)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, text, posted_by, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.text)
        .bind(data.posted_by)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    /// Lists a task's comments in insertion order
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, text, posted_by, created_at
            FROM task_comments
            WHERE task_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }

    /// Finds a comment by ID, scoped to its task
    pub async fn find_by_id(
        pool: &PgPool,
        task_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, text, posted_by, created_at
            FROM task_comments
            WHERE id = $1 AND task_id = $2
            "#,
        )
        .bind(comment_id)
        .bind(task_id)
        .fetch_optional(pool)
        .await?;

        Ok(comment)
    }

    /// Deletes a comment
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_comments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_serializes_camel_case() {
        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            text: "Looks good".to_string(),
            posted_by: Uuid::new_v4(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&comment).unwrap();
        assert!(json.contains("\"postedBy\""));
        assert!(json.contains("\"taskId\""));
    }
}
