/// Attachment records for task file uploads
///
/// The file bytes live on disk under the configured upload directory; rows
/// here record the original filename, the stored path, and the MIME type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A file attached to a task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,

    pub task_id: Uuid,

    /// Original filename as uploaded
    pub filename: String,

    /// Path of the stored file on disk
    pub stored_path: String,

    pub mime_type: String,

    pub created_at: DateTime<Utc>,
}

/// Input for recording an uploaded file
#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub task_id: Uuid,
    pub filename: String,
    pub stored_path: String,
    pub mime_type: String,
}

impl Attachment {
    /// Appends an attachment record to a task
    pub async fn create(pool: &PgPool, data: CreateAttachment) -> Result<Self, sqlx::Error> {
        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO task_attachments (task_id, filename, stored_path, mime_type)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, filename, stored_path, mime_type, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.filename)
        .bind(data.stored_path)
        .bind(data.mime_type)
        .fetch_one(pool)
        .await?;

        Ok(attachment)
    }

    /// Lists a task's attachments in upload order
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let attachments = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, filename, stored_path, mime_type, created_at
            FROM task_attachments
            WHERE task_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(attachments)
    }
}
