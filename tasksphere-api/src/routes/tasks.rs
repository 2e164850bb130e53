/// Task lifecycle endpoints
///
/// The authoritative task handler: CRUD, guarded status transitions,
/// comments, attachments, and bulk operations. Every mutation publishes a
/// [`TaskEvent`] so notifications and the activity log happen as isolated
/// side effects, never failing the primary request.
///
/// # Endpoints
///
/// - `POST /api/tasks` - Create
/// - `GET /api/tasks` - List with filters (admin)
/// - `GET /api/tasks/my` - Own tasks (creator or assignee)
/// - `GET/PUT/DELETE /api/tasks/:id`
/// - `PATCH /api/tasks/:id/in-progress`, `PATCH /api/tasks/:id/complete`
/// - `POST /api/tasks/:id/comments`, `DELETE /api/tasks/:taskId/comments/:commentId`
/// - `POST /api/tasks/:id/attachments` - Multipart upload (field `file`)
/// - `POST /api/tasks/bulk-create`, `DELETE /api/tasks/bulk-delete`

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiPath, ApiResult},
    uploads,
};
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tasksphere_shared::{
    auth::{
        authorization::{
            require_admin, require_comment_delete, require_task_delete, require_task_update,
            require_task_view,
        },
        middleware::CurrentUser,
    },
    events::{publish, TaskEvent},
    models::{
        attachment::{Attachment, CreateAttachment},
        comment::{Comment, CreateComment},
        task::{CreateTask, Task, TaskFilter, TaskStatus, UpdateTask},
    },
};
use uuid::Uuid;
use validator::Validate;

/// Default page size for listings
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Hard cap on page size
const MAX_PAGE_SIZE: i64 = 100;

/// Task creation request (also the draft shape for bulk-create)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub assigned_to: Option<Uuid>,
}

/// Task update request
///
/// `version` must be the caller's last-seen task version; a stale value is
/// rejected with 409 and nothing is applied. Status is not updatable here.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub assigned_to: Option<Uuid>,

    /// Last-seen version of the task
    pub version: i64,
}

/// Query parameters for the admin task listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    /// Exact status match
    pub status: Option<TaskStatus>,

    /// Tasks due on this calendar date (server-local day window)
    pub due_date: Option<NaiveDate>,

    /// Case-insensitive substring match on the title
    pub title: Option<String>,

    /// 1-based page number (default 1)
    pub page: Option<i64>,

    /// Page size (default 20, max 100)
    pub limit: Option<i64>,
}

/// Task with its comments and attachments, for fetch-by-id
#[derive(Debug, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,

    pub comments: Vec<Comment>,

    pub attachments: Vec<Attachment>,
}

/// Bulk-create request: `tasks` must be an array of drafts
#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    pub tasks: Vec<CreateTaskRequest>,
}

/// Bulk-delete request: `ids` must be an array of task ids
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

/// Bulk-delete response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub message: String,
    pub deleted_count: u64,
}

/// Message-only response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Attachment upload response
#[derive(Debug, Serialize)]
pub struct AttachmentsResponse {
    pub message: String,
    pub attachments: Vec<Attachment>,
}

/// Creates a task in pending state, stamped with the actor as creator
///
/// Notifies the assignee (when set and not the actor) and logs the creation.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = Task::create(
        &state.db,
        CreateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            created_by: current.id,
            assigned_to: req.assigned_to,
        },
    )
    .await?;

    publish(
        &state.db,
        current.id,
        TaskEvent::Created {
            task_id: task.id,
            title: task.title.clone(),
            assigned_to: task.assigned_to,
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Lists tasks with filters and pagination (admin only)
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    require_admin(&current)?;

    let (limit, offset) = page_params(query.page, query.limit);

    let tasks = Task::list(
        &state.db,
        TaskFilter {
            status: query.status,
            due_between: query.due_date.map(local_day_bounds),
            title_contains: query.title,
            limit,
            offset,
        },
    )
    .await?;

    Ok(Json(tasks))
}

/// Lists tasks where the actor is creator or assignee
pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list_for_user(&state.db, current.id).await?;

    Ok(Json(tasks))
}

/// Fetches a task with its comments and attachments
///
/// # Errors
///
/// - `404 Not Found`: no such task
/// - `403 Forbidden`: actor is not creator, assignee, or admin
pub async fn get_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<TaskDetail>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_task_view(&current, &task)?;

    let comments = Comment::list_for_task(&state.db, task.id).await?;
    let attachments = Attachment::list_for_task(&state.db, task.id).await?;

    Ok(Json(TaskDetail {
        task,
        comments,
        attachments,
    }))
}

/// Applies a partial update (creator or admin)
///
/// The write is guarded by the caller's last-seen version; a stale version
/// yields 409 with nothing applied. Notifies a newly assigned user and logs
/// the submitted changes.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_task_update(&current, &task)?;

    let prev_assignee = task.assigned_to;
    let changes = changes_payload(&req);

    let updated = Task::update(
        &state.db,
        id,
        req.version,
        UpdateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            assigned_to: req.assigned_to,
        },
    )
    .await?;

    let updated = match updated {
        Some(task) => task,
        // Guard didn't match: the row vanished or the version went stale
        None => {
            return Err(match Task::find_by_id(&state.db, id).await? {
                Some(_) => ApiError::Conflict(
                    "Task was modified concurrently; fetch the latest version and retry"
                        .to_string(),
                ),
                None => ApiError::NotFound("Task not found".to_string()),
            });
        }
    };

    let reassigned_to = match (prev_assignee, updated.assigned_to) {
        (prev, Some(new)) if prev != Some(new) => Some(new),
        _ => None,
    };

    publish(
        &state.db,
        current.id,
        TaskEvent::Updated {
            task_id: updated.id,
            title: updated.title.clone(),
            reassigned_to,
            changes,
        },
    )
    .await;

    Ok(Json(updated))
}

/// Deletes a task (creator or admin)
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_task_delete(&current, &task)?;

    Task::delete(&state.db, id).await?;

    publish(
        &state.db,
        current.id,
        TaskEvent::Deleted {
            task_id: task.id,
            title: task.title,
        },
    )
    .await;

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

/// Marks a pending task as in progress
///
/// # Errors
///
/// - `400 Bad Request`: task is not pending
pub async fn mark_in_progress(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Task>> {
    transition_task(
        &state,
        &current,
        id,
        TaskStatus::Pending,
        TaskStatus::InProgress,
        "Only pending tasks can be marked in progress",
    )
    .await
}

/// Marks an in-progress task as completed
///
/// # Errors
///
/// - `400 Bad Request`: task is not in progress
pub async fn mark_complete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Task>> {
    transition_task(
        &state,
        &current,
        id,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        "Only in-progress tasks can be marked complete",
    )
    .await
}

/// Shared status-transition flow
///
/// Loads the task for the 404/403 checks, then applies the transition as a
/// status-conditional update so concurrent callers cannot both advance it.
async fn transition_task(
    state: &AppState,
    current: &CurrentUser,
    id: Uuid,
    from: TaskStatus,
    to: TaskStatus,
    precondition_message: &str,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_task_view(current, &task)?;

    let updated = Task::transition(&state.db, id, from, to)
        .await?
        .ok_or_else(|| ApiError::BadRequest(precondition_message.to_string()))?;

    publish(
        &state.db,
        current.id,
        TaskEvent::StatusChanged {
            task_id: updated.id,
            title: updated.title.clone(),
            status: to,
            assigned_to: updated.assigned_to,
        },
    )
    .await;

    Ok(Json(updated))
}

/// Adds a comment to a task
///
/// Notifies the task's creator unless the creator is the poster. Returns the
/// task's full comment list in insertion order.
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddCommentRequest>,
) -> ApiResult<Json<Vec<Comment>>> {
    req.validate()?;

    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_task_view(&current, &task)?;

    Comment::create(
        &state.db,
        CreateComment {
            task_id: task.id,
            text: req.text.clone(),
            posted_by: current.id,
        },
    )
    .await?;

    publish(
        &state.db,
        current.id,
        TaskEvent::Commented {
            task_id: task.id,
            title: task.title,
            task_creator: task.created_by,
            text: req.text,
        },
    )
    .await;

    let comments = Comment::list_for_task(&state.db, id).await?;

    Ok(Json(comments))
}

/// Comment creation request
#[derive(Debug, Deserialize, Validate)]
pub struct AddCommentRequest {
    #[validate(length(min = 1, message = "Comment text is required"))]
    pub text: String,
}

/// Deletes a comment (poster or admin)
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiPath((task_id, comment_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<MessageResponse>> {
    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let comment = Comment::find_by_id(&state.db, task_id, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    require_comment_delete(&current, &comment)?;

    Comment::delete(&state.db, comment.id).await?;

    publish(
        &state.db,
        current.id,
        TaskEvent::CommentDeleted {
            task_id: task.id,
            comment_id: comment.id,
        },
    )
    .await;

    Ok(Json(MessageResponse {
        message: "Comment deleted successfully".to_string(),
    }))
}

/// Accepts a multipart file upload (field `file`) for a task
///
/// The file passes the shared upload policy (jpg/jpeg/png/pdf, 2 MB) and is
/// recorded on the task's attachment list. Returns the updated list.
pub async fn upload_attachment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<AttachmentsResponse>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    require_task_view(&current, &task)?;

    let mut stored: Option<(String, String, String)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|f| f.to_string())
            .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field.bytes().await?;
        let path =
            uploads::store_upload(&state.config.uploads.dir, "tasks", &filename, data).await?;

        stored = Some((filename, path, mime_type));
        break;
    }

    let (filename, stored_path, mime_type) =
        stored.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    Attachment::create(
        &state.db,
        CreateAttachment {
            task_id: task.id,
            filename,
            stored_path: stored_path.clone(),
            mime_type,
        },
    )
    .await?;

    publish(
        &state.db,
        current.id,
        TaskEvent::AttachmentUploaded {
            task_id: task.id,
            stored_path,
        },
    )
    .await;

    let attachments = Attachment::list_for_task(&state.db, id).await?;

    Ok(Json(AttachmentsResponse {
        message: "File uploaded".to_string(),
        attachments,
    }))
}

/// Creates a batch of tasks, all stamped with the actor as creator
///
/// The batch is transactional: a draft with a blank title rejects the whole
/// request and nothing persists.
pub async fn bulk_create_tasks(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<BulkCreateRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Task>>)> {
    for draft in &req.tasks {
        draft.validate()?;
    }

    let drafts = req
        .tasks
        .into_iter()
        .map(|draft| CreateTask {
            title: draft.title,
            description: draft.description,
            due_date: draft.due_date,
            created_by: current.id,
            assigned_to: draft.assigned_to,
        })
        .collect();

    let created = Task::create_many(&state.db, drafts).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Deletes a batch of tasks by id
///
/// Admins delete any listed task; other users only delete listed tasks they
/// created. Returns the number of tasks actually removed.
pub async fn bulk_delete_tasks(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<BulkDeleteRequest>,
) -> ApiResult<Json<BulkDeleteResponse>> {
    let restrict_to_creator = if current.is_admin() {
        None
    } else {
        Some(current.id)
    };

    let deleted_count = Task::delete_many(&state.db, &req.ids, restrict_to_creator).await?;

    Ok(Json(BulkDeleteResponse {
        message: "Tasks deleted".to_string(),
        deleted_count,
    }))
}

/// Resolves page/limit query params into a (limit, offset) pair
fn page_params(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = page.unwrap_or(1).max(1);
    (limit, (page - 1) * limit)
}

/// The half-open UTC window covering a server-local calendar day
pub(crate) fn local_day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (local_midnight(date), local_midnight(date + chrono::Days::new(1)))
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        // Midnight falls into a DST gap; treat the naive time as UTC
        None => DateTime::from_naive_utc_and_offset(naive, Utc),
    }
}

/// Serializes the submitted update fields for the activity log
fn changes_payload(req: &UpdateTaskRequest) -> serde_json::Value {
    let mut changes = serde_json::Map::new();

    if let Some(ref title) = req.title {
        changes.insert("title".to_string(), json!(title));
    }
    if let Some(ref description) = req.description {
        changes.insert("description".to_string(), json!(description));
    }
    if let Some(due_date) = req.due_date {
        changes.insert("dueDate".to_string(), json!(due_date));
    }
    if let Some(assigned_to) = req.assigned_to {
        changes.insert("assignedTo".to_string(), json!(assigned_to));
    }

    serde_json::Value::Object(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_defaults() {
        assert_eq!(page_params(None, None), (20, 0));
    }

    #[test]
    fn test_page_params_offsets() {
        assert_eq!(page_params(Some(1), Some(10)), (10, 0));
        assert_eq!(page_params(Some(3), Some(10)), (10, 20));
    }

    #[test]
    fn test_page_params_clamps() {
        // Limit capped at 100, page floored at 1
        assert_eq!(page_params(Some(0), Some(1000)), (100, 0));
        assert_eq!(page_params(Some(-5), Some(0)), (1, 0));
    }

    #[test]
    fn test_local_day_bounds_cover_one_day() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let (start, end) = local_day_bounds(date);

        assert!(start < end);
        // A calendar day is 24h except across DST shifts
        let hours = (end - start).num_hours();
        assert!((23..=25).contains(&hours), "unexpected span: {}h", hours);

        // The start converts back to local midnight on the requested date
        let local_start = start.with_timezone(&Local);
        assert_eq!(local_start.time(), NaiveTime::MIN);
        assert_eq!(local_start.date_naive(), date);
    }

    #[test]
    fn test_changes_payload_includes_only_submitted_fields() {
        let req = UpdateTaskRequest {
            title: Some("New title".to_string()),
            description: None,
            due_date: None,
            assigned_to: None,
            version: 3,
        };

        let changes = changes_payload(&req);
        assert_eq!(changes["title"], "New title");
        assert!(changes.get("description").is_none());
        assert!(changes.get("dueDate").is_none());
    }

    #[test]
    fn test_bulk_create_request_requires_array() {
        let ok = serde_json::from_str::<BulkCreateRequest>(
            r#"{"tasks": [{"title": "One"}, {"title": "Two"}]}"#,
        );
        assert_eq!(ok.unwrap().tasks.len(), 2);

        // Non-array payloads fail deserialization and surface as 400
        assert!(serde_json::from_str::<BulkCreateRequest>(r#"{"tasks": "nope"}"#).is_err());
        assert!(serde_json::from_str::<BulkCreateRequest>(r#"{}"#).is_err());
    }
}
