/// Notification endpoints
///
/// # Endpoints
///
/// - `GET /api/notifications` - The actor's notifications, newest first
/// - `PATCH /api/notifications/:id/read` - Flip the read flag

use crate::{
    app::AppState,
    error::{ApiError, ApiPath, ApiResult},
};
use axum::{extract::State, Extension, Json};
use tasksphere_shared::{
    auth::{authorization::require_notification_access, middleware::CurrentUser},
    models::notification::Notification,
};
use uuid::Uuid;

/// Lists the authenticated user's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = Notification::list_for_user(&state.db, current.id).await?;

    Ok(Json(notifications))
}

/// Marks a notification as read
///
/// # Errors
///
/// - `404 Not Found`: no such notification
/// - `403 Forbidden`: the notification belongs to someone else
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Notification>> {
    let notification = Notification::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    require_notification_access(&current, &notification)?;

    let updated = Notification::mark_read(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    Ok(Json(updated))
}
