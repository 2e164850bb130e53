/// Activity-log endpoint (admin only)
///
/// # Endpoint
///
/// ```text
/// GET /api/logs?page=1&limit=20
/// ```
///
/// Entries come back newest first with the actor's name/email and the task
/// title joined in.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use tasksphere_shared::{
    auth::{authorization::require_admin, middleware::CurrentUser},
    models::activity_log::{ActivityLog, ActivityLogView},
};

/// Default page size for the log listing
const DEFAULT_PAGE_SIZE: i64 = 50;

/// Hard cap on page size
const MAX_PAGE_SIZE: i64 = 200;

/// Query parameters for the log listing
#[derive(Debug, Deserialize)]
pub struct ListLogsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Lists activity-log entries, newest first (admin only)
pub async fn list_logs(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListLogsQuery>,
) -> ApiResult<Json<Vec<ActivityLogView>>> {
    require_admin(&current)?;

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);

    let entries = ActivityLog::list(&state.db, limit, (page - 1) * limit).await?;

    Ok(Json(entries))
}
