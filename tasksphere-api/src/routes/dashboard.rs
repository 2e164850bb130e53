/// Dashboard statistics endpoint (admin only)
///
/// # Endpoint
///
/// ```text
/// GET /api/dashboard/stats
/// ```
///
/// # Response
///
/// ```json
/// {
///   "totalTasks": 120,
///   "tasksByStatus": [{"status": "completed", "count": 45}, ...],
///   "tasksDueToday": 10,
///   "topUsers": [{"userId": "...", "name": "...", "email": "...", "taskCount": 12}, ...]
/// }
/// ```
///
/// "Due today" means a due date inside the server-local calendar day:
/// [start-of-day, start-of-next-day).

use crate::{app::AppState, error::ApiResult, routes::tasks::local_day_bounds};
use axum::{extract::State, Extension, Json};
use chrono::Local;
use serde::Serialize;
use tasksphere_shared::{
    auth::{authorization::require_admin, middleware::CurrentUser},
    models::task::{AssigneeCount, StatusCount, Task},
};

/// Number of users in the top-assignees ranking
const TOP_USERS: i64 = 5;

/// Dashboard statistics response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tasks: i64,
    pub tasks_by_status: Vec<StatusCount>,
    pub tasks_due_today: i64,
    pub top_users: Vec<AssigneeCount>,
}

/// Computes dashboard statistics (admin only)
pub async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<DashboardStats>> {
    require_admin(&current)?;

    let total_tasks = Task::count(&state.db).await?;
    let tasks_by_status = Task::count_by_status(&state.db).await?;

    let (day_start, day_end) = local_day_bounds(Local::now().date_naive());
    let tasks_due_today = Task::count_due_between(&state.db, day_start, day_end).await?;

    let top_users = Task::top_assignees(&state.db, TOP_USERS).await?;

    Ok(Json(DashboardStats {
        total_tasks,
        tasks_by_status,
        tasks_due_today,
        top_users,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasksphere_shared::models::task::TaskStatus;
    use uuid::Uuid;

    #[test]
    fn test_stats_wire_format() {
        let stats = DashboardStats {
            total_tasks: 120,
            tasks_by_status: vec![StatusCount {
                status: TaskStatus::Completed,
                count: 45,
            }],
            tasks_due_today: 10,
            top_users: vec![AssigneeCount {
                user_id: Uuid::new_v4(),
                name: "John Doe".to_string(),
                email: "john@example.com".to_string(),
                task_count: 12,
            }],
        };

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"totalTasks\":120"));
        assert!(json.contains("\"tasksDueToday\":10"));
        assert!(json.contains("\"tasksByStatus\""));
        assert!(json.contains("\"status\":\"completed\""));
        assert!(json.contains("\"taskCount\":12"));
    }
}
