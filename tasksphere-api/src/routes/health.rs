/// Health check endpoint
///
/// Liveness probe reporting process uptime and database connectivity.
///
/// # Endpoint
///
/// ```text
/// GET /api/health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "ok",
///   "uptime": "0d 2h 13m 8s",
///   "timestamp": "2025-06-01T12:00:00Z",
///   "database": "connected"
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Process uptime, formatted as days/hours/minutes/seconds
    pub uptime: String,

    /// Current server time
    pub timestamp: DateTime<Utc>,

    /// Database status
    pub database: String,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database = match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let status = if database == "connected" { "ok" } else { "degraded" };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        uptime: format_uptime(state.started_at.elapsed().as_secs()),
        timestamp: Utc::now(),
        database: database.to_string(),
    }))
}

/// Formats seconds as `"<d>d <h>h <m>m <s>s"`
fn format_uptime(seconds: u64) -> String {
    let d = seconds / (3600 * 24);
    let h = seconds % (3600 * 24) / 3600;
    let m = seconds % 3600 / 60;
    let s = seconds % 60;
    format!("{}d {}h {}m {}s", d, h, m, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0d 0h 0m 0s");
        assert_eq!(format_uptime(59), "0d 0h 0m 59s");
        assert_eq!(format_uptime(61), "0d 0h 1m 1s");
        assert_eq!(format_uptime(3600 * 24 + 3600 * 2 + 60 * 13 + 8), "1d 2h 13m 8s");
    }
}
