// handlers/protected/auth/heartbeat.rs - POST /api/auth/heartbeat handler

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::SessionRecord;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub active: bool,
    pub login_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// POST /api/auth/heartbeat - keeps the session alive; the middleware already refreshed it
pub async fn heartbeat_post(State(state): State<AppState>, record: SessionRecord) -> ApiResult<HeartbeatResponse> {
    Ok(ApiResponse::success(HeartbeatResponse {
        active: true,
        login_time: record.login_time,
        last_activity: record.last_activity,
        expires_at: state.sessions.policy().expires_at(&record),
    }))
}
