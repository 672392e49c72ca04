// handlers/public/auth/superadmin_login.rs - POST /api/auth/superadmin-login handler

use axum::{extract::State, Json};
use axum_extra::extract::CookieJar;

use super::utils::{check_rate_limit, reject_login, start_session, LoginRequest, LoginResponse};
use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::state::AppState;

/// POST /api/auth/superadmin-login - checks only the built-in superadmin accounts
pub async fn superadmin_login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>), ApiError> {
    let (username, password) = body.credentials()?;
    if !state.superadmin.is_configured() {
        return Err(ApiError::forbidden("Superadmin login is not enabled"));
    }
    check_rate_limit(&state, username).await?;

    if state.superadmin.verify(username, password) {
        start_session(&state, jar, username, SessionUser::superadmin(username)).await
    } else {
        Err(reject_login(&state, username).await)
    }
}
