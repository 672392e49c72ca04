// handlers/protected/auth/logout.rs - POST /api/auth/logout handler

use axum::extract::State;
use axum_extra::extract::CookieJar;
use serde_json::Value;

use crate::error::ApiError;
use crate::handlers::public::auth::utils::removal_cookie;
use crate::middleware::{ApiResponse, AuthUser, SessionToken};
use crate::state::AppState;

/// POST /api/auth/logout - destroys the session and clears the cookie
pub async fn logout_post(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    SessionToken(token): SessionToken,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Value>), ApiError> {
    state.sessions.destroy(&token).await?;
    tracing::info!("Logout: {}", user.username);
    Ok((jar.remove(removal_cookie()), ApiResponse::message("Logged out")))
}
