// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::{extract::State, Json};
use axum_extra::extract::CookieJar;

use super::utils::{check_rate_limit, reject_login, start_session, LoginRequest, LoginResponse};
use crate::auth::{verify_password_or_dummy, SessionUser};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::services::{ServiceResult, UserService};
use crate::state::AppState;

/// POST /api/auth/login
///
/// Body `{"username": "...", "password": "..."}`; `username` may also be an email.
/// Superadmin accounts are checked first, then the `users` table.
/// On success the `sid` cookie is set and the user identity returned.
/// Every attempt that does not end in a session counts against the limiter,
/// including attempts that fail because the database is unreachable.
pub async fn login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>), ApiError> {
    let (username, password) = body.credentials()?;
    check_rate_limit(&state, username).await?;

    if state.superadmin.verify(username, password) {
        return start_session(&state, jar, username, SessionUser::superadmin(username)).await;
    }
    // A superadmin name never falls through to the users table
    if state.superadmin.has_account(username) {
        return Err(reject_login(&state, username).await);
    }

    match authenticate_user(username, password).await {
        Ok(Some(user)) => start_session(&state, jar, username, SessionUser::from_user(&user)).await,
        Ok(None) => Err(reject_login(&state, username).await),
        Err(err) => {
            state.limiter.record_failure(username).await;
            tracing::warn!("Login for '{}' could not be checked: {}", username, err);
            Err(err.into())
        }
    }
}

/// The matching user when the password verifies
async fn authenticate_user(username: &str, password: &str) -> ServiceResult<Option<User>> {
    let users = UserService::new().await?;
    let user = users.find_for_login(username).await?;
    let verified = verify_password_or_dummy(password, user.as_ref().and_then(|u| u.password.as_deref())).await?;
    Ok(user.filter(|_| verified))
}
