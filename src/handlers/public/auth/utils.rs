// handlers/public/auth/utils.rs - shared login plumbing

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthUserResponse, SessionUser};
use crate::config::config;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Both fields present and non-blank
    pub fn credentials(&self) -> Result<(&str, &str), ApiError> {
        let username = self.username.as_deref().map(str::trim).unwrap_or_default();
        let password = self.password.as_deref().unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::bad_request("Username and password are required"));
        }
        Ok((username, password))
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub user: AuthUserResponse,
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    let cfg = config();
    let secure = cfg.security.secure_cookies;
    Cookie::build((cfg.session.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(if secure { SameSite::Strict } else { SameSite::Lax })
        .max_age(time::Duration::seconds(cfg.session.absolute_timeout_secs))
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((config().session.cookie_name.clone(), ""))
        .path("/")
        .build()
}

/// Refuse while the username is locked out
pub async fn check_rate_limit(state: &AppState, username: &str) -> Result<(), ApiError> {
    state.limiter.check(username).await.map_err(|retry_after| {
        ApiError::too_many_requests(
            "Too many failed login attempts, please try again later",
            retry_after.as_secs().max(1),
        )
    })
}

pub async fn reject_login(state: &AppState, username: &str) -> ApiError {
    state.limiter.record_failure(username).await;
    tracing::warn!("Failed login for '{}'", username);
    ApiError::unauthorized("Invalid credentials")
}

/// Create the session and attach its cookie.
/// `login_name` is the identifier as submitted, which is what the limiter counted.
pub async fn start_session(
    state: &AppState,
    jar: CookieJar,
    login_name: &str,
    user: SessionUser,
) -> Result<(CookieJar, ApiResponse<LoginResponse>), ApiError> {
    state.limiter.reset(login_name).await;
    let (token, record) = state.sessions.create(user, Utc::now()).await?;
    tracing::info!("Login: {} ({})", record.user.username, record.user.role);

    let user = if record.user.is_superadmin() {
        AuthUserResponse::superadmin(&record.user.username)
    } else {
        AuthUserResponse::login(&record.user)
    };
    Ok((
        jar.add(session_cookie(token)),
        ApiResponse::success(LoginResponse {
            message: "Login successful",
            user,
        }),
    ))
}
