// handlers/protected/users/password.rs - POST /api/users/:id/change-password handler

use axum::{extract::Path, Json};
use serde_json::Value;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::user_service::PasswordChange;
use crate::services::UserService;

pub async fn change_password_post(
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(change): Json<PasswordChange>,
) -> ApiResult<Value> {
    UserService::new().await?.change_password(&id, change, &actor).await?;
    tracing::info!("{} changed the password of user {}", actor.username, id);
    Ok(ApiResponse::message("Password changed"))
}
