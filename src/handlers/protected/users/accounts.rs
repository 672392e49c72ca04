// handlers/protected/users/accounts.rs - user account CRUD

use axum::{extract::Path, Json};
use serde_json::Value;

use crate::database::models::User;
use crate::middleware::{AdminUser, ApiResponse, ApiResult, AuthUser};
use crate::services::user_service::{NewUser, UserPatch};
use crate::services::UserService;

/// GET /api/users - superadmin sees everyone, admins their mandants
pub async fn users_get(AdminUser(actor): AdminUser) -> ApiResult<Vec<User>> {
    let users = UserService::new().await?.list(&actor).await?;
    Ok(ApiResponse::success(users))
}

/// POST /api/users
pub async fn user_post(AdminUser(actor): AdminUser, Json(input): Json<NewUser>) -> ApiResult<User> {
    let user = UserService::new().await?.create(input, &actor).await?;
    tracing::info!("{} created user {}", actor.username, user.username);
    Ok(ApiResponse::created(user))
}

/// GET /api/users/:id
pub async fn user_get(AuthUser(actor): AuthUser, Path(id): Path<String>) -> ApiResult<User> {
    let user = UserService::new().await?.get(&id, &actor).await?;
    Ok(ApiResponse::success(user))
}

/// PATCH /api/users/:id
pub async fn user_patch(AuthUser(actor): AuthUser, Path(id): Path<String>, Json(patch): Json<UserPatch>) -> ApiResult<User> {
    let user = UserService::new().await?.update(&id, patch, &actor).await?;
    tracing::info!("{} updated user {}", actor.username, user.username);
    Ok(ApiResponse::success(user))
}

/// DELETE /api/users/:id
pub async fn user_delete(AuthUser(actor): AuthUser, Path(id): Path<String>) -> ApiResult<Value> {
    UserService::new().await?.delete(&id, &actor).await?;
    tracing::info!("{} deleted user {}", actor.username, id);
    Ok(ApiResponse::message("User deleted"))
}
