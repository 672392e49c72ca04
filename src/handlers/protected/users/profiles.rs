// handlers/protected/users/profiles.rs - user profile (sidebar preset) CRUD

use axum::{extract::Path, Json};
use serde_json::Value;

use crate::database::models::UserProfile;
use crate::middleware::{AdminUser, ApiResponse, ApiResult, AuthUser};
use crate::services::user_profile_service::ProfileInput;
use crate::services::UserProfileService;

/// GET /api/users/profiles/list
pub async fn profiles_get(_user: AuthUser) -> ApiResult<Vec<UserProfile>> {
    let profiles = UserProfileService::new().await?.list().await?;
    Ok(ApiResponse::success(profiles))
}

/// POST /api/users/profiles
pub async fn profile_post(AdminUser(actor): AdminUser, Json(input): Json<ProfileInput>) -> ApiResult<UserProfile> {
    let profile = UserProfileService::new().await?.create(input).await?;
    tracing::info!("{} created profile {}", actor.username, profile.id);
    Ok(ApiResponse::created(profile))
}

/// PUT /api/users/profiles/:id
pub async fn profile_put(AdminUser(actor): AdminUser, Path(id): Path<i32>, Json(input): Json<ProfileInput>) -> ApiResult<UserProfile> {
    let profile = UserProfileService::new().await?.update(id, input).await?;
    tracing::info!("{} updated profile {}", actor.username, id);
    Ok(ApiResponse::success(profile))
}

/// DELETE /api/users/profiles/:id
pub async fn profile_delete(AdminUser(actor): AdminUser, Path(id): Path<i32>) -> ApiResult<Value> {
    UserProfileService::new().await?.delete(id).await?;
    tracing::info!("{} deleted profile {}", actor.username, id);
    Ok(ApiResponse::message("Profile deleted"))
}
