// handlers/protected/auth/me.rs - GET /api/auth/me handler

use crate::auth::AuthUserResponse;
use crate::database::models::UserProfile;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{ServiceResult, UserProfileService};

async fn load_profile(profile_id: i32) -> ServiceResult<Option<UserProfile>> {
    UserProfileService::new().await?.find(profile_id).await
}

/// GET /api/auth/me - identity plus the resolved start page and sidebar.
/// A profile that cannot be loaded falls back to the role defaults.
pub async fn me_get(AuthUser(user): AuthUser) -> ApiResult<AuthUserResponse> {
    if user.is_superadmin() {
        return Ok(ApiResponse::success(AuthUserResponse::superadmin(&user.username)));
    }

    let profile = match user.user_profile_id {
        Some(profile_id) => load_profile(profile_id).await.unwrap_or_else(|e| {
            tracing::warn!("Profile {} unavailable for {}: {}", profile_id, user.username, e);
            None
        }),
        None => None,
    };

    Ok(ApiResponse::success(AuthUserResponse::current(&user, profile.as_ref())))
}
