// handlers/protected/settings/write.rs - settings mutations (admin)

use axum::{
    extract::{Path, Query},
    Json,
};
use serde_json::{json, Value};

use crate::database::models::Setting;
use crate::middleware::{AdminUser, ApiResponse, ApiResult, SuperadminUser};
use crate::services::settings_service::{NewSetting, SettingPatch, SettingsFilter};
use crate::services::SettingsService;

/// POST /api/settings
pub async fn setting_post(AdminUser(user): AdminUser, Json(input): Json<NewSetting>) -> ApiResult<Setting> {
    let setting = SettingsService::new().await?.create(input).await?;
    tracing::info!("{} created setting {}", user.username, setting.id);
    Ok(ApiResponse::created(setting))
}

/// PUT /api/settings/:id
pub async fn setting_put(AdminUser(user): AdminUser, Path(id): Path<i32>, Json(patch): Json<SettingPatch>) -> ApiResult<Setting> {
    let setting = SettingsService::new().await?.update(id, patch).await?;
    tracing::info!("{} updated setting {}", user.username, id);
    Ok(ApiResponse::success(setting))
}

/// DELETE /api/settings/:id
pub async fn setting_delete(AdminUser(user): AdminUser, Path(id): Path<i32>) -> ApiResult<Value> {
    SettingsService::new().await?.delete(id).await?;
    tracing::info!("{} deleted setting {}", user.username, id);
    Ok(ApiResponse::message("Setting deleted"))
}

/// DELETE /api/settings/clear - superadmin only; without a filter every row goes
pub async fn settings_clear_delete(SuperadminUser(user): SuperadminUser, Query(filter): Query<SettingsFilter>) -> ApiResult<Value> {
    let deleted = SettingsService::new().await?.clear(&filter).await?;
    tracing::warn!("{} cleared {} settings", user.username, deleted.len());
    Ok(ApiResponse::success(json!({
        "message": "Settings cleared",
        "count": deleted.len(),
        "deletedSettings": deleted,
    })))
}
