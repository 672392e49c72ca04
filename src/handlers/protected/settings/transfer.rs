// handlers/protected/settings/transfer.rs - settings export/import

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::services::settings_service::{NewSetting, SettingsExport, SettingsFilter};
use crate::services::SettingsService;

#[derive(Debug, Default, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub settings: Vec<NewSetting>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub imported_count: usize,
}

/// POST /api/settings/export - body is an optional filter
pub async fn settings_export_post(_admin: AdminUser, filter: Option<Json<SettingsFilter>>) -> ApiResult<SettingsExport> {
    let filter = filter.map(|Json(f)| f).unwrap_or_default();
    let export = SettingsService::new().await?.export(&filter).await?;
    Ok(ApiResponse::success(export))
}

/// POST /api/settings/import - all rows or none
pub async fn settings_import_post(AdminUser(user): AdminUser, Json(request): Json<ImportRequest>) -> ApiResult<ImportResponse> {
    let imported_count = SettingsService::new().await?.import(request.settings).await?;
    tracing::info!("{} imported {} settings", user.username, imported_count);
    Ok(ApiResponse::success(ImportResponse { imported_count }))
}
