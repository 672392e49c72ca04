// handlers/protected/settings/read.rs - settings lookups

use axum::extract::{Path, Query};
use serde::Deserialize;

use crate::database::models::Setting;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::settings_service::SettingsFilter;
use crate::services::SettingsService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByKeyQuery {
    pub category: Option<String>,
    #[serde(alias = "key_name")]
    pub key_name: Option<String>,
    #[serde(alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(alias = "mandant_id")]
    pub mandant_id: Option<i32>,
}

impl ByKeyQuery {
    fn required(&self) -> Result<(&str, &str), ApiError> {
        match (self.category.as_deref(), self.key_name.as_deref()) {
            (Some(category), Some(key_name)) if !category.is_empty() && !key_name.is_empty() => Ok((category, key_name)),
            _ => Err(ApiError::bad_request("category and keyName are required")),
        }
    }
}

/// GET /api/settings?category=&userId=&mandantId=
pub async fn settings_get(_user: AuthUser, Query(filter): Query<SettingsFilter>) -> ApiResult<Vec<Setting>> {
    let settings = SettingsService::new().await?.list(&filter).await?;
    Ok(ApiResponse::success(settings))
}

/// GET /api/settings/by-key - newest matching row
pub async fn setting_by_key_get(_user: AuthUser, Query(query): Query<ByKeyQuery>) -> ApiResult<Setting> {
    let (category, key_name) = query.required()?;
    let setting = SettingsService::new()
        .await?
        .by_key(category, key_name, query.user_id.as_deref(), query.mandant_id)
        .await?;
    Ok(ApiResponse::success(setting))
}

/// GET /api/settings/thresholds
pub async fn thresholds_get(_user: AuthUser) -> ApiResult<Vec<Setting>> {
    let settings = SettingsService::new().await?.thresholds().await?;
    Ok(ApiResponse::success(settings))
}

/// GET /api/settings/:id
pub async fn setting_get(_user: AuthUser, Path(id): Path<i32>) -> ApiResult<Setting> {
    let setting = SettingsService::new().await?.get(id).await?;
    Ok(ApiResponse::success(setting))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_key_requires_category_and_key() {
        let query: ByKeyQuery = serde_json::from_value(serde_json::json!({"category": "thresholds"})).unwrap();
        assert_eq!(query.required().unwrap_err().status_code(), 400);

        let query: ByKeyQuery =
            serde_json::from_value(serde_json::json!({"category": "thresholds", "keyName": "netzwaechter_0"})).unwrap();
        assert_eq!(query.required().unwrap(), ("thresholds", "netzwaechter_0"));
    }
}
