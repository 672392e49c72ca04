// handlers/protected/monitoring.rs - temperature analysis and dashboard

use axum::extract::Path;
use chrono::Utc;

use super::objects::show::parse_objectid;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::monitoring::ObjectStatus;
use crate::services::monitoring_service::DashboardView;
use crate::services::MonitoringService;

/// GET /api/temperature-analysis - every visible object, worst first
pub async fn temperature_analysis_get(AuthUser(user): AuthUser) -> ApiResult<Vec<ObjectStatus>> {
    let entries = MonitoringService::new().await?.analysis(&user.scope(), Utc::now()).await?;
    Ok(ApiResponse::success(entries))
}

/// GET /api/temperature-analysis/:objectId
pub async fn temperature_analysis_object_get(AuthUser(user): AuthUser, Path(objectid): Path<String>) -> ApiResult<ObjectStatus> {
    let objectid = parse_objectid(&objectid)?;
    let entry = MonitoringService::new()
        .await?
        .analysis_for(objectid, &user.scope(), Utc::now())
        .await?;
    Ok(ApiResponse::success(entry))
}

/// GET /api/monitoring/dashboard
pub async fn dashboard_get(AuthUser(user): AuthUser) -> ApiResult<DashboardView> {
    let view = MonitoringService::new().await?.dashboard(&user.scope(), Utc::now()).await?;
    Ok(ApiResponse::success(view))
}
