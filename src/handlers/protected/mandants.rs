// handlers/protected/mandants.rs - /api/mandants

use axum::{extract::Path, Json};
use serde_json::Value;

use crate::database::models::Mandant;
use crate::middleware::{AdminUser, ApiResponse, ApiResult, AuthUser};
use crate::services::mandant_service::MandantInput;
use crate::services::MandantService;

/// GET /api/mandants - admins see all, users their accessible mandants
pub async fn mandants_get(AuthUser(user): AuthUser) -> ApiResult<Vec<Mandant>> {
    let mandants = MandantService::new().await?.list(&user.scope()).await?;
    Ok(ApiResponse::success(mandants))
}

/// POST /api/mandants
pub async fn mandant_post(AdminUser(user): AdminUser, Json(input): Json<MandantInput>) -> ApiResult<Mandant> {
    let mandant = MandantService::new().await?.create(input).await?;
    tracing::info!("{} created mandant {} ({})", user.username, mandant.name, mandant.id);
    Ok(ApiResponse::created(mandant))
}

/// PATCH /api/mandants/:id
pub async fn mandant_patch(AdminUser(user): AdminUser, Path(id): Path<i32>, Json(input): Json<MandantInput>) -> ApiResult<Mandant> {
    let mandant = MandantService::new().await?.update(id, input).await?;
    tracing::info!("{} updated mandant {}", user.username, id);
    Ok(ApiResponse::success(mandant))
}

/// DELETE /api/mandants/:id
pub async fn mandant_delete(AdminUser(user): AdminUser, Path(id): Path<i32>) -> ApiResult<Value> {
    MandantService::new().await?.delete(id).await?;
    tracing::info!("{} deleted mandant {}", user.username, id);
    Ok(ApiResponse::message("Mandant deleted"))
}
