// handlers/protected/objects/delete.rs - DELETE /api/objects/:id handler

use axum::extract::Path;
use serde_json::Value;

use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::services::ObjectService;

/// DELETE /api/objects/:id - admins within their own mandant, superadmin anywhere
pub async fn object_delete(AdminUser(user): AdminUser, Path(id): Path<i32>) -> ApiResult<Value> {
    ObjectService::new().await?.delete(id, &user).await?;
    Ok(ApiResponse::message("Object deleted"))
}
