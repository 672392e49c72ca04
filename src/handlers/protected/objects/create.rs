// handlers/protected/objects/create.rs - POST /api/objects handler

use axum::Json;
use serde_json::Value;

use super::object_body;
use crate::database::models::PortalObject;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::services::ObjectService;

/// POST /api/objects - admin only; `name` and `objectid` required
pub async fn object_post(AdminUser(user): AdminUser, Json(body): Json<Value>) -> ApiResult<PortalObject> {
    let body = object_body(body)?;
    let object = ObjectService::new().await?.create(&body, &user).await?;
    Ok(ApiResponse::created(object))
}
