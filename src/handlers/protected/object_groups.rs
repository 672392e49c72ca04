// handlers/protected/object_groups.rs - /api/object-groups

use axum::{extract::Path, Json};
use serde_json::Value;

use crate::database::models::ObjectGroup;
use crate::middleware::{AdminUser, ApiResponse, ApiResult, AuthUser};
use crate::services::object_group_service::ObjectGroupInput;
use crate::services::ObjectGroupService;

pub async fn object_groups_get(_user: AuthUser) -> ApiResult<Vec<ObjectGroup>> {
    let groups = ObjectGroupService::new().await?.list().await?;
    Ok(ApiResponse::success(groups))
}

pub async fn object_group_post(AdminUser(user): AdminUser, Json(input): Json<ObjectGroupInput>) -> ApiResult<ObjectGroup> {
    let group = ObjectGroupService::new().await?.create(input).await?;
    tracing::info!("{} created object group {}", user.username, group.id);
    Ok(ApiResponse::created(group))
}

pub async fn object_group_patch(
    AdminUser(user): AdminUser,
    Path(id): Path<i32>,
    Json(input): Json<ObjectGroupInput>,
) -> ApiResult<ObjectGroup> {
    let group = ObjectGroupService::new().await?.update(id, input).await?;
    tracing::info!("{} updated object group {}", user.username, id);
    Ok(ApiResponse::success(group))
}

pub async fn object_group_delete(AdminUser(user): AdminUser, Path(id): Path<i32>) -> ApiResult<Value> {
    ObjectGroupService::new().await?.delete(id).await?;
    tracing::info!("{} deleted object group {}", user.username, id);
    Ok(ApiResponse::message("Object group deleted"))
}
