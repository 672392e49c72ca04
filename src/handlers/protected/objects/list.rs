// handlers/protected/objects/list.rs - object listings

use axum::extract::{Path, Query};

use crate::database::models::PortalObject;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::object_service::ObjectFilter;
use crate::services::ObjectService;

/// GET /api/objects?status=&city=&postalCode=&objectType=
pub async fn objects_get(AuthUser(user): AuthUser, Query(filter): Query<ObjectFilter>) -> ApiResult<Vec<PortalObject>> {
    let objects = ObjectService::new().await?.list(&filter, &user.scope()).await?;
    Ok(ApiResponse::success(objects))
}

/// GET /api/objects/hierarchy/:mandantId
pub async fn object_hierarchy_get(AuthUser(user): AuthUser, Path(mandant_id): Path<i32>) -> ApiResult<Vec<PortalObject>> {
    let objects = ObjectService::new().await?.hierarchy(mandant_id, &user.scope()).await?;
    Ok(ApiResponse::success(objects))
}

/// GET /api/objects/:id/children
pub async fn object_children_get(AuthUser(user): AuthUser, Path(id): Path<i32>) -> ApiResult<Vec<PortalObject>> {
    let objects = ObjectService::new().await?.children(id, &user.scope()).await?;
    Ok(ApiResponse::success(objects))
}
