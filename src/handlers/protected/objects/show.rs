// handlers/protected/objects/show.rs - single object lookups

use axum::extract::Path;

use crate::database::models::PortalObject;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::object_service::ObjectMeter;
use crate::services::ObjectService;

pub(crate) fn parse_objectid(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request("Invalid object ID"))
}

/// GET /api/objects/:id
pub async fn object_get(AuthUser(user): AuthUser, Path(id): Path<i32>) -> ApiResult<PortalObject> {
    let object = ObjectService::new().await?.get(id, &user.scope()).await?;
    Ok(ApiResponse::success(object))
}

/// GET /api/objects/by-objectid/:objectid
pub async fn object_by_objectid_get(AuthUser(user): AuthUser, Path(objectid): Path<String>) -> ApiResult<PortalObject> {
    let objectid = parse_objectid(&objectid)?;
    let object = ObjectService::new().await?.by_objectid(objectid, &user.scope()).await?;
    Ok(ApiResponse::success(object))
}

/// GET /api/objects/meter/:objectid - meter ids and report config only
pub async fn object_meter_get(AuthUser(user): AuthUser, Path(objectid): Path<String>) -> ApiResult<ObjectMeter> {
    let objectid = parse_objectid(&objectid)?;
    let meter = ObjectService::new().await?.meter_by_objectid(objectid, &user.scope()).await?;
    Ok(ApiResponse::success(meter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objectid_must_be_numeric() {
        assert_eq!(parse_objectid(" 1000123 ").unwrap(), 1000123);
        assert_eq!(parse_objectid("abc").unwrap_err().status_code(), 400);
    }
}
