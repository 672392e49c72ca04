// handlers/protected/objects/update.rs - object write handlers

use axum::{extract::Path, Json};
use serde_json::Value;

use super::object_body;
use crate::database::models::PortalObject;
use crate::error::ApiError;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::services::object_service::Coordinates;
use crate::services::ObjectService;

/// PUT /api/objects/:id - partial field update
pub async fn object_put(AdminUser(user): AdminUser, Path(id): Path<i32>, Json(body): Json<Value>) -> ApiResult<PortalObject> {
    let body = object_body(body)?;
    let object = ObjectService::new().await?.update(id, &body, &user.scope()).await?;
    tracing::info!("{} updated object {}", user.username, id);
    Ok(ApiResponse::success(object))
}

/// PATCH /api/objects/:id/coordinates - `{latitude, longitude}`
pub async fn object_coordinates_patch(
    AdminUser(user): AdminUser,
    Path(id): Path<i32>,
    Json(coordinates): Json<Coordinates>,
) -> ApiResult<PortalObject> {
    let object = ObjectService::new()
        .await?
        .update_coordinates(id, coordinates, &user.scope())
        .await?;
    Ok(ApiResponse::success(object))
}

/// PATCH /api/objects/:id/meter - `{meter: {...}}` or the meter object itself
pub async fn object_meter_patch(AdminUser(user): AdminUser, Path(id): Path<i32>, Json(body): Json<Value>) -> ApiResult<PortalObject> {
    let meter = match body {
        Value::Object(mut map) => match map.remove("meter") {
            Some(meter) if map.is_empty() => meter,
            Some(meter) => {
                map.insert("meter".to_string(), meter);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        _ => return Err(ApiError::bad_request("Request body must be a JSON object")),
    };
    let object = ObjectService::new().await?.update_meter(id, meter, &user.scope()).await?;
    Ok(ApiResponse::success(object))
}
