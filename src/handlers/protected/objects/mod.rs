// handlers/protected/objects/mod.rs - /api/objects

use serde_json::{Map, Value};

use crate::error::ApiError;

pub mod create;
pub mod delete;
pub mod list;
pub mod show;
pub mod update;

pub use create::object_post;
pub use delete::object_delete;
pub use list::{object_children_get, object_hierarchy_get, objects_get};
pub use show::{object_by_objectid_get, object_get, object_meter_get};
pub use update::{object_coordinates_patch, object_meter_patch, object_put};

/// Write endpoints take a JSON object of fields
fn object_body(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}
