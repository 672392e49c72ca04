use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::types::{mandant_ids_from_json, Role};

pub const USER_COLUMNS: &str = "id, username, email, password, role, mandant_id, first_name, last_name, \
     user_profile_id, address, mandant_access, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    /// bcrypt hash, never serialized
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub role: String,
    pub mandant_id: Option<i32>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_profile_id: Option<i32>,
    pub address: Option<Value>,
    pub mandant_access: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from_db(&self.role)
    }

    pub fn mandant_access_ids(&self) -> Vec<i32> {
        mandant_ids_from_json(Some(&self.mandant_access))
    }
}
