use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// One row of the `settings` table. Values are arbitrary JSON documents.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: i32,
    pub category: String,
    pub key_name: String,
    pub value: Value,
    pub user_id: Option<String>,
    pub mandant_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
