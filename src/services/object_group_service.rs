use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::error::{ServiceError, ServiceResult};
use crate::database::manager::DatabaseManager;
use crate::database::models::ObjectGroup;

const GROUP_COLUMNS: &str = "id, name, description, type, created_at, updated_at";
const DEFAULT_GROUP_TYPE: &str = "standard";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectGroupInput {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub group_type: Option<String>,
}

pub struct ObjectGroupService {
    pool: PgPool,
}

impl ObjectGroupService {
    pub async fn new() -> ServiceResult<Self> {
        let pool = DatabaseManager::main_pool().await?;
        Ok(Self { pool })
    }

    pub async fn list(&self) -> ServiceResult<Vec<ObjectGroup>> {
        let groups = sqlx::query_as::<_, ObjectGroup>(&format!(
            "SELECT {} FROM object_groups ORDER BY name",
            GROUP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    pub async fn create(&self, input: ObjectGroupInput) -> ServiceResult<ObjectGroup> {
        let name = input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::field("name", "name is required"))?;
        let group = sqlx::query_as::<_, ObjectGroup>(&format!(
            "INSERT INTO object_groups (name, description, type, created_at, updated_at) \
             VALUES ($1, $2, $3, now(), now()) RETURNING {}",
            GROUP_COLUMNS
        ))
        .bind(&name)
        .bind(&input.description)
        .bind(input.group_type.as_deref().unwrap_or(DEFAULT_GROUP_TYPE))
        .fetch_one(&self.pool)
        .await?;
        info!("Created object group {} ({})", group.name, group.id);
        Ok(group)
    }

    pub async fn update(&self, id: i32, input: ObjectGroupInput) -> ServiceResult<ObjectGroup> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE object_groups SET updated_at = now()");
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::field("name", "name must not be empty"));
            }
            builder.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(description) = input.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(group_type) = input.group_type {
            builder.push(", type = ").push_bind(group_type);
        }
        builder.push(" WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {}", GROUP_COLUMNS));

        builder
            .build_query_as::<ObjectGroup>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Object group {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM object_groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("Object group {} not found", id)));
        }
        info!("Deleted object group {}", id);
        Ok(())
    }
}
