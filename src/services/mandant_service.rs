use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::error::{ServiceError, ServiceResult};
use crate::database::manager::DatabaseManager;
use crate::database::models::Mandant;
use crate::types::MandantScope;

const MANDANT_COLUMNS: &str = "id, name, description, category, info, created_at";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MandantInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub info: Option<Value>,
}

pub struct MandantService {
    pool: PgPool,
}

impl MandantService {
    pub async fn new() -> ServiceResult<Self> {
        let pool = DatabaseManager::main_pool().await?;
        Ok(Self { pool })
    }

    pub async fn list(&self, scope: &MandantScope) -> ServiceResult<Vec<Mandant>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM mandants", MANDANT_COLUMNS));
        if let MandantScope::Only(ids) = scope {
            builder.push(" WHERE id = ANY(").push_bind(ids.clone()).push(")");
        }
        builder.push(" ORDER BY name");
        Ok(builder.build_query_as::<Mandant>().fetch_all(&self.pool).await?)
    }

    pub async fn create(&self, input: MandantInput) -> ServiceResult<Mandant> {
        let name = input
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::field("name", "name is required"))?;
        let mandant = sqlx::query_as::<_, Mandant>(&format!(
            "INSERT INTO mandants (name, description, category, info) VALUES ($1, $2, $3, $4) RETURNING {}",
            MANDANT_COLUMNS
        ))
        .bind(&name)
        .bind(&input.description)
        .bind(&input.category)
        .bind(&input.info)
        .fetch_one(&self.pool)
        .await?;
        info!("Created mandant {} ({})", mandant.name, mandant.id);
        Ok(mandant)
    }

    pub async fn update(&self, id: i32, input: MandantInput) -> ServiceResult<Mandant> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE mandants SET id = id");
        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::field("name", "name must not be empty"));
            }
            builder.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(description) = input.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(category) = input.category {
            builder.push(", category = ").push_bind(category);
        }
        if let Some(info) = input.info {
            builder.push(", info = ").push_bind(info);
        }
        builder.push(" WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {}", MANDANT_COLUMNS));

        builder
            .build_query_as::<Mandant>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Mandant {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM mandants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("Mandant {} not found", id)));
        }
        info!("Deleted mandant {}", id);
        Ok(())
    }
}
