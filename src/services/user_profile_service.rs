use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::error::{ServiceError, ServiceResult};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::UserProfile;

const PROFILE_COLUMNS: &str = "id, name, start_page, sidebar, created_at, updated_at";
const DEFAULT_START_PAGE: &str = "/maps";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub name: Option<String>,
    pub start_page: Option<String>,
    pub sidebar: Option<Value>,
}

impl ProfileInput {
    fn validate(&self) -> ServiceResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ServiceError::field("name", "name must not be empty"));
            }
        }
        if let Some(start_page) = &self.start_page {
            if !start_page.starts_with('/') {
                return Err(ServiceError::field("startPage", "startPage must be an absolute path"));
            }
        }
        if let Some(sidebar) = &self.sidebar {
            if !sidebar.is_object() {
                return Err(ServiceError::field("sidebar", "sidebar must be a JSON object"));
            }
        }
        Ok(())
    }
}

fn name_conflict(err: sqlx::Error) -> ServiceError {
    let err = DatabaseError::Sqlx(err);
    if err.is_unique_violation() {
        ServiceError::Conflict("A profile with this name already exists".to_string())
    } else {
        ServiceError::Database(err)
    }
}

pub struct UserProfileService {
    pool: PgPool,
}

impl UserProfileService {
    pub async fn new() -> ServiceResult<Self> {
        let pool = DatabaseManager::main_pool().await?;
        Ok(Self { pool })
    }

    pub async fn list(&self) -> ServiceResult<Vec<UserProfile>> {
        let profiles = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM user_profiles ORDER BY name",
            PROFILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(profiles)
    }

    pub async fn find(&self, id: i32) -> ServiceResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM user_profiles WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    pub async fn create(&self, input: ProfileInput) -> ServiceResult<UserProfile> {
        input.validate()?;
        let name = input
            .name
            .ok_or_else(|| ServiceError::field("name", "name is required"))?;
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "INSERT INTO user_profiles (name, start_page, sidebar, created_at, updated_at) \
             VALUES ($1, $2, $3, now(), now()) RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(name.trim())
        .bind(input.start_page.as_deref().unwrap_or(DEFAULT_START_PAGE))
        .bind(&input.sidebar)
        .fetch_one(&self.pool)
        .await
        .map_err(name_conflict)?;
        info!("Created user profile {} ({})", profile.name, profile.id);
        Ok(profile)
    }

    pub async fn update(&self, id: i32, input: ProfileInput) -> ServiceResult<UserProfile> {
        input.validate()?;
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE user_profiles SET ");
        if let Some(name) = input.name {
            builder.push("name = ").push_bind(name.trim().to_string()).push(", ");
        }
        if let Some(start_page) = input.start_page {
            builder.push("start_page = ").push_bind(start_page).push(", ");
        }
        if let Some(sidebar) = input.sidebar {
            builder.push("sidebar = ").push_bind(sidebar).push(", ");
        }
        builder.push("updated_at = now() WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {}", PROFILE_COLUMNS));

        builder
            .build_query_as::<UserProfile>()
            .fetch_optional(&self.pool)
            .await
            .map_err(name_conflict)?
            .ok_or_else(|| ServiceError::NotFound(format!("User profile {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("User profile {} not found", id)));
        }
        info!("Deleted user profile {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validates_profile_input() {
        let ok: ProfileInput = serde_json::from_value(json!({
            "name": "Techniker",
            "startPage": "/network-monitor",
            "sidebar": {"showDashboard": true}
        }))
        .unwrap();
        assert!(ok.validate().is_ok());

        let bad = ProfileInput { start_page: Some("maps".into()), ..Default::default() };
        assert!(bad.validate().is_err());
        let bad = ProfileInput { sidebar: Some(json!([1])), ..Default::default() };
        assert!(bad.validate().is_err());
        let bad = ProfileInput { name: Some("  ".into()), ..Default::default() };
        assert!(bad.validate().is_err());
    }
}
