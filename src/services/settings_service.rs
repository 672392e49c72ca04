use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::error::{ServiceError, ServiceResult};
use crate::database::manager::DatabaseManager;
use crate::database::models::Setting;
use crate::grafana::{GrafanaConfig, GRAFANA_SETTING_KEY};
use crate::monitoring::{ThresholdCatalog, THRESHOLD_CATEGORY};

const SETTING_COLUMNS: &str = "id, category, key_name, value, user_id, mandant_id, created_at, updated_at";

const MAX_CATEGORY_LENGTH: usize = 100;
const MAX_KEY_LENGTH: usize = 255;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFilter {
    pub category: Option<String>,
    #[serde(alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(alias = "mandant_id")]
    pub mandant_id: Option<i32>,
}

impl SettingsFilter {
    pub fn validate(&self) -> ServiceResult<()> {
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        if let Some(user_id) = &self.user_id {
            if user_id.trim().is_empty() {
                return Err(ServiceError::field("userId", "userId must not be empty"));
            }
        }
        if let Some(mandant_id) = self.mandant_id {
            validate_positive_id("mandantId", mandant_id)?;
        }
        Ok(())
    }

    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE 1=1");
        if let Some(category) = &self.category {
            builder.push(" AND category = ").push_bind(category.clone());
        }
        if let Some(user_id) = &self.user_id {
            builder.push(" AND user_id = ").push_bind(user_id.clone());
        }
        if let Some(mandant_id) = self.mandant_id {
            builder.push(" AND mandant_id = ").push_bind(mandant_id);
        }
    }
}

/// Body for create and import. Accepts both `keyName` and `key_name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSetting {
    pub category: Option<String>,
    #[serde(alias = "key_name")]
    pub key_name: Option<String>,
    pub value: Option<Value>,
    #[serde(alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(alias = "mandant_id")]
    pub mandant_id: Option<i32>,
}

/// A create body that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSetting {
    pub category: String,
    pub key_name: String,
    pub value: Value,
    pub user_id: Option<String>,
    pub mandant_id: Option<i32>,
}

impl NewSetting {
    pub fn validate(self) -> ServiceResult<ValidSetting> {
        let category = self
            .category
            .ok_or_else(|| ServiceError::field("category", "category is required"))?;
        validate_category(&category)?;

        let key_name = self
            .key_name
            .ok_or_else(|| ServiceError::field("keyName", "keyName is required"))?;
        validate_key_name(&key_name)?;

        let value = match self.value {
            Some(Value::Null) | None => return Err(ServiceError::field("value", "value is required")),
            Some(value) => value,
        };

        if let Some(mandant_id) = self.mandant_id {
            validate_positive_id("mandantId", mandant_id)?;
        }

        Ok(ValidSetting {
            category,
            key_name,
            value,
            user_id: self.user_id.filter(|u| !u.trim().is_empty()),
            mandant_id: self.mandant_id,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingPatch {
    pub category: Option<String>,
    #[serde(alias = "key_name")]
    pub key_name: Option<String>,
    pub value: Option<Value>,
    #[serde(alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(alias = "mandant_id")]
    pub mandant_id: Option<i32>,
}

impl SettingPatch {
    pub fn validate(&self) -> ServiceResult<()> {
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        if let Some(key_name) = &self.key_name {
            validate_key_name(key_name)?;
        }
        if let Some(mandant_id) = self.mandant_id {
            validate_positive_id("mandantId", mandant_id)?;
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.key_name.is_none()
            && self.value.is_none()
            && self.user_id.is_none()
            && self.mandant_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsExport {
    pub settings: Vec<Setting>,
    pub exported_count: usize,
}

pub fn validate_category(category: &str) -> ServiceResult<()> {
    if category.is_empty() || category.len() > MAX_CATEGORY_LENGTH {
        return Err(ServiceError::field(
            "category",
            format!("category must be 1-{} characters", MAX_CATEGORY_LENGTH),
        ));
    }
    if !category.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(ServiceError::field(
            "category",
            "category may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

pub fn validate_key_name(key_name: &str) -> ServiceResult<()> {
    if key_name.is_empty() || key_name.len() > MAX_KEY_LENGTH {
        return Err(ServiceError::field(
            "keyName",
            format!("keyName must be 1-{} characters", MAX_KEY_LENGTH),
        ));
    }
    if !key_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(ServiceError::field(
            "keyName",
            "keyName may only contain letters, digits, '_', '-' and '.'",
        ));
    }
    Ok(())
}

pub fn validate_positive_id(field: &str, id: i32) -> ServiceResult<()> {
    if id <= 0 {
        return Err(ServiceError::field(field, format!("{} must be a positive integer", field)));
    }
    Ok(())
}

pub struct SettingsService {
    pool: PgPool,
}

impl SettingsService {
    pub async fn new() -> ServiceResult<Self> {
        let pool = DatabaseManager::main_pool().await?;
        Ok(Self { pool })
    }

    pub async fn list(&self, filter: &SettingsFilter) -> ServiceResult<Vec<Setting>> {
        filter.validate()?;
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM settings", SETTING_COLUMNS));
        filter.push_conditions(&mut builder);
        builder.push(" ORDER BY created_at DESC");
        let settings = builder.build_query_as::<Setting>().fetch_all(&self.pool).await?;
        Ok(settings)
    }

    /// Newest row matching category + key (and owner filters when given)
    pub async fn by_key(
        &self,
        category: &str,
        key_name: &str,
        user_id: Option<&str>,
        mandant_id: Option<i32>,
    ) -> ServiceResult<Setting> {
        validate_category(category)?;
        validate_key_name(key_name)?;

        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM settings WHERE category = ", SETTING_COLUMNS));
        builder.push_bind(category.to_string());
        builder.push(" AND key_name = ").push_bind(key_name.to_string());
        if let Some(user_id) = user_id {
            builder.push(" AND user_id = ").push_bind(user_id.to_string());
        }
        if let Some(mandant_id) = mandant_id {
            validate_positive_id("mandantId", mandant_id)?;
            builder.push(" AND mandant_id = ").push_bind(mandant_id);
        }
        builder.push(" ORDER BY created_at DESC LIMIT 1");

        builder
            .build_query_as::<Setting>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Setting {}/{} not found", category, key_name)))
    }

    pub async fn get(&self, id: i32) -> ServiceResult<Setting> {
        validate_positive_id("id", id)?;
        sqlx::query_as::<_, Setting>(&format!("SELECT {} FROM settings WHERE id = $1", SETTING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Setting {} not found", id)))
    }

    pub async fn create(&self, input: NewSetting) -> ServiceResult<Setting> {
        let setting = input.validate()?;
        let created = self.insert(&self.pool, &setting).await?;
        info!("Created setting {}/{} (id={})", created.category, created.key_name, created.id);
        Ok(created)
    }

    async fn insert<'e, E>(&self, executor: E, setting: &ValidSetting) -> ServiceResult<Setting>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Setting>(&format!(
            "INSERT INTO settings (category, key_name, value, user_id, mandant_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, now(), now()) RETURNING {}",
            SETTING_COLUMNS
        ))
        .bind(&setting.category)
        .bind(&setting.key_name)
        .bind(&setting.value)
        .bind(&setting.user_id)
        .bind(setting.mandant_id)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn update(&self, id: i32, patch: SettingPatch) -> ServiceResult<Setting> {
        validate_positive_id("id", id)?;
        patch.validate()?;
        if patch.is_empty() {
            return self.get(id).await;
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE settings SET ");
        let mut fields = builder.separated(", ");
        if let Some(category) = patch.category {
            fields.push("category = ").push_bind_unseparated(category);
        }
        if let Some(key_name) = patch.key_name {
            fields.push("key_name = ").push_bind_unseparated(key_name);
        }
        if let Some(value) = patch.value {
            fields.push("value = ").push_bind_unseparated(value);
        }
        if let Some(user_id) = patch.user_id {
            fields.push("user_id = ").push_bind_unseparated(user_id);
        }
        if let Some(mandant_id) = patch.mandant_id {
            fields.push("mandant_id = ").push_bind_unseparated(mandant_id);
        }
        fields.push("updated_at = now()");
        builder.push(" WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {}", SETTING_COLUMNS));

        builder
            .build_query_as::<Setting>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Setting {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> ServiceResult<()> {
        validate_positive_id("id", id)?;
        let result = sqlx::query("DELETE FROM settings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(format!("Setting {} not found", id)));
        }
        info!("Deleted setting {}", id);
        Ok(())
    }

    /// Delete every row matching the filter and hand the deleted rows back
    pub async fn clear(&self, filter: &SettingsFilter) -> ServiceResult<Vec<Setting>> {
        filter.validate()?;
        let mut builder = QueryBuilder::<Postgres>::new("DELETE FROM settings");
        filter.push_conditions(&mut builder);
        builder.push(format!(" RETURNING {}", SETTING_COLUMNS));
        let deleted = builder.build_query_as::<Setting>().fetch_all(&self.pool).await?;
        info!("Cleared {} settings", deleted.len());
        Ok(deleted)
    }

    pub async fn export(&self, filter: &SettingsFilter) -> ServiceResult<SettingsExport> {
        let settings = self.list(filter).await?;
        Ok(SettingsExport {
            exported_count: settings.len(),
            settings,
        })
    }

    /// All rows are validated up front and written in one transaction
    pub async fn import(&self, settings: Vec<NewSetting>) -> ServiceResult<usize> {
        let valid = settings
            .into_iter()
            .enumerate()
            .map(|(index, setting)| {
                setting.validate().map_err(|e| match e {
                    ServiceError::InvalidField { field, message } => ServiceError::InvalidField {
                        field: format!("settings[{}].{}", index, field),
                        message,
                    },
                    other => other,
                })
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        let mut tx = self.pool.begin().await?;
        for setting in &valid {
            self.insert(&mut *tx, setting).await?;
        }
        tx.commit().await?;

        info!("Imported {} settings", valid.len());
        Ok(valid.len())
    }

    pub async fn thresholds(&self) -> ServiceResult<Vec<Setting>> {
        self.list(&SettingsFilter {
            category: Some(THRESHOLD_CATEGORY.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn threshold_catalog(&self) -> ServiceResult<ThresholdCatalog> {
        let rows = self.thresholds().await?;
        Ok(ThresholdCatalog::from_settings(&rows))
    }

    /// Grafana config from the `defaultGrafana` row, falling back to built-in defaults
    pub async fn grafana_config(&self) -> ServiceResult<GrafanaConfig> {
        let rows = sqlx::query_as::<_, Setting>(&format!(
            "SELECT {} FROM settings WHERE key_name = $1 ORDER BY created_at DESC",
            SETTING_COLUMNS
        ))
        .bind(GRAFANA_SETTING_KEY)
        .fetch_all(&self.pool)
        .await?;
        Ok(GrafanaConfig::from_settings(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_rules() {
        assert!(validate_category("thresholds").is_ok());
        assert!(validate_category("grafana-setup_2").is_ok());
        assert!(validate_category("").is_err());
        assert!(validate_category("with space").is_err());
        assert!(validate_category("dots.not.allowed").is_err());
        assert!(validate_category(&"a".repeat(101)).is_err());
    }

    #[test]
    fn key_rules_allow_dots() {
        assert!(validate_key_name("netzwaechter_0").is_ok());
        assert!(validate_key_name("app.theme-v2").is_ok());
        assert!(validate_key_name("semi;colon").is_err());
        assert!(validate_key_name(&"k".repeat(256)).is_err());
    }

    #[test]
    fn new_setting_requires_value() {
        let input: NewSetting = serde_json::from_value(json!({
            "category": "thresholds",
            "key_name": "netzwaechter_0",
            "value": null
        }))
        .unwrap();
        match input.validate() {
            Err(ServiceError::InvalidField { field, .. }) => assert_eq!(field, "value"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn new_setting_accepts_camel_case() {
        let input: NewSetting = serde_json::from_value(json!({
            "category": "ui",
            "keyName": "layout",
            "value": {"dense": true},
            "mandantId": 4,
            "userId": ""
        }))
        .unwrap();
        let valid = input.validate().unwrap();
        assert_eq!(valid.key_name, "layout");
        assert_eq!(valid.mandant_id, Some(4));
        assert_eq!(valid.user_id, None);
    }

    #[test]
    fn ids_must_be_positive() {
        let filter = SettingsFilter {
            mandant_id: Some(0),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
        assert!(validate_positive_id("id", 1).is_ok());
    }

    #[test]
    fn patch_validates_present_fields() {
        let patch: SettingPatch = serde_json::from_value(json!({"value": null})).unwrap();
        assert!(patch.is_empty());

        let patch = SettingPatch {
            key_name: Some("bad key".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }
}
