// monitoring/thresholds.rs - threshold settings parsed from `settings` rows

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use super::telemetry::{json_document, number_from_json};
use crate::database::models::Setting;

/// Settings category holding threshold rows
pub const THRESHOLD_CATEGORY: &str = "thresholds";

/// Global fallback threshold set; must exist for any object to be classified
pub const DEFAULT_THRESHOLD_KEY: &str = "netzwaechter_0";

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("threshold setting '{0}' has no thresholds object")]
    MissingThresholds(String),

    #[error("threshold setting '{key}' is missing level '{level}'")]
    MissingLevel { key: String, level: &'static str },

    #[error("threshold setting '{key}' has a non-numeric {level}.{field}")]
    InvalidValue {
        key: String,
        level: &'static str,
        field: &'static str,
    },
}

/// Flow (VL) and return (RL) limits for one severity level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdLevel {
    #[serde(rename = "vlValue")]
    pub vl_value: f64,
    #[serde(rename = "rlValue")]
    pub rl_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSet {
    pub key: String,
    pub label: Option<String>,
    pub enabled: bool,
    pub show_temp: bool,
    pub normal: Option<ThresholdLevel>,
    pub warning: ThresholdLevel,
    pub critical: ThresholdLevel,
}

impl ThresholdSet {
    /// Parse the JSON `value` of a threshold setting:
    /// `{label, enabled, showTemp, thresholds: {normal, warning, critical}}`.
    /// Limits may be numbers or numeric strings.
    pub fn from_value(key: &str, value: &Value) -> Result<Self, ThresholdError> {
        let value = json_document(value).unwrap_or_else(|| value.clone());
        let thresholds = value
            .get("thresholds")
            .and_then(json_document)
            .filter(Value::is_object)
            .ok_or_else(|| ThresholdError::MissingThresholds(key.to_string()))?;

        let warning = parse_level(key, &thresholds, "warning")?
            .ok_or(ThresholdError::MissingLevel { key: key.to_string(), level: "warning" })?;
        let critical = parse_level(key, &thresholds, "critical")?
            .ok_or(ThresholdError::MissingLevel { key: key.to_string(), level: "critical" })?;
        let normal = parse_level(key, &thresholds, "normal")?;

        Ok(Self {
            key: key.to_string(),
            label: value.get("label").and_then(Value::as_str).map(str::to_string),
            enabled: value.get("enabled").and_then(Value::as_bool).unwrap_or(true),
            show_temp: value.get("showTemp").and_then(Value::as_bool).unwrap_or(false),
            normal,
            warning,
            critical,
        })
    }

    pub fn from_setting(setting: &Setting) -> Result<Self, ThresholdError> {
        Self::from_value(&setting.key_name, &setting.value)
    }
}

fn parse_level(
    key: &str,
    thresholds: &Value,
    level: &'static str,
) -> Result<Option<ThresholdLevel>, ThresholdError> {
    let Some(entry) = thresholds.get(level).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let field = |field: &'static str| {
        entry
            .get(field)
            .and_then(number_from_json)
            .ok_or_else(|| ThresholdError::InvalidValue { key: key.to_string(), level, field })
    };
    Ok(Some(ThresholdLevel {
        vl_value: field("vlValue")?,
        rl_value: field("rlValue")?,
    }))
}

/// All threshold sets known to the portal, keyed by `key_name`
#[derive(Debug, Clone, Default)]
pub struct ThresholdCatalog {
    sets: BTreeMap<String, ThresholdSet>,
}

impl ThresholdCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from settings rows. Rows outside the threshold category are ignored,
    /// malformed rows are skipped with a warning.
    pub fn from_settings<'a>(settings: impl IntoIterator<Item = &'a Setting>) -> Self {
        let mut catalog = Self::new();
        for setting in settings {
            if setting.category != THRESHOLD_CATEGORY {
                continue;
            }
            match ThresholdSet::from_setting(setting) {
                Ok(set) => catalog.insert(set),
                Err(e) => tracing::warn!("Skipping threshold setting {}: {}", setting.id, e),
            }
        }
        catalog
    }

    /// Build from `{key_name: value}` pairs, as exported by the settings API
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a Value)>) -> Self {
        let mut catalog = Self::new();
        for (key, value) in pairs {
            match ThresholdSet::from_value(key, value) {
                Ok(set) => catalog.insert(set),
                Err(e) => tracing::warn!("Skipping threshold set {}: {}", key, e),
            }
        }
        catalog
    }

    pub fn insert(&mut self, set: ThresholdSet) {
        self.sets.insert(set.key.clone(), set);
    }

    pub fn get(&self, key: &str) -> Option<&ThresholdSet> {
        self.sets.get(key)
    }

    pub fn default_set(&self) -> Option<&ThresholdSet> {
        self.get(DEFAULT_THRESHOLD_KEY)
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThresholdSet> {
        self.sets.values()
    }

    /// Object-specific key when it names a known set, otherwise the global default
    pub fn resolve(&self, object_key: Option<&str>) -> Option<&ThresholdSet> {
        object_key
            .and_then(|key| self.get(key))
            .or_else(|| self.default_set())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn threshold_value(vl_warn: Value, rl_warn: Value) -> Value {
        json!({
            "label": "Standard",
            "enabled": true,
            "showTemp": true,
            "thresholds": {
                "normal": {"vlValue": 60, "rlValue": 40},
                "warning": {"vlValue": vl_warn, "rlValue": rl_warn},
                "critical": {"vlValue": 45, "rlValue": 55}
            }
        })
    }

    #[test]
    fn parses_numbers_and_numeric_strings() {
        let set = ThresholdSet::from_value("netzwaechter_0", &threshold_value(json!("52.5"), json!(48))).unwrap();
        assert_eq!(set.warning, ThresholdLevel { vl_value: 52.5, rl_value: 48.0 });
        assert_eq!(set.critical, ThresholdLevel { vl_value: 45.0, rl_value: 55.0 });
        assert_eq!(set.label.as_deref(), Some("Standard"));
        assert!(set.show_temp);
    }

    #[test]
    fn parses_stringified_documents() {
        let raw = Value::String(threshold_value(json!(50), json!(50)).to_string());
        let set = ThresholdSet::from_value("netzwaechter_1", &raw).unwrap();
        assert_eq!(set.warning.vl_value, 50.0);
    }

    #[test]
    fn rejects_missing_or_invalid_levels() {
        let missing = json!({"thresholds": {"warning": {"vlValue": 1, "rlValue": 2}}});
        assert_eq!(
            ThresholdSet::from_value("k", &missing),
            Err(ThresholdError::MissingLevel { key: "k".into(), level: "critical" })
        );

        let invalid = threshold_value(json!("warm"), json!(48));
        assert_eq!(
            ThresholdSet::from_value("k", &invalid),
            Err(ThresholdError::InvalidValue { key: "k".into(), level: "warning", field: "vlValue" })
        );

        assert!(matches!(
            ThresholdSet::from_value("k", &json!({"label": "x"})),
            Err(ThresholdError::MissingThresholds(_))
        ));
    }

    #[test]
    fn resolve_prefers_object_key_then_default() {
        let catalog = ThresholdCatalog::from_pairs([
            ("netzwaechter_0", &threshold_value(json!(50), json!(50))),
            ("netzwaechter_7", &threshold_value(json!(58), json!(42))),
        ]);
        assert_eq!(catalog.resolve(Some("netzwaechter_7")).map(|s| s.key.as_str()), Some("netzwaechter_7"));
        assert_eq!(catalog.resolve(Some("unknown")).map(|s| s.key.as_str()), Some("netzwaechter_0"));
        assert_eq!(catalog.resolve(None).map(|s| s.key.as_str()), Some("netzwaechter_0"));
    }

    #[test]
    fn resolve_without_default_only_finds_exact_keys() {
        let catalog = ThresholdCatalog::from_pairs([("netzwaechter_3", &threshold_value(json!(50), json!(50)))]);
        assert!(catalog.default_set().is_none());
        assert!(catalog.resolve(None).is_none());
        assert!(catalog.resolve(Some("netzwaechter_3")).is_some());
    }
}
