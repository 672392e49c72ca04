// grafana/mod.rs - embeddable Grafana panel URLs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::database::models::Setting;

/// Settings key holding the portal-wide Grafana setup
pub const GRAFANA_SETTING_KEY: &str = "defaultGrafana";

pub const FALLBACK_BASE_URL: &str = "https://graf.heatcare.one";
pub const FALLBACK_DASHBOARD: &str = "d-solo/eelav0ybil2wwd/ws-heatcare";
pub const FALLBACK_TIME_RANGE: &str = "now-7d";

#[derive(Debug, Error, PartialEq)]
pub enum GrafanaError {
    #[error("invalid Grafana base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("panel id must not be empty")]
    MissingPanelId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrafanaConfig {
    pub base_url: String,
    pub default_dashboard: String,
    pub default_time_range: String,
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            base_url: FALLBACK_BASE_URL.to_string(),
            default_dashboard: FALLBACK_DASHBOARD.to_string(),
            default_time_range: FALLBACK_TIME_RANGE.to_string(),
        }
    }
}

/// Parameters for one embedded panel
#[derive(Debug, Clone, Default)]
pub struct PanelRequest {
    pub panel_id: String,
    pub meter_id: Option<String>,
    pub time_range: Option<String>,
    pub dashboard: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl GrafanaConfig {
    /// Read `value.setupGrafana` of the `defaultGrafana` setting.
    /// Missing or blank fields keep their fallback.
    pub fn from_setting_value(value: &Value) -> Self {
        let mut config = Self::default();
        let Some(setup) = value.get("setupGrafana") else {
            return config;
        };
        let field = |name: &str| {
            setup
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        if let Some(v) = field("baseUrl") {
            config.base_url = v;
        }
        if let Some(v) = field("defaultDashboard") {
            config.default_dashboard = v;
        }
        if let Some(v) = field("defaultTimeRange") {
            config.default_time_range = v;
        }
        config
    }

    pub fn from_settings<'a>(settings: impl IntoIterator<Item = &'a Setting>) -> Self {
        settings
            .into_iter()
            .find(|s| s.key_name == GRAFANA_SETTING_KEY)
            .map(|s| Self::from_setting_value(&s.value))
            .unwrap_or_default()
    }

    /// `{base}/{dashboard}?orgId=1&from=..&to=now&panelId=..&__feature=dashboardSceneSolo&kiosk=1[&var-id=..]`
    pub fn panel_url(&self, request: &PanelRequest) -> Result<String, GrafanaError> {
        let panel_id = request.panel_id.trim();
        if panel_id.is_empty() {
            return Err(GrafanaError::MissingPanelId);
        }

        let base = self.base_url.trim_end_matches('/');
        let dashboard = request
            .dashboard
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&self.default_dashboard)
            .trim_matches('/');
        let mut url = Url::parse(&format!("{}/{}", base, dashboard))
            .map_err(|_| GrafanaError::InvalidBaseUrl(self.base_url.clone()))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(GrafanaError::InvalidBaseUrl(self.base_url.clone()));
        }

        let range = request
            .time_range
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(&self.default_time_range);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("orgId", "1")
                .append_pair("from", &normalize_time_range(range))
                .append_pair("to", "now")
                .append_pair("panelId", panel_id)
                .append_pair("__feature", "dashboardSceneSolo")
                .append_pair("kiosk", "1");
            if let Some(meter) = request.meter_id.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
                query.append_pair("var-id", meter);
            }
            for (key, value) in &request.extra {
                query.append_pair(key, value);
            }
        }

        Ok(url.into())
    }
}

/// "7d" becomes "now-7d"; values already relative to now are kept
pub fn normalize_time_range(range: &str) -> String {
    let range = range.trim();
    if range.starts_with("now-") || range == "now" {
        range.to_string()
    } else {
        format!("now-{}", range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_default_panel_url() {
        let url = GrafanaConfig::default()
            .panel_url(&PanelRequest { panel_id: "3".into(), ..Default::default() })
            .unwrap();
        assert_eq!(
            url,
            "https://graf.heatcare.one/d-solo/eelav0ybil2wwd/ws-heatcare?orgId=1&from=now-7d&to=now&panelId=3&__feature=dashboardSceneSolo&kiosk=1"
        );
    }

    #[test]
    fn adds_meter_and_extra_params() {
        let request = PanelRequest {
            panel_id: "12".into(),
            meter_id: Some("mtr 42".into()),
            time_range: Some("30d".into()),
            dashboard: None,
            extra: vec![("theme".into(), "light".into())],
        };
        let url = GrafanaConfig::default().panel_url(&request).unwrap();
        assert!(url.contains("from=now-30d"));
        assert!(url.contains("var-id=mtr+42"));
        assert!(url.ends_with("&theme=light"));
    }

    #[test]
    fn config_from_setting_keeps_fallbacks() {
        let value = json!({"setupGrafana": {"baseUrl": "https://grafana.example.org/", "defaultTimeRange": ""}});
        let config = GrafanaConfig::from_setting_value(&value);
        assert_eq!(config.base_url, "https://grafana.example.org/");
        assert_eq!(config.default_dashboard, FALLBACK_DASHBOARD);
        assert_eq!(config.default_time_range, FALLBACK_TIME_RANGE);

        let url = config
            .panel_url(&PanelRequest { panel_id: "1".into(), dashboard: Some("/d-solo/abc/x/".into()), ..Default::default() })
            .unwrap();
        assert!(url.starts_with("https://grafana.example.org/d-solo/abc/x?orgId=1"));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            GrafanaConfig::default().panel_url(&PanelRequest::default()),
            Err(GrafanaError::MissingPanelId)
        );
        let broken = GrafanaConfig { base_url: "ftp://grafana".into(), ..Default::default() };
        assert!(matches!(
            broken.panel_url(&PanelRequest { panel_id: "1".into(), ..Default::default() }),
            Err(GrafanaError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn normalizes_time_ranges() {
        assert_eq!(normalize_time_range("now-24h"), "now-24h");
        assert_eq!(normalize_time_range("24h"), "now-24h");
        assert_eq!(normalize_time_range(" 1y "), "now-1y");
    }
}
