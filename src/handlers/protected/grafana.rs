// handlers/protected/grafana.rs - Grafana panel configuration

use std::collections::BTreeMap;

use axum::extract::Query;
use serde::Serialize;

use crate::grafana::{GrafanaConfig, PanelRequest};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::SettingsService;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelUrlResponse {
    pub url: String,
    pub panel_id: String,
    pub time_range: String,
}

/// Stored config, or the built-in fallback when settings cannot be read
async fn load_config() -> GrafanaConfig {
    let loaded = match SettingsService::new().await {
        Ok(service) => service.grafana_config().await,
        Err(e) => Err(e),
    };
    loaded.unwrap_or_else(|e| {
        tracing::warn!("Using fallback Grafana config: {}", e);
        GrafanaConfig::default()
    })
}

/// `panelId`, `meterId`, `timeRange`, `dashboard`; `var-*` keys pass through
fn panel_request(mut params: BTreeMap<String, String>) -> PanelRequest {
    let panel_id = params.remove("panelId").unwrap_or_default();
    let meter_id = params.remove("meterId");
    let time_range = params.remove("timeRange");
    let dashboard = params.remove("dashboard");
    let extra = params.into_iter().filter(|(key, _)| key.starts_with("var-")).collect();
    PanelRequest {
        panel_id,
        meter_id,
        time_range,
        dashboard,
        extra,
    }
}

/// GET /api/grafana/config
pub async fn grafana_config_get(_user: AuthUser) -> ApiResult<GrafanaConfig> {
    Ok(ApiResponse::success(load_config().await))
}

/// GET /api/grafana/url?panelId=&meterId=&timeRange=
pub async fn grafana_url_get(_user: AuthUser, Query(params): Query<BTreeMap<String, String>>) -> ApiResult<PanelUrlResponse> {
    let config = load_config().await;
    let request = panel_request(params);
    let url = config.panel_url(&request)?;
    let time_range = crate::grafana::normalize_time_range(request.time_range.as_deref().unwrap_or(&config.default_time_range));
    Ok(ApiResponse::success(PanelUrlResponse {
        url,
        panel_id: request.panel_id,
        time_range,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn only_var_keys_pass_through() {
        let request = panel_request(params(&[
            ("panelId", "12"),
            ("meterId", "4711"),
            ("var-zone", "north"),
            ("orgId", "7"),
        ]));
        assert_eq!(request.panel_id, "12");
        assert_eq!(request.meter_id.as_deref(), Some("4711"));
        assert_eq!(request.extra, vec![("var-zone".to_string(), "north".to_string())]);
    }

    #[test]
    fn missing_panel_id_is_empty() {
        let request = panel_request(params(&[("timeRange", "30d")]));
        assert!(request.panel_id.is_empty());
        assert!(GrafanaConfig::default().panel_url(&request).is_err());
    }
}
