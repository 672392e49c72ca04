use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::auth::session::SessionUser;
use crate::monitoring::{ObjectTelemetry, TemperatureMap, ThresholdCatalog};
use crate::types::Role;

/// Threshold setting value in the stored shape.
/// Arguments are the warning VL/RL and critical VL/RL limits.
pub fn threshold_value(warn_vl: f64, warn_rl: f64, crit_vl: f64, crit_rl: f64) -> Value {
    json!({
        "label": "Test",
        "enabled": true,
        "showTemp": false,
        "thresholds": {
            "normal": {"vlValue": warn_vl + 10.0, "rlValue": warn_rl - 10.0},
            "warning": {"vlValue": warn_vl, "rlValue": warn_rl},
            "critical": {"vlValue": crit_vl, "rlValue": crit_rl}
        }
    })
}

pub fn catalog_with(sets: &[(&str, Value)]) -> ThresholdCatalog {
    ThresholdCatalog::from_pairs(sets.iter().map(|(key, value)| (*key, value)))
}

/// Telemetry whose flow and return maps were both updated at `at`
pub fn telemetry_at(at: DateTime<Utc>, fltemp: Value, rttemp: Value) -> ObjectTelemetry {
    let stamp = |mut value: Value| {
        if let Value::Object(map) = &mut value {
            map.insert("updateTime".to_string(), json!(at.to_rfc3339()));
        }
        value
    };
    ObjectTelemetry {
        id: Some(1),
        objectid: Some(1000),
        name: "Testobjekt".to_string(),
        city: None,
        fltemp: TemperatureMap::from_json(Some(&stamp(fltemp))),
        rttemp: TemperatureMap::from_json(Some(&stamp(rttemp))),
        threshold_key: None,
    }
}

pub fn session_user(role: Role, mandant_id: Option<i32>, mandant_access: Vec<i32>) -> SessionUser {
    SessionUser {
        id: format!("{}-1", role),
        username: format!("{}-user", role),
        email: None,
        role,
        mandant_id,
        mandant_access,
        first_name: None,
        last_name: None,
        user_profile_id: None,
    }
}
