// monitoring/telemetry.rs - flow/return temperature maps from object JSON columns

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::database::models::PortalObject;

/// Key carrying the measurement timestamp inside `fltemp` / `rttemp`
pub const UPDATE_TIME_KEY: &str = "updateTime";

/// Return the value as a JSON object/array, decoding it first when it was stored as a string.
pub fn json_document(value: &Value) -> Option<Value> {
    match value {
        Value::Object(_) | Value::Array(_) => Some(value.clone()),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(|v| v.is_object() || v.is_array()),
        _ => None,
    }
}

/// Numbers, or strings like "54.2" / "54,2"
pub fn number_from_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<f64>()
                .ok()
                .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
                .filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]` / `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC),
/// and epoch seconds or milliseconds.
pub fn parse_update_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(epoch_to_utc),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
            s.parse::<i64>().ok().and_then(epoch_to_utc)
        }
        _ => None,
    }
}

fn epoch_to_utc(raw: i64) -> Option<DateTime<Utc>> {
    // 10^11 seconds is far in the future, so anything larger is milliseconds
    if raw.abs() >= 100_000_000_000 {
        DateTime::<Utc>::from_timestamp_millis(raw)
    } else {
        DateTime::<Utc>::from_timestamp(raw, 0)
    }
}

/// Sensor readings of one side of the circuit (flow or return)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureMap {
    pub readings: BTreeMap<String, f64>,
    pub update_time: Option<DateTime<Utc>>,
}

impl TemperatureMap {
    pub fn from_json(value: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = value.and_then(json_document) else {
            return Self::default();
        };

        let mut readings = BTreeMap::new();
        let mut update_time = None;
        for (key, raw) in map.iter() {
            if key == UPDATE_TIME_KEY {
                update_time = parse_update_time(raw);
            } else if let Some(reading) = number_from_json(raw) {
                readings.insert(key.clone(), reading);
            }
        }
        Self { readings, update_time }
    }

    pub fn get(&self, sensor: &str) -> Option<f64> {
        self.readings.get(sensor).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty() && self.update_time.is_none()
    }
}

/// Everything the classifier needs to know about one object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectTelemetry {
    pub id: Option<i32>,
    pub objectid: Option<i64>,
    pub name: String,
    pub city: Option<String>,
    pub fltemp: TemperatureMap,
    pub rttemp: TemperatureMap,
    /// `objanlage.thresholds`, the object's own threshold key
    pub threshold_key: Option<String>,
}

impl ObjectTelemetry {
    pub fn from_object(object: &PortalObject) -> Self {
        Self {
            id: Some(object.id),
            objectid: Some(object.objectid),
            name: object.name.clone(),
            city: object.city.clone(),
            fltemp: TemperatureMap::from_json(object.fltemp.as_ref()),
            rttemp: TemperatureMap::from_json(object.rttemp.as_ref()),
            threshold_key: threshold_key(object.objanlage.as_ref()),
        }
    }

    /// Build from an exported object document (camelCase or snake_case keys)
    pub fn from_json(value: &Value) -> Self {
        let objectid = value
            .get("objectid")
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())));
        Self {
            id: value.get("id").and_then(Value::as_i64).and_then(|v| i32::try_from(v).ok()),
            objectid,
            name: value
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| objectid.map(|id| id.to_string()).unwrap_or_default()),
            city: value.get("city").and_then(Value::as_str).map(str::to_string),
            fltemp: TemperatureMap::from_json(value.get("fltemp")),
            rttemp: TemperatureMap::from_json(value.get("rttemp")),
            threshold_key: threshold_key(value.get("objanlage")),
        }
    }
}

fn threshold_key(objanlage: Option<&Value>) -> Option<String> {
    let doc = objanlage.and_then(json_document)?;
    match doc.get("thresholds")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn parses_update_time_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_update_time(&json!("2024-03-01T12:30:00Z")), Some(expected));
        assert_eq!(parse_update_time(&json!("2024-03-01T13:30:00+01:00")), Some(expected));
        assert_eq!(parse_update_time(&json!("2024-03-01 12:30:00")), Some(expected));
        assert_eq!(parse_update_time(&json!("2024-03-01T12:30:00.000")), Some(expected));
        assert_eq!(parse_update_time(&json!(expected.timestamp_millis())), Some(expected));
        assert_eq!(parse_update_time(&json!(expected.timestamp())), Some(expected));
        assert_eq!(parse_update_time(&json!(expected.timestamp_millis().to_string())), Some(expected));
    }

    #[test]
    fn rejects_garbage_update_times() {
        assert_eq!(parse_update_time(&json!("gestern")), None);
        assert_eq!(parse_update_time(&json!("")), None);
        assert_eq!(parse_update_time(&json!(null)), None);
        assert_eq!(parse_update_time(&json!({"t": 1})), None);
    }

    #[test]
    fn temperature_map_skips_non_numeric_readings() {
        let now = Utc::now();
        let value = json!({
            "updateTime": now.to_rfc3339(),
            "s1": 61.5,
            "s2": "48,25",
            "s3": "n/a",
            "s4": null
        });
        let map = TemperatureMap::from_json(Some(&value));
        assert_eq!(map.get("s1"), Some(61.5));
        assert_eq!(map.get("s2"), Some(48.25));
        assert_eq!(map.get("s3"), None);
        assert_eq!(map.readings.len(), 2);
        let parsed = map.update_time.unwrap();
        assert!((parsed - now).num_milliseconds().abs() < 1000);
    }

    #[test]
    fn temperature_map_accepts_stringified_json() {
        let raw = json!(r#"{"updateTime":"2024-01-01 00:00:00","a":"55"}"#);
        let map = TemperatureMap::from_json(Some(&raw));
        assert_eq!(map.get("a"), Some(55.0));
        assert!(map.update_time.is_some());
        assert!(TemperatureMap::from_json(Some(&json!("not json"))).is_empty());
        assert!(TemperatureMap::from_json(None).is_empty());
    }

    #[test]
    fn telemetry_from_export_document() {
        let doc = json!({
            "id": 4,
            "objectid": "207315014",
            "name": "Heizzentrale Nord",
            "objanlage": {"thresholds": "netzwaechter_2"},
            "fltemp": {"updateTime": (Utc::now() - Duration::hours(1)).to_rfc3339(), "k1": 70},
            "rttemp": {"k1": 40}
        });
        let telemetry = ObjectTelemetry::from_json(&doc);
        assert_eq!(telemetry.id, Some(4));
        assert_eq!(telemetry.objectid, Some(207315014));
        assert_eq!(telemetry.threshold_key.as_deref(), Some("netzwaechter_2"));
        assert_eq!(telemetry.rttemp.get("k1"), Some(40.0));
    }

    #[test]
    fn blank_threshold_key_is_ignored() {
        assert_eq!(threshold_key(Some(&json!({"thresholds": "  "}))), None);
        assert_eq!(threshold_key(Some(&json!({"other": 1}))), None);
        assert_eq!(threshold_key(None), None);
    }
}
