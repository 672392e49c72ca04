use std::path::Path;

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::cli::utils::{read_json_file, unwrap_envelope};
use crate::cli::OutputFormat;
use crate::monitoring::{Classifier, DashboardBuckets, ObjectTelemetry, ThresholdCatalog};

/// Accepts a bare array, an API envelope around one, or `{objects: [...]}`
fn object_documents(value: Value) -> anyhow::Result<Vec<Value>> {
    match unwrap_envelope(value) {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("objects") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(anyhow::anyhow!("objects file must hold a JSON array")),
        },
        _ => Err(anyhow::anyhow!("objects file must hold a JSON array")),
    }
}

/// Settings rows (`[{keyName, value}]`, a settings export) or a plain `{key: value}` map
fn threshold_catalog(value: Value) -> ThresholdCatalog {
    let value = unwrap_envelope(value);
    let rows = match &value {
        Value::Array(rows) => Some(rows.as_slice()),
        Value::Object(map) => map.get("settings").and_then(Value::as_array).map(Vec::as_slice),
        _ => None,
    };

    match rows {
        Some(rows) => ThresholdCatalog::from_pairs(rows.iter().filter_map(|row| {
            let key = row.get("keyName").or_else(|| row.get("key_name"))?.as_str()?;
            Some((key, row.get("value")?))
        })),
        None => match &value {
            Value::Object(map) => ThresholdCatalog::from_pairs(map.iter().map(|(k, v)| (k.as_str(), v))),
            _ => ThresholdCatalog::new(),
        },
    }
}

pub fn handle(objects: &Path, thresholds: &Path, stale_hours: Option<i64>, output_format: OutputFormat) -> anyhow::Result<()> {
    let documents = object_documents(read_json_file(objects)?)?;
    let catalog = threshold_catalog(read_json_file(thresholds)?);
    if catalog.is_empty() {
        tracing::warn!("No usable threshold sets in {}; every object will be offline", thresholds.display());
    }

    let classifier = match stale_hours {
        Some(hours) => Classifier::new(Duration::hours(hours.max(1))),
        None => Classifier::from_config(),
    };
    let telemetry: Vec<ObjectTelemetry> = documents.iter().map(ObjectTelemetry::from_json).collect();
    let buckets = DashboardBuckets::build(&telemetry, &catalog, &classifier, Utc::now());
    let counts = buckets.counts();

    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "counts": counts, "objects": buckets.sorted() }))?
            );
        }
        OutputFormat::Text => {
            for entry in buckets.sorted() {
                let objectid = entry.objectid.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
                let reason = entry.classification.reason.as_deref().unwrap_or("");
                println!("{:<9} {:<10} {} {}", entry.status().as_str(), objectid, entry.name, reason);
            }
            println!(
                "critical={} warning={} normal={} offline={} total={}",
                counts.critical, counts.warning, counts.normal, counts.offline, counts.total
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_settings_export_rows() {
        let export = json!({
            "success": true,
            "data": {
                "settings": [{
                    "keyName": "netzwaechter_0",
                    "value": {"thresholds": {"warning": {"vlValue": 60, "rlValue": 45}, "critical": {"vlValue": 55, "rlValue": 50}}}
                }],
                "exportedCount": 1
            }
        });
        let catalog = threshold_catalog(export);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.default_set().is_some());
    }

    #[test]
    fn objects_must_be_an_array() {
        assert!(object_documents(json!({"name": "x"})).is_err());
        assert_eq!(object_documents(json!({"objects": [{"objectid": 1}]})).unwrap().len(), 1);
    }
}
