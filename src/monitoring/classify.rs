// monitoring/classify.rs - per-object temperature status

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::telemetry::ObjectTelemetry;
use super::thresholds::{ThresholdCatalog, ThresholdSet, DEFAULT_THRESHOLD_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureStatus {
    Critical,
    Warning,
    Normal,
    Offline,
}

impl TemperatureStatus {
    /// Dashboard sort order, most urgent first
    pub fn priority(&self) -> u8 {
        match self {
            TemperatureStatus::Critical => 0,
            TemperatureStatus::Warning => 1,
            TemperatureStatus::Normal => 2,
            TemperatureStatus::Offline => 3,
        }
    }

    fn severity(&self) -> u8 {
        match self {
            TemperatureStatus::Normal | TemperatureStatus::Offline => 0,
            TemperatureStatus::Warning => 1,
            TemperatureStatus::Critical => 2,
        }
    }

    /// The more severe of two sensor statuses
    pub fn worst(self, other: TemperatureStatus) -> TemperatureStatus {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureStatus::Critical => "critical",
            TemperatureStatus::Warning => "warning",
            TemperatureStatus::Normal => "normal",
            TemperatureStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for TemperatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an object could not be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineReason {
    NoThresholds,
    DefaultThresholdsMissing,
    NoTemperatureData,
    Stale,
}

impl OfflineReason {
    /// Operator-facing text, in the portal's language.
    /// `stale_after` is the window a `Stale` object exceeded.
    pub fn message(&self, stale_after: Duration) -> String {
        match self {
            OfflineReason::NoThresholds => "Keine Grenzwerte konfiguriert".to_string(),
            OfflineReason::DefaultThresholdsMissing => "Standard-Grenzwerte netzwaechter_0 fehlen".to_string(),
            OfflineReason::NoTemperatureData => "Keine Temperatur-Daten".to_string(),
            OfflineReason::Stale => format!("Daten älter als {}", window_label(stale_after)),
        }
    }
}

fn window_label(window: Duration) -> String {
    let minutes = window.num_minutes();
    if minutes >= 60 && minutes % 60 == 0 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}min", minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorClassification {
    pub sensor: String,
    pub flow: f64,
    #[serde(rename = "return")]
    pub return_temp: f64,
    pub flow_status: TemperatureStatus,
    pub return_status: TemperatureStatus,
    pub status: TemperatureStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub status: TemperatureStatus,
    pub offline_reason: Option<OfflineReason>,
    pub reason: Option<String>,
    pub threshold_key: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub sensors: Vec<SensorClassification>,
}

impl Classification {
    fn offline(
        reason: OfflineReason,
        stale_after: Duration,
        threshold_key: Option<String>,
        last_update: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            status: TemperatureStatus::Offline,
            offline_reason: Some(reason),
            reason: Some(reason.message(stale_after)),
            threshold_key,
            last_update,
            sensors: Vec::new(),
        }
    }
}

/// Evaluates telemetry against threshold sets.
/// Holds the staleness window; everything else comes in per call.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    stale_after: Duration,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

impl Classifier {
    pub fn new(stale_after: Duration) -> Self {
        Self { stale_after }
    }

    pub fn from_config() -> Self {
        let hours = crate::config::config().monitoring.stale_after_hours.max(1);
        Self::new(Duration::hours(hours))
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    pub fn classify(&self, telemetry: &ObjectTelemetry, catalog: &ThresholdCatalog, now: DateTime<Utc>) -> Classification {
        if catalog.is_empty() {
            return Classification::offline(OfflineReason::NoThresholds, self.stale_after, None, None);
        }
        if catalog.get(DEFAULT_THRESHOLD_KEY).is_none() {
            return Classification::offline(OfflineReason::DefaultThresholdsMissing, self.stale_after, None, None);
        }

        // default exists, so resolve always yields a set
        let Some(set) = catalog.resolve(telemetry.threshold_key.as_deref()) else {
            return Classification::offline(OfflineReason::DefaultThresholdsMissing, self.stale_after, None, None);
        };
        let threshold_key = Some(set.key.clone());

        let last_update = match (telemetry.fltemp.update_time, telemetry.rttemp.update_time) {
            (None, None) => {
                return Classification::offline(OfflineReason::NoTemperatureData, self.stale_after, threshold_key, None);
            }
            (Some(a), Some(b)) => a.max(b),
            (Some(a), None) | (None, Some(a)) => a,
        };

        if now - last_update > self.stale_after {
            return Classification::offline(OfflineReason::Stale, self.stale_after, threshold_key, Some(last_update));
        }

        let sensors = evaluate_sensors(telemetry, set);
        let status = sensors
            .iter()
            .fold(TemperatureStatus::Normal, |acc, s| acc.worst(s.status));

        Classification {
            status,
            offline_reason: None,
            reason: None,
            threshold_key,
            last_update: Some(last_update),
            sensors,
        }
    }
}

fn evaluate_sensors(telemetry: &ObjectTelemetry, set: &ThresholdSet) -> Vec<SensorClassification> {
    telemetry
        .fltemp
        .readings
        .iter()
        .filter_map(|(sensor, &flow)| {
            let return_temp = telemetry.rttemp.get(sensor)?;
            let flow_status = flow_status(flow, set);
            let return_status = return_status(return_temp, set);
            Some(SensorClassification {
                sensor: sensor.clone(),
                flow,
                return_temp,
                flow_status,
                return_status,
                status: flow_status.worst(return_status),
            })
        })
        .collect()
}

/// Flow temperature is unsafe when it drops below the limit
pub fn flow_status(flow: f64, set: &ThresholdSet) -> TemperatureStatus {
    if flow < set.critical.vl_value {
        TemperatureStatus::Critical
    } else if flow < set.warning.vl_value {
        TemperatureStatus::Warning
    } else {
        TemperatureStatus::Normal
    }
}

/// Return temperature is unsafe when it rises above the limit
pub fn return_status(return_temp: f64, set: &ThresholdSet) -> TemperatureStatus {
    if return_temp > set.critical.rl_value {
        TemperatureStatus::Critical
    } else if return_temp > set.warning.rl_value {
        TemperatureStatus::Warning
    } else {
        TemperatureStatus::Normal
    }
}
