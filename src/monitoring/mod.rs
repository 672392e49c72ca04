//! Temperature monitoring for heating circuits.
//!
//! Every object carries two telemetry maps, `fltemp` (flow / VL) and `rttemp`
//! (return / RL), keyed by sensor id with an `updateTime` stamp. An object is
//! classified against a threshold set from the `settings` table:
//!
//! 1. no threshold sets, or no `netzwaechter_0` default: offline
//! 2. the set named by `objanlage.thresholds` wins, else `netzwaechter_0`
//! 3. neither map has an `updateTime`: offline
//! 4. the newest `updateTime` is older than the staleness window (24h): offline
//! 5. per sensor, flow below the limit or return above the limit is flagged
//! 6. the object takes the worst sensor status
//!
//! The engine is pure: callers pass in `now`, so results are reproducible.

pub mod classify;
pub mod dashboard;
pub mod telemetry;
pub mod thresholds;

pub use classify::{
    Classification, Classifier, OfflineReason, SensorClassification, TemperatureStatus,
};
pub use dashboard::{sort_by_priority, BucketCounts, DashboardBuckets, ObjectStatus};
pub use telemetry::{ObjectTelemetry, TemperatureMap};
pub use thresholds::{
    ThresholdCatalog, ThresholdError, ThresholdLevel, ThresholdSet, DEFAULT_THRESHOLD_KEY,
    THRESHOLD_CATEGORY,
};
