// monitoring/dashboard.rs - status buckets for the Netzwächter overview

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::classify::{Classification, Classifier, TemperatureStatus};
use super::telemetry::ObjectTelemetry;
use super::thresholds::ThresholdCatalog;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStatus {
    pub id: Option<i32>,
    pub objectid: Option<i64>,
    pub name: String,
    pub city: Option<String>,
    #[serde(flatten)]
    pub classification: Classification,
}

impl ObjectStatus {
    pub fn evaluate(
        telemetry: &ObjectTelemetry,
        catalog: &ThresholdCatalog,
        classifier: &Classifier,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: telemetry.id,
            objectid: telemetry.objectid,
            name: telemetry.name.clone(),
            city: telemetry.city.clone(),
            classification: classifier.classify(telemetry, catalog, now),
        }
    }

    pub fn status(&self) -> TemperatureStatus {
        self.classification.status
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub critical: usize,
    pub warning: usize,
    pub normal: usize,
    pub offline: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardBuckets {
    pub critical: Vec<ObjectStatus>,
    pub warning: Vec<ObjectStatus>,
    pub normal: Vec<ObjectStatus>,
    pub offline: Vec<ObjectStatus>,
}

impl DashboardBuckets {
    pub fn build<'a>(
        objects: impl IntoIterator<Item = &'a ObjectTelemetry>,
        catalog: &ThresholdCatalog,
        classifier: &Classifier,
        now: DateTime<Utc>,
    ) -> Self {
        let mut buckets = Self::default();
        for telemetry in objects {
            buckets.push(ObjectStatus::evaluate(telemetry, catalog, classifier, now));
        }
        for bucket in [
            &mut buckets.critical,
            &mut buckets.warning,
            &mut buckets.normal,
            &mut buckets.offline,
        ] {
            bucket.sort_by(|a, b| a.name.cmp(&b.name));
        }
        buckets
    }

    pub fn push(&mut self, entry: ObjectStatus) {
        match entry.status() {
            TemperatureStatus::Critical => self.critical.push(entry),
            TemperatureStatus::Warning => self.warning.push(entry),
            TemperatureStatus::Normal => self.normal.push(entry),
            TemperatureStatus::Offline => self.offline.push(entry),
        }
    }

    pub fn counts(&self) -> BucketCounts {
        BucketCounts {
            critical: self.critical.len(),
            warning: self.warning.len(),
            normal: self.normal.len(),
            offline: self.offline.len(),
            total: self.critical.len() + self.warning.len() + self.normal.len() + self.offline.len(),
        }
    }

    /// All entries ordered by status priority, then name
    pub fn sorted(self) -> Vec<ObjectStatus> {
        let mut all = Vec::with_capacity(self.counts().total);
        all.extend(self.critical);
        all.extend(self.warning);
        all.extend(self.normal);
        all.extend(self.offline);
        all
    }
}

/// Sort a flat list the same way the dashboard does
pub fn sort_by_priority(entries: &mut [ObjectStatus]) {
    entries.sort_by(|a, b| {
        a.status()
            .priority()
            .cmp(&b.status().priority())
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{catalog_with, telemetry_at, threshold_value};
    use chrono::Duration;
    use serde_json::json;

    fn named(name: &str, mut telemetry: ObjectTelemetry) -> ObjectTelemetry {
        telemetry.name = name.to_string();
        telemetry
    }

    #[test]
    fn groups_and_counts_objects() {
        let now = Utc::now();
        let catalog = catalog_with(&[("netzwaechter_0", threshold_value(55.0, 45.0, 45.0, 55.0))]);
        let objects = vec![
            named("Zeta", telemetry_at(now, json!({"s": 70}), json!({"s": 30}))),
            named("Alpha", telemetry_at(now, json!({"s": 70}), json!({"s": 30}))),
            named("Beta", telemetry_at(now, json!({"s": 40}), json!({"s": 30}))),
            named("Gamma", telemetry_at(now, json!({"s": 50}), json!({"s": 30}))),
            named("Delta", telemetry_at(now - Duration::days(3), json!({"s": 70}), json!({"s": 30}))),
        ];

        let buckets = DashboardBuckets::build(&objects, &catalog, &Classifier::default(), now);
        assert_eq!(
            buckets.counts(),
            BucketCounts { critical: 1, warning: 1, normal: 2, offline: 1, total: 5 }
        );

        let order: Vec<String> = buckets.sorted().into_iter().map(|o| o.name).collect();
        assert_eq!(order, vec!["Beta", "Gamma", "Alpha", "Zeta", "Delta"]);
    }

    #[test]
    fn sort_by_priority_matches_bucket_order() {
        let now = Utc::now();
        let catalog = catalog_with(&[("netzwaechter_0", threshold_value(55.0, 45.0, 45.0, 55.0))]);
        let classifier = Classifier::default();
        let mut entries: Vec<ObjectStatus> = [
            named("b", telemetry_at(now - Duration::days(2), json!({}), json!({}))),
            named("a", telemetry_at(now, json!({"s": 70}), json!({"s": 60}))),
            named("c", telemetry_at(now, json!({"s": 70}), json!({"s": 30}))),
        ]
        .iter()
        .map(|t| ObjectStatus::evaluate(t, &catalog, &classifier, now))
        .collect();

        sort_by_priority(&mut entries);
        let statuses: Vec<_> = entries.iter().map(|e| e.status()).collect();
        assert_eq!(
            statuses,
            vec![TemperatureStatus::Critical, TemperatureStatus::Normal, TemperatureStatus::Offline]
        );
    }

    #[test]
    fn serializes_flattened_classification() {
        let now = Utc::now();
        let catalog = catalog_with(&[("netzwaechter_0", threshold_value(55.0, 45.0, 45.0, 55.0))]);
        let entry = ObjectStatus::evaluate(
            &named("Heizhaus", telemetry_at(now, json!({"s": 70}), json!({"s": 30}))),
            &catalog,
            &Classifier::default(),
            now,
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "normal");
        assert_eq!(value["thresholdKey"], "netzwaechter_0");
        assert_eq!(value["sensors"][0]["return"], 30.0);
    }
}
