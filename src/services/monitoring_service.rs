use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::ServiceResult;
use super::object_service::ObjectService;
use super::settings_service::SettingsService;
use crate::monitoring::{
    sort_by_priority, BucketCounts, Classifier, DashboardBuckets, ObjectStatus, ObjectTelemetry,
};
use crate::types::MandantScope;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub counts: BucketCounts,
    #[serde(flatten)]
    pub buckets: DashboardBuckets,
    pub generated_at: DateTime<Utc>,
}

/// Loads objects and threshold sets and runs the classifier over them
pub struct MonitoringService {
    objects: ObjectService,
    settings: SettingsService,
    classifier: Classifier,
}

impl MonitoringService {
    pub async fn new() -> ServiceResult<Self> {
        Ok(Self {
            objects: ObjectService::new().await?,
            settings: SettingsService::new().await?,
            classifier: Classifier::from_config(),
        })
    }

    async fn telemetry(&self, scope: &MandantScope) -> ServiceResult<Vec<ObjectTelemetry>> {
        let objects = self.objects.visible(scope).await?;
        Ok(objects.iter().map(ObjectTelemetry::from_object).collect())
    }

    /// Every visible object, worst first
    pub async fn analysis(&self, scope: &MandantScope, now: DateTime<Utc>) -> ServiceResult<Vec<ObjectStatus>> {
        let catalog = self.settings.threshold_catalog().await?;
        let mut entries: Vec<ObjectStatus> = self
            .telemetry(scope)
            .await?
            .iter()
            .map(|t| ObjectStatus::evaluate(t, &catalog, &self.classifier, now))
            .collect();
        sort_by_priority(&mut entries);
        Ok(entries)
    }

    pub async fn analysis_for(&self, objectid: i64, scope: &MandantScope, now: DateTime<Utc>) -> ServiceResult<ObjectStatus> {
        let object = self.objects.by_objectid(objectid, scope).await?;
        let catalog = self.settings.threshold_catalog().await?;
        Ok(ObjectStatus::evaluate(
            &ObjectTelemetry::from_object(&object),
            &catalog,
            &self.classifier,
            now,
        ))
    }

    pub async fn dashboard(&self, scope: &MandantScope, now: DateTime<Utc>) -> ServiceResult<DashboardView> {
        let catalog = self.settings.threshold_catalog().await?;
        let telemetry = self.telemetry(scope).await?;
        let buckets = DashboardBuckets::build(&telemetry, &catalog, &self.classifier, now);
        Ok(DashboardView {
            counts: buckets.counts(),
            buckets,
            generated_at: now,
        })
    }
}
