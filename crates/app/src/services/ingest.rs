use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ingest::{SinkError, UsageSink};
use tracker_core::UsageRecord;
use tracker_db::UsagePoint;

use crate::error::{AppError, Result};
use crate::services::SharedStore;

/// Validates usage records and writes them as points.
#[derive(Clone)]
pub struct IngestService {
    store: SharedStore,
}

impl IngestService {
    pub(super) fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Writes the batch stamped with the current time.
    pub async fn track(&self, records: &[UsageRecord]) -> Result<usize> {
        let now = Utc::now();
        let stamped: Vec<_> = records.iter().map(|record| (record, now)).collect();
        self.track_at(&stamped).await
    }

    /// Writes records with explicit timestamps, for backfill and seeding.
    ///
    /// Nothing is written unless every record is valid.
    pub async fn track_at(&self, records: &[(&UsageRecord, DateTime<Utc>)]) -> Result<usize> {
        let mut points = Vec::with_capacity(records.len());
        for (index, (record, time)) in records.iter().enumerate() {
            if let Some(field) = record.invalid_field() {
                return Err(AppError::InvalidInput(format!(
                    "record {}: {} must be a non-negative number",
                    index, field
                )));
            }
            points.push(UsagePoint::from_record(record, *time));
        }
        self.store.write_points(&points).await?;
        tracing::debug!(records = points.len(), "usage points written");
        Ok(points.len())
    }

    pub async fn ping(&self) -> Result<()> {
        Ok(self.store.ping().await?)
    }
}

#[async_trait]
impl UsageSink for IngestService {
    async fn track(&self, record: &UsageRecord) -> std::result::Result<(), SinkError> {
        IngestService::track(self, std::slice::from_ref(record))
            .await
            .map(|_| ())
            .map_err(|err| SinkError::Store(err.to_string()))
    }

    async fn probe(&self) -> std::result::Result<(), SinkError> {
        self.ping()
            .await
            .map_err(|err| SinkError::Store(err.to_string()))
    }
}
