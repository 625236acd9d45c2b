use std::time::Instant;

use chrono::{DateTime, Utc};
use tracker_core::{Dimension, MetricsResponse};
use tracker_db::AggregationQuery;

use crate::aggregate::{
    TimelineMerger, breakdown_from_records, fill_timeline, summary_from_records,
};
use crate::config::MetricsParams;
use crate::error::Result;
use crate::services::SharedStore;
use crate::util::time::{parse_range, resolve_timeline_window, resolve_windows, timeline_period};

#[derive(Clone)]
pub struct MetricsService {
    store: SharedStore,
}

impl MetricsService {
    pub(super) fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn metrics(&self, params: &MetricsParams) -> Result<MetricsResponse> {
        self.metrics_at(params, Utc::now()).await
    }

    /// Runs the six aggregations for one request concurrently. The first
    /// failure fails the whole request.
    pub async fn metrics_at(
        &self,
        params: &MetricsParams,
        now: DateTime<Utc>,
    ) -> Result<MetricsResponse> {
        let started = Instant::now();
        let range = parse_range(params.range.range.as_deref().unwrap_or_default());
        let (current, previous) = resolve_windows(&range, now);
        let timeline_window = resolve_timeline_window(&params.range, current)?;
        let every = timeline_period(&range, timeline_window);
        let filters = params.filters();

        let summary_query = AggregationQuery::summary(current, &filters);
        let previous_query = AggregationQuery::summary(previous, &filters);
        let agents_query = AggregationQuery::breakdown(current, &filters, Dimension::Agent);
        let models_query = AggregationQuery::breakdown(current, &filters, Dimension::Model);
        let projects_query = AggregationQuery::breakdown(current, &filters, Dimension::Project);
        let timeline_query = AggregationQuery::timeline(timeline_window, &filters, every);

        let store = self.store.as_ref();
        let (summary, previous_summary, agents, models, projects, timeline) = tokio::try_join!(
            store.query(&summary_query),
            store.query(&previous_query),
            store.query(&agents_query),
            store.query(&models_query),
            store.query(&projects_query),
            store.query(&timeline_query),
        )
        .inspect_err(|err| {
            tracing::warn!(range = %range.label(), error = %err, "metrics query failed");
        })?;

        let summary = summary_from_records(&summary);
        let previous_summary = summary_from_records(&previous_summary);
        let mut merger = TimelineMerger::new(every);
        merger.extend(&timeline);
        let response = MetricsResponse {
            changes: summary.changes_from(&previous_summary),
            summary,
            previous_summary,
            agents: breakdown_from_records(&agents, Dimension::Agent),
            models: breakdown_from_records(&models, Dimension::Model),
            projects: breakdown_from_records(&projects, Dimension::Project),
            timeline: fill_timeline(merger.into_buckets(), timeline_window, every),
        };
        tracing::info!(
            range = %range.label(),
            every = %every.literal(),
            filtered = !filters.is_empty(),
            backend = self.store.backend_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "metrics served"
        );
        Ok(response)
    }
}
