use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracker_app::{AppError, AppState, MetricsParams, RangeParams, TrackerConfig};
use tracker_core::{MetricField, UsageRecord};
use tracker_db::{
    AggregationQuery, QueryShape, Record, SqliteStore, StoreError, TimeSeriesStore, UsagePoint,
};

fn at(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("timestamp")
        .with_timezone(&Utc)
}

fn record(agent: &str, model: &str, input: f64, output: f64) -> UsageRecord {
    UsageRecord {
        project_name: "ttrack".to_string(),
        agent_name: agent.to_string(),
        model: model.to_string(),
        input_tokens: input,
        output_tokens: output,
        ..UsageRecord::default()
    }
}

fn sqlite_state() -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open(dir.path().join("metrics.sqlite")).expect("store");
    let state = AppState::with_store(TrackerConfig::default(), Arc::new(store));
    (dir, state)
}

fn params(range: &str) -> MetricsParams {
    MetricsParams {
        range: RangeParams {
            range: Some(range.to_string()),
            ..RangeParams::default()
        },
        ..MetricsParams::default()
    }
}

#[tokio::test]
async fn three_record_scenario() {
    let (_dir, state) = sqlite_state();
    let now = at("2025-03-01T12:00:00Z");
    let a = record("A", "M1", 100.0, 50.0);
    let b = record("B", "M1", 200.0, 0.0);
    let c = record("A", "M2", 10.0, 10.0);
    state
        .services
        .ingest
        .track_at(&[
            (&a, now - Duration::minutes(10)),
            (&b, now - Duration::minutes(5)),
            (&c, now - Duration::hours(4)),
        ])
        .await
        .expect("track");

    let response = state
        .services
        .metrics
        .metrics_at(&params("3h"), now)
        .await
        .expect("metrics");

    assert_eq!(response.summary.total, 350.0);
    assert_eq!(response.summary.input, 300.0);
    assert_eq!(response.summary.billable, 350.0);
    assert_eq!(response.previous_summary.total, 20.0);
    assert!((response.changes.total - 1650.0).abs() < 1e-9);

    let agents: Vec<_> = response
        .agents
        .iter()
        .map(|entry| (entry.name.as_str(), entry.value))
        .collect();
    assert_eq!(agents, vec![("B", 200.0), ("A", 150.0)]);
    let models: Vec<_> = response
        .models
        .iter()
        .map(|entry| (entry.name.as_str(), entry.value))
        .collect();
    assert_eq!(models, vec![("M1", 350.0)]);
    assert_eq!(response.projects.len(), 1);

    assert_eq!(response.timeline.len(), 60);
    let times: Vec<_> = response.timeline.iter().map(|row| row.time.clone()).collect();
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted);
    let total: f64 = response
        .timeline
        .iter()
        .filter_map(|row| row.get(MetricField::TotalTokens))
        .sum();
    assert_eq!(total, 350.0);
    let busy: Vec<_> = response
        .timeline
        .iter()
        .filter(|row| row.get(MetricField::TotalTokens) != Some(0.0))
        .map(|row| row.time.as_str())
        .collect();
    assert_eq!(busy, vec!["2025-03-01T11:48:00.000Z", "2025-03-01T11:54:00.000Z"]);
}

#[tokio::test]
async fn filters_apply_to_every_query() {
    let (_dir, state) = sqlite_state();
    let now = at("2025-03-01T12:00:00Z");
    let a = record("A", "M1", 100.0, 0.0);
    let b = record("B", "M1", 200.0, 0.0);
    let old = record("A", "M1", 40.0, 0.0);
    state
        .services
        .ingest
        .track_at(&[
            (&a, now - Duration::minutes(10)),
            (&b, now - Duration::minutes(10)),
            (&old, now - Duration::hours(5)),
        ])
        .await
        .expect("track");

    let mut filtered = params("3h");
    filtered.agent = Some("A".to_string());
    filtered.project = Some(String::new());
    let response = state
        .services
        .metrics
        .metrics_at(&filtered, now)
        .await
        .expect("metrics");
    assert_eq!(response.summary.total, 100.0);
    assert_eq!(response.previous_summary.total, 40.0);
    assert_eq!(response.agents.len(), 1);
    assert_eq!(response.models[0].value, 100.0);
}

#[tokio::test]
async fn empty_store_reports_zeroes() {
    let (_dir, state) = sqlite_state();
    let response = state
        .services
        .metrics
        .metrics_at(&params("1h"), at("2025-03-01T12:00:00Z"))
        .await
        .expect("metrics");
    assert_eq!(response.summary.total, 0.0);
    assert_eq!(response.changes.total, 0.0);
    assert!(response.agents.is_empty());
    assert_eq!(response.timeline.len(), 60);
    assert!(
        response
            .timeline
            .iter()
            .all(|row| row.values.values().all(|value| *value == 0.0))
    );
}

#[tokio::test]
async fn invalid_records_are_rejected_before_writing() {
    let (_dir, state) = sqlite_state();
    let good = record("A", "M1", 1.0, 0.0);
    let mut bad = record("A", "M1", 1.0, 0.0);
    bad.cache_write_tokens = -3.0;
    let err = state
        .services
        .ingest
        .track(&[good, bad])
        .await
        .expect_err("invalid");
    assert!(matches!(err, AppError::InvalidInput(ref message) if message.contains("cache_write_tokens")));

    let response = state
        .services
        .metrics
        .metrics(&params("1h"))
        .await
        .expect("metrics");
    assert_eq!(response.summary.total, 0.0);
}

#[tokio::test]
async fn invalid_timeline_dates_fail_before_querying() {
    let store = Arc::new(FailingStore::default());
    let state = AppState::with_store(TrackerConfig::default(), store.clone());
    let mut bad = params("3h");
    bad.range.start_date = Some("not-a-date".to_string());
    let err = state.services.metrics.metrics(&bad).await.expect_err("bad date");
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

/// Fails the timeline query and answers the rest with nothing.
#[derive(Default)]
struct FailingStore {
    calls: AtomicUsize,
}

#[async_trait]
impl TimeSeriesStore for FailingStore {
    async fn write_points(&self, _points: &[UsagePoint]) -> tracker_db::Result<()> {
        Err(StoreError::Api {
            status: 503,
            message: "down".to_string(),
        })
    }

    async fn query(&self, query: &AggregationQuery) -> tracker_db::Result<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match query.shape {
            QueryShape::Timeline { .. } => Err(StoreError::Api {
                status: 500,
                message: "timeline failed".to_string(),
            }),
            _ => Ok(Vec::new()),
        }
    }

    async fn ping(&self) -> tracker_db::Result<()> {
        Err(StoreError::InvalidResponse("unreachable".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn one_failed_query_fails_the_request() {
    let state = AppState::with_store(TrackerConfig::default(), Arc::new(FailingStore::default()));
    let err = state
        .services
        .metrics
        .metrics(&params("24h"))
        .await
        .expect_err("fan-out failure");
    assert!(matches!(err, AppError::Store(StoreError::Api { status: 500, .. })));

    let write = state
        .services
        .ingest
        .track(&[record("A", "M1", 1.0, 0.0)])
        .await
        .expect_err("write failure");
    assert!(matches!(write, AppError::Store(_)));
    assert!(state.health().await.is_err());
}

#[tokio::test]
async fn example_scenario_sums_every_field() {
    let (_dir, state) = sqlite_state();
    let now = at("2025-03-01T12:00:00Z");
    let turn = |input: f64, output: f64| UsageRecord {
        project_name: "app".to_string(),
        agent_name: "coder".to_string(),
        model: "openai/gpt-4o".to_string(),
        input_tokens: input,
        output_tokens: output,
        ..UsageRecord::default()
    };
    let records = [turn(100.0, 50.0), turn(200.0, 100.0), turn(50.0, 25.0)];
    let stamped: Vec<_> = records
        .iter()
        .enumerate()
        .map(|(i, record)| (record, now - Duration::minutes(5 * (i as i64 + 1))))
        .collect();
    state.services.ingest.track_at(&stamped).await.expect("track");

    let response = state
        .services
        .metrics
        .metrics_at(&params("1h"), now)
        .await
        .expect("metrics");
    let summary = response.summary;
    assert_eq!(summary.input, 350.0);
    assert_eq!(summary.output, 175.0);
    let all_fields = summary.input
        + summary.output
        + summary.reasoning
        + summary.cache_read
        + summary.cache_write;
    assert_eq!(summary.total, all_fields);
    assert_eq!(summary.total, 525.0);
    assert_eq!(response.agents[0].name, "coder");
    assert_eq!(response.projects[0].name, "app");
    assert_eq!(response.projects[0].value, 525.0);
}

#[tokio::test]
async fn project_and_model_filters_are_conjunctive() {
    let (_dir, state) = sqlite_state();
    let now = at("2025-03-01T12:00:00Z");
    let usage = |project: &str, model: &str, input: f64| UsageRecord {
        project_name: project.to_string(),
        agent_name: "coder".to_string(),
        model: model.to_string(),
        input_tokens: input,
        ..UsageRecord::default()
    };
    let both = usage("web", "M1", 1.0);
    let project_only = usage("web", "M2", 10.0);
    let model_only = usage("api", "M1", 100.0);
    let neither = usage("api", "M2", 1000.0);
    let previous_both = usage("web", "M1", 4.0);
    let previous_neither = usage("api", "M2", 4000.0);
    let current = now - Duration::minutes(30);
    let earlier = now - Duration::minutes(90);
    state
        .services
        .ingest
        .track_at(&[
            (&both, current),
            (&project_only, current),
            (&model_only, current),
            (&neither, current),
            (&previous_both, earlier),
            (&previous_neither, earlier),
        ])
        .await
        .expect("track");

    let mut filtered = params("1h");
    filtered.project = Some("web".to_string());
    filtered.model = Some("M1".to_string());
    let response = state
        .services
        .metrics
        .metrics_at(&filtered, now)
        .await
        .expect("metrics");

    assert_eq!(response.summary.total, 1.0);
    assert_eq!(response.previous_summary.total, 4.0);
    assert!((response.changes.total - -75.0).abs() < 1e-9);
    let names = |entries: &[tracker_core::Breakdown]| -> Vec<(String, f64)> {
        entries
            .iter()
            .map(|entry| (entry.name.clone(), entry.value))
            .collect()
    };
    assert_eq!(names(&response.projects), vec![("web".to_string(), 1.0)]);
    assert_eq!(names(&response.models), vec![("M1".to_string(), 1.0)]);
    assert_eq!(names(&response.agents), vec![("coder".to_string(), 1.0)]);
    let timeline_total: f64 = response
        .timeline
        .iter()
        .filter_map(|row| row.get(MetricField::TotalTokens))
        .sum();
    assert_eq!(timeline_total, 1.0);
}

#[tokio::test]
async fn explicit_start_date_keeps_every_bucket() {
    let (_dir, state) = sqlite_state();
    let now = at("2025-03-01T12:00:00Z");
    let old = record("A", "M1", 30.0, 0.0);
    state
        .services
        .ingest
        .track_at(&[(&old, now - Duration::days(10))])
        .await
        .expect("track");

    let mut request = params("3h");
    request.range.start_date = Some("2025-02-01T00:00:00Z".to_string());
    let response = state
        .services
        .metrics
        .metrics_at(&request, now)
        .await
        .expect("metrics");

    // 28.5 days in 4h buckets.
    assert_eq!(response.timeline.len(), 171);
    let empty = response
        .timeline
        .iter()
        .filter(|row| row.get(MetricField::TotalTokens) == Some(0.0))
        .count();
    assert_eq!(empty, 170);
    assert!(
        response
            .timeline
            .iter()
            .all(|row| row.values.len() == MetricField::ALL.len())
    );
    assert_eq!(
        response.timeline.first().map(|row| row.time.as_str()),
        Some("2025-02-01T00:00:00.000Z")
    );
    assert_eq!(response.summary.total, 0.0);
}
