use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracker_app::{IngestService, Result};
use tracker_core::UsageRecord;

const AGENTS: [&str; 4] = [
    "research-agent",
    "coding-agent",
    "writer-agent",
    "planner-agent",
];
const MODELS: [&str; 4] = [
    "openai/gpt-4-turbo",
    "anthropic/claude-3-opus",
    "meta/llama-3-70b",
    "google/gemini-1.5-pro",
];
const PROJECTS: [&str; 3] = ["web", "api", "docs"];

/// Random records back-dated uniformly over the last `hours`.
pub fn generate<R: Rng>(
    rng: &mut R,
    count: usize,
    hours: u32,
    now: DateTime<Utc>,
) -> Vec<(UsageRecord, DateTime<Utc>)> {
    let span_ms = Duration::hours(i64::from(hours.max(1))).num_milliseconds();
    (0..count)
        .map(|_| {
            let record = UsageRecord {
                project_name: PROJECTS[rng.gen_range(0..PROJECTS.len())].to_string(),
                agent_name: AGENTS[rng.gen_range(0..AGENTS.len())].to_string(),
                model: MODELS[rng.gen_range(0..MODELS.len())].to_string(),
                input_tokens: f64::from(rng.gen_range(100..2100u32)),
                output_tokens: f64::from(rng.gen_range(50..1050u32)),
                ..UsageRecord::default()
            };
            let offset = Duration::milliseconds(rng.gen_range(0..span_ms));
            (record, now - offset)
        })
        .collect()
}

pub async fn run(ingest: &IngestService, count: usize, hours: u32) -> Result<usize> {
    let records = generate(&mut rand::thread_rng(), count, hours, Utc::now());
    let stamped: Vec<_> = records.iter().map(|(record, time)| (record, *time)).collect();
    let written = ingest.track_at(&stamped).await?;
    tracing::info!(records = written, hours, "seeded usage records");
    Ok(written)
}
