#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tracker_core::UsageRecord;
use tracker_db::{SqliteStore, UsagePoint};

pub struct TestStore {
    pub _dir: TempDir,
    pub store: SqliteStore,
    pub path: PathBuf,
}

pub fn setup_store() -> TestStore {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let store = SqliteStore::open(&path).expect("open store");
    TestStore {
        _dir: dir,
        store,
        path,
    }
}

pub fn at(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("timestamp")
        .with_timezone(&Utc)
}

pub fn record(agent: &str, model: &str, project: &str, input: f64, output: f64) -> UsageRecord {
    UsageRecord {
        agent_name: agent.to_string(),
        model: model.to_string(),
        project_name: project.to_string(),
        input_tokens: input,
        output_tokens: output,
        ..UsageRecord::default()
    }
}

pub fn point(record: &UsageRecord, time: &str) -> UsagePoint {
    UsagePoint::from_record(record, at(time))
}
