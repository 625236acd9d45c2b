use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use ingest::{
    ErrorLog, EventPipeline, PipelineStats, SessionTracker, UsageSink, events_from_reader,
};

pub struct ReplayOptions {
    pub path: PathBuf,
    pub worktree: Option<String>,
    pub log_dir: Option<PathBuf>,
}

fn open(path: &Path) -> io::Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    Ok(Box::new(BufReader::new(File::open(path)?)))
}

/// Feeds recorded events through the extractor into `sink`.
///
/// Write failures do not stop the replay; they are counted and surface as
/// warnings at session checkpoints.
pub async fn run<S: UsageSink>(
    sink: S,
    options: ReplayOptions,
) -> Result<PipelineStats, Box<dyn std::error::Error>> {
    let events = events_from_reader(open(&options.path)?)?;
    let worktree = options.worktree.as_deref().unwrap_or("unknown");
    let mut pipeline = EventPipeline::new(SessionTracker::for_worktree(worktree), sink);
    if let Some(dir) = &options.log_dir {
        pipeline = pipeline.with_error_log(ErrorLog::in_dir(dir));
    }

    if !pipeline.startup_probe().await {
        tracing::warn!("sink unreachable, replay will record failures");
    }
    for event in &events {
        if let Some(notification) = pipeline.handle(event).await {
            tracing::warn!(title = %notification.title, "{}", notification.message);
        }
    }

    let stats = pipeline.stats().clone();
    tracing::info!(
        events = stats.events,
        sent = stats.records_sent,
        failed = stats.records_failed,
        "replay finished"
    );
    Ok(stats)
}
