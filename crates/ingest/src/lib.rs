mod dedup;
mod error_log;
mod events;
mod health;
mod paths;
mod pipeline;
mod session;
mod sink;
mod tools;
mod types;

pub use dedup::{DEFAULT_CAPACITY, RecentIds};
pub use error_log::ErrorLog;
pub use events::{
    CacheTokens, CompletedState, LifecycleEvent, MessageInfo, MessageTime, MessageTokens, ToolPart,
    events_from_reader,
};
pub use health::{HealthState, Notification, WriteHealth};
pub use paths::{default_error_log_path, project_name_from_worktree};
pub use pipeline::{EventPipeline, PipelineStats};
pub use session::{EventOutcome, SessionTracker};
pub use sink::{TrackerClient, UsageSink};
pub use tools::{FileChange, FileDiff, ToolPayload, extract_file_changes};
pub use types::{IngestError, Result, SinkError};
