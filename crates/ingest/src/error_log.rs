use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::paths::default_error_log_path;

/// Append-only local log for failures that must not interrupt the agent.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log under `<dir>/.opencode/TTrack/error.log`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(default_error_log_path(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line; failures to write the log are dropped.
    pub fn append(&self, message: &str, error: Option<&dyn Display>) {
        if let Err(err) = self.try_append(message, error) {
            tracing::debug!(path = %self.path.display(), error = %err, "error log unavailable");
        }
    }

    fn try_append(&self, message: &str, error: Option<&dyn Display>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let details = error.map(|err| format!(" - {err}")).unwrap_or_default();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "[{timestamp}] {message}{details}")
    }
}
