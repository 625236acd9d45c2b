use std::io;

/// Errors raised while reading recorded events.
#[derive(Debug)]
pub enum IngestError {
    Io(io::Error),
    Json { line: usize, source: serde_json::Error },
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Json { line, source } => write!(f, "invalid event on line {}: {}", line, source),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<io::Error> for IngestError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Failure reported by a [`crate::UsageSink`].
#[derive(Debug)]
pub enum SinkError {
    Http(reqwest::Error),
    Rejected { status: u16, message: String },
    Store(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "tracker request failed: {}", err),
            Self::Rejected { status, message } => {
                write!(f, "tracker rejected record ({}): {}", status, message)
            }
            Self::Store(message) => write!(f, "store write failed: {}", message),
        }
    }
}

impl std::error::Error for SinkError {}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}
