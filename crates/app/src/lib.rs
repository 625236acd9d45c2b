pub mod aggregate;
pub mod app;
pub mod config;
pub mod error;
pub mod services;
pub mod util;

pub use app::{AppState, open_store};
pub use config::{
    ConfigSource, InfluxSettings, MetricsParams, RangeParams, StoreBackend, TrackerConfig,
};
pub use error::{ApiError, AppError, Result};
pub use services::{AppServices, IngestService, MetricsService, SharedStore};
pub use util::time::{
    MAX_TIMELINE_BUCKETS, RangeSpec, RangeUnit, parse_range, period_for_span, resolve_windows,
    timeline_period, window_period,
};
