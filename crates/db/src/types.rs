use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use tracker_core::{Dimension, MetricField, UsageRecord};

/// Half-open time window `[start, stop)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
}

impl QueryWindow {
    pub fn new(start: DateTime<Utc>, stop: DateTime<Utc>) -> Self {
        Self { start, stop }
    }

    /// Window of `duration` ending at `stop`.
    pub fn ending_at(stop: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start: stop - duration,
            stop,
        }
    }

    pub fn duration(&self) -> Duration {
        self.stop - self.start
    }

    /// Window of equal length that ends where this one starts.
    pub fn preceding(&self) -> Self {
        Self::ending_at(self.start, self.duration())
    }
}

/// Width of a timeline bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPeriod {
    seconds: i64,
}

impl WindowPeriod {
    pub const fn from_secs(seconds: i64) -> Self {
        Self { seconds }
    }

    pub const fn minutes(minutes: i64) -> Self {
        Self::from_secs(minutes * 60)
    }

    pub const fn hours(hours: i64) -> Self {
        Self::from_secs(hours * 3600)
    }

    pub const fn days(days: i64) -> Self {
        Self::from_secs(days * 86_400)
    }

    pub fn seconds(self) -> i64 {
        self.seconds.max(1)
    }

    pub fn duration(self) -> Duration {
        Duration::seconds(self.seconds())
    }

    /// Duration literal in the largest unit that divides the width evenly.
    pub fn literal(self) -> String {
        let seconds = self.seconds();
        if seconds % 86_400 == 0 {
            format!("{}d", seconds / 86_400)
        } else if seconds % 3600 == 0 {
            format!("{}h", seconds / 3600)
        } else if seconds % 60 == 0 {
            format!("{}m", seconds / 60)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Start of the epoch-aligned bucket containing `time`.
    pub fn align(self, time: DateTime<Utc>) -> DateTime<Utc> {
        let width_ms = self.seconds() * 1000;
        let aligned = time.timestamp_millis().div_euclid(width_ms) * width_ms;
        Utc.timestamp_millis_opt(aligned).single().unwrap_or(time)
    }
}

/// Exact-match tag predicates, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilters {
    pub agent: Option<String>,
    pub model: Option<String>,
    pub project: Option<String>,
}

impl TagFilters {
    pub fn is_empty(&self) -> bool {
        self.agent.is_none() && self.model.is_none() && self.project.is_none()
    }

    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Agent => self.agent.as_deref(),
            Dimension::Model => self.model.as_deref(),
            Dimension::Project => self.project.as_deref(),
        }
    }

    /// Present predicates in a fixed order.
    pub fn predicates(&self) -> Vec<(Dimension, &str)> {
        Dimension::ALL
            .iter()
            .filter_map(|dimension| self.get(*dimension).map(|value| (*dimension, value)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    /// One sum per field.
    Summary,
    /// `total_tokens` summed per tag value, largest first.
    Breakdown(Dimension),
    /// One sum per field per bucket.
    Timeline { every: WindowPeriod },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationQuery {
    pub window: QueryWindow,
    pub filters: TagFilters,
    pub shape: QueryShape,
}

impl AggregationQuery {
    pub fn summary(window: QueryWindow, filters: &TagFilters) -> Self {
        Self {
            window,
            filters: filters.clone(),
            shape: QueryShape::Summary,
        }
    }

    pub fn breakdown(window: QueryWindow, filters: &TagFilters, dimension: Dimension) -> Self {
        Self {
            window,
            filters: filters.clone(),
            shape: QueryShape::Breakdown(dimension),
        }
    }

    pub fn timeline(window: QueryWindow, filters: &TagFilters, every: WindowPeriod) -> Self {
        Self {
            window,
            filters: filters.clone(),
            shape: QueryShape::Timeline { every },
        }
    }

    /// Fields the query reads.
    pub fn fields(&self) -> &'static [MetricField] {
        match self.shape {
            QueryShape::Breakdown(_) => &[MetricField::TotalTokens],
            QueryShape::Summary | QueryShape::Timeline { .. } => &MetricField::ALL,
        }
    }
}

/// One row of an aggregation result in long format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub time: Option<DateTime<Utc>>,
    pub field: Option<String>,
    pub value: Option<f64>,
    pub agent: Option<String>,
    pub model: Option<String>,
    pub project: Option<String>,
}

impl Record {
    pub fn tag(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Agent => self.agent.as_deref(),
            Dimension::Model => self.model.as_deref(),
            Dimension::Project => self.project.as_deref(),
        }
    }

    pub fn set_tag(&mut self, dimension: Dimension, value: String) {
        match dimension {
            Dimension::Agent => self.agent = Some(value),
            Dimension::Model => self.model = Some(value),
            Dimension::Project => self.project = Some(value),
        }
    }

    pub fn metric_field(&self) -> Option<MetricField> {
        self.field.as_deref().and_then(MetricField::from_field_name)
    }
}

/// A `token_usage` point ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct UsagePoint {
    pub time: DateTime<Utc>,
    pub agent: String,
    pub model: String,
    pub project: String,
    pub fields: Vec<(MetricField, f64)>,
}

impl UsagePoint {
    pub fn from_record(record: &UsageRecord, time: DateTime<Utc>) -> Self {
        Self {
            time,
            agent: record.agent_name.clone(),
            model: record.model.clone(),
            project: record.project_name.clone(),
            fields: record.fields(),
        }
    }

    pub fn tag(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Agent => &self.agent,
            Dimension::Model => &self.model,
            Dimension::Project => &self.project,
        }
    }
}

/// Connection settings for an InfluxDB v2 server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConnection {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
