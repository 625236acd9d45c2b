use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const MEASUREMENT: &str = "token_usage";

const UNKNOWN: &str = "unknown";

fn unknown_name() -> String {
    UNKNOWN.to_string()
}

/// One completed assistant turn as reported by the event extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    #[serde(default = "unknown_name")]
    pub project_name: String,
    #[serde(default = "unknown_name")]
    pub agent_name: String,
    #[serde(default = "unknown_name")]
    pub model: String,
    #[serde(default)]
    pub input_tokens: f64,
    #[serde(default)]
    pub output_tokens: f64,
    #[serde(default)]
    pub reasoning_tokens: f64,
    #[serde(default)]
    pub cache_read_tokens: f64,
    #[serde(default)]
    pub cache_write_tokens: f64,
    #[serde(default)]
    pub additions: f64,
    #[serde(default)]
    pub deletions: f64,
    #[serde(default)]
    pub files_changed: f64,
}

impl Default for UsageRecord {
    fn default() -> Self {
        Self {
            project_name: unknown_name(),
            agent_name: unknown_name(),
            model: unknown_name(),
            input_tokens: 0.0,
            output_tokens: 0.0,
            reasoning_tokens: 0.0,
            cache_read_tokens: 0.0,
            cache_write_tokens: 0.0,
            additions: 0.0,
            deletions: 0.0,
            files_changed: 0.0,
        }
    }
}

impl UsageRecord {
    pub fn total_tokens(&self) -> f64 {
        self.input_tokens
            + self.output_tokens
            + self.reasoning_tokens
            + self.cache_read_tokens
            + self.cache_write_tokens
    }

    /// Input, output and reasoning tokens; cache traffic is not billed.
    pub fn billable_tokens(&self) -> f64 {
        self.input_tokens + self.output_tokens + self.reasoning_tokens
    }

    pub fn value(&self, field: MetricField) -> f64 {
        match field {
            MetricField::TotalTokens => self.total_tokens(),
            MetricField::InputTokens => self.input_tokens,
            MetricField::OutputTokens => self.output_tokens,
            MetricField::ReasoningTokens => self.reasoning_tokens,
            MetricField::CacheReadTokens => self.cache_read_tokens,
            MetricField::CacheWriteTokens => self.cache_write_tokens,
            MetricField::BillableTokens => self.billable_tokens(),
            MetricField::Additions => self.additions,
            MetricField::Deletions => self.deletions,
            MetricField::FilesChanged => self.files_changed,
        }
    }

    /// Every stored field paired with its value, derived fields included.
    pub fn fields(&self) -> Vec<(MetricField, f64)> {
        MetricField::ALL
            .iter()
            .map(|field| (*field, self.value(*field)))
            .collect()
    }

    /// Returns the name of the first input field that is negative or not
    /// finite.
    pub fn invalid_field(&self) -> Option<&'static str> {
        MetricField::ALL
            .iter()
            .filter(|field| !field.is_derived())
            .find(|field| {
                let value = self.value(**field);
                !value.is_finite() || value < 0.0
            })
            .map(|field| field.as_str())
    }
}

/// Numeric fields persisted on every `token_usage` point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    TotalTokens,
    InputTokens,
    OutputTokens,
    ReasoningTokens,
    CacheReadTokens,
    CacheWriteTokens,
    BillableTokens,
    Additions,
    Deletions,
    FilesChanged,
}

impl MetricField {
    pub const ALL: [MetricField; 10] = [
        MetricField::TotalTokens,
        MetricField::InputTokens,
        MetricField::OutputTokens,
        MetricField::ReasoningTokens,
        MetricField::CacheReadTokens,
        MetricField::CacheWriteTokens,
        MetricField::BillableTokens,
        MetricField::Additions,
        MetricField::Deletions,
        MetricField::FilesChanged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricField::TotalTokens => "total_tokens",
            MetricField::InputTokens => "input_tokens",
            MetricField::OutputTokens => "output_tokens",
            MetricField::ReasoningTokens => "reasoning_tokens",
            MetricField::CacheReadTokens => "cache_read_tokens",
            MetricField::CacheWriteTokens => "cache_write_tokens",
            MetricField::BillableTokens => "billable_tokens",
            MetricField::Additions => "additions",
            MetricField::Deletions => "deletions",
            MetricField::FilesChanged => "files_changed",
        }
    }

    pub fn is_derived(self) -> bool {
        matches!(self, MetricField::TotalTokens | MetricField::BillableTokens)
    }

    /// Maps a stored field name back to a known field. Fields written by
    /// newer producers are not recognised and yield `None`.
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.as_str() == name)
    }
}

/// Tag dimensions a point can be grouped or filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Agent,
    Model,
    Project,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Agent, Dimension::Model, Dimension::Project];

    pub fn tag(self) -> &'static str {
        match self {
            Dimension::Agent => "agent",
            Dimension::Model => "model",
            Dimension::Project => "project",
        }
    }
}

/// Per-field sums over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    pub total: f64,
    pub input: f64,
    pub output: f64,
    pub reasoning: f64,
    pub cache_read: f64,
    pub cache_write: f64,
    pub billable: f64,
    pub additions: f64,
    pub deletions: f64,
    pub files_changed: f64,
}

impl TokenSummary {
    pub fn get(&self, field: MetricField) -> f64 {
        match field {
            MetricField::TotalTokens => self.total,
            MetricField::InputTokens => self.input,
            MetricField::OutputTokens => self.output,
            MetricField::ReasoningTokens => self.reasoning,
            MetricField::CacheReadTokens => self.cache_read,
            MetricField::CacheWriteTokens => self.cache_write,
            MetricField::BillableTokens => self.billable,
            MetricField::Additions => self.additions,
            MetricField::Deletions => self.deletions,
            MetricField::FilesChanged => self.files_changed,
        }
    }

    pub fn set(&mut self, field: MetricField, value: f64) {
        let slot = match field {
            MetricField::TotalTokens => &mut self.total,
            MetricField::InputTokens => &mut self.input,
            MetricField::OutputTokens => &mut self.output,
            MetricField::ReasoningTokens => &mut self.reasoning,
            MetricField::CacheReadTokens => &mut self.cache_read,
            MetricField::CacheWriteTokens => &mut self.cache_write,
            MetricField::BillableTokens => &mut self.billable,
            MetricField::Additions => &mut self.additions,
            MetricField::Deletions => &mut self.deletions,
            MetricField::FilesChanged => &mut self.files_changed,
        };
        *slot = value;
    }

    pub fn changes_from(&self, previous: &TokenSummary) -> SummaryChanges {
        let mut changes = SummaryChanges::default();
        for field in MetricField::ALL {
            changes.set(field, change_of(self.get(field), previous.get(field)));
        }
        changes
    }
}

/// Percentage change per field between two summaries. Same keys as
/// [`TokenSummary`].
pub type SummaryChanges = TokenSummary;

/// Percentage delta from `previous` to `current`.
///
/// A zero baseline reports 100 when there is any current value and 0 when
/// there is none. Results are not clamped.
pub fn change_of(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }
    ((current - previous) / previous) * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub name: String,
    pub value: f64,
}

/// One timeline bucket with a value per stored field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineRow {
    pub time: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl TimelineRow {
    pub fn new(time: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: MetricField) -> Option<f64> {
        self.values.get(field.as_str()).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub summary: TokenSummary,
    pub previous_summary: TokenSummary,
    pub changes: SummaryChanges,
    pub agents: Vec<Breakdown>,
    pub models: Vec<Breakdown>,
    pub projects: Vec<Breakdown>,
    pub timeline: Vec<TimelineRow>,
}
