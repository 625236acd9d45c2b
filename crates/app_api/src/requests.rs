use serde::Deserialize;
use tracker_app::{MetricsParams, RangeParams};
use tracker_core::UsageRecord;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRequest {
    pub range: Option<String>,
    pub project: Option<String>,
    pub model: Option<String>,
    pub agent: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl From<MetricsRequest> for MetricsParams {
    fn from(req: MetricsRequest) -> Self {
        MetricsParams {
            range: RangeParams {
                range: req.range,
                start_date: req.start_date,
                end_date: req.end_date,
            },
            project: req.project,
            model: req.model,
            agent: req.agent,
        }
    }
}

/// Body of a track call: a batch of usage records.
pub type TrackRequest = Vec<UsageRecord>;
