mod tracker;

use serde::{Deserialize, Serialize};
use tracker_db::TagFilters;

pub use tracker::{
    ConfigSource, InfluxSettings, StoreBackend, TrackerConfig, default_config_path,
    default_sqlite_path,
};

/// Time parameters of a metrics request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeParams {
    pub range: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Everything a dashboard can ask of the metrics endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsParams {
    #[serde(flatten)]
    pub range: RangeParams,
    pub project: Option<String>,
    pub model: Option<String>,
    pub agent: Option<String>,
}

impl MetricsParams {
    /// Empty strings mean "no filter".
    pub fn filters(&self) -> TagFilters {
        fn present(value: &Option<String>) -> Option<String> {
            value.as_ref().filter(|value| !value.is_empty()).cloned()
        }
        TagFilters {
            agent: present(&self.agent),
            model: present(&self.model),
            project: present(&self.project),
        }
    }
}
