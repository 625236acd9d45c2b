use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracker_db::InfluxConnection;

use crate::error::{AppError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Influxdb,
    Sqlite,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "influxdb" | "influx" => Ok(StoreBackend::Influxdb),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(AppError::Config(format!("unknown store backend {:?}", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct InfluxSettings {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

impl Default for InfluxSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            token: "my-super-secret-auth-token".to_string(),
            org: "ttrack-org".to_string(),
            bucket: "token-usage".to_string(),
        }
    }
}

impl From<&InfluxSettings> for InfluxConnection {
    fn from(settings: &InfluxSettings) -> Self {
        InfluxConnection {
            url: settings.url.clone(),
            token: settings.token.clone(),
            org: settings.org.clone(),
            bucket: settings.bucket.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    pub store: StoreBackend,
    pub influxdb: InfluxSettings,
    pub sqlite_path: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::default(),
            influxdb: InfluxSettings::default(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialInflux {
    url: Option<String>,
    token: Option<String>,
    org: Option<String>,
    bucket: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    store: Option<StoreBackend>,
    #[serde(default)]
    influxdb: PartialInflux,
    sqlite_path: Option<PathBuf>,
}

/// Where a loaded config file came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    File(PathBuf),
}

impl TrackerConfig {
    /// Defaults, then the config file, then environment variables.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let mut config = TrackerConfig::default();
        let source = match path {
            Some(path) => {
                config.merge_file(path)?;
                ConfigSource::File(path.to_path_buf())
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    config.merge_file(&path)?;
                    ConfigSource::File(path)
                }
                _ => ConfigSource::Defaults,
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok((config, source))
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            AppError::Config(format!("read {}: {}", path.display(), err))
        })?;
        let file: ConfigFile = serde_json::from_str(&contents).map_err(|err| {
            AppError::Config(format!("parse {}: {}", path.display(), err))
        })?;
        if let Some(store) = file.store {
            self.store = store;
        }
        let influx = file.influxdb;
        if let Some(url) = influx.url {
            self.influxdb.url = url;
        }
        if let Some(token) = influx.token {
            self.influxdb.token = token;
        }
        if let Some(org) = influx.org {
            self.influxdb.org = org;
        }
        if let Some(bucket) = influx.bucket {
            self.influxdb.bucket = bucket;
        }
        if let Some(sqlite_path) = file.sqlite_path {
            self.sqlite_path = sqlite_path;
        }
        Ok(())
    }

    /// Overrides from `TTRACK_*` and `INFLUXDB_*`; empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(store) = get("TTRACK_STORE") {
            self.store = StoreBackend::parse(&store)?;
        }
        if let Some(url) = get("INFLUXDB_URL") {
            self.influxdb.url = url;
        }
        if let Some(token) = get("INFLUXDB_TOKEN") {
            self.influxdb.token = token;
        }
        if let Some(org) = get("INFLUXDB_ORG") {
            self.influxdb.org = org;
        }
        if let Some(bucket) = get("INFLUXDB_BUCKET") {
            self.influxdb.bucket = bucket;
        }
        if let Some(path) = get("TTRACK_SQLITE_PATH") {
            self.sqlite_path = PathBuf::from(path);
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("ttrack").join("config.json"))
}

pub fn default_sqlite_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ttrack")
        .join("ttrack.sqlite")
}
