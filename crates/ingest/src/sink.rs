use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracker_core::UsageRecord;

use crate::types::SinkError;

/// Destination for extracted usage records.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn track(&self, record: &UsageRecord) -> Result<(), SinkError>;

    /// Checks that records would currently be accepted.
    async fn probe(&self) -> Result<(), SinkError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Posts records to a running tracker server.
#[derive(Clone)]
pub struct TrackerClient {
    http_client: Client,
    base_url: String,
}

impl TrackerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SinkError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            http_client,
            base_url,
        })
    }

    async fn rejected(response: reqwest::Response) -> SinkError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|parsed| parsed.error)
            .unwrap_or(body);
        SinkError::Rejected { status, message }
    }
}

#[async_trait]
impl UsageSink for TrackerClient {
    async fn track(&self, record: &UsageRecord) -> Result<(), SinkError> {
        let url = format!("{}/api/track", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&[record])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }

    async fn probe(&self) -> Result<(), SinkError> {
        let url = format!("{}/api/health", self.base_url);
        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }
}
