//! InfluxDB v2 backend.
//!
//! Writes go through the line-protocol endpoint and queries are rendered as
//! Flux and read back as annotated CSV.

pub mod csv_reader;
pub mod flux;
pub mod line_protocol;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header};
use serde::Deserialize;
use serde_json::json;

use crate::error::{Result, StoreError};
use crate::store::TimeSeriesStore;
use crate::types::{AggregationQuery, InfluxConnection, Record, UsagePoint};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

#[derive(Clone)]
pub struct InfluxStore {
    http_client: Client,
    base_url: String,
    token: String,
    org: String,
    bucket: String,
}

impl InfluxStore {
    pub fn new(connection: &InfluxConnection) -> Result<Self> {
        let http_client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = connection.url.trim_end_matches('/').to_string();
        Ok(Self {
            http_client,
            base_url,
            token: connection.token.clone(),
            org: connection.org.clone(),
            bucket: connection.bucket.clone(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(header::AUTHORIZATION, format!("Token {}", self.token))
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .ok()
            .and_then(|parsed| parsed.message)
            .unwrap_or(body);
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Runs raw Flux and returns the rows of every result table.
    pub async fn query_flux(&self, flux: &str) -> Result<Vec<Record>> {
        let url = format!("{}/api/v2/query", self.base_url);
        let body = json!({
            "query": flux,
            "type": "flux",
            "dialect": {
                "header": true,
                "annotations": [],
                "delimiter": ",",
            },
        });
        let response = self
            .authorized(self.http_client.post(&url))
            .query(&[("org", self.org.as_str())])
            .header(header::ACCEPT, "application/csv")
            .json(&body)
            .send()
            .await?;
        let text = Self::check(response).await?.text().await?;
        csv_reader::parse_records(&text)
    }
}

#[async_trait]
impl TimeSeriesStore for InfluxStore {
    async fn write_points(&self, points: &[UsagePoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let body = line_protocol::encode_batch(points)?;
        let url = format!("{}/api/v2/write", self.base_url);
        let response = self
            .authorized(self.http_client.post(&url))
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;
        Self::check(response).await?;
        tracing::debug!(points = points.len(), "influx write flushed");
        Ok(())
    }

    async fn query(&self, query: &AggregationQuery) -> Result<Vec<Record>> {
        let started = Instant::now();
        let flux = flux::render(&self.bucket, query);
        let records = self.query_flux(&flux).await?;
        tracing::debug!(
            shape = ?query.shape,
            rows = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "influx query complete"
        );
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.http_client.get(&url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "influxdb"
    }
}
