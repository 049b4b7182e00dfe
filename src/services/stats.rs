//! Statistics service client
//!
//! The statistics service counts hits per URI. We record a hit for every
//! public event read and ask for unique hit counts to annotate events.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::StatsConfig;
use crate::utils::errors::{EventHubError, Result, StatsError, StatsResult};
use crate::utils::helpers::{datetime_format, format_timestamp};

/// Body of `POST /hit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointHit {
    pub app: String,
    pub uri: String,
    pub ip: String,
    #[serde(with = "datetime_format")]
    pub timestamp: NaiveDateTime,
}

/// One entry of the `GET /stats` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStats {
    pub app: String,
    pub uri: String,
    pub hits: i64,
}

#[async_trait]
pub trait StatsClient: Send + Sync {
    async fn record_hit(&self, hit: &EndpointHit) -> StatsResult<()>;

    async fn query_hits(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        uris: &[String],
        unique: bool,
    ) -> StatsResult<Vec<ViewStats>>;
}

#[derive(Debug, Clone)]
pub struct HttpStatsClient {
    client: Client,
    base_url: Url,
}

impl HttpStatsClient {
    pub fn new(config: &StatsConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.timeout())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| EventHubError::Config(format!("Invalid statistics base URL: {}", e)))?;
        // Endpoints are joined as relative paths, so the base must end in a directory
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("eventhub/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> StatsResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| StatsError::RequestFailed(format!("invalid endpoint {}: {}", path, e)))
    }
}

fn map_request_error(error: reqwest::Error) -> StatsError {
    if error.is_timeout() {
        StatsError::Timeout
    } else {
        StatsError::RequestFailed(error.to_string())
    }
}

#[async_trait]
impl StatsClient for HttpStatsClient {
    async fn record_hit(&self, hit: &EndpointHit) -> StatsResult<()> {
        let url = self.endpoint("hit")?;
        debug!(uri = %hit.uri, ip = %hit.ip, "Recording hit");

        let response = self
            .client
            .post(url)
            .json(hit)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(StatsError::RequestFailed(format!("HTTP {}", response.status())));
        }
        Ok(())
    }

    async fn query_hits(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        uris: &[String],
        unique: bool,
    ) -> StatsResult<Vec<ViewStats>> {
        let url = self.endpoint("stats")?;

        let mut query = vec![
            ("start", format_timestamp(start)),
            ("end", format_timestamp(end)),
            ("unique", unique.to_string()),
        ];
        query.extend(uris.iter().map(|uri| ("uris", uri.clone())));

        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StatsError::RequestFailed(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<Vec<ViewStats>>()
            .await
            .map_err(|e| StatsError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base: &str, path: &str) -> String {
        HttpStatsClient::with_timeout(base, Duration::from_secs(1))
            .unwrap()
            .endpoint(path)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        assert_eq!(endpoint("http://stats:9090", "hit"), "http://stats:9090/hit");
        assert_eq!(endpoint("http://stats:9090/stats-api", "hit"), "http://stats:9090/stats-api/hit");
        assert_eq!(endpoint("http://stats:9090/stats-api/", "stats"), "http://stats:9090/stats-api/stats");
    }
}
