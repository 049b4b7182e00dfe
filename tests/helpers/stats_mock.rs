//! Statistics service doubles
//!
//! `FakeStatsClient` answers in-process and remembers what it was asked.
//! `StatsMockServer` is a wiremock server speaking the statistics HTTP API,
//! used to exercise `HttpStatsClient` end to end.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use eventhub::services::{EndpointHit, HttpStatsClient, StatsClient, ViewStats};
use eventhub::utils::errors::{StatsError, StatsResult};

/// In-process statistics client with scripted hit counts
#[derive(Debug, Default)]
pub struct FakeStatsClient {
    hits: Mutex<HashMap<String, i64>>,
    recorded: Mutex<Vec<EndpointHit>>,
    queries: Mutex<Vec<Vec<String>>>,
    failing: AtomicBool,
}

impl FakeStatsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hits(&self, uri: &str, hits: i64) {
        self.hits.lock().insert(uri.to_string(), hits);
    }

    /// Make every call fail as if the service were down
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn recorded_hits(&self) -> Vec<EndpointHit> {
        self.recorded.lock().clone()
    }

    pub fn queried_uris(&self) -> Vec<Vec<String>> {
        self.queries.lock().clone()
    }

    /// Hits are reported from a spawned task; wait until `count` arrived
    pub async fn wait_for_hits(&self, count: usize) -> Vec<EndpointHit> {
        for _ in 0..100 {
            if self.recorded.lock().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.recorded_hits()
    }
}

#[async_trait]
impl StatsClient for FakeStatsClient {
    async fn record_hit(&self, hit: &EndpointHit) -> StatsResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StatsError::RequestFailed("connection refused".to_string()));
        }
        self.recorded.lock().push(hit.clone());
        Ok(())
    }

    async fn query_hits(
        &self,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
        uris: &[String],
        _unique: bool,
    ) -> StatsResult<Vec<ViewStats>> {
        self.queries.lock().push(uris.to_vec());
        if self.failing.load(Ordering::SeqCst) {
            return Err(StatsError::Timeout);
        }

        let hits = self.hits.lock();
        Ok(uris
            .iter()
            .filter_map(|uri| {
                hits.get(uri).map(|count| ViewStats {
                    app: "eventhub".to_string(),
                    uri: uri.clone(),
                    hits: *count,
                })
            })
            .collect())
    }
}

/// Mock statistics server for testing the HTTP client
pub struct StatsMockServer {
    pub server: MockServer,
}

impl StatsMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn client(&self) -> HttpStatsClient {
        self.client_with_timeout(Duration::from_secs(2))
    }

    pub fn client_with_timeout(&self, timeout: Duration) -> HttpStatsClient {
        HttpStatsClient::with_timeout(&self.uri(), timeout).expect("mock server URL is valid")
    }

    /// Accept `POST /hit` with the given status
    pub async fn mock_hit(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/hit"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /stats` with `body`
    pub async fn mock_stats(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path("/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer `GET /stats` only after `delay`
    pub async fn mock_slow_stats(&self, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/stats"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(Value::Array(Vec::new()))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn received_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}
