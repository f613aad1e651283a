//! Upstream Clash Royale API access.
//!
//! All upstream traffic goes through the `UpstreamApi` trait so the fetch
//! chain can run against a canned API in tests.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::PlayerTag;

mod client;

pub use client::ClashRoyaleClient;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.clashroyale.com/v1";

/// Errors raised while talking to the upstream API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Upstream request to {endpoint} failed with HTTP {status}")]
    Request {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid client configuration: {0}")]
    Client(String),
}

impl UpstreamError {
    pub fn malformed(endpoint: &Endpoint, reason: impl Into<String>) -> Self {
        UpstreamError::Malformed {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }
}

/// Upstream endpoints consumed by the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `locations/global/seasons`
    Seasons,
    /// `locations/global/seasons/{season}/rankings/players`
    SeasonRankings(String),
    /// `players/{tag}` with the tag percent-encoded
    Player(PlayerTag),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Seasons => write!(f, "locations/global/seasons"),
            Endpoint::SeasonRankings(season) => {
                write!(f, "locations/global/seasons/{}/rankings/players", season)
            }
            Endpoint::Player(tag) => write!(f, "players/{}", tag.encoded()),
        }
    }
}

/// Authenticated read access to the upstream API.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Implementation name for logging.
    fn name(&self) -> &'static str;

    /// GET an endpoint and return its parsed JSON body.
    async fn get(&self, endpoint: &Endpoint) -> Result<Value, UpstreamError>;
}

/// Canned upstream for tests. Unknown endpoints answer 404.
#[cfg(test)]
pub struct MockApi {
    responses: std::sync::Mutex<std::collections::HashMap<String, MockResponse>>,
    calls: std::sync::Mutex<Vec<String>>,
    latency: Option<std::time::Duration>,
    in_flight: std::sync::atomic::AtomicUsize,
    max_in_flight: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
#[derive(Debug, Clone)]
enum MockResponse {
    Json(Value),
    Status(u16),
}

#[cfg(test)]
impl MockApi {
    pub fn new() -> Self {
        Self {
            responses: std::sync::Mutex::new(std::collections::HashMap::new()),
            calls: std::sync::Mutex::new(Vec::new()),
            latency: None,
            in_flight: std::sync::atomic::AtomicUsize::new(0),
            max_in_flight: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Delay every response, so overlapping requests are observable.
    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_json(self, endpoint: impl Into<String>, body: Value) -> Self {
        self.set_json(endpoint, body);
        self
    }

    pub fn with_status(self, endpoint: impl Into<String>, status: u16) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.into(), MockResponse::Status(status));
        self
    }

    /// Replace the response for an endpoint after construction.
    pub fn set_json(&self, endpoint: impl Into<String>, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.into(), MockResponse::Json(body));
    }

    /// Every endpoint requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == endpoint)
            .count()
    }

    /// Highest number of requests that were outstanding at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl UpstreamApi for MockApi {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get(&self, endpoint: &Endpoint) -> Result<Value, UpstreamError> {
        let path = endpoint.to_string();
        self.calls.lock().unwrap().push(path.clone());

        if let Some(latency) = self.latency {
            use std::sync::atomic::Ordering;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        let response = self.responses.lock().unwrap().get(&path).cloned();
        match response {
            Some(MockResponse::Json(body)) => Ok(body),
            Some(MockResponse::Status(status)) => Err(UpstreamError::Request {
                endpoint: path,
                status,
                body: String::new(),
            }),
            None => Err(UpstreamError::Request {
                endpoint: path,
                status: 404,
                body: r#"{"reason":"notFound"}"#.to_string(),
            }),
        }
    }
}
