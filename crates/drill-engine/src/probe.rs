//! ---
//! drill_section: "04-execution-engine"
//! drill_subsection: "module"
//! drill_type: "source"
//! drill_scope: "code"
//! drill_description: "Scenario execution engine."
//! drill_version: "v0.0.0-prealpha"
//! drill_owner: "tbd"
//! ---
//! Metric query capability used by `check-metric` steps.
//!
//! `Ok(None)` means "no value available" (no backend configured, or the
//! backend had nothing for the query) and degrades the step to `skipped`.
//! `Err(_)` means the backend was reachable but failed; the executor decides
//! whether that is fatal.

use std::time::Duration;

use async_trait::async_trait;
use drill_common::config::MetricsConfig;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

/// Failure of a reachable metric backend.
#[derive(Debug, thiserror::Error)]
pub enum MetricQueryError {
    /// Transport-level failure (connect, timeout, TLS, body decode).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// The backend answered with a non-success status.
    #[error("backend returned status {0}")]
    Status(u16),
    /// The response body did not carry a usable `value`.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Source of single numeric metric values.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch the current value for `query`.
    async fn fetch_value(&self, query: &str) -> Result<Option<f64>, MetricQueryError>;
}

/// HTTP backend answering `GET <endpoint>?query=<q>` with `{"value": ...}`.
#[derive(Debug, Clone)]
pub struct HttpMetricSource {
    endpoint: Option<Url>,
    client: reqwest::Client,
}

impl HttpMetricSource {
    /// Build a source; `endpoint = None` yields a source that never has values.
    pub fn new(endpoint: Option<Url>, timeout: Duration) -> Result<Self, MetricQueryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }

    /// Build a source from the `[metrics]` configuration section.
    pub fn from_config(config: &MetricsConfig) -> Result<Self, MetricQueryError> {
        Self::new(config.endpoint.clone(), config.query_timeout)
    }

    /// Whether a backend endpoint is configured.
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    fn query_url(endpoint: &Url, query: &str) -> Url {
        let mut url = endpoint.clone();
        url.query_pairs_mut().append_pair("query", query);
        url
    }
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    async fn fetch_value(&self, query: &str) -> Result<Option<f64>, MetricQueryError> {
        let Some(endpoint) = &self.endpoint else {
            info!(query, "no metric endpoint configured, skipping automatic query");
            return Ok(None);
        };
        let url = Self::query_url(endpoint, query);
        debug!(%url, "querying metric backend");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetricQueryError::Status(status.as_u16()));
        }
        let payload: Value = response.json().await?;
        parse_value(&payload)
    }
}

fn parse_value(payload: &Value) -> Result<Option<f64>, MetricQueryError> {
    match payload.get("value") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_f64()
            .map(Some)
            .ok_or_else(|| MetricQueryError::Malformed(format!("value {number} is not an f64"))),
        Some(Value::String(text)) => match text.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            Ok(_) => Err(MetricQueryError::Malformed(format!(
                "value {text:?} is not a finite number"
            ))),
            Err(_) => Err(MetricQueryError::Malformed(format!(
                "value {text:?} is not numeric"
            ))),
        },
        Some(other) => Err(MetricQueryError::Malformed(format!(
            "unexpected value type: {other}"
        ))),
    }
}

/// In-memory source with scripted answers; unknown queries yield no value.
#[derive(Debug, Default)]
pub struct FixedMetricSource {
    values: IndexMap<String, f64>,
    failures: IndexMap<String, String>,
    queries: Mutex<Vec<String>>,
}

impl FixedMetricSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with `value`.
    pub fn with_value(mut self, query: impl Into<String>, value: f64) -> Self {
        self.values.insert(query.into(), value);
        self
    }

    /// Answer `query` with a backend failure.
    pub fn with_failure(mut self, query: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(query.into(), message.into());
        self
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl MetricSource for FixedMetricSource {
    async fn fetch_value(&self, query: &str) -> Result<Option<f64>, MetricQueryError> {
        self.queries.lock().push(query.to_owned());
        if let Some(message) = self.failures.get(query) {
            return Err(MetricQueryError::Malformed(message.clone()));
        }
        Ok(self.values.get(query).copied())
    }
}
