// Query catalog and backend executor (Prometheus-compatible instant queries)

use crate::config::{BackendConfig, QueryConfig};
use crate::error::QueryError;
use crate::models::{MetricKind, QueryResponse, QueryResult, RawValue};
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

/// A named expression polled every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub kind: MetricKind,
    pub expression: String,
}

/// The fixed, ordered set of queries. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCatalog {
    queries: Vec<Query>,
}

impl QueryCatalog {
    pub fn from_config(config: &QueryConfig) -> Self {
        let queries = MetricKind::ALL
            .into_iter()
            .map(|kind| Query {
                kind,
                expression: config.expression(kind).to_string(),
            })
            .collect();
        Self { queries }
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl Default for QueryCatalog {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default())
    }
}

/// Runs one expression against the backend. Implementations do not retry.
#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn query(&self, expression: &str) -> Result<QueryResult, QueryError>;
}

/// HTTP executor for `GET {url}/api/v1/query?query=...`.
pub struct PrometheusClient {
    client: reqwest::Client,
    endpoint: String,
    volume_label: String,
}

impl PrometheusClient {
    pub fn new(config: &BackendConfig) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/v1/query", config.url.trim_end_matches('/')),
            volume_label: config.volume_label.clone(),
        })
    }
}

#[async_trait]
impl QuerySource for PrometheusClient {
    #[instrument(skip(self), fields(client = "backend", operation = "query"))]
    async fn query(&self, expression: &str) -> Result<QueryResult, QueryError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", expression)])
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        parse_response(&body, &self.volume_label)
    }
}

/// Decodes a response body into volume name -> sanitized value.
/// Series without `volume_label` are skipped; a later duplicate overwrites an earlier one.
pub fn parse_response(body: &[u8], volume_label: &str) -> Result<QueryResult, QueryError> {
    let response: QueryResponse = serde_json::from_slice(body)?;
    if response.status != "success" {
        return Err(QueryError::Backend {
            status: response.status,
        });
    }

    let mut values = QueryResult::with_capacity(response.data.result.len());
    for entry in &response.data.result {
        let Some(volume) = entry.label(volume_label) else {
            tracing::debug!(label = volume_label, "series without volume label skipped");
            continue;
        };
        let value = match entry.raw_value() {
            RawValue::Text(text) => sanitize(volume, text),
            RawValue::Number(n) if n.is_finite() => n,
            RawValue::Number(_) => 0.0,
            RawValue::Missing => {
                tracing::warn!(volume, "sample without a usable value; using 0");
                0.0
            }
        };
        values.insert(volume.to_string(), value);
    }
    Ok(values)
}

/// Maps a textual sample to a finite float. NaN, infinities and garbage become 0.
pub fn sanitize(volume: &str, text: &str) -> f64 {
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        Ok(_) => {
            tracing::debug!(volume, value = text, "non-finite sample; using 0");
            0.0
        }
        Err(e) => {
            tracing::warn!(volume, value = text, error = %e, "unparseable sample; using 0");
            0.0
        }
    }
}
