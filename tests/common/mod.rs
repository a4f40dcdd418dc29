// Shared test helpers: in-memory query source, volume lister, catalog lookups

#![allow(dead_code)]

use async_trait::async_trait;
use pvscope::error::{IdentityError, QueryError};
use pvscope::identity::{VolumeLister, VolumeRef};
use pvscope::models::{MetricKind, QueryResult};
use pvscope::query::{QueryCatalog, QuerySource};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Answers by expression. Unknown expressions and `None` answers fail with HTTP 503.
#[derive(Default)]
pub struct FakeSource {
    answers: Mutex<HashMap<String, Option<QueryResult>>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn answer(&self, expression: &str, values: &[(&str, f64)]) {
        let result = values.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        self.answers
            .lock()
            .unwrap()
            .insert(expression.to_string(), Some(result));
    }

    pub fn fail(&self, expression: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(expression.to_string(), None);
    }
}

#[async_trait]
impl QuerySource for FakeSource {
    async fn query(&self, expression: &str) -> Result<QueryResult, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let answer = self.answers.lock().unwrap().get(expression).cloned();
        match answer {
            Some(Some(values)) => Ok(values),
            _ => Err(QueryError::Status {
                status: 503,
                body: "unavailable".into(),
            }),
        }
    }
}

/// Default expression for `kind`.
pub fn expr(kind: MetricKind) -> String {
    QueryCatalog::default()
        .queries()
        .iter()
        .find(|q| q.kind == kind)
        .map(|q| q.expression.clone())
        .unwrap()
}

/// Every default query answers with the same `values`.
pub fn answer_all(source: &FakeSource, values: &[(&str, f64)]) {
    for kind in MetricKind::ALL {
        source.answer(&expr(kind), values);
    }
}

/// `None` simulates a cluster API outage.
pub struct FakeLister {
    volumes: Mutex<Option<Vec<VolumeRef>>>,
}

impl FakeLister {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let volumes = pairs
            .iter()
            .map(|(name, uid)| VolumeRef {
                name: name.to_string(),
                uid: uid.to_string(),
            })
            .collect();
        Self {
            volumes: Mutex::new(Some(volumes)),
        }
    }

    pub fn down() -> Self {
        Self {
            volumes: Mutex::new(None),
        }
    }

    pub fn set_down(&self) {
        *self.volumes.lock().unwrap() = None;
    }
}

#[async_trait]
impl VolumeLister for FakeLister {
    async fn list_volumes(&self) -> Result<Vec<VolumeRef>, IdentityError> {
        self.volumes
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| IdentityError::Config("cluster API unreachable".into()))
    }
}

/// Instant-query body with one series per `(volume, value)`.
pub fn prom_body(series: &[(&str, &str)]) -> String {
    let result: Vec<serde_json::Value> = series
        .iter()
        .map(|(pv, value)| {
            serde_json::json!({
                "metric": {
                    "__name__": "openebs_reads",
                    "instance": "172.17.0.2:9500",
                    "openebs_pv": pv,
                },
                "value": [1528354477.902, value],
            })
        })
        .collect();
    serde_json::json!({
        "status": "success",
        "data": {"resultType": "vector", "result": result},
    })
    .to_string()
}
