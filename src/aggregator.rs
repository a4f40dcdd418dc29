// Fan-out over the query catalog and per-field merge into six-field volume records

use crate::error::QueryError;
use crate::models::{MetricKind, MetricsByName, QueryResult};
use crate::query::{QueryCatalog, QuerySource};
use futures_util::future::join_all;
use std::sync::Arc;

/// Outcome of one collection round: merged metrics plus the kinds whose query failed.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub metrics: MetricsByName,
    pub failed: Vec<MetricKind>,
}

impl Collected {
    /// True when no query contributed (every fetch failed).
    pub fn is_total_failure(&self, catalog_len: usize) -> bool {
        catalog_len > 0 && self.failed.len() == catalog_len
    }
}

pub struct MetricsAggregator {
    source: Arc<dyn QuerySource>,
    catalog: QueryCatalog,
}

impl MetricsAggregator {
    pub fn new(source: Arc<dyn QuerySource>, catalog: QueryCatalog) -> Self {
        Self { source, catalog }
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    /// Issues every query concurrently and waits for all of them.
    pub async fn fetch_all(&self) -> Vec<(MetricKind, Result<QueryResult, QueryError>)> {
        let fetches = self.catalog.queries().iter().map(|q| {
            let source = self.source.clone();
            async move { (q.kind, source.query(&q.expression).await) }
        });
        join_all(fetches).await
    }

    /// One fan-out/fan-in round. Failed queries are logged and contribute nothing.
    pub async fn collect(&self) -> Collected {
        let mut ok = Vec::with_capacity(self.catalog.len());
        let mut failed = Vec::new();
        for (kind, result) in self.fetch_all().await {
            match result {
                Ok(values) => ok.push((kind, values)),
                Err(e) => {
                    tracing::warn!(
                        query = %kind,
                        error_kind = e.kind(),
                        error = %e,
                        operation = "fetch_query",
                        "query failed; withholding its data this cycle"
                    );
                    failed.push(kind);
                }
            }
        }
        Collected {
            metrics: merge(&ok),
            failed,
        }
    }
}

/// Fills each volume's record field by field. Fields with no data stay 0.
pub fn merge(results: &[(MetricKind, QueryResult)]) -> MetricsByName {
    let mut merged = MetricsByName::new();
    for (kind, values) in results {
        for (volume, value) in values {
            merged
                .entry(volume.clone())
                .or_default()
                .set(*kind, *value);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(pairs: &[(&str, f64)]) -> QueryResult {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn merge_zero_fills_missing_fields() {
        let merged = merge(&[
            (MetricKind::ReadIops, result(&[("pv-a", 7.0), ("pv-b", 1.0)])),
            (MetricKind::WriteLatency, result(&[("pv-b", 2.5)])),
        ]);
        assert_eq!(merged.len(), 2);
        let a = merged["pv-a"];
        assert_eq!(a.read_iops, 7.0);
        assert_eq!(a.write_latency, 0.0);
        let b = merged["pv-b"];
        assert_eq!(b.read_iops, 1.0);
        assert_eq!(b.write_latency, 2.5);
        assert_eq!(b.write_iops, 0.0);
    }

    #[test]
    fn merge_of_nothing_is_empty() {
        assert!(merge(&[]).is_empty());
    }
}
