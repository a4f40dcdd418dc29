// Background refresh worker.
// Each tick: resolve identities + fan out all queries, merge, publish. Cycles never overlap.

use crate::aggregator::MetricsAggregator;
use crate::identity::IdentityResolver;
use crate::store::SnapshotStore;
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::Instrument;

/// Collaborators and shutdown signal for the worker.
pub struct WorkerDeps {
    pub aggregator: Arc<MetricsAggregator>,
    pub resolver: Arc<IdentityResolver>,
    pub store: Arc<SnapshotStore>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct WorkerConfig {
    pub interval_secs: u64,
    /// How often to log refresh stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// What a published cycle produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub volumes: usize,
    pub unresolved: usize,
    pub failed_queries: usize,
}

/// Runs one refresh. Errors leave the previously published snapshot in place.
pub async fn run_one_cycle(
    aggregator: &MetricsAggregator,
    resolver: &IdentityResolver,
    store: &SnapshotStore,
) -> anyhow::Result<CycleSummary> {
    let (identity, collected) = tokio::join!(resolver.resolve(), aggregator.collect());
    store.set_identity(identity);

    let queries = aggregator.catalog().len();
    anyhow::ensure!(
        !collected.is_total_failure(queries),
        "all {} queries failed",
        queries
    );

    let failed_queries = collected.failed.len();
    let named = collected.metrics.len();
    let snapshot = store.replace(collected.metrics);
    Ok(CycleSummary {
        volumes: snapshot.metrics.len(),
        unresolved: named.saturating_sub(snapshot.metrics.len()),
        failed_queries,
    })
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        aggregator,
        resolver,
        store,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        interval_secs,
        stats_log_interval_secs,
    } = config;

    let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", interval_secs);

    tokio::spawn(
        async move {
            let mut tick = interval(Duration::from_secs(interval_secs));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
            stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            let mut cycles_published: u64 = 0;
            let mut cycles_failed: u64 = 0;

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        match run_one_cycle(&aggregator, &resolver, &store).await {
                            Ok(summary) => {
                                cycles_published += 1;
                                tracing::debug!(
                                    volumes = summary.volumes,
                                    unresolved = summary.unresolved,
                                    failed_queries = summary.failed_queries,
                                    "snapshot published"
                                );
                            }
                            Err(e) => {
                                cycles_failed += 1;
                                tracing::warn!(
                                    error = %e,
                                    operation = "refresh",
                                    "refresh failed; keeping previous snapshot"
                                );
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Worker shutting down");
                        break;
                    }
                    _ = stats_log_tick.tick() => {
                        tracing::info!(
                            cycles_published,
                            cycles_failed,
                            volumes = store.current_snapshot().metrics.len(),
                            identities = store.identity().len(),
                            "app stats"
                        );
                    }
                }
            }
        }
        .instrument(worker_span),
    )
}
