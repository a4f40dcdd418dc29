use anyhow::{Context, Result};
use pvscope::*;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tokio::net::UnixListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let source = Arc::new(query::PrometheusClient::new(&app_config.backend)?);
    let catalog = query::QueryCatalog::from_config(&app_config.queries);
    let aggregator = Arc::new(aggregator::MetricsAggregator::new(source, catalog));
    let lister = Arc::new(identity::KubeClient::from_config(&app_config.cluster)?);
    let resolver = Arc::new(identity::IdentityResolver::new(lister));
    let store = Arc::new(store::SnapshotStore::new());

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            aggregator,
            resolver,
            store: store.clone(),
            shutdown_rx,
        },
        worker::WorkerConfig {
            interval_secs: app_config.refresh.interval_secs,
            stats_log_interval_secs: app_config.refresh.stats_log_interval_secs,
        },
    );

    let socket_path = Path::new(&app_config.server.socket_path);
    let listener = setup_socket(socket_path)?;
    tracing::info!("Listening on unix://{}", socket_path.display());

    let app = routes::app(store, report::plugin_spec(&app_config.plugin));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;
    cleanup_socket(socket_path);
    served?;
    Ok(())
}

/// Creates the socket directory (0700) and binds, replacing a stale socket file.
fn setup_socket(socket_path: &Path) -> Result<UnixListener> {
    if let Some(dir) = socket_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("failed to set permissions on {}", dir.display()))?;
    }
    match std::fs::remove_file(socket_path) {
        Ok(()) => tracing::debug!(path = %socket_path.display(), "removed stale socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to remove stale {}", socket_path.display()));
        }
    }
    UnixListener::bind(socket_path)
        .with_context(|| format!("failed to listen on {}", socket_path.display()))
}

/// Removes the socket and, if now empty, its directory.
fn cleanup_socket(socket_path: &Path) {
    if let Err(e) = std::fs::remove_file(socket_path) {
        tracing::warn!(error = %e, path = %socket_path.display(), "failed to remove socket");
    }
    if let Some(dir) = socket_path.parent() {
        let _ = std::fs::remove_dir(dir);
    }
}

async fn shutdown_signal() {
    let mut sigterm =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Received shutdown signal");
                return;
            }
        };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    tracing::info!("Received shutdown signal");
}
