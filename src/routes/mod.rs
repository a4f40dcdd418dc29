// HTTP routes served to the Scope probe over the plugin socket

mod report;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::models::PluginSpec;
use crate::store::SnapshotStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<SnapshotStore>,
    pub(crate) plugin: Arc<PluginSpec>,
}

pub fn app(store: Arc<SnapshotStore>, plugin: PluginSpec) -> Router {
    let state = AppState {
        store,
        plugin: Arc::new(plugin),
    };
    Router::new()
        .route(
            "/report",
            get(report::report_handler).post(report::report_handler),
        ) // GET|POST /report
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
