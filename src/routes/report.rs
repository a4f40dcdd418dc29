// Report handler: renders the current snapshot, never touches the network

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;

use super::AppState;
use crate::report::build_report;

/// GET|POST /report: topology report JSON. 500 only if the report cannot be serialized.
pub(super) async fn report_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.store.current_snapshot();
    let report = build_report(&snapshot, &state.plugin, Utc::now());
    match serde_json::to_vec(&report) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(
                error = %e,
                operation = "serialize_report",
                "report serialization failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
