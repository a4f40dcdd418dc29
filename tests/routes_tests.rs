// Integration tests: /report endpoint

use axum_test::TestServer;
use pvscope::config::PluginConfig;
use pvscope::models::{MetricsByName, VolumeIdentity, VolumeMetrics};
use pvscope::report::plugin_spec;
use pvscope::routes;
use pvscope::store::SnapshotStore;
use std::sync::Arc;

fn test_server(store: Arc<SnapshotStore>) -> TestServer {
    let app = routes::app(store, plugin_spec(&PluginConfig::default()));
    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_report_with_empty_store() {
    let server = test_server(Arc::new(SnapshotStore::new()));
    let response = server.get("/report").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["PersistentVolume"]["nodes"], serde_json::json!({}));
    assert_eq!(
        json["PersistentVolume"]["metric_templates"]
            .as_object()
            .map(|m| m.len()),
        Some(6)
    );
    assert_eq!(json["Plugins"][0]["id"], "openebs");
}

#[tokio::test]
async fn test_report_serves_published_snapshot() {
    let store = Arc::new(SnapshotStore::new());
    let identity: VolumeIdentity = [("pv-a".to_string(), "uid-a".to_string())]
        .into_iter()
        .collect();
    store.set_identity(identity);
    let mut metrics = MetricsByName::new();
    metrics.insert(
        "pv-a".into(),
        VolumeMetrics {
            write_latency: 4.5,
            ..VolumeMetrics::default()
        },
    );
    store.replace(metrics);

    let server = test_server(store);
    let response = server.get("/report").await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "application/json"
    );
    let json: serde_json::Value = response.json();
    let node = &json["PersistentVolume"]["nodes"]["uid-a;<persistent_volume>"];
    assert_eq!(node["metrics"]["writeLatency"]["samples"][0]["value"], 4.5);
    assert_eq!(node["metrics"]["readIops"]["samples"][0]["value"], 0.0);
}

#[tokio::test]
async fn test_report_accepts_post() {
    let server = test_server(Arc::new(SnapshotStore::new()));
    let response = server.post("/report").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert!(json.get("Plugins").is_some());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let server = test_server(Arc::new(SnapshotStore::new()));
    let response = server.get("/metrics").await;
    response.assert_status_not_found();
}
