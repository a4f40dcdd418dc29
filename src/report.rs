// Topology report for the Scope probe, rendered from the published snapshot

use crate::config::PluginConfig;
use crate::models::{
    Metric, MetricKind, MetricTemplate, Node, PluginSpec, Report, Sample, Snapshot, Topology,
    VolumeMetrics,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Suffix tagging a node as a persistent volume in the Scope topology.
pub const PV_TOPOLOGY_SUFFIX: &str = ";<persistent_volume>";

/// Declared graph range for every metric.
pub const METRIC_MIN: f64 = 0.0;
pub const METRIC_MAX: f64 = 100.0;

pub const PLUGIN_API_VERSION: &str = "1";

pub fn topology_key(uid: &str) -> String {
    format!("{}{}", uid, PV_TOPOLOGY_SUFFIX)
}

fn template(kind: MetricKind) -> MetricTemplate {
    let (label, format, priority) = match kind {
        MetricKind::ReadIops => ("Iops(R)", "", 0.1),
        MetricKind::WriteIops => ("Iops(W)", "", 0.2),
        MetricKind::ReadLatency => ("Latency(R)", "millisecond", 0.3),
        MetricKind::WriteLatency => ("Latency(W)", "millisecond", 0.4),
        MetricKind::ReadThroughput => ("Throughput(R)", "bytes", 0.5),
        MetricKind::WriteThroughput => ("Throughput(W)", "bytes", 0.6),
    };
    MetricTemplate {
        id: kind.id().to_string(),
        label: label.to_string(),
        format: format.to_string(),
        priority,
    }
}

pub fn metric_templates() -> BTreeMap<String, MetricTemplate> {
    MetricKind::ALL
        .into_iter()
        .map(|kind| (kind.id().to_string(), template(kind)))
        .collect()
}

pub fn plugin_spec(config: &PluginConfig) -> PluginSpec {
    PluginSpec {
        id: config.id.clone(),
        label: config.label.clone(),
        description: config.description.clone(),
        interfaces: vec!["reporter".to_string()],
        api_version: PLUGIN_API_VERSION.to_string(),
    }
}

/// IOPS are shown as whole operations (half rounds up).
fn display_value(kind: MetricKind, value: f64) -> f64 {
    if kind.is_iops() {
        (value + 0.5).trunc()
    } else {
        value
    }
}

fn node(metrics: &VolumeMetrics, now: DateTime<Utc>) -> Node {
    let metrics = MetricKind::ALL
        .into_iter()
        .map(|kind| {
            let metric = Metric {
                samples: vec![Sample {
                    date: now,
                    value: display_value(kind, metrics.get(kind)),
                }],
                min: METRIC_MIN,
                max: METRIC_MAX,
            };
            (kind.id().to_string(), metric)
        })
        .collect();
    Node { metrics }
}

/// Pure: reads only `snapshot`; every sample is stamped `now`.
pub fn build_report(snapshot: &Snapshot, plugin: &PluginSpec, now: DateTime<Utc>) -> Report {
    let nodes = snapshot
        .metrics
        .iter()
        .map(|(uid, metrics)| (topology_key(uid), node(metrics, now)))
        .collect();
    Report {
        persistent_volume: Topology {
            nodes,
            metric_templates: metric_templates(),
        },
        plugins: vec![plugin.clone()],
    }
}
