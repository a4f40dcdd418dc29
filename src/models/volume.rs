// Per-volume metric records, identity mapping and published snapshot

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One of the six polled statistics. Declaration order is the catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    ReadIops,
    WriteIops,
    ReadLatency,
    WriteLatency,
    ReadThroughput,
    WriteThroughput,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::ReadIops,
        MetricKind::WriteIops,
        MetricKind::ReadLatency,
        MetricKind::WriteLatency,
        MetricKind::ReadThroughput,
        MetricKind::WriteThroughput,
    ];

    /// Metric id as it appears in the report and metric templates.
    pub fn id(self) -> &'static str {
        match self {
            MetricKind::ReadIops => "readIops",
            MetricKind::WriteIops => "writeIops",
            MetricKind::ReadLatency => "readLatency",
            MetricKind::WriteLatency => "writeLatency",
            MetricKind::ReadThroughput => "readThroughput",
            MetricKind::WriteThroughput => "writeThroughput",
        }
    }

    pub fn is_iops(self) -> bool {
        matches!(self, MetricKind::ReadIops | MetricKind::WriteIops)
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Six-field record for one volume. Fields a cycle had no data for stay 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolumeMetrics {
    pub read_iops: f64,
    pub write_iops: f64,
    pub read_latency: f64,
    pub write_latency: f64,
    pub read_throughput: f64,
    pub write_throughput: f64,
}

impl VolumeMetrics {
    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::ReadIops => self.read_iops,
            MetricKind::WriteIops => self.write_iops,
            MetricKind::ReadLatency => self.read_latency,
            MetricKind::WriteLatency => self.write_latency,
            MetricKind::ReadThroughput => self.read_throughput,
            MetricKind::WriteThroughput => self.write_throughput,
        }
    }

    /// Negative values are clamped to 0.
    pub fn set(&mut self, kind: MetricKind, value: f64) {
        let value = value.max(0.0);
        match kind {
            MetricKind::ReadIops => self.read_iops = value,
            MetricKind::WriteIops => self.write_iops = value,
            MetricKind::ReadLatency => self.read_latency = value,
            MetricKind::WriteLatency => self.write_latency = value,
            MetricKind::ReadThroughput => self.read_throughput = value,
            MetricKind::WriteThroughput => self.write_throughput = value,
        }
    }
}

/// Values of one query, keyed by the volume's external name.
pub type QueryResult = HashMap<String, f64>;

/// Merged metrics keyed by external volume name (before identity resolution).
pub type MetricsByName = HashMap<String, VolumeMetrics>;

/// External volume name -> orchestrator-issued UID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeIdentity {
    uids: HashMap<String, String>,
}

impl VolumeIdentity {
    pub fn new(uids: HashMap<String, String>) -> Self {
        Self { uids }
    }

    pub fn uid(&self, name: &str) -> Option<&str> {
        self.uids.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.uids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }
}

impl FromIterator<(String, String)> for VolumeIdentity {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            uids: iter.into_iter().collect(),
        }
    }
}

/// Immutable result of one refresh, keyed by volume UID.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub metrics: HashMap<String, VolumeMetrics>,
    pub as_of: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            metrics: HashMap::new(),
            as_of: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Joins name-keyed metrics against `identity`. Volumes without a UID are dropped.
    pub fn resolve(
        metrics: &MetricsByName,
        identity: &VolumeIdentity,
        as_of: DateTime<Utc>,
    ) -> Self {
        let metrics = metrics
            .iter()
            .filter_map(|(name, m)| identity.uid(name).map(|uid| (uid.to_string(), *m)))
            .collect();
        Self { metrics, as_of }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clamps_negative_values() {
        let mut m = VolumeMetrics::default();
        m.set(MetricKind::WriteLatency, -3.5);
        assert_eq!(m.write_latency, 0.0);
        m.set(MetricKind::WriteLatency, 2.5);
        assert_eq!(m.get(MetricKind::WriteLatency), 2.5);
    }

    #[test]
    fn resolve_drops_unknown_volumes() {
        let mut metrics = MetricsByName::new();
        metrics.insert("pv-a".into(), VolumeMetrics::default());
        metrics.insert("pv-b".into(), VolumeMetrics::default());
        let identity: VolumeIdentity = [("pv-a".to_string(), "uid-a".to_string())]
            .into_iter()
            .collect();
        let snapshot = Snapshot::resolve(&metrics, &identity, Utc::now());
        assert_eq!(snapshot.metrics.len(), 1);
        assert!(snapshot.metrics.contains_key("uid-a"));
    }
}
