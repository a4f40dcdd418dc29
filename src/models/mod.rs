// Domain models: volume metrics, backend responses, report wire format

mod prometheus;
mod report;
mod volume;

pub use prometheus::{QueryData, QueryResponse, RawValue, ResultEntry};
pub use report::{Metric, MetricTemplate, Node, PluginSpec, Report, Sample, Topology};
pub use volume::{
    MetricKind, MetricsByName, QueryResult, Snapshot, VolumeIdentity, VolumeMetrics,
};
