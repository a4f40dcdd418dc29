use crate::models::MetricKind;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub queries: QueryConfig,
    #[serde(default)]
    pub plugin: PluginConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Unix socket the Scope probe connects to; its parent directory is owned by us.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
        }
    }
}

fn default_socket_path() -> String {
    "/var/run/scope/plugins/openebs/openebs.sock".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Prometheus-compatible API, without `/api/v1/query`.
    pub url: String,
    /// Series label carrying the volume name.
    #[serde(default = "default_volume_label")]
    pub volume_label: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_volume_label() -> String {
    "openebs_pv".into()
}

fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Defaults to https://$KUBERNETES_SERVICE_HOST:$KUBERNETES_SERVICE_PORT.
    pub api_url: Option<String>,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_ca_path")]
    pub ca_path: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            token_path: default_token_path(),
            ca_path: default_ca_path(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_token_path() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/token".into()
}

fn default_ca_path() -> String {
    "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// How often to log refresh stats at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_stats_log_interval_secs() -> u64 {
    300
}

/// Query expression per metric. Omitted keys keep the built-in expression.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    #[serde(default = "default_read_iops")]
    pub read_iops: String,
    #[serde(default = "default_write_iops")]
    pub write_iops: String,
    #[serde(default = "default_read_latency")]
    pub read_latency: String,
    #[serde(default = "default_write_latency")]
    pub write_latency: String,
    #[serde(default = "default_read_throughput")]
    pub read_throughput: String,
    #[serde(default = "default_write_throughput")]
    pub write_throughput: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            read_iops: default_read_iops(),
            write_iops: default_write_iops(),
            read_latency: default_read_latency(),
            write_latency: default_write_latency(),
            read_throughput: default_read_throughput(),
            write_throughput: default_write_throughput(),
        }
    }
}

impl QueryConfig {
    pub fn expression(&self, kind: MetricKind) -> &str {
        match kind {
            MetricKind::ReadIops => &self.read_iops,
            MetricKind::WriteIops => &self.write_iops,
            MetricKind::ReadLatency => &self.read_latency,
            MetricKind::WriteLatency => &self.write_latency,
            MetricKind::ReadThroughput => &self.read_throughput,
            MetricKind::WriteThroughput => &self.write_throughput,
        }
    }
}

fn default_read_iops() -> String {
    "increase(openebs_reads[5m])/300".into()
}

fn default_write_iops() -> String {
    "increase(openebs_writes[5m])/300".into()
}

fn default_read_latency() -> String {
    "((increase(openebs_read_time[5m]))/(increase(openebs_reads[5m])))/1000000".into()
}

fn default_write_latency() -> String {
    "((increase(openebs_write_time[5m]))/(increase(openebs_writes[5m])))/1000000".into()
}

fn default_read_throughput() -> String {
    "increase(openebs_read_block_count[5m])/(1024*1024*60*5)".into()
}

fn default_write_throughput() -> String {
    "increase(openebs_write_block_count[5m])/(1024*1024*60*5)".into()
}

/// Plugin descriptor fields advertised in every report.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
    #[serde(default = "default_plugin_id")]
    pub id: String,
    #[serde(default = "default_plugin_label")]
    pub label: String,
    #[serde(default = "default_plugin_description")]
    pub description: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            id: default_plugin_id(),
            label: default_plugin_label(),
            description: default_plugin_description(),
        }
    }
}

fn default_plugin_id() -> String {
    "openebs".into()
}

fn default_plugin_label() -> String {
    "OpenEBS Plugin".into()
}

fn default_plugin_description() -> String {
    "Adds graphs of metrics of OpenEBS PV".into()
}

/// Environment variables that override `backend.url`, in priority order.
/// `CORTEXAGENT` is the name older deployments set.
pub const BACKEND_URL_ENV: [&str; 2] = ["CORTEX_AGENT_URL", "CORTEXAGENT"];

fn backend_url_override() -> Option<String> {
    BACKEND_URL_ENV.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    })
}

impl AppConfig {
    /// Reads `$CONFIG_FILE` (default `config.toml`). The first non-empty variable in
    /// [`BACKEND_URL_ENV`] overrides `backend.url`.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        let mut config: AppConfig = toml::from_str(&s)?;
        if let Some(url) = backend_url_override() {
            config.backend.url = url;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.server.socket_path.is_empty(),
            "server.socket_path must be non-empty"
        );
        anyhow::ensure!(
            !self.backend.url.trim().is_empty(),
            "backend.url must be non-empty"
        );
        anyhow::ensure!(
            self.backend.url.starts_with("http://") || self.backend.url.starts_with("https://"),
            "backend.url must start with http:// or https://, got {}",
            self.backend.url
        );
        anyhow::ensure!(
            !self.backend.volume_label.is_empty(),
            "backend.volume_label must be non-empty"
        );
        anyhow::ensure!(
            self.backend.timeout_ms > 0,
            "backend.timeout_ms must be > 0, got {}",
            self.backend.timeout_ms
        );
        anyhow::ensure!(
            self.cluster.timeout_ms > 0,
            "cluster.timeout_ms must be > 0, got {}",
            self.cluster.timeout_ms
        );
        anyhow::ensure!(
            self.refresh.interval_secs > 0,
            "refresh.interval_secs must be > 0, got {}",
            self.refresh.interval_secs
        );
        anyhow::ensure!(
            self.refresh.stats_log_interval_secs > 0,
            "refresh.stats_log_interval_secs must be > 0, got {}",
            self.refresh.stats_log_interval_secs
        );
        for kind in MetricKind::ALL {
            anyhow::ensure!(
                !self.queries.expression(kind).trim().is_empty(),
                "queries.{} must be non-empty",
                kind.id()
            );
        }
        anyhow::ensure!(!self.plugin.id.is_empty(), "plugin.id must be non-empty");
        Ok(())
    }
}
