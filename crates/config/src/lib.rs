//! Configuration schema and loader for etcdkit clients.

use etcdkit_common::Endpoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Cluster members in priority order.
    pub endpoints: Vec<Endpoint>,

    /// Upper bound on a single attempt against one endpoint, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Dial timeout for new connections, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Settings for the `etcdkit-probe` diagnostic.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Dump Prometheus metrics to stdout when the probe finishes.
    #[serde(default)]
    pub print_metrics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Key written and read back.
    #[serde(default = "default_probe_key")]
    pub key: String,

    /// Value written under `key`.
    #[serde(default = "default_probe_value")]
    pub value: String,

    /// Deadline for each probe call in milliseconds (0 = none).
    #[serde(default = "default_call_deadline_ms")]
    pub call_deadline_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            key: default_probe_key(),
            value: default_probe_value(),
            call_deadline_ms: default_call_deadline_ms(),
        }
    }
}

impl ProbeConfig {
    pub fn call_deadline(&self) -> Option<Duration> {
        (self.call_deadline_ms > 0).then(|| Duration::from_millis(self.call_deadline_ms))
    }
}

// --- Defaults ---

fn default_timeout_ms() -> u64 {
    5000
}
fn default_probe_key() -> String {
    "test_key".to_string()
}
fn default_probe_value() -> String {
    "Hello from etcdkit!".to_string()
}
fn default_call_deadline_ms() -> u64 {
    1000
}

// --- Loading ---

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ClientConfig {
    /// Single-endpoint configuration with default timeouts.
    pub fn single(endpoint: Endpoint) -> Self {
        Self {
            endpoints: vec![endpoint],
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_timeout_ms(),
            probe: ProbeConfig::default(),
            print_metrics: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Validate that configuration values are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::Invalid("endpoints must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be > 0".into()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid("connect_timeout_ms must be > 0".into()));
        }
        if self.probe.key.is_empty() {
            return Err(ConfigError::Invalid("probe.key must not be empty".into()));
        }
        Ok(())
    }
}

/// Load a `ClientConfig` from a YAML file path.
pub fn load_from_file(path: &std::path::Path) -> Result<ClientConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}

/// Load a `ClientConfig` from a YAML string.
pub fn load_from_str(yaml: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
endpoints:
  - "http://localhost:2379"
"#;
        let config = load_from_str(yaml).unwrap();
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].port(), 2379);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.probe.key, "test_key");
        assert_eq!(config.probe.call_deadline(), Some(Duration::from_secs(1)));
        assert!(!config.print_metrics);
    }

    #[test]
    fn test_parse_cluster_config() {
        let yaml = r#"
endpoints:
  - "http://localhost:2379"
  - "http://etcd-00:2379"
  - "http://etcd-01:2379"
  - "http://etcd-02:2379"
timeout_ms: 1000
connect_timeout_ms: 250
probe:
  key: cluster_key
  value: "Hello from cluster!"
  call_deadline_ms: 0
print_metrics: true
"#;
        let config = load_from_str(yaml).unwrap();
        assert_eq!(config.endpoints.len(), 4);
        assert_eq!(config.endpoints[2].host(), "etcd-01");
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.probe.key, "cluster_key");
        assert_eq!(config.probe.value, "Hello from cluster!");
        assert_eq!(config.probe.call_deadline(), None);
        assert!(config.print_metrics);
    }

    #[test]
    fn test_roundtrip_yaml() {
        let config = load_from_str("endpoints: [\"etcd-00\", \"http://[::1]:2380\"]\n").unwrap();
        let serialized = serde_yaml::to_string(&config).unwrap();
        let config2 = load_from_str(&serialized).unwrap();
        assert_eq!(config.endpoints, config2.endpoints);
        assert_eq!(config.timeout_ms, config2.timeout_ms);
    }

    #[test]
    fn test_rejects_empty_endpoints() {
        let err = load_from_str("endpoints: []\n").unwrap_err().to_string();
        assert!(err.contains("endpoints"), "error should mention endpoints: {}", err);
    }

    #[test]
    fn test_rejects_missing_endpoints() {
        let result = load_from_str("timeout_ms: 10\n");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let yaml = r#"
endpoints: ["http://localhost:2379"]
timeout_ms: 0
"#;
        let err = load_from_str(yaml).unwrap_err().to_string();
        assert!(err.contains("timeout_ms"), "error should mention timeout_ms: {}", err);
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let result = load_from_str("endpoints: [\"ftp://etcd:2379\"]\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("ftp"), "error should name the scheme: {}", err);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "endpoints: [\"http://127.0.0.1:2379\"]").unwrap();
        writeln!(file, "timeout_ms: 750").unwrap();
        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(750));

        let missing = load_from_file(std::path::Path::new("/nonexistent/etcdkit.yaml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_shipped_configs_parse() {
        let single = load_from_str(include_str!("../../../configs/single.yaml")).unwrap();
        assert_eq!(single.endpoints.len(), 1);
        assert_eq!(single.probe.key, "test_key");

        let cluster = load_from_str(include_str!("../../../configs/cluster.yaml")).unwrap();
        assert_eq!(cluster.endpoints.len(), 4);
        assert_eq!(cluster.probe.key, "cluster_key");
        assert_eq!(cluster.timeout(), Duration::from_secs(1));
        assert_eq!(cluster.probe.call_deadline(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_single_is_valid() {
        let config = ClientConfig::single("localhost:2379".parse().unwrap());
        config.validate().unwrap();
        assert_eq!(config.endpoints.len(), 1);
    }
}
