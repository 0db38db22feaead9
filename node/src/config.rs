//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use overlay_engine::PipelineConfig;
use overlay_gasp::GaspConfig;

use crate::{LogFormat, NodeError};

/// Configuration for an overlay node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB output store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Topics this node must host. Each needs a registered topic manager.
    #[serde(default)]
    pub topics: Vec<String>,

    /// Seconds between background sync rounds with a peer.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub gasp: GaspConfig,

    #[serde(default)]
    pub submission: PipelineConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./overlay_data")
}

fn default_map_size() -> usize {
    4 << 30
}

fn default_sync_interval_secs() -> u64 {
    60
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Anything but "json" selects human-readable output.
    pub fn log_format(&self) -> LogFormat {
        match self.log_format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Human,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            topics: Vec::new(),
            sync_interval_secs: default_sync_interval_secs(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            gasp: GaspConfig::default(),
            submission: PipelineConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.submission.max_bundle_bytes, 1 << 30);
        assert_eq!(config.submission.submit_timeout(), Duration::from_secs(10));
        assert_eq!(config.gasp.max_nodes_per_graph, 1_000);
        assert!(!config.gasp.unidirectional);
        assert_eq!(config.log_format(), LogFormat::Human);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            topics = ["tm_tokens", "tm_names"]
            log_format = "json"

            [gasp]
            max_nodes_per_graph = 64

            [submission]
            submit_timeout_ms = 2500
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.topics, vec!["tm_tokens", "tm_names"]);
        assert_eq!(config.gasp.max_nodes_per_graph, 64);
        assert_eq!(config.gasp.initial_limit, 1_000); // default
        assert_eq!(config.submission.submit_timeout(), Duration::from_millis(2500));
        assert_eq!(config.submission.max_bundle_bytes, 1 << 30); // default
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn invalid_toml_returns_config_error() {
        let result = NodeConfig::from_toml_str("topics = 7");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/overlay.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
