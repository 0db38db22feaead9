use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits applied to every submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Largest accepted proof bundle, in bytes.
    #[serde(default = "default_max_bundle_bytes")]
    pub max_bundle_bytes: usize,
    /// How long `submit_and_wait` waits for the acknowledgment.
    #[serde(default = "default_submit_timeout_ms")]
    pub submit_timeout_ms: u64,
}

fn default_max_bundle_bytes() -> usize {
    1024 * 1024 * 1024
}

fn default_submit_timeout_ms() -> u64 {
    10_000
}

impl PipelineConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_bundle_bytes: default_max_bundle_bytes(),
            submit_timeout_ms: default_submit_timeout_ms(),
        }
    }
}
