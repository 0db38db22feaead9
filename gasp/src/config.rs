use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits of one sync session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaspConfig {
    /// Most nodes a single graph may hold, root included.
    #[serde(default = "default_max_nodes_per_graph")]
    pub max_nodes_per_graph: usize,
    /// Most UTXOs listed in one initial response (0 = unlimited).
    #[serde(default = "default_initial_limit")]
    pub initial_limit: u32,
    /// Only pull from the remote; never push local UTXOs back.
    #[serde(default)]
    pub unidirectional: bool,
    /// Most pushed graphs a responder keeps waiting on inputs at once.
    #[serde(default = "default_max_pending_pushes")]
    pub max_pending_pushes: usize,
    /// Seconds a pushed graph may wait for its next node before it is dropped.
    #[serde(default = "default_push_idle_timeout_secs")]
    pub push_idle_timeout_secs: u64,
}

fn default_max_nodes_per_graph() -> usize {
    1_000
}

fn default_initial_limit() -> u32 {
    1_000
}

fn default_max_pending_pushes() -> usize {
    64
}

fn default_push_idle_timeout_secs() -> u64 {
    60
}

impl Default for GaspConfig {
    fn default() -> Self {
        Self {
            max_nodes_per_graph: default_max_nodes_per_graph(),
            initial_limit: default_initial_limit(),
            unidirectional: false,
            max_pending_pushes: default_max_pending_pushes(),
            push_idle_timeout_secs: default_push_idle_timeout_secs(),
        }
    }
}

impl GaspConfig {
    pub fn push_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.push_idle_timeout_secs)
    }
}
