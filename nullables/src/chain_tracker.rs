//! Nullable chain tracker: accepts exactly the roots it was told about.

use async_trait::async_trait;
use overlay_transactions::{ChainTracker, ChainTrackerError};
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Default)]
pub struct NullChainTracker {
    roots: Mutex<HashSet<([u8; 32], u32)>>,
    offline: Mutex<bool>,
}

impl NullChainTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `root` as the Merkle root of the block at `height`.
    pub fn add_root(&self, root: [u8; 32], height: u32) {
        self.roots.lock().unwrap().insert((root, height));
    }

    /// Make every query fail as if the header service were unreachable.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }
}

#[async_trait]
impl ChainTracker for NullChainTracker {
    async fn is_valid_root_for_height(
        &self,
        root: &[u8; 32],
        height: u32,
    ) -> Result<bool, ChainTrackerError> {
        if *self.offline.lock().unwrap() {
            return Err(ChainTrackerError::Unavailable("null tracker offline".into()));
        }
        Ok(self.roots.lock().unwrap().contains(&(*root, height)))
    }
}
