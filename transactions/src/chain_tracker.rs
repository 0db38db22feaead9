//! Chain tracker contract: the node's view of which Merkle roots are on the
//! accepted chain at which heights.

use async_trait::async_trait;

use overlay_types::TxId;

use crate::error::ChainTrackerError;
use crate::merkle::MerklePath;

#[async_trait]
pub trait ChainTracker: Send + Sync {
    /// Whether `root` is the Merkle root of the accepted block at `height`.
    async fn is_valid_root_for_height(
        &self,
        root: &[u8; 32],
        height: u32,
    ) -> Result<bool, ChainTrackerError>;
}

/// Check that `path` anchors `txid` to the accepted chain.
pub async fn verify_merkle_path(
    tracker: &dyn ChainTracker,
    txid: &TxId,
    path: &MerklePath,
) -> Result<bool, ChainTrackerError> {
    if !path.index_fits() {
        return Ok(false);
    }
    let root = path.compute_root(txid);
    tracker
        .is_valid_root_for_height(&root, path.block_height)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::compute_merkle_root;

    struct FixedRoot([u8; 32], u32);

    #[async_trait]
    impl ChainTracker for FixedRoot {
        async fn is_valid_root_for_height(
            &self,
            root: &[u8; 32],
            height: u32,
        ) -> Result<bool, ChainTrackerError> {
            Ok(*root == self.0 && height == self.1)
        }
    }

    #[tokio::test]
    async fn accepts_matching_root_and_height() {
        let leaves = [TxId::new([1u8; 32]), TxId::new([2u8; 32])];
        let tracker = FixedRoot(compute_merkle_root(&leaves), 10);
        let path = MerklePath::from_leaves(&leaves, 1, 10).unwrap();
        assert!(verify_merkle_path(&tracker, &leaves[1], &path).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_index_beyond_tree_height() {
        let leaves = [TxId::new([1u8; 32]), TxId::new([2u8; 32])];
        let tracker = FixedRoot(compute_merkle_root(&leaves), 10);
        let mut path = MerklePath::from_leaves(&leaves, 1, 10).unwrap();
        path.index = 3;
        assert!(!verify_merkle_path(&tracker, &leaves[1], &path).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_wrong_height() {
        let leaves = [TxId::new([1u8; 32]), TxId::new([2u8; 32])];
        let tracker = FixedRoot(compute_merkle_root(&leaves), 10);
        let path = MerklePath::from_leaves(&leaves, 1, 11).unwrap();
        assert!(!verify_merkle_path(&tracker, &leaves[1], &path).await.unwrap());
    }
}
