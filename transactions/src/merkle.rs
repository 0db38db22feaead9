//! Merkle inclusion proofs.
//!
//! A [`MerklePath`] carries the sibling hashes from a transaction id up to the
//! block's Merkle root, plus the block height the root must be checked at.
//! Hashing follows the Bitcoin convention: `sha256d(left || right)`, with the
//! last node of an odd level paired with itself.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use overlay_types::TxId;

/// Double SHA-256.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    sha256d(&buf)
}

/// One level of a Merkle path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MerkleSibling {
    Hash([u8; 32]),
    /// The node is the last of an odd level and is hashed with itself.
    Duplicate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    pub block_height: u32,
    /// Position of the transaction among the block's transactions.
    pub index: u64,
    /// Siblings from the leaf level upwards.
    pub siblings: Vec<MerkleSibling>,
}

impl MerklePath {
    /// Whether `index` addresses a leaf of a tree `siblings.len()` levels
    /// high. Higher bits would be ignored by [`Self::compute_root`], letting
    /// one proof stand for many positions.
    pub fn index_fits(&self) -> bool {
        let levels = self.siblings.len();
        levels >= 64 || self.index >> levels == 0
    }

    /// Fold the path from `txid` up to the root it implies.
    pub fn compute_root(&self, txid: &TxId) -> [u8; 32] {
        let mut current = *txid.as_bytes();
        let mut index = self.index;
        for sibling in &self.siblings {
            let other = match sibling {
                MerkleSibling::Hash(h) => *h,
                MerkleSibling::Duplicate => current,
            };
            current = if index & 1 == 0 {
                hash_pair(&current, &other)
            } else {
                hash_pair(&other, &current)
            };
            index >>= 1;
        }
        current
    }

    /// Build the path for `leaves[index]`. Returns `None` when out of range.
    pub fn from_leaves(leaves: &[TxId], index: usize, block_height: u32) -> Option<Self> {
        if index >= leaves.len() {
            return None;
        }
        let mut level: Vec<[u8; 32]> = leaves.iter().map(|t| *t.as_bytes()).collect();
        let mut position = index;
        let mut siblings = Vec::new();
        while level.len() > 1 {
            let sibling_pos = position ^ 1;
            siblings.push(match level.get(sibling_pos) {
                Some(h) => MerkleSibling::Hash(*h),
                None => MerkleSibling::Duplicate,
            });
            level = next_level(&level);
            position /= 2;
        }
        Some(Self {
            block_height,
            index: index as u64,
            siblings,
        })
    }
}

fn next_level(level: &[[u8; 32]]) -> Vec<[u8; 32]> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            [only] => hash_pair(only, only),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// Merkle root of a block's transaction ids.
pub fn compute_merkle_root(leaves: &[TxId]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    let mut level: Vec<[u8; 32]> = leaves.iter().map(|t| *t.as_bytes()).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}
