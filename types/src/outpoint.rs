//! Outpoints and graph identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{TxId, TypesError};

/// One output of one transaction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    pub txid: TxId,
    pub output_index: u32,
}

impl Outpoint {
    pub fn new(txid: TxId, output_index: u32) -> Self {
        Self { txid, output_index }
    }

    /// Fixed-width binary key: txid bytes followed by the big-endian index.
    pub fn to_key(&self) -> [u8; 36] {
        let mut key = [0u8; 36];
        key[..32].copy_from_slice(self.txid.as_bytes());
        key[32..].copy_from_slice(&self.output_index.to_be_bytes());
        key
    }

    pub fn from_key(key: &[u8]) -> Option<Self> {
        let txid: [u8; 32] = key.get(..32)?.try_into().ok()?;
        let index: [u8; 4] = key.get(32..36)?.try_into().ok()?;
        Some(Self::new(TxId::new(txid), u32::from_be_bytes(index)))
    }
}

impl fmt::Debug for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Outpoint({:?}.{})", self.txid, self.output_index)
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.txid, self.output_index)
    }
}

impl FromStr for Outpoint {
    type Err = TypesError;

    /// Parse the `"<txid>.<index>"` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, index) = s
            .rsplit_once('.')
            .ok_or_else(|| TypesError::InvalidOutpoint(s.to_string()))?;
        let index = index
            .parse::<u32>()
            .map_err(|e| TypesError::InvalidOutpoint(format!("{s}: {e}")))?;
        Ok(Self::new(TxId::from_hex(txid)?, index))
    }
}

/// The root outpoint of one synchronization traversal.
///
/// Every node discovered while resolving that root carries this id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphId(Outpoint);

impl GraphId {
    pub fn new(root: Outpoint) -> Self {
        Self(root)
    }

    pub fn root(&self) -> &Outpoint {
        &self.0
    }
}

impl From<Outpoint> for GraphId {
    fn from(root: Outpoint) -> Self {
        Self(root)
    }
}

impl fmt::Debug for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphId({:?})", self.0)
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
