//! Self-contained proof bundle persisted with every output.
//!
//! Encoding: 4-byte magic `OVB1` followed by the bincode-encoded body.

use serde::{Deserialize, Serialize};

use overlay_types::TxId;

use crate::error::TransactionError;
use crate::merkle::MerklePath;
use crate::transaction::{txid_of, Transaction};

const MAGIC: &[u8; 4] = b"OVB1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBundle {
    pub raw_tx: Vec<u8>,
    pub merkle_path: Option<MerklePath>,
}

impl ProofBundle {
    pub fn new(raw_tx: Vec<u8>, merkle_path: Option<MerklePath>) -> Self {
        Self {
            raw_tx,
            merkle_path,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        let body = bincode::serialize(self).expect("ProofBundle is always serializable");
        out.extend_from_slice(&body);
        out
    }

    /// Decode and check that the carried transaction parses.
    pub fn decode(bytes: &[u8]) -> Result<Self, TransactionError> {
        let body = bytes
            .strip_prefix(MAGIC.as_slice())
            .ok_or_else(|| TransactionError::InvalidBundle("missing magic".into()))?;
        let bundle: Self = bincode::deserialize(body)
            .map_err(|e| TransactionError::InvalidBundle(e.to_string()))?;
        Transaction::from_bytes(&bundle.raw_tx)?;
        Ok(bundle)
    }

    pub fn transaction(&self) -> Result<Transaction, TransactionError> {
        Transaction::from_bytes(&self.raw_tx)
    }

    pub fn txid(&self) -> TxId {
        txid_of(&self.raw_tx)
    }

    pub fn block_height(&self) -> Option<u32> {
        self.merkle_path.as_ref().map(|p| p.block_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TxInput, TxOutput};
    use overlay_types::Outpoint;

    fn raw_tx() -> Vec<u8> {
        Transaction {
            version: 1,
            inputs: vec![TxInput {
                previous_output: Outpoint::new(TxId::new([2u8; 32]), 0),
                unlocking_script: vec![],
                sequence: 0,
            }],
            outputs: vec![TxOutput {
                satoshis: 5,
                locking_script: vec![0x51],
            }],
            lock_time: 0,
        }
        .to_bytes()
    }

    #[test]
    fn decode_restores_tx_and_path() {
        let raw = raw_tx();
        let path = MerklePath::from_leaves(&[txid_of(&raw)], 0, 812).unwrap();
        let bundle = ProofBundle::new(raw.clone(), Some(path));
        let decoded = ProofBundle::decode(&bundle.encode()).unwrap();
        assert_eq!(decoded.raw_tx, raw);
        assert_eq!(decoded.block_height(), Some(812));
    }

    #[test]
    fn decode_rejects_missing_magic() {
        assert!(matches!(
            ProofBundle::decode(b"nope"),
            Err(TransactionError::InvalidBundle(_))
        ));
    }

    #[test]
    fn decode_rejects_unparsable_tx() {
        let bundle = ProofBundle::new(vec![1, 2, 3], None);
        assert!(ProofBundle::decode(&bundle.encode()).is_err());
    }
}
