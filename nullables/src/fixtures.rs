//! Transaction fixtures shared by the test suites.

use overlay_transactions::{
    compute_merkle_root, MerklePath, ProofBundle, Transaction, TxInput, TxOutput,
};
use overlay_types::{Outpoint, TxId};

use crate::NullChainTracker;

/// A parsed transaction together with its raw bytes and id.
#[derive(Clone, Debug)]
pub struct TxFixture {
    pub tx: Transaction,
    pub raw: Vec<u8>,
    pub txid: TxId,
}

impl TxFixture {
    pub fn new(tx: Transaction) -> Self {
        let raw = tx.to_bytes();
        let txid = tx.txid();
        Self { tx, raw, txid }
    }

    pub fn outpoint(&self, index: u32) -> Outpoint {
        Outpoint::new(self.txid, index)
    }

    pub fn bundle(&self, merkle_path: Option<MerklePath>) -> ProofBundle {
        ProofBundle::new(self.raw.clone(), merkle_path)
    }
}

/// A transaction spending `inputs` and creating `outputs` outputs.
///
/// `tag` goes into the lock time so otherwise identical fixtures get
/// distinct ids.
pub fn spend(inputs: &[Outpoint], outputs: u32, tag: u32) -> TxFixture {
    TxFixture::new(Transaction {
        version: 1,
        inputs: inputs
            .iter()
            .map(|op| TxInput {
                previous_output: *op,
                unlocking_script: vec![0x51],
                sequence: u32::MAX,
            })
            .collect(),
        outputs: (0..outputs)
            .map(|i| TxOutput {
                satoshis: 1000 + i as u64,
                locking_script: vec![0x76, 0xa9, i as u8],
            })
            .collect(),
        lock_time: tag,
    })
}

/// Mine `fixture` alone into a block at `height` and teach `tracker` the root.
pub fn anchor(fixture: &TxFixture, height: u32, tracker: &NullChainTracker) -> MerklePath {
    let filler = TxId::new([height as u8; 32]);
    let leaves = [fixture.txid, filler];
    tracker.add_root(compute_merkle_root(&leaves), height);
    MerklePath::from_leaves(&leaves, 0, height).expect("index 0 of two leaves")
}
