//! Messages exchanged between two GASP peers.

use serde::{Deserialize, Serialize};

use overlay_transactions::{txid_of, MerklePath, TransactionError};
use overlay_types::{GraphId, Outpoint, Score, TxId};

/// Protocol version spoken by this node.
pub const GASP_VERSION: u32 = 1;

/// Opens a sync: "send me every UTXO newer than `since`".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialRequest {
    pub version: u32,
    pub since: Score,
}

/// One UTXO of the responder together with its score on the responder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub outpoint: Outpoint,
    pub score: Score,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialResponse {
    /// The low-water mark the listing was computed from.
    pub since: Score,
    /// Ascending by score.
    pub utxo_list: Vec<UtxoEntry>,
}

/// One vertex of a graph under resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaspNode {
    pub graph_id: GraphId,
    pub raw_tx: Vec<u8>,
    pub output_index: u32,
    /// Present when the transaction is anchored in a block.
    pub proof: Option<MerklePath>,
    #[serde(default)]
    pub ancillary_txids: Vec<TxId>,
    #[serde(default)]
    pub tx_metadata: Option<String>,
    #[serde(default)]
    pub output_metadata: Option<String>,
}

impl GaspNode {
    pub fn new(graph_id: GraphId, raw_tx: Vec<u8>, output_index: u32) -> Self {
        Self {
            graph_id,
            raw_tx,
            output_index,
            proof: None,
            ancillary_txids: Vec::new(),
            tx_metadata: None,
            output_metadata: None,
        }
    }

    pub fn with_proof(mut self, proof: Option<MerklePath>) -> Self {
        self.proof = proof;
        self
    }

    /// The output this node stands for. Does not parse the transaction.
    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(txid_of(&self.raw_tx), self.output_index)
    }

    /// Parse the transaction and check the output index exists.
    pub fn checked_outpoint(&self) -> Result<Outpoint, TransactionError> {
        overlay_transactions::Transaction::from_bytes(&self.raw_tx)?.outpoint(self.output_index)
    }
}

/// Inputs of a received node the receiver still needs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub requested_inputs: Vec<Outpoint>,
}

impl NodeResponse {
    pub fn is_empty(&self) -> bool {
        self.requested_inputs.is_empty()
    }
}
