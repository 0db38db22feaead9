//! Submission inputs and the admittance acknowledgment ("Steak").

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::TxId;

/// Which state a submission is evaluated against.
///
/// The admittance pipeline does not interpret this; it is handed to the
/// topic managers as-is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitMode {
    /// Evaluate against the current head state.
    #[default]
    Current,
    /// Evaluate as a historical (already anchored) transaction, e.g. during sync.
    Historical,
}

/// A proof bundle tagged with the topics it should be evaluated under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedBundle {
    pub bundle: Vec<u8>,
    pub topics: Vec<String>,
}

impl TaggedBundle {
    pub fn new(bundle: Vec<u8>, topics: Vec<String>) -> Self {
        Self { bundle, topics }
    }
}

/// What one topic decided about one transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmittanceInstructions {
    /// Indices of the transaction's outputs admitted into the topic.
    pub outputs_to_admit: Vec<u32>,
    /// Input indices of previously admitted coins the topic keeps tracking.
    pub coins_to_retain: Vec<u32>,
    /// Input indices of previously admitted coins dropped from the topic.
    #[serde(default)]
    pub coins_removed: Vec<u32>,
    /// Transactions needed alongside this one to validate it.
    #[serde(default)]
    pub ancillary_txids: Vec<TxId>,
}

impl AdmittanceInstructions {
    pub fn is_empty(&self) -> bool {
        self.outputs_to_admit.is_empty()
            && self.coins_to_retain.is_empty()
            && self.coins_removed.is_empty()
    }
}

/// Per-topic admittance acknowledgment for one submission.
pub type Steak = BTreeMap<String, AdmittanceInstructions>;
