//! Transaction layer for the topic overlay.
//!
//! Parses raw Bitcoin-family transactions, computes their ids, verifies
//! Merkle inclusion proofs against a [`ChainTracker`], and encodes the
//! self-contained [`ProofBundle`] stored alongside every admitted output.

pub mod bundle;
pub mod chain_tracker;
pub mod error;
pub mod merkle;
pub mod transaction;

pub use bundle::ProofBundle;
pub use chain_tracker::{verify_merkle_path, ChainTracker};
pub use error::{ChainTrackerError, TransactionError};
pub use merkle::{compute_merkle_root, sha256d, MerklePath, MerkleSibling};
pub use transaction::{txid_of, Transaction, TxInput, TxOutput};
