use std::time::Duration;

use overlay_store::StoreError;
use overlay_topics::TopicManagerError;
use overlay_transactions::{ChainTrackerError, TransactionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("bundle of {size} bytes exceeds the {max} byte limit")]
    BundleTooLarge { size: usize, max: usize },

    #[error("submission names no topics")]
    NoTopics,

    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("malformed bundle: {0}")]
    Malformed(#[from] TransactionError),

    #[error("merkle path does not anchor the transaction to the chain")]
    InvalidProof,

    #[error("chain tracker error: {0}")]
    ChainTracker(#[from] ChainTrackerError),

    #[error("topic manager for {topic} failed: {source}")]
    TopicManager {
        topic: String,
        #[source]
        source: TopicManagerError,
    },

    #[error("topic manager for {topic} returned invalid instructions: {reason}")]
    InvalidInstructions { topic: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("no acknowledgment within {0:?}")]
    Timeout(Duration),

    #[error("evaluation ended without delivering an acknowledgment")]
    Abandoned,
}
