use overlay_store::StoreError;
use overlay_topics::TopicManagerError;
use overlay_transactions::{ChainTrackerError, TransactionError};
use overlay_types::{GraphId, Outpoint};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GaspError {
    #[error("malformed node: {0}")]
    Malformed(#[from] TransactionError),

    #[error("graph {graph_id} is full ({max} nodes)")]
    GraphFull { graph_id: GraphId, max: usize },

    #[error("too many pushed graphs pending ({max})")]
    TooManyPendingGraphs { max: usize },

    #[error("parent {parent} is not in graph {graph_id}")]
    DanglingParent { graph_id: GraphId, parent: Outpoint },

    #[error("parent {parent} does not spend {outpoint}")]
    ParentMismatch { parent: Outpoint, outpoint: Outpoint },

    #[error("root node {outpoint} does not match graph {graph_id}")]
    RootMismatch { graph_id: GraphId, outpoint: Outpoint },

    #[error("unknown graph {0}")]
    UnknownGraph(GraphId),

    #[error("node {outpoint} was not requested for graph {graph_id}")]
    UnexpectedNode { graph_id: GraphId, outpoint: Outpoint },

    #[error("graph {graph_id} is not anchored: {reason}")]
    AnchorInvalid { graph_id: GraphId, reason: String },

    #[error("unsupported protocol version {got} (expected {expected})")]
    VersionMismatch { expected: u32, got: u32 },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("chain tracker error: {0}")]
    ChainTracker(#[from] ChainTrackerError),

    #[error("topic manager error: {0}")]
    TopicManager(#[from] TopicManagerError),

    #[error("remote error: {0}")]
    Remote(String),
}
