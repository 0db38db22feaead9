use overlay_engine::SubmitError;
use overlay_gasp::GaspError;
use overlay_store::StoreError;
use overlay_store_lmdb::LmdbError;
use overlay_types::TypesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("topic {0} is not hosted by this node")]
    UnknownTopic(String),

    #[error("invalid identifier: {0}")]
    Types(#[from] TypesError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] LmdbError),

    #[error("submission failed: {0}")]
    Submit(#[from] SubmitError),

    #[error("sync failed: {0}")]
    Gasp(#[from] GaspError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-independent classification of every error the node returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unparsable transaction, bundle or request.
    Malformed,
    /// Graph node budget exhausted.
    ResourceExhausted,
    /// Request body over the configured ceiling.
    PayloadTooLarge,
    /// A referenced graph node is gone.
    Referential,
    NotFound,
    /// Store, chain tracker or topic manager failure.
    Backend,
    /// The acknowledgment did not arrive in time.
    Timeout,
}

impl ErrorKind {
    /// HTTP status a transport layer answers with.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Malformed | ErrorKind::Referential => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Timeout => 408,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::ResourceExhausted | ErrorKind::Backend => 500,
        }
    }
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeError::UnknownTopic(_) => ErrorKind::NotFound,
            NodeError::Types(_) => ErrorKind::Malformed,
            NodeError::Store(e) => store_kind(e),
            NodeError::Submit(e) => submit_kind(e),
            NodeError::Gasp(e) => gasp_kind(e),
            NodeError::Config(_) | NodeError::Lmdb(_) | NodeError::Io(_) => ErrorKind::Backend,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

fn store_kind(e: &StoreError) -> ErrorKind {
    match e {
        StoreError::NotFound(_) => ErrorKind::NotFound,
        _ => ErrorKind::Backend,
    }
}

fn submit_kind(e: &SubmitError) -> ErrorKind {
    match e {
        SubmitError::BundleTooLarge { .. } => ErrorKind::PayloadTooLarge,
        SubmitError::NoTopics
        | SubmitError::UnknownTopic(_)
        | SubmitError::Malformed(_)
        | SubmitError::InvalidProof
        | SubmitError::InvalidInstructions { .. } => ErrorKind::Malformed,
        SubmitError::Store(e) => store_kind(e),
        SubmitError::ChainTracker(_) | SubmitError::TopicManager { .. } => ErrorKind::Backend,
        SubmitError::Abandoned => ErrorKind::Backend,
        SubmitError::Timeout(_) => ErrorKind::Timeout,
    }
}

fn gasp_kind(e: &GaspError) -> ErrorKind {
    match e {
        GaspError::Malformed(_)
        | GaspError::ParentMismatch { .. }
        | GaspError::RootMismatch { .. }
        | GaspError::UnexpectedNode { .. }
        | GaspError::AnchorInvalid { .. }
        | GaspError::VersionMismatch { .. } => ErrorKind::Malformed,
        GaspError::GraphFull { .. } | GaspError::TooManyPendingGraphs { .. } => {
            ErrorKind::ResourceExhausted
        }
        GaspError::DanglingParent { .. } | GaspError::UnknownGraph(_) => ErrorKind::Referential,
        GaspError::Store(e) => store_kind(e),
        GaspError::ChainTracker(_) | GaspError::TopicManager(_) | GaspError::Remote(_) => {
            ErrorKind::Backend
        }
    }
}
