use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction truncated while reading {what}")]
    Truncated { what: &'static str },

    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    #[error("non-minimal varint encoding of {what}")]
    NonCanonicalVarint { what: &'static str },

    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("output index {index} out of range ({count} outputs)")]
    OutputIndexOutOfRange { index: u32, count: usize },

    #[error("invalid proof bundle: {0}")]
    InvalidBundle(String),
}

#[derive(Debug, Error)]
pub enum ChainTrackerError {
    #[error("chain tracker unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}
