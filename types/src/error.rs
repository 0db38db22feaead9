//! Parse errors for the textual forms of the core types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid transaction id: {0}")]
    InvalidTxId(String),

    #[error("invalid outpoint: {0}")]
    InvalidOutpoint(String),
}
