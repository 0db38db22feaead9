//! Fundamental types for the topic overlay.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: transaction ids, outpoints, graph ids, ordering scores and the
//! admittance acknowledgment returned from a submission.

pub mod error;
pub mod hash;
pub mod outpoint;
pub mod score;
pub mod steak;

pub use error::TypesError;
pub use hash::TxId;
pub use outpoint::{GraphId, Outpoint};
pub use score::{Score, ScoreClock};
pub use steak::{AdmittanceInstructions, Steak, SubmitMode, TaggedBundle};
