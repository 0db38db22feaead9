//! Graph-aware sync protocol (GASP).
//!
//! Two peers reconcile the UTXO set of one topic:
//! - **Enumerate**: the requester asks for every UTXO newer than its
//!   low-water mark and gets back an ordered list of outpoints.
//! - **Resolve**: every unknown outpoint becomes the root of a graph; its
//!   ancestors are requested until each branch ends in a Merkle-anchored
//!   transaction or an output already held locally.
//! - **Commit**: a validated graph is written to the output store; a graph
//!   that fails anywhere is discarded whole.
//!
//! [`OverlayGaspStorage`] is the bounded graph builder, [`Gasp`] drives one
//! sync session against a [`GaspRemote`], and [`GaspResponder`] answers the
//! other side of the exchange.

pub mod config;
pub mod error;
pub mod messages;
pub mod remote;
pub mod responder;
pub mod storage;
pub mod sync;

pub use config::GaspConfig;
pub use error::GaspError;
pub use messages::{GaspNode, InitialRequest, InitialResponse, NodeResponse, UtxoEntry, GASP_VERSION};
pub use remote::{GaspRemote, InProcessRemote};
pub use responder::GaspResponder;
pub use storage::OverlayGaspStorage;
pub use sync::{Gasp, SyncReport};
