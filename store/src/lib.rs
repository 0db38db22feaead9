//! Abstract storage traits for the topic overlay.
//!
//! Every output store backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits, and each
//! component asks only for the capabilities it uses.

pub mod applied;
pub mod error;
pub mod lookup;
pub mod output;
pub mod utxo;
pub mod writer;

pub use applied::AppliedTransactionStore;
pub use error::StoreError;
pub use lookup::{OutputLookup, SpentFilter};
pub use output::Output;
pub use utxo::UtxoEnumeration;
pub use writer::OutputWriter;

/// Every capability at once, for backends and for the node wiring.
pub trait OutputStore:
    OutputLookup + UtxoEnumeration + OutputWriter + AppliedTransactionStore + Send + Sync
{
}

impl<T> OutputStore for T where
    T: OutputLookup + UtxoEnumeration + OutputWriter + AppliedTransactionStore + Send + Sync
{
}
