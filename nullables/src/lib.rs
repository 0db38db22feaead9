//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the overlay core (output store, chain
//! tracker, topic managers) is abstracted behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chain_tracker;
pub mod fixtures;
pub mod store;
pub mod topic_manager;

pub use chain_tracker::NullChainTracker;
pub use fixtures::{anchor, spend, TxFixture};
pub use store::NullOutputStore;
pub use topic_manager::{NullTopicManager, TopicBehaviour};
