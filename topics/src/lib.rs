//! Topic managers decide which outputs of a transaction belong to a topic.
//!
//! Their business rules are opaque to the overlay core: the admittance
//! pipeline and the graph validator only call [`TopicManager`] and look up
//! managers by topic name in a [`TopicManagers`] registry.

pub mod error;
pub mod manager;
pub mod registry;

pub use error::TopicManagerError;
pub use manager::{TopicDocumentation, TopicManager};
pub use registry::TopicManagers;
