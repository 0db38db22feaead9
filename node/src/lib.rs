//! Topic overlay node.
//!
//! The node owns no protocol logic of its own. It wires explicit
//! collaborators together:
//! - an output store (LMDB, or any [`overlay_store::OutputStore`])
//! - a chain tracker answering Merkle-root queries
//! - one topic manager per hosted topic
//!
//! and exposes the admittance pipeline, per-topic GASP responders and sync
//! sessions on top of them, with logging, metrics and the error-to-status
//! mapping a transport layer needs.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod tracing_spans;

pub use config::NodeConfig;
pub use error::{ErrorKind, NodeError};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::OverlayNode;
pub use shutdown::ShutdownController;
