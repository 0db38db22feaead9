//! Pre-built [`tracing::Span`] constructors for overlay node operations.
//!
//! Consistent span names and fields make it easy to correlate a submission
//! or a sync round across the engine, GASP and store log lines.

use tracing::{info_span, Span};

/// Span covering one submission from the up-front checks to the acknowledgment.
pub fn submit_span(bundle_bytes: usize, topics: usize) -> Span {
    info_span!("submit", bundle_bytes = bundle_bytes, topics = topics)
}

/// Span covering one sync round with a peer.
pub fn sync_span(topic: &str, peer: &str) -> Span {
    info_span!("gasp_sync", topic = %topic, peer = %peer)
}

/// Span covering a UTXO listing served to a caller.
pub fn lookup_span(topic: &str) -> Span {
    info_span!("lookup", topic = %topic)
}
