//! Commit-time mutation of stored outputs.

use crate::{Output, StoreError};
use overlay_types::Outpoint;

pub trait OutputWriter {
    /// Insert or replace the `(outpoint, topic)` record.
    fn insert_output(&self, output: &Output) -> Result<(), StoreError>;

    /// Mark each listed output of `topic` as spent. Unknown outpoints are
    /// skipped.
    fn mark_utxos_as_spent(&self, outpoints: &[Outpoint], topic: &str) -> Result<(), StoreError>;

    /// Replace the `consumed_by` list of one output.
    fn update_consumed_by(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        consumed_by: &[Outpoint],
    ) -> Result<(), StoreError>;

    /// Remove the `(outpoint, topic)` record. Removing a missing record is
    /// not an error.
    fn delete_output(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StoreError>;
}
