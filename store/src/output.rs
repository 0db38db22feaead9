//! The persisted output record.

use overlay_types::{Outpoint, Score};
use serde::{Deserialize, Serialize};

/// One output admitted into one topic.
///
/// The same outpoint may be admitted into several topics; each admission is
/// its own record keyed by `(outpoint, topic)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub outpoint: Outpoint,
    pub topic: String,
    pub spent: bool,
    /// Encoded proof bundle of the transaction that created this output.
    pub bundle: Vec<u8>,
    pub block_height: Option<u32>,
    pub score: Score,
    /// Outputs (in this topic) created by the transaction that spent this one.
    #[serde(default)]
    pub consumed_by: Vec<Outpoint>,
    /// Previously admitted outputs this output's transaction consumed.
    #[serde(default)]
    pub outputs_consumed: Vec<Outpoint>,
}
