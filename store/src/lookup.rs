//! Point lookups of stored outputs.

use crate::{Output, StoreError};
use overlay_types::Outpoint;

/// Restricts lookups by spend state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpentFilter {
    Any,
    Unspent,
    Spent,
}

impl SpentFilter {
    pub fn matches(&self, spent: bool) -> bool {
        match self {
            SpentFilter::Any => true,
            SpentFilter::Unspent => !spent,
            SpentFilter::Spent => spent,
        }
    }
}

pub trait OutputLookup {
    /// Find one output. With `topic = None` the first admission of the
    /// outpoint in any topic is returned.
    fn find_output(
        &self,
        outpoint: &Outpoint,
        topic: Option<&str>,
        spent: SpentFilter,
    ) -> Result<Option<Output>, StoreError>;

    /// Find every listed outpoint admitted into `topic`, skipping unknown ones.
    fn find_outputs(
        &self,
        outpoints: &[Outpoint],
        topic: &str,
        spent: SpentFilter,
    ) -> Result<Vec<Output>, StoreError>;
}
