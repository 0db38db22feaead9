//! Score-ordered enumeration of a topic's outputs.

use crate::{Output, StoreError};
use overlay_types::Score;

pub trait UtxoEnumeration {
    /// Outputs of `topic` with score strictly greater than `since`, lowest
    /// score first. `limit = 0` means no limit. Spent outputs are included
    /// only when `historical` is set.
    fn find_utxos_for_topic(
        &self,
        topic: &str,
        since: Score,
        limit: u32,
        historical: bool,
    ) -> Result<Vec<Output>, StoreError>;
}
