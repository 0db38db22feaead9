//! Record of which transactions were already applied to which topic.

use crate::StoreError;
use overlay_types::TxId;

pub trait AppliedTransactionStore {
    fn insert_applied_transaction(&self, txid: &TxId, topic: &str) -> Result<(), StoreError>;

    fn does_applied_transaction_exist(&self, txid: &TxId, topic: &str) -> Result<bool, StoreError>;
}
