//! Nullable output store: thread-safe in-memory storage for testing.

use overlay_store::{
    AppliedTransactionStore, Output, OutputLookup, OutputWriter, SpentFilter, StoreError,
    UtxoEnumeration,
};
use overlay_types::{Outpoint, Score, TxId};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// An in-memory output store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullOutputStore {
    outputs: Mutex<BTreeMap<(Outpoint, String), Output>>,
    applied: Mutex<HashSet<(TxId, String)>>,
    /// When set, every call fails with this backend error.
    failure: Mutex<Option<String>>,
    /// Writes still allowed before every call starts failing.
    writes_left: Mutex<Option<usize>>,
}

impl NullOutputStore {
    pub fn new() -> Self {
        Self {
            outputs: Mutex::new(BTreeMap::new()),
            applied: Mutex::new(HashSet::new()),
            failure: Mutex::new(None),
            writes_left: Mutex::new(None),
        }
    }

    /// Make every subsequent call fail with `StoreError::Backend(message)`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Allow `writes` more successful writes, then fail every call as
    /// [`fail_with`](Self::fail_with) does.
    pub fn fail_after_writes(&self, writes: usize) {
        *self.writes_left.lock().unwrap() = Some(writes);
    }

    pub fn heal(&self) {
        *self.failure.lock().unwrap() = None;
        *self.writes_left.lock().unwrap() = None;
    }

    /// Number of stored `(outpoint, topic)` records.
    pub fn len(&self) -> usize {
        self.outputs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record of `topic`, in score order.
    pub fn outputs_for_topic(&self, topic: &str) -> Vec<Output> {
        let mut outputs: Vec<Output> = self
            .outputs
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.topic == topic)
            .cloned()
            .collect();
        outputs.sort_by_key(|o| o.score);
        outputs
    }

    fn check(&self) -> Result<(), StoreError> {
        match self.failure.lock().unwrap().as_ref() {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    fn check_write(&self) -> Result<(), StoreError> {
        self.check()?;
        let mut writes_left = self.writes_left.lock().unwrap();
        match writes_left.as_mut() {
            Some(0) => {
                let message = "write budget exhausted";
                *self.failure.lock().unwrap() = Some(message.to_string());
                Err(StoreError::Backend(message.to_string()))
            }
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Default for NullOutputStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputLookup for NullOutputStore {
    fn find_output(
        &self,
        outpoint: &Outpoint,
        topic: Option<&str>,
        spent: SpentFilter,
    ) -> Result<Option<Output>, StoreError> {
        self.check()?;
        let outputs = self.outputs.lock().unwrap();
        Ok(outputs
            .values()
            .find(|o| {
                &o.outpoint == outpoint
                    && topic.map_or(true, |t| o.topic == t)
                    && spent.matches(o.spent)
            })
            .cloned())
    }

    fn find_outputs(
        &self,
        outpoints: &[Outpoint],
        topic: &str,
        spent: SpentFilter,
    ) -> Result<Vec<Output>, StoreError> {
        self.check()?;
        let outputs = self.outputs.lock().unwrap();
        Ok(outpoints
            .iter()
            .filter_map(|op| outputs.get(&(*op, topic.to_string())))
            .filter(|o| spent.matches(o.spent))
            .cloned()
            .collect())
    }
}

impl UtxoEnumeration for NullOutputStore {
    fn find_utxos_for_topic(
        &self,
        topic: &str,
        since: Score,
        limit: u32,
        historical: bool,
    ) -> Result<Vec<Output>, StoreError> {
        self.check()?;
        let mut matching: Vec<Output> = self
            .outputs_for_topic(topic)
            .into_iter()
            .filter(|o| o.score > since && (historical || !o.spent))
            .collect();
        if limit != 0 {
            matching.truncate(limit as usize);
        }
        Ok(matching)
    }
}

impl OutputWriter for NullOutputStore {
    fn insert_output(&self, output: &Output) -> Result<(), StoreError> {
        self.check_write()?;
        self.outputs
            .lock()
            .unwrap()
            .insert((output.outpoint, output.topic.clone()), output.clone());
        Ok(())
    }

    fn mark_utxos_as_spent(&self, outpoints: &[Outpoint], topic: &str) -> Result<(), StoreError> {
        self.check_write()?;
        let mut outputs = self.outputs.lock().unwrap();
        for op in outpoints {
            if let Some(output) = outputs.get_mut(&(*op, topic.to_string())) {
                output.spent = true;
            }
        }
        Ok(())
    }

    fn update_consumed_by(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        consumed_by: &[Outpoint],
    ) -> Result<(), StoreError> {
        self.check_write()?;
        let mut outputs = self.outputs.lock().unwrap();
        let output = outputs
            .get_mut(&(*outpoint, topic.to_string()))
            .ok_or_else(|| StoreError::NotFound(format!("output {outpoint} in {topic}")))?;
        output.consumed_by = consumed_by.to_vec();
        Ok(())
    }

    fn delete_output(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.outputs
            .lock()
            .unwrap()
            .remove(&(*outpoint, topic.to_string()));
        Ok(())
    }
}

impl AppliedTransactionStore for NullOutputStore {
    fn insert_applied_transaction(&self, txid: &TxId, topic: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.applied
            .lock()
            .unwrap()
            .insert((*txid, topic.to_string()));
        Ok(())
    }

    fn does_applied_transaction_exist(&self, txid: &TxId, topic: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self
            .applied
            .lock()
            .unwrap()
            .contains(&(*txid, topic.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(b: u8) -> Outpoint {
        Outpoint::new(TxId::new([b; 32]), 0)
    }

    fn output(b: u8, topic: &str, score: u64) -> Output {
        Output {
            outpoint: op(b),
            topic: topic.to_string(),
            spent: false,
            bundle: Vec::new(),
            block_height: None,
            score: Score::new(score),
            consumed_by: Vec::new(),
            outputs_consumed: Vec::new(),
        }
    }

    #[test]
    fn test_pagination_lowest_score_first() {
        let store = NullOutputStore::new();
        for (b, score) in [(1u8, 140u64), (2, 110), (3, 130), (4, 120)] {
            store.insert_output(&output(b, "tm", score)).unwrap();
        }
        let page = store
            .find_utxos_for_topic("tm", Score::new(100), 2, false)
            .unwrap();
        let scores: Vec<u64> = page.iter().map(|o| o.score.value()).collect();
        assert_eq!(scores, vec![110, 120]);
        assert_eq!(
            store
                .find_utxos_for_topic("tm", Score::new(100), 0, false)
                .unwrap()
                .len(),
            4
        );
    }

    #[test]
    fn test_find_output_topic_filter() {
        let store = NullOutputStore::new();
        store.insert_output(&output(1, "tm_a", 1)).unwrap();
        assert!(store
            .find_output(&op(1), Some("tm_b"), SpentFilter::Any)
            .unwrap()
            .is_none());
        assert!(store
            .find_output(&op(1), None, SpentFilter::Unspent)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_failure_injection() {
        let store = NullOutputStore::new();
        store.fail_with("disk on fire");
        match store.find_utxos_for_topic("tm", Score::ZERO, 0, false) {
            Err(StoreError::Backend(msg)) => assert_eq!(msg, "disk on fire"),
            other => panic!("expected backend error, got {:?}", other),
        }
        store.heal();
        assert!(store.find_utxos_for_topic("tm", Score::ZERO, 0, false).is_ok());
    }

    #[test]
    fn test_fail_after_writes() {
        let store = NullOutputStore::new();
        store.fail_after_writes(1);
        store.insert_output(&output(1, "tm", 1)).unwrap();
        assert!(matches!(
            store.insert_output(&output(2, "tm", 2)),
            Err(StoreError::Backend(_))
        ));
        assert!(store.find_output(&op(1), None, SpentFilter::Any).is_err());
        store.heal();
        assert_eq!(store.len(), 1);
        store.insert_output(&output(2, "tm", 2)).unwrap();
    }

    #[test]
    fn test_mark_spent_and_delete() {
        let store = NullOutputStore::new();
        store.insert_output(&output(1, "tm", 1)).unwrap();
        store.mark_utxos_as_spent(&[op(1)], "tm").unwrap();
        assert!(store
            .find_utxos_for_topic("tm", Score::ZERO, 0, false)
            .unwrap()
            .is_empty());
        store.delete_output(&op(1), "tm").unwrap();
        assert!(store.is_empty());
    }
}
