//! LMDB implementation of the output store traits.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};

use overlay_store::{
    AppliedTransactionStore, Output, OutputLookup, OutputWriter, SpentFilter, StoreError,
    UtxoEnumeration,
};
use overlay_types::{Outpoint, Score, TxId};

use crate::keys::{
    applied_key, check_topic, increment_prefix, outpoint_from_score_key, output_key, score_key,
    score_lower_bound, topic_prefix,
};
use crate::LmdbError;

pub struct LmdbOutputStore {
    pub(crate) env: Arc<Env>,
    pub(crate) outputs_db: Database<Bytes, Bytes>,
    pub(crate) topic_scores_db: Database<Bytes, Bytes>,
    pub(crate) applied_db: Database<Bytes, Bytes>,
}

impl LmdbOutputStore {
    fn read(
        &self,
        rtxn: &RoTxn,
        outpoint: &Outpoint,
        topic: &str,
    ) -> Result<Option<Output>, LmdbError> {
        match self.outputs_db.get(rtxn, &output_key(outpoint, topic))? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, wtxn: &mut RwTxn, output: &Output) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(output)?;
        self.outputs_db
            .put(wtxn, &output_key(&output.outpoint, &output.topic), &bytes)?;
        Ok(())
    }
}

impl OutputLookup for LmdbOutputStore {
    fn find_output(
        &self,
        outpoint: &Outpoint,
        topic: Option<&str>,
        spent: SpentFilter,
    ) -> Result<Option<Output>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        if let Some(topic) = topic {
            let found = self.read(&rtxn, outpoint, topic)?;
            return Ok(found.filter(|o| spent.matches(o.spent)));
        }

        let prefix = outpoint.to_key();
        let iter = self
            .outputs_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        for result in iter {
            let (_key, val) = result.map_err(LmdbError::from)?;
            let output: Output = bincode::deserialize(val).map_err(LmdbError::from)?;
            if spent.matches(output.spent) {
                return Ok(Some(output));
            }
        }
        Ok(None)
    }

    fn find_outputs(
        &self,
        outpoints: &[Outpoint],
        topic: &str,
        spent: SpentFilter,
    ) -> Result<Vec<Output>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut results = Vec::with_capacity(outpoints.len());
        for outpoint in outpoints {
            if let Some(output) = self.read(&rtxn, outpoint, topic)? {
                if spent.matches(output.spent) {
                    results.push(output);
                }
            }
        }
        Ok(results)
    }
}

impl UtxoEnumeration for LmdbOutputStore {
    fn find_utxos_for_topic(
        &self,
        topic: &str,
        since: Score,
        limit: u32,
        historical: bool,
    ) -> Result<Vec<Output>, StoreError> {
        check_topic(topic)?;
        let Some(lower) = score_lower_bound(topic, since) else {
            return Ok(Vec::new());
        };
        let mut upper = topic_prefix(topic);
        increment_prefix(&mut upper);

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bounds = (
            Bound::Included(lower.as_slice()),
            Bound::Excluded(upper.as_slice()),
        );
        let iter = self
            .topic_scores_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;

        let mut results = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            let outpoint = outpoint_from_score_key(key)
                .ok_or_else(|| StoreError::Corruption("short score index key".into()))?;
            let output = self.read(&rtxn, &outpoint, topic)?.ok_or_else(|| {
                StoreError::Corruption(format!("score index points at missing output {outpoint}"))
            })?;
            if output.spent && !historical {
                continue;
            }
            results.push(output);
            if limit != 0 && results.len() >= limit as usize {
                break;
            }
        }
        Ok(results)
    }
}

impl OutputWriter for LmdbOutputStore {
    fn insert_output(&self, output: &Output) -> Result<(), StoreError> {
        check_topic(&output.topic)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if let Some(previous) = self.read(&wtxn, &output.outpoint, &output.topic)? {
            self.topic_scores_db
                .delete(
                    &mut wtxn,
                    &score_key(&previous.topic, previous.score, &previous.outpoint),
                )
                .map_err(LmdbError::from)?;
        }
        self.write(&mut wtxn, output)?;
        self.topic_scores_db
            .put(
                &mut wtxn,
                &score_key(&output.topic, output.score, &output.outpoint),
                &[],
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn mark_utxos_as_spent(&self, outpoints: &[Outpoint], topic: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for outpoint in outpoints {
            if let Some(mut output) = self.read(&wtxn, outpoint, topic)? {
                output.spent = true;
                self.write(&mut wtxn, &output)?;
            }
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn update_consumed_by(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        consumed_by: &[Outpoint],
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut output = self
            .read(&wtxn, outpoint, topic)?
            .ok_or_else(|| LmdbError::NotFound(format!("output {outpoint} in {topic}")))?;
        output.consumed_by = consumed_by.to_vec();
        self.write(&mut wtxn, &output)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn delete_output(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if let Some(existing) = self.read(&wtxn, outpoint, topic)? {
            self.topic_scores_db
                .delete(&mut wtxn, &score_key(topic, existing.score, outpoint))
                .map_err(LmdbError::from)?;
            self.outputs_db
                .delete(&mut wtxn, &output_key(outpoint, topic))
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl AppliedTransactionStore for LmdbOutputStore {
    fn insert_applied_transaction(&self, txid: &TxId, topic: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.applied_db
            .put(&mut wtxn, &applied_key(txid, topic), &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn does_applied_transaction_exist(&self, txid: &TxId, topic: &str) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let found = self
            .applied_db
            .get(&rtxn, &applied_key(txid, topic))
            .map_err(LmdbError::from)?;
        Ok(found.is_some())
    }
}
