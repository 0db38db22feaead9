//! Submission evaluation.
//!
//! [`AdmittancePipeline::submit`] performs every check that needs no topic
//! manager on the caller's path. Anything failing there is returned directly
//! and no handoff is created. The per-topic evaluation then runs on its own
//! task so that a caller giving up on the acknowledgment never aborts a
//! half-applied admission.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use overlay_store::{
    AppliedTransactionStore, Output, OutputLookup, OutputStore, OutputWriter, SpentFilter,
};
use overlay_topics::{TopicManager, TopicManagers};
use overlay_transactions::{verify_merkle_path, ChainTracker, ProofBundle, Transaction};
use overlay_types::{
    AdmittanceInstructions, Outpoint, ScoreClock, Steak, SubmitMode, TaggedBundle,
};

use crate::handoff::{self, PendingSteak};
use crate::{PipelineConfig, SubmitError};

/// Evaluates tagged bundles against the registered topic managers.
#[derive(Clone)]
pub struct AdmittancePipeline {
    store: Arc<dyn OutputStore>,
    chain_tracker: Arc<dyn ChainTracker>,
    managers: Arc<TopicManagers>,
    clock: Arc<ScoreClock>,
    config: PipelineConfig,
    /// Held from the applied-transaction re-check until the apply is done,
    /// so concurrent submissions of one transaction apply it once.
    apply_lock: Arc<Mutex<()>>,
}

/// A submission that passed the up-front checks.
struct Accepted {
    bundle_bytes: Vec<u8>,
    bundle: ProofBundle,
    tx: Transaction,
    topics: BTreeSet<String>,
}

impl AdmittancePipeline {
    pub fn new(
        store: Arc<dyn OutputStore>,
        chain_tracker: Arc<dyn ChainTracker>,
        managers: Arc<TopicManagers>,
        clock: Arc<ScoreClock>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            chain_tracker,
            managers,
            clock,
            config,
            apply_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate `tagged` and start evaluating it under every named topic.
    ///
    /// Returns as soon as evaluation has been scheduled. The acknowledgment
    /// is collected from the returned [`PendingSteak`].
    pub async fn submit(
        &self,
        tagged: TaggedBundle,
        mode: SubmitMode,
    ) -> Result<PendingSteak, SubmitError> {
        let accepted = self.check(tagged).await?;
        let txid = accepted.tx.txid();
        let (sender, pending) = handoff::channel(txid);

        tracing::debug!(
            %txid,
            topics = accepted.topics.len(),
            ?mode,
            "submission accepted for evaluation"
        );

        let pipeline = self.clone();
        tokio::spawn(async move {
            let result = pipeline.evaluate(accepted, mode).await;
            if let Err(e) = &result {
                tracing::warn!(%txid, error = %e, "submission evaluation failed");
            }
            sender.deliver(result);
        });

        Ok(pending)
    }

    /// Submit and wait for the acknowledgment up to the configured deadline.
    pub async fn submit_and_wait(
        &self,
        tagged: TaggedBundle,
        mode: SubmitMode,
    ) -> Result<Steak, SubmitError> {
        let pending = self.submit(tagged, mode).await?;
        pending.wait(self.config.submit_timeout()).await
    }

    async fn check(&self, tagged: TaggedBundle) -> Result<Accepted, SubmitError> {
        let size = tagged.bundle.len();
        if size > self.config.max_bundle_bytes {
            return Err(SubmitError::BundleTooLarge {
                size,
                max: self.config.max_bundle_bytes,
            });
        }
        if tagged.topics.is_empty() {
            return Err(SubmitError::NoTopics);
        }
        if let Some(unknown) = tagged.topics.iter().find(|t| !self.managers.contains(t)) {
            return Err(SubmitError::UnknownTopic(unknown.clone()));
        }

        let bundle = ProofBundle::decode(&tagged.bundle)?;
        let tx = bundle.transaction()?;
        if let Some(path) = &bundle.merkle_path {
            if !verify_merkle_path(self.chain_tracker.as_ref(), &tx.txid(), path).await? {
                return Err(SubmitError::InvalidProof);
            }
        }

        Ok(Accepted {
            bundle_bytes: tagged.bundle,
            bundle,
            tx,
            topics: tagged.topics.into_iter().collect(),
        })
    }

    async fn evaluate(&self, accepted: Accepted, mode: SubmitMode) -> Result<Steak, SubmitError> {
        let mut steak = Steak::new();
        for topic in &accepted.topics {
            let manager = self
                .managers
                .get(topic)
                .ok_or_else(|| SubmitError::UnknownTopic(topic.clone()))?;
            let instructions = self
                .evaluate_topic(&accepted, topic, manager.as_ref(), mode)
                .await?;
            steak.insert(topic.clone(), instructions);
        }
        Ok(steak)
    }

    async fn evaluate_topic(
        &self,
        accepted: &Accepted,
        topic: &str,
        manager: &dyn TopicManager,
        mode: SubmitMode,
    ) -> Result<AdmittanceInstructions, SubmitError> {
        let tx = &accepted.tx;
        let txid = tx.txid();

        if self.store.does_applied_transaction_exist(&txid, topic)? {
            tracing::debug!(%txid, topic, "transaction already applied");
            return Ok(AdmittanceInstructions::default());
        }

        let inputs: Vec<Outpoint> = tx.inputs.iter().map(|i| i.previous_output).collect();
        let known: HashSet<Outpoint> = self
            .store
            .find_outputs(&inputs, topic, SpentFilter::Unspent)?
            .into_iter()
            .map(|o| o.outpoint)
            .collect();
        let previous_coins: Vec<u32> = inputs
            .iter()
            .enumerate()
            .filter(|(_, op)| known.contains(op))
            .map(|(i, _)| i as u32)
            .collect();

        let decided = manager
            .identify_admissible_outputs(tx, &previous_coins, mode)
            .await
            .map_err(|source| SubmitError::TopicManager {
                topic: topic.to_string(),
                source,
            })?;
        let instructions = normalize(decided, tx, &previous_coins)
            .map_err(|reason| SubmitError::InvalidInstructions {
                topic: topic.to_string(),
                reason,
            })?;

        let _applying = self.apply_lock.lock().await;
        if self.store.does_applied_transaction_exist(&txid, topic)? {
            tracing::debug!(%txid, topic, "transaction applied concurrently");
            return Ok(AdmittanceInstructions::default());
        }
        self.apply(accepted, topic, &inputs, &instructions)?;
        Ok(instructions)
    }

    /// Persist one topic's decision.
    fn apply(
        &self,
        accepted: &Accepted,
        topic: &str,
        inputs: &[Outpoint],
        instructions: &AdmittanceInstructions,
    ) -> Result<(), SubmitError> {
        let txid = accepted.tx.txid();
        let spent: Vec<Outpoint> = instructions
            .coins_to_retain
            .iter()
            .chain(&instructions.coins_removed)
            .map(|i| inputs[*i as usize])
            .collect();
        let retained: Vec<Outpoint> = instructions
            .coins_to_retain
            .iter()
            .map(|i| inputs[*i as usize])
            .collect();
        let admitted: Vec<Outpoint> = instructions
            .outputs_to_admit
            .iter()
            .map(|i| Outpoint::new(txid, *i))
            .collect();

        self.store.mark_utxos_as_spent(&spent, topic)?;
        for index in &instructions.coins_removed {
            self.store.delete_output(&inputs[*index as usize], topic)?;
        }
        for coin in &retained {
            self.store.update_consumed_by(coin, topic, &admitted)?;
        }
        for outpoint in &admitted {
            self.store.insert_output(&Output {
                outpoint: *outpoint,
                topic: topic.to_string(),
                spent: false,
                bundle: accepted.bundle_bytes.clone(),
                block_height: accepted.bundle.block_height(),
                score: self.clock.next(),
                consumed_by: Vec::new(),
                outputs_consumed: retained.clone(),
            })?;
        }
        self.store.insert_applied_transaction(&txid, topic)?;

        tracing::info!(
            %txid,
            topic,
            admitted = admitted.len(),
            retained = retained.len(),
            removed = instructions.coins_removed.len(),
            "transaction applied to topic"
        );
        Ok(())
    }
}

/// Check a topic manager's answer against the transaction and derive the
/// removed coins. Indices come back sorted and deduplicated.
fn normalize(
    decided: AdmittanceInstructions,
    tx: &Transaction,
    previous_coins: &[u32],
) -> Result<AdmittanceInstructions, String> {
    let outputs: BTreeSet<u32> = decided.outputs_to_admit.into_iter().collect();
    if let Some(bad) = outputs.iter().find(|i| **i as usize >= tx.outputs.len()) {
        return Err(format!(
            "output {bad} out of range ({} outputs)",
            tx.outputs.len()
        ));
    }
    let retained: BTreeSet<u32> = decided.coins_to_retain.into_iter().collect();
    if let Some(bad) = retained.iter().find(|i| !previous_coins.contains(i)) {
        return Err(format!("input {bad} is not a previous coin of this topic"));
    }
    let removed = previous_coins
        .iter()
        .copied()
        .filter(|i| !retained.contains(i))
        .collect();

    Ok(AdmittanceInstructions {
        outputs_to_admit: outputs.into_iter().collect(),
        coins_to_retain: retained.into_iter().collect(),
        coins_removed: removed,
        ancillary_txids: decided.ancillary_txids,
    })
}
