//! The overlay node: wires the output store, chain tracker and topic
//! managers into the admittance pipeline and the per-topic GASP endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::Instrument;

use overlay_engine::{AdmittancePipeline, SubmitError};
use overlay_gasp::{
    Gasp, GaspRemote, GaspResponder, InProcessRemote, OverlayGaspStorage, SyncReport,
};
use overlay_store::{
    Output, OutputLookup, OutputStore, SpentFilter, StoreError, UtxoEnumeration,
};
use overlay_store_lmdb::LmdbEnvironment;
use overlay_topics::{TopicDocumentation, TopicManagers};
use overlay_transactions::ChainTracker;
use overlay_types::{Outpoint, Score, ScoreClock, Steak, SubmitMode, TaggedBundle};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::tracing_spans;

/// A topic overlay node hosting a fixed set of topics.
pub struct OverlayNode {
    config: NodeConfig,
    store: Arc<dyn OutputStore>,
    chain_tracker: Arc<dyn ChainTracker>,
    managers: Arc<TopicManagers>,
    clock: Arc<ScoreClock>,
    pipeline: AdmittancePipeline,
    responders: BTreeMap<String, Arc<GaspResponder>>,
    metrics: Arc<NodeMetrics>,
}

impl OverlayNode {
    /// Build a node over an already opened store.
    ///
    /// Every topic in `config.topics` must have a manager in `managers`.
    /// Managers registered for topics not listed in the config are hosted
    /// too.
    pub fn new(
        config: NodeConfig,
        store: Arc<dyn OutputStore>,
        chain_tracker: Arc<dyn ChainTracker>,
        managers: TopicManagers,
    ) -> Result<Self, NodeError> {
        if let Some(missing) = config.topics.iter().find(|t| !managers.contains(t)) {
            return Err(NodeError::Config(format!(
                "topic {missing} has no topic manager"
            )));
        }
        if managers.is_empty() {
            return Err(NodeError::Config("no topics hosted".into()));
        }
        let managers = Arc::new(managers);

        let mut floor = Score::ZERO;
        for topic in managers.topics() {
            if let Some(last) = store.find_utxos_for_topic(topic, Score::ZERO, 0, true)?.last() {
                floor = floor.max(last.score);
            }
        }
        let clock = Arc::new(ScoreClock::starting_after(floor));

        let pipeline = AdmittancePipeline::new(
            store.clone(),
            chain_tracker.clone(),
            managers.clone(),
            clock.clone(),
            config.submission.clone(),
        );

        let metrics = Arc::new(NodeMetrics::new());
        metrics.topics_hosted.set(managers.len() as i64);

        let mut node = Self {
            config,
            store,
            chain_tracker,
            managers,
            clock,
            pipeline,
            responders: BTreeMap::new(),
            metrics,
        };
        let topics: Vec<String> = node.managers.topics().map(str::to_owned).collect();
        for topic in topics {
            let storage = node.storage(&topic)?;
            let responder = GaspResponder::new(storage, node.config.gasp.clone());
            node.responders.insert(topic, Arc::new(responder));
        }

        tracing::info!(
            topics = node.responders.len(),
            score_floor = floor.value(),
            "overlay node ready"
        );
        Ok(node)
    }

    /// Open the LMDB store under `config.data_dir` and build a node on it.
    pub fn open(
        config: NodeConfig,
        chain_tracker: Arc<dyn ChainTracker>,
        managers: TopicManagers,
    ) -> Result<Self, NodeError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let env = LmdbEnvironment::open(&config.data_dir, config.map_size)?;
        tracing::info!(data_dir = %config.data_dir.display(), "output store opened");
        let store: Arc<dyn OutputStore> = Arc::new(env.output_store());
        Self::new(config, store, chain_tracker, managers)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    pub fn store(&self) -> &Arc<dyn OutputStore> {
        &self.store
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.responders.keys().map(String::as_str)
    }

    pub fn topic_documentation(&self) -> BTreeMap<String, TopicDocumentation> {
        self.managers.documentation()
    }

    // ── Submission ─────────────────────────────────────────────────────

    /// Submit a tagged bundle and wait for its acknowledgment.
    ///
    /// A timeout only stops the waiting: evaluation continues and its
    /// effects are still applied.
    pub async fn submit(&self, tagged: TaggedBundle, mode: SubmitMode) -> Result<Steak, NodeError> {
        let span = tracing_spans::submit_span(tagged.bundle.len(), tagged.topics.len());
        let started = Instant::now();
        let result = async {
            let pending = self.pipeline.submit(tagged, mode).await?;
            pending.wait(self.config.submission.submit_timeout()).await
        }
        .instrument(span)
        .await;

        self.metrics
            .submission_latency_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        match &result {
            Ok(steak) => {
                self.metrics.submissions_accepted.inc();
                let admitted: usize = steak.values().map(|i| i.outputs_to_admit.len()).sum();
                self.metrics.outputs_admitted.inc_by(admitted as u64);
            }
            Err(SubmitError::Timeout(after)) => {
                tracing::warn!(after_ms = after.as_millis() as u64, "acknowledgment timed out");
                self.metrics.submission_timeouts.inc();
            }
            Err(e) => {
                tracing::debug!(error = %e, "submission rejected");
                self.metrics.submissions_rejected.inc();
            }
        }
        Ok(result?)
    }

    // ── Lookup ─────────────────────────────────────────────────────────

    /// Unspent outputs of `topic` newer than `since`, oldest first.
    pub fn lookup_utxos(
        &self,
        topic: &str,
        since: Score,
        limit: u32,
    ) -> Result<Vec<Output>, NodeError> {
        let _span = tracing_spans::lookup_span(topic).entered();
        self.require_topic(topic)?;
        Ok(self.store.find_utxos_for_topic(topic, since, limit, false)?)
    }

    /// One output of `topic`, spent or not.
    pub fn find_output(&self, outpoint: &Outpoint, topic: &str) -> Result<Output, NodeError> {
        self.require_topic(topic)?;
        self.store
            .find_output(outpoint, Some(topic), SpentFilter::Any)?
            .ok_or_else(|| StoreError::NotFound(format!("{outpoint} in {topic}")).into())
    }

    // ── Sync ───────────────────────────────────────────────────────────

    /// The GASP endpoint remote peers talk to for `topic`.
    pub fn responder(&self, topic: &str) -> Result<Arc<GaspResponder>, NodeError> {
        self.responders
            .get(topic)
            .cloned()
            .ok_or_else(|| NodeError::UnknownTopic(topic.to_owned()))
    }

    /// This node's responder for `topic`, usable as another node's remote.
    pub fn remote(&self, topic: &str) -> Result<Arc<dyn GaspRemote>, NodeError> {
        Ok(Arc::new(InProcessRemote::new(self.responder(topic)?)))
    }

    /// A fresh sync session with `remote` for `topic`.
    pub fn gasp_session(
        &self,
        topic: &str,
        remote: Arc<dyn GaspRemote>,
    ) -> Result<Gasp, NodeError> {
        Ok(Gasp::new(self.storage(topic)?, remote, self.config.gasp.clone()))
    }

    /// Run a single sync round with `remote` for `topic`.
    pub async fn sync_topic(
        &self,
        topic: &str,
        remote: Arc<dyn GaspRemote>,
        peer: &str,
    ) -> Result<SyncReport, NodeError> {
        let session = self.gasp_session(topic, remote)?;
        self.run_sync(&session, peer).await
    }

    /// Sync `topic` with `remote` every `sync_interval_secs` until
    /// `shutdown` fires. The first round starts immediately, and the
    /// low-water mark carries over between rounds.
    pub fn spawn_sync_loop(
        self: &Arc<Self>,
        topic: &str,
        remote: Arc<dyn GaspRemote>,
        peer: String,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, NodeError> {
        let period = self.config.sync_interval();
        if period.is_zero() {
            return Err(NodeError::Config("sync_interval_secs must be positive".into()));
        }
        let session = self.gasp_session(topic, remote)?;
        let node = Arc::clone(self);

        Ok(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => {
                        tracing::info!(topic = session.topic(), %peer, "sync loop shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = node.run_sync(&session, &peer).await {
                            tracing::warn!(topic = session.topic(), %peer, error = %e, "sync round failed");
                        }
                    }
                }
            }
        }))
    }

    async fn run_sync(&self, session: &Gasp, peer: &str) -> Result<SyncReport, NodeError> {
        let span = tracing_spans::sync_span(session.topic(), peer);
        let started = Instant::now();
        let result = session.sync().instrument(span).await;

        self.metrics.sync_rounds.inc();
        self.metrics
            .sync_duration_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);
        let report = result?;
        self.metrics
            .graphs_committed
            .inc_by(report.committed.len() as u64);
        self.metrics
            .graphs_discarded
            .inc_by(report.failed.len() as u64);
        self.metrics
            .outputs_synced
            .inc_by(report.outputs_committed as u64);
        self.metrics.nodes_pushed.inc_by(report.pushed as u64);
        Ok(report)
    }

    fn storage(&self, topic: &str) -> Result<OverlayGaspStorage, NodeError> {
        let manager = self
            .managers
            .get(topic)
            .ok_or_else(|| NodeError::UnknownTopic(topic.to_owned()))?;
        Ok(OverlayGaspStorage::new(
            topic,
            self.store.clone(),
            self.chain_tracker.clone(),
            manager,
            self.clock.clone(),
            self.config.gasp.max_nodes_per_graph,
        ))
    }

    fn require_topic(&self, topic: &str) -> Result<(), NodeError> {
        if self.responders.contains_key(topic) {
            Ok(())
        } else {
            Err(NodeError::UnknownTopic(topic.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_nullables::{spend, NullChainTracker, NullOutputStore, NullTopicManager};
    use overlay_types::TxId;

    fn node_with(store: Arc<NullOutputStore>, manager: NullTopicManager) -> OverlayNode {
        let config = NodeConfig {
            topics: vec!["tm_test".into()],
            ..NodeConfig::default()
        };
        OverlayNode::new(
            config,
            store,
            Arc::new(NullChainTracker::new()),
            TopicManagers::new().with("tm_test", Arc::new(manager)),
        )
        .unwrap()
    }

    fn funding(b: u8) -> Outpoint {
        Outpoint::new(TxId::new([b; 32]), 0)
    }

    #[test]
    fn test_configured_topic_without_manager_rejected() {
        let config = NodeConfig {
            topics: vec!["tm_missing".into()],
            ..NodeConfig::default()
        };
        let result = OverlayNode::new(
            config,
            Arc::new(NullOutputStore::new()),
            Arc::new(NullChainTracker::new()),
            TopicManagers::new().with("tm_test", Arc::new(NullTopicManager::admit_all())),
        );
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[tokio::test]
    async fn test_submit_updates_metrics() {
        let store = Arc::new(NullOutputStore::new());
        let node = node_with(store.clone(), NullTopicManager::admit_all());
        let fx = spend(&[funding(1)], 2, 0);

        let steak = node
            .submit(
                TaggedBundle::new(fx.bundle(None).encode(), vec!["tm_test".into()]),
                SubmitMode::Current,
            )
            .await
            .unwrap();

        assert_eq!(steak["tm_test"].outputs_to_admit, vec![0, 1]);
        assert_eq!(node.metrics().submissions_accepted.get(), 1);
        assert_eq!(node.metrics().outputs_admitted.get(), 2);
        assert_eq!(node.lookup_utxos("tm_test", Score::ZERO, 0).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_submission_counted() {
        let node = node_with(Arc::new(NullOutputStore::new()), NullTopicManager::admit_all());
        let err = node
            .submit(
                TaggedBundle::new(vec![0xff; 4], vec!["tm_test".into()]),
                SubmitMode::Current,
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(node.metrics().submissions_rejected.get(), 1);
    }

    #[test]
    fn test_lookup_unknown_topic() {
        let node = node_with(Arc::new(NullOutputStore::new()), NullTopicManager::admit_all());
        let err = node.lookup_utxos("tm_other", Score::ZERO, 10).unwrap_err();
        assert!(matches!(err, NodeError::UnknownTopic(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_find_output_missing_is_not_found() {
        let node = node_with(Arc::new(NullOutputStore::new()), NullTopicManager::admit_all());
        let err = node.find_output(&funding(9), "tm_test").unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_zero_sync_interval_rejected() {
        let mut node = node_with(Arc::new(NullOutputStore::new()), NullTopicManager::admit_all());
        node.config.sync_interval_secs = 0;
        let node = Arc::new(node);
        let shutdown = crate::ShutdownController::new();
        let remote = node.remote("tm_test").unwrap();
        let result = node.spawn_sync_loop("tm_test", remote, "self".into(), shutdown.subscribe());
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
