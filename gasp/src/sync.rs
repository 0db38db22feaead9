//! Requesting side of GASP.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use overlay_types::{GraphId, Outpoint, Score};

use crate::messages::{GaspNode, InitialRequest, InitialResponse, GASP_VERSION};
use crate::{GaspConfig, GaspError, GaspRemote, OverlayGaspStorage};

/// Outcome of one [`Gasp::sync`] run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// UTXOs the remote listed.
    pub listed: usize,
    /// Listed UTXOs already held locally.
    pub already_known: usize,
    /// Graphs resolved and committed.
    pub committed: Vec<GraphId>,
    /// Outputs written while committing those graphs.
    pub outputs_committed: usize,
    /// Graphs discarded, with the reason.
    pub failed: Vec<(GraphId, GaspError)>,
    /// Nodes pushed to the remote during the reply phase.
    pub pushed: usize,
    pub push_failures: Vec<(GraphId, GaspError)>,
    /// Low-water mark to use for the next sync with this remote.
    pub since: Score,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.push_failures.is_empty()
    }
}

/// Sync session with one remote peer for one topic.
pub struct Gasp {
    storage: OverlayGaspStorage,
    remote: Arc<dyn GaspRemote>,
    config: GaspConfig,
    since: Mutex<Score>,
}

impl Gasp {
    pub fn new(
        storage: OverlayGaspStorage,
        remote: Arc<dyn GaspRemote>,
        config: GaspConfig,
    ) -> Self {
        Self {
            storage,
            remote,
            config,
            since: Mutex::new(Score::ZERO),
        }
    }

    /// Resume from a low-water mark saved by an earlier session.
    pub fn with_since(self, since: Score) -> Self {
        Self {
            since: Mutex::new(since),
            ..self
        }
    }

    pub async fn since(&self) -> Score {
        *self.since.lock().await
    }

    pub fn topic(&self) -> &str {
        self.storage.topic()
    }

    /// Pull every UTXO the remote holds above our low-water mark, then push
    /// back the ones it lacks unless the session is unidirectional.
    ///
    /// Graph failures are recorded in the report and do not stop the run.
    /// The low-water mark advances up to, not past, the first failed UTXO.
    pub async fn sync(&self) -> Result<SyncReport, GaspError> {
        let since = self.since().await;
        let response = self
            .remote
            .get_initial_response(InitialRequest {
                version: GASP_VERSION,
                since,
            })
            .await?;

        let mut report = SyncReport {
            listed: response.utxo_list.len(),
            since,
            ..SyncReport::default()
        };
        let mut entries = response.utxo_list.clone();
        entries.sort_by_key(|e| e.score);

        let mut high_water = since;
        let mut stalled = false;
        for entry in &entries {
            let graph_id = GraphId::new(entry.outpoint);
            let outcome = match self.storage.is_known(&entry.outpoint) {
                Ok(true) => {
                    report.already_known += 1;
                    Ok(())
                }
                Ok(false) => self.resolve(graph_id).await.map(|inserted| {
                    report.committed.push(graph_id);
                    report.outputs_committed += inserted;
                }),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) if !stalled => high_water = high_water.max(entry.score),
                Ok(()) => {}
                Err(e) => {
                    tracing::warn!(%graph_id, topic = self.topic(), error = %e, "graph discarded");
                    self.storage.discard_graph(&graph_id).await?;
                    report.failed.push((graph_id, e));
                    stalled = true;
                }
            }
        }
        report.since = high_water;
        *self.since.lock().await = high_water;

        if !self.config.unidirectional {
            self.reply(&response, &mut report).await?;
        }

        tracing::info!(
            topic = self.topic(),
            listed = report.listed,
            committed = report.committed.len(),
            failed = report.failed.len(),
            pushed = report.pushed,
            since = report.since.value(),
            "sync finished"
        );
        Ok(report)
    }

    /// Fetch `graph_id` and its unresolved ancestors, then validate and
    /// commit it.
    async fn resolve(&self, graph_id: GraphId) -> Result<usize, GaspError> {
        let root_outpoint = *graph_id.root();
        let root = self.fetch(graph_id, root_outpoint).await?;
        self.storage.append_to_graph(&root, None).await?;

        let mut scheduled = HashSet::from([root_outpoint]);
        let mut worklist = VecDeque::new();
        self.schedule(&root, root_outpoint, &mut scheduled, &mut worklist)
            .await?;

        while let Some((needed, spender)) = worklist.pop_front() {
            let node = self.fetch(graph_id, needed).await?;
            self.storage.append_to_graph(&node, Some(spender)).await?;
            self.schedule(&node, needed, &mut scheduled, &mut worklist)
                .await?;
        }

        self.storage.validate_graph_anchor(&graph_id).await?;
        self.storage.finalize_graph(&graph_id).await
    }

    /// Queue the missing inputs of `node`. The queue plus the graph may
    /// never exceed the node budget.
    async fn schedule(
        &self,
        node: &GaspNode,
        outpoint: Outpoint,
        scheduled: &mut HashSet<Outpoint>,
        worklist: &mut VecDeque<(Outpoint, Outpoint)>,
    ) -> Result<(), GaspError> {
        let Some(needed) = self.storage.find_needed_inputs(node).await? else {
            return Ok(());
        };
        for input in needed.requested_inputs {
            if !scheduled.insert(input) {
                continue;
            }
            let committed = self.storage.node_count(&node.graph_id).await;
            if committed + worklist.len() >= self.storage.max_nodes_per_graph() {
                return Err(GaspError::GraphFull {
                    graph_id: node.graph_id,
                    max: self.storage.max_nodes_per_graph(),
                });
            }
            worklist.push_back((input, outpoint));
        }
        Ok(())
    }

    async fn fetch(&self, graph_id: GraphId, outpoint: Outpoint) -> Result<GaspNode, GaspError> {
        let node = self.remote.request_node(graph_id, outpoint).await?;
        if node.graph_id != graph_id || node.outpoint() != outpoint {
            return Err(GaspError::Remote(format!(
                "asked for {outpoint} in {graph_id}, got {} in {}",
                node.outpoint(),
                node.graph_id
            )));
        }
        Ok(node)
    }

    /// Push local UTXOs newer than the remote's low-water mark that the
    /// remote did not list.
    async fn reply(
        &self,
        response: &InitialResponse,
        report: &mut SyncReport,
    ) -> Result<(), GaspError> {
        let theirs: HashSet<Outpoint> = response.utxo_list.iter().map(|e| e.outpoint).collect();
        let ours = self.storage.find_known_utxos(response.since, 0)?;
        for entry in ours.iter().filter(|e| !theirs.contains(&e.outpoint)) {
            let graph_id = GraphId::new(entry.outpoint);
            match self.push_graph(graph_id).await {
                Ok(pushed) => report.pushed += pushed,
                Err(e) => {
                    tracing::warn!(%graph_id, topic = self.topic(), error = %e, "push failed");
                    report.push_failures.push((graph_id, e));
                }
            }
        }
        Ok(())
    }

    /// Push `graph_id`'s root and whatever ancestors the remote asks for.
    async fn push_graph(&self, graph_id: GraphId) -> Result<usize, GaspError> {
        let root = self
            .storage
            .hydrate_gasp_node(graph_id, graph_id.root(), true)?;
        let mut sent = HashSet::from([*graph_id.root()]);
        let mut queue = VecDeque::from([root]);
        let mut pushed = 0;

        while let Some(node) = queue.pop_front() {
            let response = self.remote.submit_node(node).await?;
            pushed += 1;
            let requested = response.map(|r| r.requested_inputs).unwrap_or_default();
            for input in requested {
                if !sent.insert(input) {
                    continue;
                }
                if sent.len() > self.config.max_nodes_per_graph {
                    return Err(GaspError::GraphFull {
                        graph_id,
                        max: self.config.max_nodes_per_graph,
                    });
                }
                queue.push_back(self.storage.hydrate_gasp_node(graph_id, &input, true)?);
            }
        }
        Ok(pushed)
    }
}
