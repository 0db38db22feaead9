//! Answering side of GASP.
//!
//! Serves the initial listing and single nodes from the local store, and
//! accepts nodes pushed by a requester during its reply phase. A pushed
//! graph is committed once its last requested input arrives. At most
//! `max_pending_pushes` pushed graphs wait for inputs at once, and a graph
//! that receives nothing for `push_idle_timeout_secs` is dropped.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::time::Instant;

use overlay_types::{GraphId, Outpoint};

use crate::messages::{GaspNode, InitialRequest, InitialResponse, NodeResponse, GASP_VERSION};
use crate::{GaspConfig, GaspError, OverlayGaspStorage};

/// A pushed graph still missing inputs.
struct PendingPush {
    /// Requested input and the node spending it.
    waiting: HashMap<Outpoint, Outpoint>,
    touched: Instant,
}

impl PendingPush {
    fn new() -> Self {
        Self {
            waiting: HashMap::new(),
            touched: Instant::now(),
        }
    }
}

pub struct GaspResponder {
    storage: OverlayGaspStorage,
    config: GaspConfig,
    pending: Mutex<HashMap<GraphId, PendingPush>>,
}

impl GaspResponder {
    pub fn new(storage: OverlayGaspStorage, config: GaspConfig) -> Self {
        Self {
            storage,
            config,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn topic(&self) -> &str {
        self.storage.topic()
    }

    /// Pushed graphs currently waiting for inputs.
    pub async fn pending_graphs(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub fn get_initial_response(
        &self,
        request: &InitialRequest,
    ) -> Result<InitialResponse, GaspError> {
        if request.version != GASP_VERSION {
            return Err(GaspError::VersionMismatch {
                expected: GASP_VERSION,
                got: request.version,
            });
        }
        let utxo_list = self
            .storage
            .find_known_utxos(request.since, self.config.initial_limit)?;
        tracing::debug!(
            topic = self.topic(),
            since = request.since.value(),
            listed = utxo_list.len(),
            "initial response"
        );
        Ok(InitialResponse {
            since: request.since,
            utxo_list,
        })
    }

    pub fn provide_foreign_gasp_node(
        &self,
        graph_id: GraphId,
        outpoint: &Outpoint,
    ) -> Result<GaspNode, GaspError> {
        self.storage.hydrate_gasp_node(graph_id, outpoint, true)
    }

    /// Accept a pushed node. Returns the inputs still needed from the
    /// pusher, or `None` once nothing more is needed for this node.
    ///
    /// Any failure discards the node's whole graph.
    pub async fn receive_node(&self, node: GaspNode) -> Result<Option<NodeResponse>, GaspError> {
        self.expire_idle().await?;
        let graph_id = node.graph_id;
        let result = self.accept(&node).await;
        if let Err(e) = &result {
            tracing::warn!(%graph_id, error = %e, "pushed graph rejected");
            self.pending.lock().await.remove(&graph_id);
            self.storage.discard_graph(&graph_id).await?;
        }
        result
    }

    /// Drop pushed graphs that have waited longer than the idle timeout.
    async fn expire_idle(&self) -> Result<(), GaspError> {
        let timeout = self.config.push_idle_timeout();
        let expired: Vec<GraphId> = {
            let mut pending = self.pending.lock().await;
            let expired: Vec<GraphId> = pending
                .iter()
                .filter(|(_, push)| push.touched.elapsed() >= timeout)
                .map(|(graph_id, _)| *graph_id)
                .collect();
            for graph_id in &expired {
                pending.remove(graph_id);
            }
            expired
        };
        for graph_id in &expired {
            tracing::debug!(%graph_id, "idle pushed graph dropped");
            self.storage.discard_graph(graph_id).await?;
        }
        Ok(())
    }

    async fn accept(&self, node: &GaspNode) -> Result<Option<NodeResponse>, GaspError> {
        let graph_id = node.graph_id;
        let outpoint = node.checked_outpoint()?;

        let parent = if outpoint == *graph_id.root() {
            if self.storage.is_known(&outpoint)? {
                return Ok(None);
            }
            let mut pending = self.pending.lock().await;
            if !pending.contains_key(&graph_id) {
                if pending.len() >= self.config.max_pending_pushes {
                    return Err(GaspError::TooManyPendingGraphs {
                        max: self.config.max_pending_pushes,
                    });
                }
                pending.insert(graph_id, PendingPush::new());
            }
            None
        } else {
            let spender = self
                .pending
                .lock()
                .await
                .get_mut(&graph_id)
                .and_then(|push| push.waiting.remove(&outpoint))
                .ok_or(GaspError::UnexpectedNode { graph_id, outpoint })?;
            Some(spender)
        };
        self.storage.append_to_graph(node, parent).await?;

        let needed = self.storage.find_needed_inputs(node).await?;
        let mut pending = self.pending.lock().await;
        let push = pending.entry(graph_id).or_insert_with(PendingPush::new);
        push.touched = Instant::now();

        let mut requested_inputs = Vec::new();
        for input in needed.map(|n| n.requested_inputs).unwrap_or_default() {
            if push.waiting.contains_key(&input)
                || requested_inputs.contains(&input)
                || self.storage.contains(&graph_id, &input).await
            {
                continue;
            }
            requested_inputs.push(input);
        }

        let in_flight = self.storage.node_count(&graph_id).await + push.waiting.len();
        if in_flight + requested_inputs.len() > self.storage.max_nodes_per_graph() {
            return Err(GaspError::GraphFull {
                graph_id,
                max: self.storage.max_nodes_per_graph(),
            });
        }
        for input in &requested_inputs {
            push.waiting.insert(*input, outpoint);
        }
        if !requested_inputs.is_empty() {
            return Ok(Some(NodeResponse { requested_inputs }));
        }
        if !push.waiting.is_empty() {
            return Ok(None);
        }

        pending.remove(&graph_id);
        drop(pending);
        self.storage.validate_graph_anchor(&graph_id).await?;
        self.storage.finalize_graph(&graph_id).await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_nullables::{
        anchor, spend, NullChainTracker, NullOutputStore, NullTopicManager,
    };
    use overlay_store::{Output, OutputLookup, OutputWriter, SpentFilter};
    use overlay_types::{Score, ScoreClock, TxId};
    use std::sync::Arc;

    fn responder(max: usize) -> (Arc<NullOutputStore>, Arc<NullChainTracker>, GaspResponder) {
        let store = Arc::new(NullOutputStore::new());
        let tracker = Arc::new(NullChainTracker::new());
        let storage = OverlayGaspStorage::new(
            "tm_test",
            store.clone(),
            tracker.clone(),
            Arc::new(NullTopicManager::admit_all()),
            Arc::new(ScoreClock::new()),
            max,
        );
        let config = GaspConfig {
            max_nodes_per_graph: max,
            initial_limit: 2,
            max_pending_pushes: 2,
            push_idle_timeout_secs: 30,
            ..GaspConfig::default()
        };
        (store, tracker, GaspResponder::new(storage, config))
    }

    fn funding(b: u8) -> Outpoint {
        Outpoint::new(TxId::new([b; 32]), 0)
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let (_, _, responder) = responder(10);
        let request = InitialRequest {
            version: GASP_VERSION + 1,
            since: Score::ZERO,
        };
        assert!(matches!(
            responder.get_initial_response(&request),
            Err(GaspError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_initial_response_capped_by_limit() {
        let (store, _, responder) = responder(10);
        for i in 0..3u8 {
            let fx = spend(&[funding(i + 1)], 1, i as u32);
            store
                .insert_output(&Output {
                    outpoint: fx.outpoint(0),
                    topic: "tm_test".into(),
                    spent: false,
                    bundle: fx.bundle(None).encode(),
                    block_height: None,
                    score: Score::new(10 + i as u64),
                    consumed_by: Vec::new(),
                    outputs_consumed: Vec::new(),
                })
                .unwrap();
        }
        let response = responder
            .get_initial_response(&InitialRequest {
                version: GASP_VERSION,
                since: Score::ZERO,
            })
            .unwrap();
        assert_eq!(response.utxo_list.len(), 2);
        assert_eq!(response.utxo_list[0].score, Score::new(10));
    }

    #[tokio::test]
    async fn test_pushed_graph_committed_when_complete() {
        let (store, tracker, responder) = responder(10);
        let ancestor = spend(&[funding(1)], 1, 0);
        let path = anchor(&ancestor, 50, &tracker);
        let root = spend(&[ancestor.outpoint(0)], 1, 1);
        let graph_id = GraphId::new(root.outpoint(0));

        let response = responder
            .receive_node(GaspNode::new(graph_id, root.raw.clone(), 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.requested_inputs, vec![ancestor.outpoint(0)]);

        let done = responder
            .receive_node(GaspNode::new(graph_id, ancestor.raw.clone(), 0).with_proof(Some(path)))
            .await
            .unwrap();
        assert!(done.is_none());
        assert!(store
            .find_output(&root.outpoint(0), Some("tm_test"), SpentFilter::Unspent)
            .unwrap()
            .is_some());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_unrequested_node_discards_graph() {
        let (store, _, responder) = responder(10);
        let ancestor = spend(&[funding(1)], 1, 0);
        let root = spend(&[ancestor.outpoint(0)], 1, 1);
        let stranger = spend(&[funding(2)], 1, 2);
        let graph_id = GraphId::new(root.outpoint(0));

        responder
            .receive_node(GaspNode::new(graph_id, root.raw.clone(), 0))
            .await
            .unwrap();
        let result = responder
            .receive_node(GaspNode::new(graph_id, stranger.raw.clone(), 0))
            .await;
        assert!(matches!(result, Err(GaspError::UnexpectedNode { .. })));
        assert!(store.is_empty());

        // The graph is gone, so the real ancestor is now unexpected too.
        assert!(responder
            .receive_node(GaspNode::new(graph_id, ancestor.raw.clone(), 0))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_pending_pushed_graphs_are_capped() {
        let (_, _, responder) = responder(10);
        for i in 1..=2u8 {
            let root = spend(&[funding(i)], 1, i as u32);
            let graph_id = GraphId::new(root.outpoint(0));
            let asked = responder
                .receive_node(GaspNode::new(graph_id, root.raw.clone(), 0))
                .await
                .unwrap();
            assert!(asked.is_some());
        }

        let third = spend(&[funding(3)], 1, 3);
        let result = responder
            .receive_node(GaspNode::new(GraphId::new(third.outpoint(0)), third.raw.clone(), 0))
            .await;
        assert!(matches!(
            result,
            Err(GaspError::TooManyPendingGraphs { max: 2 })
        ));
        assert_eq!(responder.pending_graphs().await, 2);
        assert_eq!(responder.storage.node_count(&GraphId::new(third.outpoint(0))).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_pushed_graphs_expire() {
        let (store, tracker, responder) = responder(10);
        let ancestor = spend(&[funding(1)], 1, 0);
        let root = spend(&[ancestor.outpoint(0)], 1, 1);
        let graph_id = GraphId::new(root.outpoint(0));
        responder
            .receive_node(GaspNode::new(graph_id, root.raw.clone(), 0))
            .await
            .unwrap();
        assert_eq!(responder.pending_graphs().await, 1);

        tokio::time::advance(std::time::Duration::from_secs(31)).await;

        // Any later push sweeps the idle graph, so its input is no longer awaited.
        let path = anchor(&ancestor, 50, &tracker);
        let late = responder
            .receive_node(GaspNode::new(graph_id, ancestor.raw.clone(), 0).with_proof(Some(path)))
            .await;
        assert!(matches!(late, Err(GaspError::UnexpectedNode { .. })));
        assert_eq!(responder.pending_graphs().await, 0);
        assert_eq!(responder.storage.node_count(&graph_id).await, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_pushed_graph_budget_checked_before_requesting() {
        let (_, _, responder) = responder(2);
        let inputs: Vec<Outpoint> = (1..=3).map(funding).collect();
        let root = spend(&inputs, 1, 0);
        let graph_id = GraphId::new(root.outpoint(0));

        let result = responder
            .receive_node(GaspNode::new(graph_id, root.raw.clone(), 0))
            .await;
        assert!(matches!(result, Err(GaspError::GraphFull { max: 2, .. })));
    }
}
