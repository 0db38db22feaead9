//! The bounded graph builder.
//!
//! Nodes received from an untrusted peer are held in memory, per graph,
//! until the whole graph is anchored and committed or discarded. A graph
//! never holds more than `max_nodes_per_graph` nodes. Every link is checked
//! against the transactions themselves: a node's parent is the graph node
//! whose transaction spends the node's output.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use overlay_store::{
    AppliedTransactionStore, Output, OutputLookup, OutputStore, OutputWriter, SpentFilter,
    StoreError,
};
use overlay_topics::TopicManager;
use overlay_transactions::{verify_merkle_path, ChainTracker, ProofBundle, Transaction};
use overlay_types::{GraphId, Outpoint, Score, ScoreClock, SubmitMode};

use crate::messages::{GaspNode, NodeResponse, UtxoEntry};
use crate::GaspError;

struct GraphNode {
    node: GaspNode,
    tx: Transaction,
    /// The graph node spending this one. `None` only for the root.
    parent: Option<Outpoint>,
    /// Graph nodes this one spends.
    children: Vec<Outpoint>,
}

type NodeCopy = (Outpoint, GaspNode, Transaction);

#[derive(Default)]
struct Graph {
    nodes: HashMap<Outpoint, GraphNode>,
}

/// Graph builder for one topic and one sync session.
pub struct OverlayGaspStorage {
    topic: String,
    store: Arc<dyn OutputStore>,
    chain_tracker: Arc<dyn ChainTracker>,
    topic_manager: Arc<dyn TopicManager>,
    clock: Arc<ScoreClock>,
    max_nodes_per_graph: usize,
    graphs: Mutex<HashMap<GraphId, Graph>>,
}

impl OverlayGaspStorage {
    pub fn new(
        topic: impl Into<String>,
        store: Arc<dyn OutputStore>,
        chain_tracker: Arc<dyn ChainTracker>,
        topic_manager: Arc<dyn TopicManager>,
        clock: Arc<ScoreClock>,
        max_nodes_per_graph: usize,
    ) -> Self {
        Self {
            topic: topic.into(),
            store,
            chain_tracker,
            topic_manager,
            clock,
            max_nodes_per_graph,
            graphs: Mutex::new(HashMap::new()),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn max_nodes_per_graph(&self) -> usize {
        self.max_nodes_per_graph
    }

    /// UTXOs of the topic with a score above `since`, lowest score first.
    /// `limit = 0` means unlimited.
    pub fn find_known_utxos(
        &self,
        since: Score,
        limit: u32,
    ) -> Result<Vec<UtxoEntry>, GaspError> {
        let outputs = self
            .store
            .find_utxos_for_topic(&self.topic, since, limit, false)?;
        Ok(outputs
            .into_iter()
            .map(|o| UtxoEntry {
                outpoint: o.outpoint,
                score: o.score,
            })
            .collect())
    }

    /// Whether the topic already holds `outpoint`, spent or not.
    pub fn is_known(&self, outpoint: &Outpoint) -> Result<bool, GaspError> {
        Ok(self
            .store
            .find_output(outpoint, Some(&self.topic), SpentFilter::Any)?
            .is_some())
    }

    /// Add `node` to its graph.
    ///
    /// Without a parent the node must be the graph's root. With one, the
    /// parent must already be in the graph and its transaction must spend
    /// the node's output. Appending an outpoint the graph already holds
    /// succeeds without changing anything.
    pub async fn append_to_graph(
        &self,
        node: &GaspNode,
        parent: Option<Outpoint>,
    ) -> Result<(), GaspError> {
        let tx = Transaction::from_bytes(&node.raw_tx)?;
        let outpoint = tx.outpoint(node.output_index)?;
        let graph_id = node.graph_id;

        let mut graphs = self.graphs.lock().await;
        match parent {
            None => {
                if outpoint != *graph_id.root() {
                    return Err(GaspError::RootMismatch { graph_id, outpoint });
                }
                if graphs
                    .get(&graph_id)
                    .is_some_and(|g| g.nodes.contains_key(&outpoint))
                {
                    return Ok(());
                }
                if self.max_nodes_per_graph == 0 {
                    return Err(GaspError::GraphFull {
                        graph_id,
                        max: self.max_nodes_per_graph,
                    });
                }
                graphs.entry(graph_id).or_default().nodes.insert(
                    outpoint,
                    GraphNode {
                        node: node.clone(),
                        tx,
                        parent: None,
                        children: Vec::new(),
                    },
                );
            }
            Some(parent) => {
                let graph = graphs
                    .get_mut(&graph_id)
                    .ok_or(GaspError::DanglingParent { graph_id, parent })?;
                let spender = graph
                    .nodes
                    .get(&parent)
                    .ok_or(GaspError::DanglingParent { graph_id, parent })?;
                if !spender.tx.spends(&outpoint) {
                    return Err(GaspError::ParentMismatch { parent, outpoint });
                }
                if graph.nodes.contains_key(&outpoint) {
                    return Ok(());
                }
                if graph.nodes.len() >= self.max_nodes_per_graph {
                    return Err(GaspError::GraphFull {
                        graph_id,
                        max: self.max_nodes_per_graph,
                    });
                }
                graph.nodes.insert(
                    outpoint,
                    GraphNode {
                        node: node.clone(),
                        tx,
                        parent: Some(parent),
                        children: Vec::new(),
                    },
                );
                if let Some(spender) = graph.nodes.get_mut(&parent) {
                    spender.children.push(outpoint);
                }
            }
        }

        tracing::trace!(%graph_id, %outpoint, ?parent, "node appended");
        Ok(())
    }

    /// Drop every node of `graph_id`. Unknown graphs are ignored.
    pub async fn discard_graph(&self, graph_id: &GraphId) -> Result<(), GaspError> {
        if let Some(graph) = self.graphs.lock().await.remove(graph_id) {
            tracing::debug!(%graph_id, nodes = graph.nodes.len(), "graph discarded");
        }
        Ok(())
    }

    pub async fn node_count(&self, graph_id: &GraphId) -> usize {
        self.graphs
            .lock()
            .await
            .get(graph_id)
            .map_or(0, |g| g.nodes.len())
    }

    /// How many more nodes `graph_id` accepts.
    pub async fn remaining_capacity(&self, graph_id: &GraphId) -> usize {
        self.max_nodes_per_graph
            .saturating_sub(self.node_count(graph_id).await)
    }

    pub async fn contains(&self, graph_id: &GraphId, outpoint: &Outpoint) -> bool {
        self.graphs
            .lock()
            .await
            .get(graph_id)
            .is_some_and(|g| g.nodes.contains_key(outpoint))
    }

    /// Rebuild the node at `outpoint` from the output store, tagged with the
    /// caller's `graph_id`.
    pub fn hydrate_gasp_node(
        &self,
        graph_id: GraphId,
        outpoint: &Outpoint,
        include_proof: bool,
    ) -> Result<GaspNode, GaspError> {
        let output = self
            .store
            .find_output(outpoint, Some(&self.topic), SpentFilter::Any)?
            .ok_or_else(|| {
                StoreError::NotFound(format!("output {outpoint} in topic {}", self.topic))
            })?;
        let bundle = ProofBundle::decode(&output.bundle)?;
        let proof = if include_proof {
            bundle.merkle_path
        } else {
            None
        };
        Ok(GaspNode::new(graph_id, bundle.raw_tx, outpoint.output_index).with_proof(proof))
    }

    /// Inputs of `node` that must still be fetched before it is anchored.
    ///
    /// A node with a Merkle path accepted by the chain tracker needs nothing.
    /// Otherwise every input not already held by the topic is requested.
    pub async fn find_needed_inputs(
        &self,
        node: &GaspNode,
    ) -> Result<Option<NodeResponse>, GaspError> {
        let tx = Transaction::from_bytes(&node.raw_tx)?;
        if let Some(path) = &node.proof {
            if verify_merkle_path(self.chain_tracker.as_ref(), &tx.txid(), path).await? {
                return Ok(None);
            }
        }

        let mut requested_inputs = Vec::new();
        for input in &tx.inputs {
            if !self.is_known(&input.previous_output)? {
                requested_inputs.push(input.previous_output);
            }
        }
        if requested_inputs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(NodeResponse { requested_inputs }))
        }
    }

    /// Check that `graph_id` is fully anchored and that the topic admits
    /// its root.
    ///
    /// Every node must carry a valid Merkle path or have each input either
    /// in the graph or already held by the topic.
    pub async fn validate_graph_anchor(&self, graph_id: &GraphId) -> Result<(), GaspError> {
        let (nodes, root) = self.snapshot(graph_id).await?;
        let in_graph: HashSet<Outpoint> = nodes.iter().map(|(op, _, _)| *op).collect();

        for (outpoint, node, tx) in &nodes {
            if let Some(path) = &node.proof {
                if verify_merkle_path(self.chain_tracker.as_ref(), &tx.txid(), path).await? {
                    continue;
                }
            }
            for input in &tx.inputs {
                let op = &input.previous_output;
                if !in_graph.contains(op) && !self.is_known(op)? {
                    return Err(GaspError::AnchorInvalid {
                        graph_id: *graph_id,
                        reason: format!("{outpoint} spends unresolved {op}"),
                    });
                }
            }
        }

        let root_tx = &root.2;
        let mut previous_coins = Vec::new();
        for (index, input) in root_tx.inputs.iter().enumerate() {
            let op = &input.previous_output;
            if in_graph.contains(op) || self.is_known(op)? {
                previous_coins.push(index as u32);
            }
        }
        let instructions = self
            .topic_manager
            .identify_admissible_outputs(root_tx, &previous_coins, SubmitMode::Historical)
            .await?;
        if !instructions.outputs_to_admit.contains(&root.1.output_index) {
            return Err(GaspError::AnchorInvalid {
                graph_id: *graph_id,
                reason: format!("topic {} does not admit the root output", self.topic),
            });
        }
        Ok(())
    }

    /// Write every node of `graph_id` to the output store, ancestors first,
    /// then drop the graph. Returns the number of outputs inserted.
    ///
    /// The root is stored unspent; every other node is stored spent by its
    /// parent. Inputs already held unspent by the topic are marked spent.
    ///
    /// Each node is written with its own store calls and its output record
    /// goes in last, so a stored output means the node is fully committed.
    /// If the store fails midway the ancestors written so far stay, and
    /// finalizing the same graph again skips them and commits the rest.
    pub async fn finalize_graph(&self, graph_id: &GraphId) -> Result<usize, GaspError> {
        let ordered = {
            let graphs = self.graphs.lock().await;
            let graph = graphs
                .get(graph_id)
                .ok_or(GaspError::UnknownGraph(*graph_id))?;
            let mut order = Vec::with_capacity(graph.nodes.len());
            let mut queue = VecDeque::from([*graph_id.root()]);
            while let Some(op) = queue.pop_front() {
                if let Some(entry) = graph.nodes.get(&op) {
                    queue.extend(entry.children.iter().copied());
                    order.push((
                        op,
                        entry.node.clone(),
                        entry.tx.clone(),
                        entry.parent,
                        entry.children.clone(),
                    ));
                }
            }
            order.reverse();
            order
        };

        let mut inserted = 0;
        for (outpoint, node, tx, parent, children) in ordered {
            if self.is_known(&outpoint)? {
                continue;
            }
            for input in &tx.inputs {
                let op = &input.previous_output;
                let held = self
                    .store
                    .find_output(op, Some(&self.topic), SpentFilter::Unspent)?;
                if held.is_some() {
                    self.store.mark_utxos_as_spent(&[*op], &self.topic)?;
                    self.store.update_consumed_by(op, &self.topic, &[outpoint])?;
                }
            }
            self.store
                .insert_applied_transaction(&outpoint.txid, &self.topic)?;
            let block_height = node.proof.as_ref().map(|p| p.block_height);
            let bundle = ProofBundle::new(node.raw_tx, node.proof).encode();
            self.store.insert_output(&Output {
                outpoint,
                topic: self.topic.clone(),
                spent: parent.is_some(),
                bundle,
                block_height,
                score: self.clock.next(),
                consumed_by: parent.into_iter().collect(),
                outputs_consumed: children,
            })?;
            inserted += 1;
        }

        self.discard_graph(graph_id).await?;
        tracing::info!(%graph_id, topic = %self.topic, inserted, "graph committed");
        Ok(inserted)
    }

    /// Copy every node of `graph_id` out of the lock, plus the root on its own.
    async fn snapshot(
        &self,
        graph_id: &GraphId,
    ) -> Result<(Vec<NodeCopy>, NodeCopy), GaspError> {
        let graphs = self.graphs.lock().await;
        let graph = graphs
            .get(graph_id)
            .ok_or(GaspError::UnknownGraph(*graph_id))?;
        let root = graph
            .nodes
            .get(graph_id.root())
            .map(|n| (*graph_id.root(), n.node.clone(), n.tx.clone()))
            .ok_or(GaspError::UnknownGraph(*graph_id))?;
        let nodes = graph
            .nodes
            .iter()
            .map(|(op, n)| (*op, n.node.clone(), n.tx.clone()))
            .collect();
        Ok((nodes, root))
    }
}
