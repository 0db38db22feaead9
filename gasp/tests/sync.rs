//! Two in-process peers reconciling one topic.

use std::sync::Arc;

use overlay_gasp::{
    Gasp, GaspConfig, GaspError, GaspNode, GaspResponder, InProcessRemote, OverlayGaspStorage,
};
use overlay_nullables::{
    anchor, spend, NullChainTracker, NullOutputStore, NullTopicManager, TxFixture,
};
use overlay_store::{Output, OutputLookup, OutputWriter, SpentFilter};
use overlay_transactions::{txid_of, MerklePath, ProofBundle};
use overlay_types::{GraphId, Outpoint, Score, ScoreClock, TxId};

const TOPIC: &str = "tm_tokens";

struct Peer {
    store: Arc<NullOutputStore>,
    manager: Arc<NullTopicManager>,
    clock: Arc<ScoreClock>,
}

impl Peer {
    fn new() -> Self {
        Self {
            store: Arc::new(NullOutputStore::new()),
            manager: Arc::new(NullTopicManager::admit_all()),
            clock: Arc::new(ScoreClock::new()),
        }
    }

    fn storage(&self, tracker: &Arc<NullChainTracker>, max: usize) -> OverlayGaspStorage {
        OverlayGaspStorage::new(
            TOPIC,
            self.store.clone(),
            tracker.clone(),
            self.manager.clone(),
            self.clock.clone(),
            max,
        )
    }

    fn responder(&self, tracker: &Arc<NullChainTracker>, config: &GaspConfig) -> InProcessRemote {
        let storage = self.storage(tracker, config.max_nodes_per_graph);
        InProcessRemote::new(Arc::new(GaspResponder::new(storage, config.clone())))
    }

    fn seed(&self, fx: &TxFixture, proof: Option<MerklePath>, spent: bool) {
        self.store
            .insert_output(&Output {
                outpoint: fx.outpoint(0),
                topic: TOPIC.into(),
                spent,
                bundle: fx.bundle(proof.clone()).encode(),
                block_height: proof.map(|p| p.block_height),
                score: self.clock.next(),
                consumed_by: Vec::new(),
                outputs_consumed: Vec::new(),
            })
            .unwrap();
    }

    fn holds_unspent(&self, outpoint: &Outpoint) -> bool {
        self.store
            .find_output(outpoint, Some(TOPIC), SpentFilter::Unspent)
            .unwrap()
            .is_some()
    }
}

fn funding(b: u8) -> Outpoint {
    Outpoint::new(TxId::new([b; 32]), 0)
}

/// `depth` transactions in a line; only the first is mined.
fn chain(depth: u8, tracker: &NullChainTracker) -> (Vec<TxFixture>, MerklePath) {
    let mut txs = vec![spend(&[funding(0xaa)], 1, 0)];
    for i in 1..depth {
        let prev = txs[i as usize - 1].outpoint(0);
        txs.push(spend(&[prev], 1, i as u32));
    }
    let path = anchor(&txs[0], 700, tracker);
    (txs, path)
}

/// `fx` with its unlocking script length re-encoded as `fd 01 00`.
fn non_minimal(fx: &TxFixture) -> Vec<u8> {
    let mut raw = fx.raw[..41].to_vec();
    raw.extend_from_slice(&[0xfd, 0x01, 0x00]);
    raw.extend_from_slice(&fx.raw[42..]);
    raw
}

fn seed_chain(peer: &Peer, txs: &[TxFixture], path: &MerklePath) {
    for (i, fx) in txs.iter().enumerate() {
        let proof = if i == 0 { Some(path.clone()) } else { None };
        peer.seed(fx, proof, i + 1 < txs.len());
    }
}

#[tokio::test]
async fn test_pull_resolves_ancestors_and_commits() {
    let tracker = Arc::new(NullChainTracker::new());
    let (alice, bob) = (Peer::new(), Peer::new());
    let (txs, path) = chain(3, &tracker);
    seed_chain(&bob, &txs, &path);

    let config = GaspConfig::default();
    let gasp = Gasp::new(
        alice.storage(&tracker, config.max_nodes_per_graph),
        Arc::new(bob.responder(&tracker, &config)),
        config,
    );
    let report = gasp.sync().await.unwrap();

    assert!(report.is_clean());
    assert_eq!(report.listed, 1);
    assert_eq!(report.committed.len(), 1);
    assert_eq!(report.outputs_committed, 3);
    assert!(alice.holds_unspent(&txs[2].outpoint(0)));
    assert!(!alice.holds_unspent(&txs[0].outpoint(0)));
    assert_eq!(alice.store.len(), 3);

    for output in alice.store.outputs_for_topic(TOPIC) {
        let bundle = ProofBundle::decode(&output.bundle).unwrap();
        assert_eq!(bundle.txid(), output.outpoint.txid);
    }

    let root_score = bob.store.outputs_for_topic(TOPIC)[2].score;
    assert_eq!(gasp.since().await, root_score);

    let again = gasp.sync().await.unwrap();
    assert_eq!(again.listed, 0);
    assert!(again.committed.is_empty());
}

#[tokio::test]
async fn test_deep_graph_over_budget_is_discarded() {
    let tracker = Arc::new(NullChainTracker::new());
    let (alice, bob) = (Peer::new(), Peer::new());
    let (txs, path) = chain(5, &tracker);
    seed_chain(&bob, &txs, &path);

    let config = GaspConfig {
        max_nodes_per_graph: 3,
        unidirectional: true,
        ..GaspConfig::default()
    };
    let gasp = Gasp::new(
        alice.storage(&tracker, config.max_nodes_per_graph),
        Arc::new(bob.responder(&tracker, &GaspConfig::default())),
        config,
    );
    let report = gasp.sync().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].1,
        GaspError::GraphFull { max: 3, .. }
    ));
    assert!(alice.store.is_empty());
    assert_eq!(gasp.since().await, Score::ZERO);
}

#[tokio::test]
async fn test_unanchored_graph_is_not_committed() {
    let tracker = Arc::new(NullChainTracker::new());
    let (alice, bob) = (Peer::new(), Peer::new());
    let orphan = spend(&[funding(1)], 1, 0);
    bob.seed(&orphan, None, false);

    let config = GaspConfig {
        unidirectional: true,
        ..GaspConfig::default()
    };
    let gasp = Gasp::new(
        alice.storage(&tracker, config.max_nodes_per_graph),
        Arc::new(bob.responder(&tracker, &config)),
        config,
    );
    let report = gasp.sync().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, GaspError::Store(_)));
    assert!(alice.store.is_empty());
}

#[tokio::test]
async fn test_reply_phase_pushes_missing_utxos() {
    let tracker = Arc::new(NullChainTracker::new());
    let (alice, bob) = (Peer::new(), Peer::new());
    let (txs, path) = chain(2, &tracker);
    seed_chain(&alice, &txs, &path);

    let config = GaspConfig::default();
    let gasp = Gasp::new(
        alice.storage(&tracker, config.max_nodes_per_graph),
        Arc::new(bob.responder(&tracker, &config)),
        config,
    );
    let report = gasp.sync().await.unwrap();

    assert!(report.is_clean());
    assert_eq!(report.listed, 0);
    assert_eq!(report.pushed, 2);
    assert!(bob.holds_unspent(&txs[1].outpoint(0)));
    assert_eq!(bob.store.len(), 2);
}

#[tokio::test]
async fn test_unidirectional_sync_pushes_nothing() {
    let tracker = Arc::new(NullChainTracker::new());
    let (alice, bob) = (Peer::new(), Peer::new());
    let mined = spend(&[funding(3)], 1, 0);
    let path = anchor(&mined, 10, &tracker);
    alice.seed(&mined, Some(path), false);

    let config = GaspConfig {
        unidirectional: true,
        ..GaspConfig::default()
    };
    let gasp = Gasp::new(
        alice.storage(&tracker, config.max_nodes_per_graph),
        Arc::new(bob.responder(&tracker, &config)),
        config,
    );
    let report = gasp.sync().await.unwrap();

    assert_eq!(report.pushed, 0);
    assert!(bob.store.is_empty());
}

#[tokio::test]
async fn test_already_known_utxos_are_skipped() {
    let tracker = Arc::new(NullChainTracker::new());
    let (alice, bob) = (Peer::new(), Peer::new());
    let mined = spend(&[funding(4)], 1, 0);
    let path = anchor(&mined, 11, &tracker);
    alice.seed(&mined, Some(path.clone()), false);
    bob.seed(&mined, Some(path), false);

    let config = GaspConfig::default();
    let gasp = Gasp::new(
        alice.storage(&tracker, config.max_nodes_per_graph),
        Arc::new(bob.responder(&tracker, &config)),
        config,
    );
    let report = gasp.sync().await.unwrap();

    assert_eq!(report.already_known, 1);
    assert!(report.committed.is_empty());
    assert_eq!(report.pushed, 0);
    assert_eq!(bob.manager.calls(), 0);
}

#[tokio::test]
async fn test_non_minimal_transaction_is_not_pulled() {
    let tracker = Arc::new(NullChainTracker::new());
    let (alice, bob) = (Peer::new(), Peer::new());
    let fx = spend(&[funding(5)], 1, 0);
    let raw = non_minimal(&fx);
    bob.store
        .insert_output(&Output {
            outpoint: Outpoint::new(txid_of(&raw), 0),
            topic: TOPIC.into(),
            spent: false,
            bundle: ProofBundle::new(raw, None).encode(),
            block_height: None,
            score: bob.clock.next(),
            consumed_by: Vec::new(),
            outputs_consumed: Vec::new(),
        })
        .unwrap();

    let config = GaspConfig {
        unidirectional: true,
        ..GaspConfig::default()
    };
    let gasp = Gasp::new(
        alice.storage(&tracker, config.max_nodes_per_graph),
        Arc::new(bob.responder(&tracker, &config)),
        config,
    );
    let report = gasp.sync().await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, GaspError::Malformed(_)));
    assert!(alice.store.is_empty());
    assert_eq!(gasp.since().await, Score::ZERO);
}

#[tokio::test]
async fn test_pushed_non_minimal_root_is_rejected() {
    let tracker = Arc::new(NullChainTracker::new());
    let bob = Peer::new();
    let config = GaspConfig::default();
    let responder = GaspResponder::new(bob.storage(&tracker, config.max_nodes_per_graph), config);

    let raw = non_minimal(&spend(&[funding(6)], 1, 0));
    let graph_id = GraphId::new(Outpoint::new(txid_of(&raw), 0));
    let result = responder.receive_node(GaspNode::new(graph_id, raw, 0)).await;

    assert!(matches!(result, Err(GaspError::Malformed(_))));
    assert_eq!(responder.pending_graphs().await, 0);
    assert!(bob.store.is_empty());
    assert_eq!(bob.manager.calls(), 0);
}
