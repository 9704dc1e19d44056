//! Ledger integration tests
//!
//! Drives the public API end to end: mining, validation, persistence through
//! sled, fork resolution and pushed-block handling.

use gossip_ledger::core::GENESIS_PREV_HASH;
use gossip_ledger::{
    is_valid_chain, Block, BlockKey, ChainStore, Ledger, LedgerError, MemoryChainStore, Payload,
    PeerTransport, PushOutcome, RejectReason, Resolver, Result, SledChainStore,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;

fn memory_ledger(difficulty: u32) -> Ledger {
    Ledger::open(Arc::new(MemoryChainStore::new()), difficulty).unwrap()
}

fn grow(ledger: &Ledger, n: usize) {
    for i in 0..n {
        ledger
            .append(Payload::from(json!({ "n": i })), Some(1))
            .unwrap();
    }
}

/// Peers that answer from in-process ledgers
#[derive(Default)]
struct LocalPeers {
    ledgers: HashMap<String, Ledger>,
}

impl PeerTransport for LocalPeers {
    fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>> {
        match self.ledgers.get(peer) {
            Some(ledger) => ledger.snapshot(),
            None => Err(LedgerError::Network(format!("{peer} unreachable"))),
        }
    }

    fn push_block(&self, peer: &str, block: &Block) -> Result<PushOutcome> {
        match self.ledgers.get(peer) {
            Some(ledger) => ledger.accept_pushed(block.clone()),
            None => Err(LedgerError::Network(format!("{peer} unreachable"))),
        }
    }
}

#[test]
fn test_two_appends_on_genesis() {
    let ledger = memory_ledger(2);

    let genesis = ledger.tip().unwrap();
    assert_eq!(genesis.get_index(), 0);
    assert_eq!(genesis.get_difficulty(), 1);
    assert_eq!(genesis.get_prev_hash(), GENESIS_PREV_HASH);

    ledger
        .append(Payload::from(json!({"msg": "a"})), None)
        .unwrap();
    ledger
        .append(Payload::from(json!({"msg": "b"})), None)
        .unwrap();

    let chain = ledger.snapshot().unwrap();
    assert_eq!(chain.len(), 3);
    assert!(is_valid_chain(&chain));
    for block in &chain[1..] {
        assert_eq!(block.get_difficulty(), 2);
        assert!(block.get_hash().starts_with("00"));
    }

    let first = ledger.lookup(&BlockKey::ByIndex(1)).unwrap().unwrap();
    assert_eq!(first.get_payload(), &json!({"msg": "a"}));
}

#[test]
fn test_appends_keep_indices_and_links() {
    let ledger = memory_ledger(1);
    grow(&ledger, 6);

    let chain = ledger.snapshot().unwrap();
    assert_eq!(chain.len(), 7);
    for (i, block) in chain.iter().enumerate() {
        assert_eq!(block.get_index(), i as u64);
        assert!(block.hash_matches());
    }
    for pair in chain.windows(2) {
        assert_eq!(pair[1].get_prev_hash(), pair[0].get_hash());
    }
}

#[test]
fn test_chain_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("node_3001");

    let before = {
        let ledger = Ledger::open(Arc::new(SledChainStore::open(&db_path).unwrap()), 1).unwrap();
        grow(&ledger, 3);
        ledger.snapshot().unwrap()
    };

    let ledger = Ledger::open(Arc::new(SledChainStore::open(&db_path).unwrap()), 1).unwrap();
    assert_eq!(ledger.snapshot().unwrap(), before);
    assert_eq!(ledger.height().unwrap(), 3);
}

#[test]
fn test_replace_persists_shorter_chain_cleanly() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("node_3002");
    let store = Arc::new(SledChainStore::open(&db_path).unwrap());
    let ledger = Ledger::open(store.clone(), 1).unwrap();
    grow(&ledger, 2);

    let longer = memory_ledger(1);
    grow(&longer, 4);
    assert!(ledger.replace(longer.snapshot().unwrap()).unwrap());
    assert_eq!(store.load().unwrap(), longer.snapshot().unwrap());
}

#[test]
fn test_resolve_adopts_longer_chain_and_not_the_reverse() {
    let short = memory_ledger(1);
    grow(&short, 2);
    let long = memory_ledger(1);
    grow(&long, 4);
    assert_eq!(short.len().unwrap(), 3);
    assert_eq!(long.len().unwrap(), 5);

    let mut peers = LocalPeers::default();
    peers.ledgers.insert("short".to_string(), short.clone());
    peers.ledgers.insert("long".to_string(), long.clone());
    let peers = Arc::new(peers);

    let from_long = Resolver::new(long.clone(), peers.clone());
    let outcome = from_long.resolve(&["short".to_string()]).unwrap();
    assert!(!outcome.replaced);
    assert_eq!(long.len().unwrap(), 5);

    let from_short = Resolver::new(short.clone(), peers);
    let outcome = from_short
        .resolve(&["missing".to_string(), "long".to_string()])
        .unwrap();
    assert!(outcome.replaced);
    assert_eq!(outcome.peers_failed, 1);
    assert_eq!(short.snapshot().unwrap(), long.snapshot().unwrap());
}

#[test]
fn test_pushed_block_must_be_next() {
    let ledger = memory_ledger(1);
    grow(&ledger, 2);
    let tip = ledger.tip().unwrap();

    let skip_ahead =
        Block::new_block(5, tip.get_hash().to_string(), Payload::from(json!("late")), 1).unwrap();
    let outcome = ledger.accept_pushed(skip_ahead).unwrap();
    assert_eq!(
        outcome,
        PushOutcome::Rejected {
            reason: RejectReason::BadIndex,
            height: 2
        }
    );

    let next = Block::new_successor(&tip, Payload::from(json!("next")), 1).unwrap();
    assert_eq!(
        ledger.accept_pushed(next).unwrap(),
        PushOutcome::Accepted { height: 3 }
    );
}

#[test]
fn test_corrupt_store_falls_back_to_genesis() {
    let source = memory_ledger(1);
    grow(&source, 3);
    let mut blocks = source.snapshot().unwrap();
    blocks.swap(1, 2);

    let ledger = Ledger::open(Arc::new(MemoryChainStore::with_blocks(blocks)), 1).unwrap();
    assert_eq!(ledger.len().unwrap(), 1);
    assert_eq!(ledger.tip().unwrap(), Block::generate_genesis_block());
}
