//! Test utilities for ledger and network testing

use crate::core::{Block, Ledger, Payload, PushOutcome};
use crate::error::{LedgerError, Result};
use crate::network::PeerTransport;
use crate::storage::{ChainStore, MemoryChainStore};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// A fresh ledger holding only genesis, backed by memory
pub fn memory_ledger(default_difficulty: u32) -> Ledger {
    Ledger::open(Arc::new(MemoryChainStore::new()), default_difficulty)
        .expect("memory ledger should open")
}

/// Append `n` blocks at difficulty 1 (easy for fast tests)
pub fn grow(ledger: &Ledger, n: usize) {
    for i in 0..n {
        ledger
            .append(Payload::from(json!({ "n": i })), Some(1))
            .expect("append should succeed");
    }
}

/// Memory store whose saves can be switched to fail
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryChainStore,
    failing: AtomicBool,
}

impl FailingStore {
    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ChainStore for FailingStore {
    fn load(&self) -> Result<Vec<Block>> {
        self.inner.load()
    }

    fn save(&self, blocks: &[Block]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Database("disk unavailable".to_string()));
        }
        self.inner.save(blocks)
    }
}

enum FakePeer {
    Live(Ledger),
    Static(Vec<Block>),
    Down,
}

/// Peers addressed by name, answering straight from their ledgers
#[derive(Default)]
pub struct FakeNetwork {
    peers: RwLock<HashMap<String, FakePeer>>,
}

impl FakeNetwork {
    /// A peer backed by a real ledger; pushes are applied to it
    pub fn join(&self, name: &str, ledger: Ledger) {
        self.insert(name, FakePeer::Live(ledger));
    }

    /// A peer that serves a fixed chain and refuses pushes
    pub fn serve_chain(&self, name: &str, blocks: Vec<Block>) {
        self.insert(name, FakePeer::Static(blocks));
    }

    /// A peer that cannot be reached
    pub fn take_down(&self, name: &str) {
        self.insert(name, FakePeer::Down);
    }

    fn insert(&self, name: &str, peer: FakePeer) {
        self.peers
            .write()
            .expect("fake network lock")
            .insert(name.to_string(), peer);
    }

    fn unreachable(peer: &str) -> LedgerError {
        LedgerError::Network(format!("Failed to connect to {peer}: unreachable"))
    }
}

impl PeerTransport for FakeNetwork {
    fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>> {
        let peers = self.peers.read().expect("fake network lock");
        match peers.get(peer) {
            Some(FakePeer::Live(ledger)) => ledger.snapshot(),
            Some(FakePeer::Static(blocks)) => Ok(blocks.clone()),
            Some(FakePeer::Down) | None => Err(FakeNetwork::unreachable(peer)),
        }
    }

    fn push_block(&self, peer: &str, block: &Block) -> Result<PushOutcome> {
        let ledger = {
            let peers = self.peers.read().expect("fake network lock");
            match peers.get(peer) {
                Some(FakePeer::Live(ledger)) => ledger.clone(),
                _ => return Err(FakeNetwork::unreachable(peer)),
            }
        };
        ledger.accept_pushed(block.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow() {
        let ledger = memory_ledger(1);
        grow(&ledger, 3);
        assert_eq!(ledger.len().unwrap(), 4);
        assert!(ledger.is_valid().unwrap());
    }

    #[test]
    fn test_fake_network_routes_by_name() {
        let network = FakeNetwork::default();
        let live = memory_ledger(1);
        network.join("live", live.clone());
        network.serve_chain("static", vec![Block::generate_genesis_block()]);
        network.take_down("down");

        assert_eq!(network.fetch_chain("live").unwrap().len(), 1);
        assert_eq!(network.fetch_chain("static").unwrap().len(), 1);
        assert!(network.fetch_chain("down").is_err());
        assert!(network.fetch_chain("unknown").is_err());

        let source = memory_ledger(1);
        let block = source.append(Payload::from(json!("x")), None).unwrap();
        assert!(network.push_block("live", &block).unwrap().is_accepted());
        assert!(network.push_block("static", &block).is_err());
        assert_eq!(live.len().unwrap(), 2);
    }
}
