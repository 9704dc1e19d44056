use crate::consensus::{ResolveOutcome, Resolver};
use crate::core::{Block, BlockKey, ChainStatus, Ledger, Payload, PushOutcome};
use crate::error::Result;
use crate::network::{Broadcast, Gossip, PeerDirectory, PeerTransport};
use log::info;
use std::sync::Arc;

/// Everything one node needs to answer queries, mine, gossip and resolve.
///
/// Cloning is cheap; every clone shares the same ledger and peer list.
#[derive(Clone)]
pub struct Node {
    ledger: Ledger,
    peers: Arc<PeerDirectory>,
    gossip: Gossip,
    resolver: Resolver,
}

impl Node {
    pub fn new(ledger: Ledger, peers: PeerDirectory, transport: Arc<dyn PeerTransport>) -> Node {
        Node {
            gossip: Gossip::new(ledger.clone(), Arc::clone(&transport)),
            resolver: Resolver::new(ledger.clone(), transport),
            peers: Arc::new(peers),
            ledger,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    /// Mine a block on our tip and start gossiping it.
    ///
    /// The block is committed before the broadcast begins; the returned
    /// handle can be dropped without affecting delivery.
    pub fn mine(&self, payload: Payload, difficulty: Option<u32>) -> Result<(Block, Broadcast)> {
        let block = self.ledger.append(payload, difficulty)?;
        let peers = self.peers.list()?;
        info!(
            "Broadcasting block {} to {} peer(s)",
            block.get_hash(),
            peers.len()
        );
        let broadcast = self.gossip.broadcast(&block, &peers);
        Ok((block, broadcast))
    }

    pub fn receive_block(&self, block: Block) -> Result<PushOutcome> {
        self.gossip.on_receive(block)
    }

    /// Adopt the longest valid chain among the known peers
    pub fn resolve(&self) -> Result<ResolveOutcome> {
        let peers = self.peers.list()?;
        self.resolver.resolve(&peers)
    }

    pub fn tip(&self) -> Result<(Block, u64)> {
        let tip = self.ledger.tip()?;
        let height = tip.get_index();
        Ok((tip, height))
    }

    pub fn status(&self) -> Result<ChainStatus> {
        self.ledger.status()
    }

    pub fn lookup(&self, key: &BlockKey) -> Result<Option<Block>> {
        self.ledger.lookup(key)
    }
}
