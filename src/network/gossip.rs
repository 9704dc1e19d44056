//! Block gossip
//!
//! Outbound: every freshly mined block is pushed to each known peer on its
//! own thread. Pushes are best effort; a slow or dead peer costs only its own
//! thread and never reaches the miner as an error.
//!
//! Inbound: a pushed block goes straight to the ledger, which appends it only
//! if it is the exact successor of the current tip.

use crate::core::{Block, Ledger, PushOutcome};
use crate::error::{RejectReason, Result};
use crate::network::PeerTransport;
use log::{info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// What happened to one push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    Rejected(RejectReason),
    Failed,
}

/// Tally of a finished broadcast
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// In-flight pushes of one block. Dropping it detaches the pushes.
pub struct Broadcast {
    handles: Vec<JoinHandle<Delivery>>,
    spawn_failures: usize,
}

impl Broadcast {
    pub fn len(&self) -> usize {
        self.handles.len() + self.spawn_failures
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until every push has finished or timed out
    pub fn wait(self) -> BroadcastReport {
        let mut report = BroadcastReport {
            failed: self.spawn_failures,
            ..BroadcastReport::default()
        };
        for handle in self.handles {
            match handle.join() {
                Ok(Delivery::Accepted) => report.delivered += 1,
                Ok(Delivery::Rejected(_)) => report.rejected += 1,
                Ok(Delivery::Failed) | Err(_) => report.failed += 1,
            }
        }
        report
    }
}

#[derive(Clone)]
pub struct Gossip {
    ledger: Ledger,
    transport: Arc<dyn PeerTransport>,
}

impl Gossip {
    pub fn new(ledger: Ledger, transport: Arc<dyn PeerTransport>) -> Gossip {
        Gossip { ledger, transport }
    }

    /// Push `block` to every peer concurrently and return without waiting
    pub fn broadcast(&self, block: &Block, peers: &[String]) -> Broadcast {
        let mut broadcast = Broadcast {
            handles: Vec::with_capacity(peers.len()),
            spawn_failures: 0,
        };
        for peer in peers {
            let transport = Arc::clone(&self.transport);
            let block = block.clone();
            let target = peer.clone();
            let spawned = thread::Builder::new()
                .name(format!("gossip-{peer}"))
                .spawn(move || push_to_peer(transport.as_ref(), &target, &block));
            match spawned {
                Ok(handle) => broadcast.handles.push(handle),
                Err(e) => {
                    warn!("Failed to spawn gossip thread for {peer}: {e}");
                    broadcast.spawn_failures += 1;
                }
            }
        }
        broadcast
    }

    /// Hand a block pushed by a peer to the ledger
    pub fn on_receive(&self, block: Block) -> Result<PushOutcome> {
        self.ledger.accept_pushed(block)
    }
}

fn push_to_peer(transport: &dyn PeerTransport, peer: &str, block: &Block) -> Delivery {
    match transport.push_block(peer, block) {
        Ok(PushOutcome::Accepted { height }) => {
            info!(
                "Peer {peer} accepted block {} (height {height})",
                block.get_hash()
            );
            Delivery::Accepted
        }
        Ok(PushOutcome::Rejected { reason, height }) => {
            info!(
                "Peer {peer} rejected block {}: {reason} (height {height})",
                block.get_hash()
            );
            Delivery::Rejected(reason)
        }
        Err(e) => {
            warn!("Failed to push block {} to {peer}: {e}", block.get_hash());
            Delivery::Failed
        }
    }
}
