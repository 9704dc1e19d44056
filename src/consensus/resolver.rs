//! Longest-valid-chain fork resolution
//!
//! Every peer's chain is fetched on its own scoped thread. The results are
//! then reduced in peer-list order, so the outcome does not depend on which
//! fetch finished first: a candidate wins only if it validates, shares our
//! genesis and is strictly longer than the best seen so far (initially our
//! own chain). Equal lengths never displace an earlier candidate.

use crate::core::{check_chain, Block, Ledger};
use crate::error::{LedgerError, Result};
use crate::network::PeerTransport;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;

/// Result of one resolve round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOutcome {
    pub replaced: bool,
    pub height: u64,
    pub peers_queried: usize,
    pub peers_failed: usize,
    pub adopted_from: Option<String>,
}

#[derive(Clone)]
pub struct Resolver {
    ledger: Ledger,
    transport: Arc<dyn PeerTransport>,
}

impl Resolver {
    pub fn new(ledger: Ledger, transport: Arc<dyn PeerTransport>) -> Resolver {
        Resolver { ledger, transport }
    }

    pub fn resolve(&self, peers: &[String]) -> Result<ResolveOutcome> {
        let fetched = self.fetch_all(peers);
        let genesis = self.ledger.genesis()?;
        let (best, peers_failed) = select_best(self.ledger.len()?, genesis.get_hash(), fetched);

        let mut adopted_from = None;
        if let Some((peer, blocks)) = best {
            let len = blocks.len();
            if self.ledger.replace(blocks)? {
                info!("Adopted chain of {len} block(s) from {peer}");
                adopted_from = Some(peer);
            }
        }

        let outcome = ResolveOutcome {
            replaced: adopted_from.is_some(),
            height: self.ledger.height()?,
            peers_queried: peers.len(),
            peers_failed,
            adopted_from,
        };
        info!(
            "Resolve finished: replaced={}, height={}, {} of {} peer(s) failed",
            outcome.replaced, outcome.height, outcome.peers_failed, outcome.peers_queried
        );
        Ok(outcome)
    }

    fn fetch_all(&self, peers: &[String]) -> Vec<(String, Result<Vec<Block>>)> {
        let transport = self.transport.as_ref();
        thread::scope(|scope| {
            let handles: Vec<_> = peers
                .iter()
                .map(|peer| (peer, scope.spawn(move || transport.fetch_chain(peer))))
                .collect();
            handles
                .into_iter()
                .map(|(peer, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(LedgerError::Network(format!("Fetch from {peer} panicked")))
                    });
                    (peer.clone(), result)
                })
                .collect()
        })
    }
}

/// Pick the strictly longest valid candidate sharing `genesis_hash`.
///
/// Returns the winner, if any beat `local_len`, and how many peers failed or
/// answered with an unusable chain.
pub fn select_best(
    local_len: usize,
    genesis_hash: &str,
    fetched: Vec<(String, Result<Vec<Block>>)>,
) -> (Option<(String, Vec<Block>)>, usize) {
    let mut best: Option<(String, Vec<Block>)> = None;
    let mut best_len = local_len;
    let mut failed = 0;

    for (peer, result) in fetched {
        let blocks = match result {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!("Skipping peer {peer}: {e}");
                failed += 1;
                continue;
            }
        };
        if let Err(fault) = check_chain(&blocks) {
            warn!("Skipping chain from {peer}: {fault}");
            failed += 1;
            continue;
        }
        if blocks.first().map(Block::get_hash) != Some(genesis_hash) {
            warn!("Skipping chain from {peer}: foreign genesis");
            failed += 1;
            continue;
        }
        if blocks.len() > best_len {
            best_len = blocks.len();
            best = Some((peer, blocks));
        }
    }
    (best, failed)
}
