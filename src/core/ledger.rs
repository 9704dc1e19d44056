// The ledger owns the node's chain. Every read takes the read lock and every
// mutation the write lock, so nobody observes a half-applied append or replace.
// Mining happens outside the chain lock; a separate gate keeps it to one at a time.

use crate::core::hasher::is_attainable_difficulty;
use crate::core::validator::{check_chain, check_successor};
use crate::core::{Block, Payload};
use crate::error::{LedgerError, RejectReason, Result};
use crate::storage::ChainStore;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

pub const DEFAULT_DIFFICULTY: u32 = 2;

/// How a caller names the block it wants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKey {
    ByIndex(u64),
    ByHash(String),
}

/// Verdict on a block pushed by a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PushOutcome {
    Accepted { height: u64 },
    Rejected { reason: RejectReason, height: u64 },
}

impl PushOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PushOutcome::Accepted { .. })
    }

    pub fn height(&self) -> u64 {
        match self {
            PushOutcome::Accepted { height } | PushOutcome::Rejected { height, .. } => *height,
        }
    }
}

/// Full copy of the chain together with its validity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStatus {
    pub blocks: Vec<Block>,
    pub height: u64,
    pub valid: bool,
}

#[derive(Clone)]
pub struct Ledger {
    chain: Arc<RwLock<Vec<Block>>>,
    mining: Arc<Mutex<()>>,
    store: Arc<dyn ChainStore>,
    default_difficulty: u32,
}

impl Ledger {
    /// Load the chain from `store`, falling back to a fresh genesis
    pub fn open(store: Arc<dyn ChainStore>, default_difficulty: u32) -> Result<Ledger> {
        let loaded = match store.load() {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!("Failed to load chain, starting from genesis: {e}");
                Vec::new()
            }
        };

        let chain = if loaded.is_empty() {
            Vec::new()
        } else if let Err(fault) = check_chain(&loaded) {
            warn!("Stored chain is invalid ({fault}), starting from genesis");
            Vec::new()
        } else if loaded[0] != Block::generate_genesis_block() {
            warn!("Stored chain has a foreign genesis, starting from genesis");
            Vec::new()
        } else {
            info!("Loaded {} block(s) from storage", loaded.len());
            loaded
        };

        let ledger = Ledger {
            chain: Arc::new(RwLock::new(chain)),
            mining: Arc::new(Mutex::new(())),
            store,
            default_difficulty,
        };
        ledger.ensure_genesis()?;
        Ok(ledger)
    }

    fn ensure_genesis(&self) -> Result<()> {
        let mut chain = self.write()?;
        if chain.is_empty() {
            let genesis = Block::generate_genesis_block();
            info!("Creating genesis block {}", genesis.get_hash());
            chain.push(genesis);
            if let Err(e) = self.store.save(&chain) {
                chain.clear();
                return Err(e);
            }
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Block>>> {
        self.chain
            .read()
            .map_err(|e| LedgerError::Lock(format!("Failed to acquire read lock on chain: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Block>>> {
        self.chain
            .write()
            .map_err(|e| LedgerError::Lock(format!("Failed to acquire write lock on chain: {e}")))
    }

    pub fn get_default_difficulty(&self) -> u32 {
        self.default_difficulty
    }

    pub fn tip(&self) -> Result<Block> {
        self.read()?.last().cloned().ok_or(LedgerError::EmptyLedger)
    }

    pub fn genesis(&self) -> Result<Block> {
        self.read()?.first().cloned().ok_or(LedgerError::EmptyLedger)
    }

    /// Index of the tip
    pub fn height(&self) -> Result<u64> {
        Ok(self.tip()?.get_index())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    pub fn snapshot(&self) -> Result<Vec<Block>> {
        Ok(self.read()?.clone())
    }

    pub fn is_valid(&self) -> Result<bool> {
        Ok(check_chain(&self.read()?).is_ok())
    }

    pub fn status(&self) -> Result<ChainStatus> {
        let chain = self.read()?;
        let tip = chain.last().ok_or(LedgerError::EmptyLedger)?;
        Ok(ChainStatus {
            height: tip.get_index(),
            valid: check_chain(&chain).is_ok(),
            blocks: chain.clone(),
        })
    }

    pub fn lookup(&self, key: &BlockKey) -> Result<Option<Block>> {
        let chain = self.read()?;
        let found = match key {
            BlockKey::ByIndex(index) => chain.iter().find(|b| b.get_index() == *index),
            BlockKey::ByHash(hash) => chain.iter().find(|b| b.get_hash() == hash.as_str()),
        };
        Ok(found.cloned())
    }

    /// Mine `payload` on top of the tip and append it.
    ///
    /// Fails with `MiningInProgress` if another append is mining, and with
    /// `TipMoved` if the chain advanced while this one was mining. A difficulty
    /// outside `1..=64` is refused before any mining starts.
    pub fn append(&self, payload: Payload, difficulty: Option<u32>) -> Result<Block> {
        let difficulty = difficulty.unwrap_or(self.default_difficulty);
        if !is_attainable_difficulty(difficulty) {
            return Err(LedgerError::InvalidDifficulty(difficulty));
        }

        let _gate = match self.mining.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(LedgerError::MiningInProgress),
            Err(TryLockError::Poisoned(e)) => {
                return Err(LedgerError::Lock(format!(
                    "Failed to acquire mining lock: {e}"
                )))
            }
        };

        let parent = self.tip()?;
        let block = Block::new_successor(&parent, payload, difficulty)?;
        self.commit_mined(&parent, block)
    }

    fn commit_mined(&self, parent: &Block, block: Block) -> Result<Block> {
        let mut chain = self.write()?;
        let tip = chain.last().ok_or(LedgerError::EmptyLedger)?;
        if tip.get_hash() != parent.get_hash() {
            warn!(
                "Discarding block {}: tip moved to {} while mining",
                block.get_hash(),
                tip.get_hash()
            );
            return Err(LedgerError::TipMoved {
                expected: parent.get_hash().to_string(),
                actual: tip.get_hash().to_string(),
            });
        }
        check_successor(&block, tip).map_err(LedgerError::BlockConstructionInvalid)?;

        chain.push(block.clone());
        if let Err(e) = self.store.save(&chain) {
            chain.pop();
            return Err(e);
        }
        info!(
            "Appended block {} at index {} (difficulty: {})",
            block.get_hash(),
            block.get_index(),
            block.get_difficulty()
        );
        Ok(block)
    }

    /// Adopt `candidate` wholesale if it is longer, valid and rooted in our genesis.
    pub fn replace(&self, candidate: Vec<Block>) -> Result<bool> {
        let mut chain = self.write()?;
        if candidate.len() <= chain.len() {
            return Ok(false);
        }
        if let Err(fault) = check_chain(&candidate) {
            warn!("Refusing replacement chain: {fault}");
            return Ok(false);
        }
        if candidate.first().map(Block::get_hash) != chain.first().map(Block::get_hash) {
            warn!("Refusing replacement chain: genesis does not match");
            return Ok(false);
        }

        let previous = std::mem::replace(&mut *chain, candidate);
        if let Err(e) = self.store.save(&chain) {
            *chain = previous;
            return Err(e);
        }
        info!(
            "Replaced chain of {} block(s) with {} block(s)",
            previous.len(),
            chain.len()
        );
        Ok(true)
    }

    /// Append a peer's block if it is exactly the next block after our tip
    pub fn accept_pushed(&self, block: Block) -> Result<PushOutcome> {
        let mut chain = self.write()?;
        let tip = chain.last().ok_or(LedgerError::EmptyLedger)?;
        let height = tip.get_index();

        if let Err(reason) = check_successor(&block, tip) {
            info!(
                "Rejected pushed block {} at index {}: {reason}",
                block.get_hash(),
                block.get_index()
            );
            return Ok(PushOutcome::Rejected { reason, height });
        }

        chain.push(block);
        if let Err(e) = self.store.save(&chain) {
            chain.pop();
            return Err(e);
        }
        let height = height + 1;
        info!("Accepted pushed block at index {height}");
        Ok(PushOutcome::Accepted { height })
    }
}
