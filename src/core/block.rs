use crate::core::hasher::{calculate_hash, meets_difficulty};
use crate::core::{Payload, ProofOfWork};
use crate::error::Result;
use crate::utils::current_timestamp;
use log::info;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Parent hash recorded by the genesis block
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";
pub const GENESIS_DIFFICULTY: u32 = 1;
pub const GENESIS_TIMESTAMP: i64 = 0;

// Every node derives the same genesis, so it is mined once per process.
static GENESIS: Lazy<Block> = Lazy::new(|| {
    Block::mine(
        0,
        GENESIS_TIMESTAMP,
        Payload::from(json!({"message": "genesis"})),
        GENESIS_PREV_HASH.to_string(),
        GENESIS_DIFFICULTY,
    )
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    timestamp: i64,
    payload: Payload,
    prev_hash: String,
    nonce: u64,
    difficulty: u32,
    hash: String,
}

impl Block {
    /// Mine a block at `index` on top of `prev_hash`, stamped with the current time
    pub fn new_block(
        index: u64,
        prev_hash: String,
        payload: Payload,
        difficulty: u32,
    ) -> Result<Block> {
        let timestamp = current_timestamp()?;
        info!("Starting proof-of-work for block at index {index} with difficulty {difficulty}");
        let block = Block::mine(index, timestamp, payload, prev_hash, difficulty);
        info!(
            "Proof-of-work completed for block: {} (nonce: {})",
            block.hash, block.nonce
        );
        Ok(block)
    }

    /// Mine the block that follows `parent`
    pub fn new_successor(parent: &Block, payload: Payload, difficulty: u32) -> Result<Block> {
        Block::new_block(parent.index + 1, parent.hash.clone(), payload, difficulty)
    }

    pub fn generate_genesis_block() -> Block {
        GENESIS.clone()
    }

    /// Run the nonce search over fixed content fields
    pub fn mine(
        index: u64,
        timestamp: i64,
        payload: Payload,
        prev_hash: String,
        difficulty: u32,
    ) -> Block {
        let pow = ProofOfWork::new_proof_of_work(index, timestamp, &payload, &prev_hash, difficulty);
        let (nonce, hash) = pow.run();
        Block {
            index,
            timestamp,
            payload,
            prev_hash,
            nonce,
            difficulty,
            hash,
        }
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_payload(&self) -> &Payload {
        &self.payload
    }

    pub fn get_prev_hash(&self) -> &str {
        self.prev_hash.as_str()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    /// Hash re-derived from the content fields, ignoring the stored one
    pub fn recompute_hash(&self) -> String {
        calculate_hash(
            self.index,
            self.timestamp,
            &self.payload,
            &self.prev_hash,
            self.nonce,
            self.difficulty,
        )
    }

    pub fn hash_matches(&self) -> bool {
        self.recompute_hash() == self.hash
    }

    pub fn meets_difficulty(&self) -> bool {
        meets_difficulty(&self.hash, self.difficulty)
    }

    pub fn is_self_consistent(&self) -> bool {
        self.hash_matches() && self.meets_difficulty()
    }
}
