//! Block content hashing
//!
//! The preimage is a compact JSON object with a fixed key order:
//! `{"index":..,"timestamp":..,"payload":..,"prevHash":"..","nonce":..,"difficulty":..}`.
//! The payload is rendered canonically (sorted keys), integers in plain
//! decimal. Any node that reproduces these bytes reproduces the hash.

use crate::core::Payload;
use crate::utils::sha256_hex;

/// Everything that goes into a block hash except the nonce, pre-rendered.
///
/// The nonce sits between two fixed fragments, so the proof-of-work loop only
/// formats one integer per attempt.
#[derive(Debug, Clone)]
pub struct HashPreimage {
    head: String,
    tail: String,
}

impl HashPreimage {
    pub fn new(
        index: u64,
        timestamp: i64,
        payload: &Payload,
        prev_hash: &str,
        difficulty: u32,
    ) -> HashPreimage {
        // A plain string always serializes
        let prev_hash_json = serde_json::Value::from(prev_hash).to_string();
        let head = format!(
            "{{\"index\":{index},\"timestamp\":{timestamp},\"payload\":{},\"prevHash\":{prev_hash_json},\"nonce\":",
            payload.canonical_json()
        );
        let tail = format!(",\"difficulty\":{difficulty}}}");
        HashPreimage { head, tail }
    }

    pub fn render(&self, nonce: u64) -> String {
        let mut data = String::with_capacity(self.head.len() + self.tail.len() + 20);
        data.push_str(&self.head);
        data.push_str(&nonce.to_string());
        data.push_str(&self.tail);
        data
    }

    pub fn digest(&self, nonce: u64) -> String {
        sha256_hex(self.render(nonce).as_bytes())
    }
}

/// Hash of the six content fields of a block
pub fn calculate_hash(
    index: u64,
    timestamp: i64,
    payload: &Payload,
    prev_hash: &str,
    nonce: u64,
    difficulty: u32,
) -> String {
    HashPreimage::new(index, timestamp, payload, prev_hash, difficulty).digest(nonce)
}

/// A SHA-256 hex digest has 64 characters, so no hash can carry more zeros
pub const MAX_DIFFICULTY: u32 = 64;

/// Number of leading `'0'` characters in a hex digest
pub fn leading_zeros(hash: &str) -> usize {
    hash.bytes().take_while(|c| *c == b'0').count()
}

pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    leading_zeros(hash) >= difficulty as usize
}

/// Difficulty a mined block may carry: at least one zero, at most a full digest
pub fn is_attainable_difficulty(difficulty: u32) -> bool {
    (1..=MAX_DIFFICULTY).contains(&difficulty)
}
