use crate::core::hasher::{meets_difficulty, HashPreimage};
use crate::core::Payload;
use log::debug;

/// Nonce search over a block's pre-hash fields
pub struct ProofOfWork {
    preimage: HashPreimage,
    difficulty: u32,
}

impl ProofOfWork {
    pub fn new_proof_of_work(
        index: u64,
        timestamp: i64,
        payload: &Payload,
        prev_hash: &str,
        difficulty: u32,
    ) -> ProofOfWork {
        ProofOfWork {
            preimage: HashPreimage::new(index, timestamp, payload, prev_hash, difficulty),
            difficulty,
        }
    }

    /// Try nonces from zero upward until the hash meets the difficulty.
    ///
    /// There is no upper bound: the search runs until it succeeds.
    pub fn run(&self) -> (u64, String) {
        let mut nonce: u64 = 0;
        loop {
            let hash = self.preimage.digest(nonce);
            if meets_difficulty(&hash, self.difficulty) {
                debug!("Found nonce {nonce} for difficulty {}: {hash}", self.difficulty);
                return (nonce, hash);
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}
