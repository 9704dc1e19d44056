//! Chain validation rules
//!
//! Pure checks over blocks that may come from untrusted peers. Nothing here
//! trusts a stored hash: every block is re-hashed before it is accepted.

use crate::core::hasher::is_attainable_difficulty;
use crate::core::Block;
use crate::error::{ChainFault, RejectReason};

/// Check `candidate` as the direct child of `parent`.
///
/// Checks run in a fixed order (index, link, hash, difficulty) and the first
/// failure is reported.
pub fn check_successor(candidate: &Block, parent: &Block) -> Result<(), RejectReason> {
    if parent.get_index().checked_add(1) != Some(candidate.get_index()) {
        return Err(RejectReason::BadIndex);
    }
    if candidate.get_prev_hash() != parent.get_hash() {
        return Err(RejectReason::BadLink);
    }
    if !candidate.hash_matches() {
        return Err(RejectReason::BadHash);
    }
    if !is_attainable_difficulty(candidate.get_difficulty()) || !candidate.meets_difficulty() {
        return Err(RejectReason::InsufficientDifficulty);
    }
    Ok(())
}

pub fn is_valid_successor(candidate: &Block, parent: &Block) -> bool {
    check_successor(candidate, parent).is_ok()
}

/// Validate every adjacent pair. The first block is taken as given.
pub fn check_chain(blocks: &[Block]) -> Result<(), ChainFault> {
    if blocks.is_empty() {
        return Err(ChainFault::Empty);
    }
    for (position, pair) in blocks.windows(2).enumerate() {
        check_successor(&pair[1], &pair[0]).map_err(|reason| ChainFault::Link {
            position: position + 1,
            reason,
        })?;
    }
    Ok(())
}

pub fn is_valid_chain(blocks: &[Block]) -> bool {
    check_chain(blocks).is_ok()
}
