//! Core ledger functionality
//!
//! This module contains the block model, the content hasher, the
//! proof-of-work search, the chain validation rules and the ledger that ties
//! them together.

pub mod block;
pub mod hasher;
pub mod ledger;
pub mod payload;
pub mod proof_of_work;
pub mod validator;

pub use block::{Block, GENESIS_DIFFICULTY, GENESIS_PREV_HASH, GENESIS_TIMESTAMP};
pub use hasher::{
    calculate_hash, is_attainable_difficulty, leading_zeros, meets_difficulty, MAX_DIFFICULTY,
};
pub use ledger::{BlockKey, ChainStatus, Ledger, PushOutcome, DEFAULT_DIFFICULTY};
pub use payload::Payload;
pub use proof_of_work::ProofOfWork;
pub use validator::{check_chain, check_successor, is_valid_chain, is_valid_successor};
