//! # gossip-ledger
//!
//! A small peer-to-peer proof-of-work ledger. Every node keeps its own copy
//! of a hash-linked chain of blocks carrying arbitrary JSON payloads, mines new
//! blocks locally, gossips them to its peers and falls back to the longest
//! valid chain when peers disagree.
//!
//! ## Layout
//! - `core/`: hashing, proof-of-work, blocks, validation and the ledger itself
//! - `consensus/`: longest-valid-chain resolution across peers
//! - `network/`: wire protocol, TCP server and transport, gossip, peer list
//! - `storage/`: chain persistence (sled, or in memory)
//! - `config/`: layered node configuration
//! - `cli/`: command-line arguments
//! - `utils/`: SHA-256 and clock helpers
//!
//! The ledger is a cloneable handle around a lock-guarded chain. Readers never
//! see a half-applied append or replace, and mining runs outside the lock.

pub mod cli;
pub mod config;
pub mod consensus;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use consensus::{ResolveOutcome, Resolver};
pub use crate::core::{
    calculate_hash, check_chain, check_successor, is_valid_chain, is_valid_successor, Block,
    BlockKey, ChainStatus, Ledger, Payload, ProofOfWork, PushOutcome, DEFAULT_DIFFICULTY,
};
pub use error::{ChainFault, LedgerError, RejectReason, Result};
pub use network::{
    send_request, Broadcast, BroadcastReport, Gossip, Node, Package, PeerDirectory,
    PeerTransport, Reply, Server, TcpTransport,
};
pub use storage::{ChainStore, MemoryChainStore, SledChainStore};
pub use utils::{current_timestamp, sha256_digest};
