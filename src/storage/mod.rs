//! Data storage and persistence
//!
//! This module keeps the chain on disk so a node restarts where it stopped.

pub mod chain_store;

pub use chain_store::{ChainStore, MemoryChainStore, SledChainStore};
