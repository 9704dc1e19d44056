//! Utility functions and helpers
//!
//! Digest and clock helpers shared by the block model and the ledger.

pub mod crypto;

pub use crypto::{current_timestamp, sha256_digest, sha256_hex};
