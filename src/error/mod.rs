//! Error handling for the ledger node
//!
//! Validation verdicts are not errors: a rejected block or chain is reported
//! through [`RejectReason`] and [`ChainFault`]. `LedgerError` covers the
//! operational faults that callers have to see.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Operational errors raised by the ledger, storage and network layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger holds no blocks (genesis was never synthesized)
    EmptyLedger,
    /// A freshly mined block failed validation against its own parent
    BlockConstructionInvalid(RejectReason),
    /// Another append is already searching for a nonce
    MiningInProgress,
    /// Requested difficulty is zero or beyond what a digest can satisfy
    InvalidDifficulty(u32),
    /// The tip changed while a block was being mined on top of it
    TipMoved { expected: String, actual: String },
    /// Database-related errors
    Database(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Network communication errors
    Network(String),
    /// Configuration errors
    Config(String),
    /// File I/O errors
    Io(String),
    /// A lock was poisoned by a panicking thread
    Lock(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::EmptyLedger => write!(f, "Ledger is empty"),
            LedgerError::BlockConstructionInvalid(reason) => {
                write!(f, "Freshly mined block failed validation: {reason}")
            }
            LedgerError::MiningInProgress => write!(f, "A block is already being mined"),
            LedgerError::InvalidDifficulty(difficulty) => {
                write!(f, "Difficulty {difficulty} is outside 1..=64")
            }
            LedgerError::TipMoved { expected, actual } => {
                write!(f, "Tip moved while mining: expected {expected}, found {actual}")
            }
            LedgerError::Database(msg) => write!(f, "Database error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Network(msg) => write!(f, "Network error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
            LedgerError::Lock(msg) => write!(f, "Lock error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

/// Why a block was refused as the successor of a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// Index is not parent index + 1
    BadIndex,
    /// prevHash does not equal the parent's hash
    BadLink,
    /// Re-hashing the block's fields does not reproduce its hash
    BadHash,
    /// The hash lacks the leading zeros its difficulty demands
    InsufficientDifficulty,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::BadIndex => write!(f, "bad-index"),
            RejectReason::BadLink => write!(f, "bad-link"),
            RejectReason::BadHash => write!(f, "bad-hash"),
            RejectReason::InsufficientDifficulty => write!(f, "insufficient-difficulty"),
        }
    }
}

/// Why a whole chain failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFault {
    /// No blocks at all
    Empty,
    /// The block at `position` does not follow the one before it
    Link {
        position: usize,
        reason: RejectReason,
    },
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFault::Empty => write!(f, "chain is empty"),
            ChainFault::Link { position, reason } => {
                write!(f, "block at position {position} rejected: {reason}")
            }
        }
    }
}
