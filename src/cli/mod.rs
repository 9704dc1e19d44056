//! Command-line interface
//!
//! Node commands run a ledger locally; client commands talk to a running
//! node over the wire protocol.

pub mod commands;

pub use commands::{Command, Opt};
