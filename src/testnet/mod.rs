//! Shared helpers for unit tests: in-memory ledgers, a store that can be
//! told to fail, and an in-process stand-in for the peer network.

pub mod test_utils;

pub use test_utils::*;
