//! Configuration management
//!
//! Node address, data directory, seed peers and mining defaults.

pub mod settings;

pub use settings::Config;
