use crate::core::DEFAULT_DIFFICULTY;
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

static DEFAULT_NODE_ADDR: &str = "127.0.0.1:2001";
static DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_PEER_TIMEOUT_MS: u64 = 3000;

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const NODE_PEERS_KEY: &str = "NODE_PEERS";
const NODE_DIFFICULTY_KEY: &str = "NODE_DIFFICULTY";
const NODE_DATA_DIR_KEY: &str = "NODE_DATA_DIR";

/// Node settings, layered as defaults, then an optional TOML file, then
/// environment variables. CLI flags are applied last by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    node_addr: String,
    data_dir: PathBuf,
    peers: Vec<String>,
    default_difficulty: u32,
    peer_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            node_addr: String::from(DEFAULT_NODE_ADDR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            peers: vec![],
            default_difficulty: DEFAULT_DIFFICULTY,
            peer_timeout_ms: DEFAULT_PEER_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Defaults, overlaid with `path` when given, overlaid with the environment
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Config::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `NODE_*` overrides, reading each key through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(NODE_ADDRESS_KEY) {
            self.node_addr = addr;
        }
        if let Some(peers) = lookup(NODE_PEERS_KEY) {
            self.peers = parse_peer_list(&peers);
        }
        if let Some(difficulty) = lookup(NODE_DIFFICULTY_KEY) {
            self.default_difficulty = difficulty.trim().parse().map_err(|e| {
                LedgerError::Config(format!("Invalid {NODE_DIFFICULTY_KEY} '{difficulty}': {e}"))
            })?;
        }
        if let Some(dir) = lookup(NODE_DATA_DIR_KEY) {
            self.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn get_node_addr(&self) -> &str {
        &self.node_addr
    }

    pub fn set_node_addr(&mut self, addr: String) {
        self.node_addr = addr;
    }

    pub fn get_data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn get_peers(&self) -> &[String] {
        &self.peers
    }

    pub fn add_peers(&mut self, peers: &[String]) {
        for peer in peers {
            if !self.peers.contains(peer) {
                self.peers.push(peer.clone());
            }
        }
    }

    pub fn get_default_difficulty(&self) -> u32 {
        self.default_difficulty
    }

    pub fn set_default_difficulty(&mut self, difficulty: u32) {
        self.default_difficulty = difficulty;
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    /// Extract node ID from address (e.g., "127.0.0.1:2001" -> "2001")
    pub fn node_id(&self) -> String {
        match self.node_addr.rsplit_once(':') {
            Some((_, port)) if !port.is_empty() => port.to_string(),
            _ => "default".to_string(),
        }
    }

    /// Each node gets its own database so several can share a machine
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(format!("node_{}", self.node_id()))
    }
}

fn parse_peer_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
