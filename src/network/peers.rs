use crate::error::{LedgerError, Result};
use log::info;
use std::sync::RwLock;

/// Addresses of the nodes this node gossips with and resolves against.
///
/// The node's own address is never listed.
pub struct PeerDirectory {
    self_addr: String,
    inner: RwLock<Vec<String>>,
}

impl PeerDirectory {
    pub fn new(self_addr: String) -> PeerDirectory {
        PeerDirectory {
            self_addr,
            inner: RwLock::new(vec![]),
        }
    }

    pub fn with_peers(self_addr: String, peers: &[String]) -> Result<PeerDirectory> {
        let directory = PeerDirectory::new(self_addr);
        for peer in peers {
            directory.add(peer)?;
        }
        Ok(directory)
    }

    /// Returns false when the address is our own or already known
    pub fn add(&self, addr: &str) -> Result<bool> {
        let addr = addr.trim();
        if addr.is_empty() || addr == self.self_addr {
            return Ok(false);
        }
        let mut inner = self
            .inner
            .write()
            .map_err(|e| LedgerError::Lock(format!("Failed to acquire peer lock: {e}")))?;
        if inner.iter().any(|x| x == addr) {
            return Ok(false);
        }
        inner.push(addr.to_string());
        info!("Added peer {addr}");
        Ok(true)
    }

    pub fn remove(&self, addr: &str) -> Result<bool> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| LedgerError::Lock(format!("Failed to acquire peer lock: {e}")))?;
        if let Some(idx) = inner.iter().position(|x| x == addr) {
            inner.remove(idx);
            info!("Removed peer {addr}");
            return Ok(true);
        }
        Ok(false)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| LedgerError::Lock(format!("Failed to acquire peer lock: {e}")))?;
        Ok(inner.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.list()?.is_empty())
    }

    pub fn get_self_addr(&self) -> &str {
        &self.self_addr
    }
}
