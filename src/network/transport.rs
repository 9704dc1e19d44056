use crate::core::{Block, PushOutcome};
use crate::error::{LedgerError, Result};
use crate::network::server::{Package, Reply};
use log::debug;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_millis(3000);

/// How the node talks to other nodes.
///
/// Errors from these calls describe the transport (unreachable peer, timeout,
/// garbage on the wire), never the validity of what the peer holds.
pub trait PeerTransport: Send + Sync {
    /// The peer's whole chain, genesis first
    fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>>;
    /// Offer `block` to the peer and report its verdict
    fn push_block(&self, peer: &str, block: &Block) -> Result<PushOutcome>;
}

/// One JSON request and one JSON reply per TCP connection
pub struct TcpTransport {
    addr_from: String,
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(addr_from: String, timeout: Duration) -> TcpTransport {
        TcpTransport { addr_from, timeout }
    }
}

impl PeerTransport for TcpTransport {
    fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>> {
        let pkg = Package::GetChain {
            addr_from: self.addr_from.clone(),
        };
        match send_request(peer, &pkg, self.timeout)? {
            Reply::Chain(status) => Ok(status.blocks),
            other => Err(unexpected_reply(peer, &other)),
        }
    }

    fn push_block(&self, peer: &str, block: &Block) -> Result<PushOutcome> {
        let pkg = Package::Block {
            addr_from: self.addr_from.clone(),
            block: block.clone(),
        };
        match send_request(peer, &pkg, self.timeout)? {
            Reply::Pushed(outcome) => Ok(outcome),
            other => Err(unexpected_reply(peer, &other)),
        }
    }
}

fn unexpected_reply(peer: &str, reply: &Reply) -> LedgerError {
    match reply {
        Reply::Error { message } => LedgerError::Network(format!("Peer {peer} failed: {message}")),
        other => LedgerError::Network(format!("Unexpected reply from {peer}: {other:?}")),
    }
}

fn resolve_addr(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| LedgerError::Network(format!("Invalid address {addr}: {e}")))?
        .next()
        .ok_or_else(|| LedgerError::Network(format!("Address {addr} did not resolve")))
}

/// Send one request to `addr` and wait for its reply, each step bounded by `timeout`
pub fn send_request(addr: &str, pkg: &Package, timeout: Duration) -> Result<Reply> {
    let socket_addr = resolve_addr(addr)?;
    debug!("Sending package to {socket_addr}: {pkg:?}");

    let mut stream = TcpStream::connect_timeout(&socket_addr, timeout)
        .map_err(|e| LedgerError::Network(format!("Failed to connect to {addr}: {e}")))?;
    stream
        .set_write_timeout(Some(timeout))
        .map_err(|e| LedgerError::Network(format!("Failed to set write timeout: {e}")))?;
    stream
        .set_read_timeout(Some(timeout))
        .map_err(|e| LedgerError::Network(format!("Failed to set read timeout: {e}")))?;

    serde_json::to_writer(&stream, pkg)
        .map_err(|e| LedgerError::Network(format!("Failed to send data to {addr}: {e}")))?;
    stream
        .flush()
        .map_err(|e| LedgerError::Network(format!("Failed to send data to {addr}: {e}")))?;
    // Half-close so the peer sees the end of the request
    stream
        .shutdown(Shutdown::Write)
        .map_err(|e| LedgerError::Network(format!("Failed to finish request to {addr}: {e}")))?;

    serde_json::from_reader(&stream)
        .map_err(|e| LedgerError::Network(format!("Malformed reply from {addr}: {e}")))
}
