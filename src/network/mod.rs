//! Peer-to-peer networking
//!
//! Nodes talk over plain TCP: one JSON `Package` per connection and one JSON
//! `Reply` back. The same protocol carries gossip, chain exchange and the
//! CLI's client commands.

pub mod gossip;
pub mod node;
pub mod peers;
pub mod server;
pub mod transport;

pub use gossip::{Broadcast, BroadcastReport, Delivery, Gossip};
pub use node::Node;
pub use peers::PeerDirectory;
pub use server::{process_package, Package, Reply, Server};
pub use transport::{send_request, PeerTransport, TcpTransport, DEFAULT_PEER_TIMEOUT};
