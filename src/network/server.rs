use crate::consensus::ResolveOutcome;
use crate::core::{Block, BlockKey, ChainStatus, Payload, PushOutcome};
use crate::error::{LedgerError, Result};
use crate::network::Node;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Deserializer;
use std::io::{BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

const TCP_READ_TIMEOUT: u64 = 60;

/// Requests a node accepts, from peers and from the CLI alike
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Package {
    Block { addr_from: String, block: Block },
    GetChain { addr_from: String },
    GetTip,
    GetBlock { key: BlockKey },
    Mine {
        payload: Payload,
        difficulty: Option<u32>,
    },
    Resolve,
    AddPeer { addr: String },
    ListPeers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Reply {
    Pushed(PushOutcome),
    Chain(ChainStatus),
    Tip { block: Block, height: u64 },
    Block(Option<Block>),
    Mined(Block),
    Resolved(ResolveOutcome),
    Peers(Vec<String>),
    Error { message: String },
}

pub struct Server {
    listener: TcpListener,
    node: Node,
}

impl Server {
    pub fn bind(addr: &str, node: Node) -> Result<Server> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| LedgerError::Network(format!("Failed to bind to {addr}: {e}")))?;
        Ok(Server { listener, node })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| LedgerError::Network(format!("Failed to read local address: {e}")))
    }

    /// Accept connections forever, one handler thread each
    pub fn run(&self) -> Result<()> {
        info!("Server listening on {}", self.local_addr()?);

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer_addr = match stream.peer_addr() {
                        Ok(addr) => addr,
                        Err(e) => {
                            error!("Failed to get peer address: {e}");
                            continue;
                        }
                    };
                    let node = self.node.clone();
                    let spawned = thread::Builder::new()
                        .name(format!("conn-{peer_addr}"))
                        .spawn(move || {
                            if let Err(e) = handle_connection(&node, stream, peer_addr) {
                                error!("Error handling connection from {peer_addr}: {e}");
                            }
                        });
                    if let Err(e) = spawned {
                        error!("Failed to spawn handler for {peer_addr}: {e}");
                    }
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }
}

fn handle_connection(node: &Node, stream: TcpStream, peer_addr: SocketAddr) -> Result<()> {
    stream
        .set_read_timeout(Some(Duration::from_secs(TCP_READ_TIMEOUT)))
        .map_err(|e| LedgerError::Network(format!("Failed to set read timeout: {e}")))?;

    let reader = BufReader::new(&stream);
    let pkg_reader = Deserializer::from_reader(reader).into_iter::<Package>();

    for pkg in pkg_reader {
        let pkg = pkg
            .map_err(|e| LedgerError::Network(format!("Failed to deserialize package: {e}")))?;
        debug!("Received request from {peer_addr}: {pkg:?}");

        let reply = process_package(node, pkg);
        serde_json::to_writer(&stream, &reply)
            .map_err(|e| LedgerError::Network(format!("Failed to reply to {peer_addr}: {e}")))?;
        (&stream)
            .flush()
            .map_err(|e| LedgerError::Network(format!("Failed to reply to {peer_addr}: {e}")))?;
    }

    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}

/// Every failure becomes a `Reply::Error` so the caller always gets an answer
pub fn process_package(node: &Node, pkg: Package) -> Reply {
    match dispatch(node, pkg) {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Request failed: {e}");
            Reply::Error {
                message: e.to_string(),
            }
        }
    }
}

fn dispatch(node: &Node, pkg: Package) -> Result<Reply> {
    match pkg {
        Package::Block { addr_from, block } => {
            info!(
                "Block {} at index {} pushed by {addr_from}",
                block.get_hash(),
                block.get_index()
            );
            Ok(Reply::Pushed(node.receive_block(block)?))
        }
        Package::GetChain { addr_from } => {
            debug!("Chain requested by {addr_from}");
            Ok(Reply::Chain(node.status()?))
        }
        Package::GetTip => {
            let (block, height) = node.tip()?;
            Ok(Reply::Tip { block, height })
        }
        Package::GetBlock { key } => Ok(Reply::Block(node.lookup(&key)?)),
        Package::Mine {
            payload,
            difficulty,
        } => {
            // Delivery runs on detached threads
            let (block, _broadcast) = node.mine(payload, difficulty)?;
            Ok(Reply::Mined(block))
        }
        Package::Resolve => Ok(Reply::Resolved(node.resolve()?)),
        Package::AddPeer { addr } => {
            node.peers().add(&addr)?;
            Ok(Reply::Peers(node.peers().list()?))
        }
        Package::ListPeers => Ok(Reply::Peers(node.peers().list()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Ledger;
    use crate::network::PeerDirectory;
    use crate::testnet::{memory_ledger, FailingStore, FakeNetwork};
    use serde_json::json;
    use std::sync::Arc;

    fn lone_node() -> Node {
        Node::new(
            memory_ledger(1),
            PeerDirectory::new("me".to_string()),
            Arc::new(FakeNetwork::default()),
        )
    }

    #[test]
    fn test_package_wire_format() {
        let pkg = Package::GetBlock {
            key: BlockKey::ByIndex(3),
        };
        let text = serde_json::to_string(&pkg).unwrap();
        assert_eq!(text, r#"{"GetBlock":{"key":{"byIndex":3}}}"#);
        assert_eq!(serde_json::to_string(&Package::GetTip).unwrap(), r#""GetTip""#);
    }

    #[test]
    fn test_mine_then_query() {
        let node = lone_node();
        let mined = match process_package(
            &node,
            Package::Mine {
                payload: Payload::from(json!({"msg": "a"})),
                difficulty: Some(1),
            },
        ) {
            Reply::Mined(block) => block,
            other => panic!("unexpected reply {other:?}"),
        };

        match process_package(&node, Package::GetTip) {
            Reply::Tip { block, height } => {
                assert_eq!(block, mined);
                assert_eq!(height, 1);
            }
            other => panic!("unexpected reply {other:?}"),
        }
        let by_hash = BlockKey::ByHash(mined.get_hash().to_string());
        match process_package(&node, Package::GetBlock { key: by_hash }) {
            Reply::Block(Some(block)) => assert_eq!(block, mined),
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn test_failures_become_error_replies() {
        let store = Arc::new(FailingStore::default());
        let ledger = Ledger::open(store.clone(), 1).unwrap();
        store.fail_saves(true);
        let node = Node::new(
            ledger,
            PeerDirectory::new("me".to_string()),
            Arc::new(FakeNetwork::default()),
        );
        let reply = process_package(
            &node,
            Package::Mine {
                payload: Payload::default(),
                difficulty: None,
            },
        );
        assert!(matches!(reply, Reply::Error { .. }));
        assert_eq!(node.ledger().len().unwrap(), 1);
    }

    #[test]
    fn test_add_peer_lists_it() {
        let node = lone_node();
        let reply = process_package(
            &node,
            Package::AddPeer {
                addr: "127.0.0.1:2002".to_string(),
            },
        );
        match reply {
            Reply::Peers(peers) => assert_eq!(peers, vec!["127.0.0.1:2002".to_string()]),
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
