// Entry point for the gossip-ledger CLI: node commands run a ledger in this
// process, client commands send one request to a running node.
use clap::Parser;
use gossip_ledger::{
    check_chain, send_request, BlockKey, ChainStore, Command, Config, Ledger, Node, Opt, Package,
    Payload, PeerDirectory, Reply, Server, SledChainStore, TcpTransport,
};
use log::{error, info, warn, LevelFilter};
use serde::Serialize;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;

// Mining on the remote node happens before it replies
const CLIENT_TIMEOUT: Duration = Duration::from_secs(300);

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::StartNode {
            config,
            addr,
            peers,
            difficulty,
        } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(addr) = addr {
                config.set_node_addr(addr);
            }
            config.add_peers(&peers);
            if let Some(difficulty) = difficulty {
                config.set_default_difficulty(difficulty);
            }
            start_node(&config)?;
        }
        Command::Printchain { config } => {
            let blocks = load_local_chain(config.as_deref())?;
            for block in &blocks {
                println!("{}", serde_json::to_string_pretty(block)?);
            }
            println!("{} block(s)", blocks.len());
        }
        Command::ValidateChain { config } => {
            let blocks = load_local_chain(config.as_deref())?;
            match check_chain(&blocks) {
                Ok(()) => println!("Chain of {} block(s) is valid", blocks.len()),
                Err(fault) => return Err(format!("Chain is invalid: {fault}").into()),
            }
        }
        Command::Tip { node } => {
            print_reply(request(&node, Package::GetTip)?)?;
        }
        Command::GetBlock { node, index, hash } => {
            let key = match (index, hash) {
                (Some(index), _) => BlockKey::ByIndex(index),
                (None, Some(hash)) => BlockKey::ByHash(hash),
                (None, None) => return Err("Either --index or --hash is required".into()),
            };
            match request(&node, Package::GetBlock { key })? {
                Reply::Block(None) => println!("Block not found"),
                reply => print_reply(reply)?,
            }
        }
        Command::Mine {
            node,
            payload,
            difficulty,
        } => {
            let payload: Payload = serde_json::from_str(&payload)
                .map_err(|e| format!("Payload is not valid JSON: {e}"))?;
            print_reply(request(
                &node,
                Package::Mine {
                    payload,
                    difficulty,
                },
            )?)?;
        }
        Command::Resolve { node } => {
            print_reply(request(&node, Package::Resolve)?)?;
        }
        Command::AddPeer { node, addr } => {
            print_reply(request(&node, Package::AddPeer { addr })?)?;
        }
        Command::Peers { node } => {
            print_reply(request(&node, Package::ListPeers)?)?;
        }
    }
    Ok(())
}

fn start_node(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let node_addr = config.get_node_addr().to_string();
    let store = SledChainStore::open(&config.db_path())?;
    let ledger = Ledger::open(Arc::new(store), config.get_default_difficulty())?;
    let peers = PeerDirectory::with_peers(node_addr.clone(), config.get_peers())?;
    let transport = TcpTransport::new(node_addr.clone(), config.peer_timeout());
    let node = Node::new(ledger, peers, Arc::new(transport));

    let server = Server::bind(&node_addr, node.clone())?;

    // Catch up with the network before serving
    if !node.peers().is_empty()? {
        match node.resolve() {
            Ok(outcome) => info!("Startup resolve: height {}", outcome.height),
            Err(e) => warn!("Startup resolve failed: {e}"),
        }
    }

    server.run()?;
    Ok(())
}

fn load_local_chain(
    config: Option<&Path>,
) -> Result<Vec<gossip_ledger::Block>, Box<dyn std::error::Error>> {
    let config = Config::load(config)?;
    let store = SledChainStore::open(&config.db_path())?;
    Ok(store.load()?)
}

fn request(node: &str, pkg: Package) -> Result<Reply, Box<dyn std::error::Error>> {
    match send_request(node, &pkg, CLIENT_TIMEOUT)? {
        Reply::Error { message } => Err(format!("Node {node} failed: {message}").into()),
        reply => Ok(reply),
    }
}

fn print_reply(reply: Reply) -> Result<(), Box<dyn std::error::Error>> {
    match reply {
        Reply::Tip { block, height } => {
            println!("Height: {height}");
            print_json(&block)?;
        }
        Reply::Block(Some(block)) | Reply::Mined(block) => print_json(&block)?,
        Reply::Resolved(outcome) => print_json(&outcome)?,
        Reply::Peers(peers) => {
            if peers.is_empty() {
                println!("No peers");
            }
            for peer in peers {
                println!("{peer}");
            }
        }
        other => print_json(&other)?,
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
