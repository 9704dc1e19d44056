use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_NODE: &str = "127.0.0.1:2001";

#[derive(Debug, Parser)]
#[command(name = "gossip-ledger")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a ledger node")]
    StartNode {
        #[arg(long, help = "TOML configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Address to listen on (host:port)")]
        addr: Option<String>,
        #[arg(long = "peer", help = "Peer address, may be repeated")]
        peers: Vec<String>,
        #[arg(long, help = "Default mining difficulty")]
        difficulty: Option<u32>,
    },
    #[command(name = "printchain", about = "Print all blocks in the local ledger")]
    Printchain {
        #[arg(long, help = "TOML configuration file")]
        config: Option<PathBuf>,
    },
    #[command(name = "validatechain", about = "Check the local ledger block by block")]
    ValidateChain {
        #[arg(long, help = "TOML configuration file")]
        config: Option<PathBuf>,
    },
    #[command(name = "tip", about = "Show the tip of a running node")]
    Tip {
        #[arg(long, default_value = DEFAULT_NODE, help = "Node to query")]
        node: String,
    },
    #[command(
        name = "getblock",
        about = "Look up a block by index or hash",
        group(ArgGroup::new("key").required(true).args(["index", "hash"]))
    )]
    GetBlock {
        #[arg(long, default_value = DEFAULT_NODE, help = "Node to query")]
        node: String,
        #[arg(long, help = "Block index")]
        index: Option<u64>,
        #[arg(long, help = "Block hash")]
        hash: Option<String>,
    },
    #[command(name = "mine", about = "Mine a block carrying a JSON payload")]
    Mine {
        #[arg(long, default_value = DEFAULT_NODE, help = "Node to mine on")]
        node: String,
        #[arg(help = "Payload as JSON, e.g. '{\"msg\":\"hi\"}'")]
        payload: String,
        #[arg(long, help = "Difficulty for this block only")]
        difficulty: Option<u32>,
    },
    #[command(name = "resolve", about = "Adopt the longest valid chain among peers")]
    Resolve {
        #[arg(long, default_value = DEFAULT_NODE, help = "Node to resolve")]
        node: String,
    },
    #[command(name = "addpeer", about = "Register a peer with a running node")]
    AddPeer {
        #[arg(long, default_value = DEFAULT_NODE, help = "Node to update")]
        node: String,
        #[arg(help = "Peer address (host:port)")]
        addr: String,
    },
    #[command(name = "peers", about = "List the peers of a running node")]
    Peers {
        #[arg(long, default_value = DEFAULT_NODE, help = "Node to query")]
        node: String,
    },
}
