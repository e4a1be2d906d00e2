//! Auction node binary

use clap::{Parser, Subcommand};
use miniauction::common::{Config, FailoverPolicy, NodeRole};
use miniauction::AuctionNode;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "miniauction-node")]
#[command(about = "miniauction node: leader or follower replica of a single auction")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an auction node
    Serve {
        /// Config file (TOML); defaults to ./miniauction.toml if present
        #[arg(long)]
        config: Option<PathBuf>,

        /// Node ID
        #[arg(long)]
        id: Option<String>,

        /// Bind address for gRPC
        #[arg(long)]
        grpc: Option<SocketAddr>,

        /// Bind address for the admin HTTP API
        #[arg(long)]
        admin: Option<SocketAddr>,

        /// Start as leader
        #[arg(long)]
        leader: bool,

        /// Peer gRPC addresses (comma-separated)
        #[arg(long, value_delimiter = ',')]
        peers: Vec<String>,

        /// How long the auction stays open (e.g. 100s, 5m)
        #[arg(long)]
        duration: Option<String>,

        /// Follower behaviour on direct bids: strict or promote
        #[arg(long)]
        failover: Option<FailoverPolicy>,

        /// Deadline for each peer call, in milliseconds
        #[arg(long)]
        peer_timeout_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            id,
            grpc,
            admin,
            leader,
            peers,
            duration,
            failover,
            peer_timeout_ms,
        } => {
            // Load config from file and environment, then override with CLI arguments
            let mut config = Config::load(config.as_deref())?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| config.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            let node = &mut config.node;
            if let Some(id) = id {
                node.node_id = id;
            }
            if let Some(grpc) = grpc {
                node.grpc_addr = grpc;
            }
            if admin.is_some() {
                node.admin_addr = admin;
            }
            if leader {
                node.role = NodeRole::Leader;
            }
            if !peers.is_empty() {
                node.peers = peers;
            }
            if let Some(duration) = duration {
                node.set_auction_duration(&duration)?;
            }
            if let Some(failover) = failover {
                node.failover = failover;
            }
            if let Some(peer_timeout_ms) = peer_timeout_ms {
                node.peer_timeout_ms = peer_timeout_ms;
            }

            AuctionNode::new(config.node).serve().await?;
        }
    }

    Ok(())
}
