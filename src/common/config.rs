//! Configuration for miniauction nodes

use crate::common::{parse_duration, Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default config file looked up in the working directory (extension optional)
pub const DEFAULT_CONFIG_FILE: &str = "miniauction";

/// Prefix for environment overrides, e.g. `MINIAUCTION_NODE__NODE_ID=2`
pub const ENV_PREFIX: &str = "MINIAUCTION";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging level
    pub log_level: String,

    /// Auction node config
    pub node: NodeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            node: NodeConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Role a node starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Leader,
    Follower,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Leader => write!(f, "leader"),
            NodeRole::Follower => write!(f, "follower"),
        }
    }
}

/// How a follower treats a bid sent directly to it.
///
/// The two policies are mutually exclusive. `Promote` can end with two nodes
/// that both believe they lead: there is no term or fencing token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailoverPolicy {
    /// Followers reject bids; roles never change at runtime.
    #[default]
    Strict,
    /// Followers forward bids to peers and promote themselves when every
    /// forward fails. Receiving a Sync demotes back to follower.
    Promote,
}

impl std::fmt::Display for FailoverPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailoverPolicy::Strict => write!(f, "strict"),
            FailoverPolicy::Promote => write!(f, "promote"),
        }
    }
}

impl FromStr for FailoverPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(FailoverPolicy::Strict),
            "promote" => Ok(FailoverPolicy::Promote),
            other => Err(format!(
                "unknown failover policy '{}' (expected strict or promote)",
                other
            )),
        }
    }
}

/// Auction node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node ID, used in logs and forwarded-bid metadata
    pub node_id: String,

    /// Role at startup
    pub role: NodeRole,

    /// Bind address for the auction gRPC API
    pub grpc_addr: SocketAddr,

    /// Bind address for the admin HTTP API (disabled if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_addr: Option<SocketAddr>,

    /// Peer gRPC addresses (`host:port` or `http://host:port`)
    pub peers: Vec<String>,

    /// How long the auction stays open after the node starts
    pub auction_duration_ms: u64,

    /// Deadline for each call to a peer
    pub peer_timeout_ms: u64,

    /// Follower behaviour on direct bids
    pub failover: FailoverPolicy,
}

fn default_auction_duration() -> u64 {
    100_000
}
fn default_peer_timeout() -> u64 {
    1_000
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: "1".to_string(),
            role: NodeRole::Follower,
            grpc_addr: SocketAddr::from(([0, 0, 0, 0], 50051)),
            admin_addr: None,
            peers: Vec::new(),
            auction_duration_ms: default_auction_duration(),
            peer_timeout_ms: default_peer_timeout(),
            failover: FailoverPolicy::default(),
        }
    }
}

impl NodeConfig {
    pub fn auction_duration(&self) -> Duration {
        Duration::from_millis(self.auction_duration_ms)
    }

    /// Set the auction window from a string such as `500ms`, `90s` or `5m`.
    pub fn set_auction_duration(&mut self, value: &str) -> Result<()> {
        let millis = parse_duration(value)?.as_millis();
        self.auction_duration_ms = u64::try_from(millis)
            .map_err(|_| Error::InvalidConfig(format!("auction duration too large: {}", value)))?;
        Ok(())
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(Error::InvalidConfig("node_id must not be empty".into()));
        }
        if self.auction_duration_ms == 0 {
            return Err(Error::InvalidConfig(
                "auction_duration_ms must be greater than zero".into(),
            ));
        }
        if self.peer_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "peer_timeout_ms must be greater than zero".into(),
            ));
        }
        if let Some(peer) = self.peers.iter().find(|p| p.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!("empty peer address: {:?}", peer)));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file and `MINIAUCTION_*` environment variables.
    ///
    /// With no explicit path, `miniauction.toml` in the working directory is
    /// used if it exists. Environment variables win over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("node.peers")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.node.validate()?;
        Ok(config)
    }
}
