//! Common utilities and types shared across miniauction

pub mod config;
pub mod error;
pub mod metrics;
pub mod utils;

pub use config::{Config, FailoverPolicy, NodeConfig, NodeRole};
pub use error::{Error, Result};
pub use metrics::{Counter, NodeMetrics};
pub use utils::{deadline_after, parse_duration, peer_uri};
