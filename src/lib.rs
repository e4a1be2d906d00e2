//! # miniauction
//!
//! A single auction replicated across a small set of nodes:
//! - One leader accepts bids and owns the authoritative winning state
//! - Followers mirror the leader through best-effort Sync pushes
//! - gRPC for bids, results and peer sync, HTTP for admin and metrics
//! - Explicit failover policy: strict single leader, or forward-then-promote
//!
//! ## Architecture
//!
//! ```text
//!   client ──Bid/Result──▶ ┌──────────────────┐
//!                          │  Leader node     │
//!                          │  StateMachine    │
//!                          └───────┬──────────┘
//!                                  │ Sync (best-effort fan-out)
//!                     ┌────────────┴────────────┐
//!               ┌─────▼──────┐            ┌─────▼──────┐
//!               │ Follower 1 │            │ Follower 2 │
//!               │ (replica)  │            │ (replica)  │
//!               └────────────┘            └────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start a leader and a follower
//! ```bash
//! miniauction-node serve --id 1 --grpc 0.0.0.0:50051 --leader --peers localhost:50052
//! miniauction-node serve --id 2 --grpc 0.0.0.0:50052
//! ```
//!
//! ### Use the CLI
//! ```bash
//! miniauction --target http://localhost:50051 bid --id alice --amount 100
//! miniauction --target http://localhost:50052 result
//! ```

pub mod common;
pub mod node;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use node::{AuctionNode, AuctionService};

// Generated protobuf code
pub mod proto {
    tonic::include_proto!("auction");
}

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
