//! Auction node: replicated state machine with leader/follower roles
//!
//! The node is responsible for:
//! - Validating and applying bids under a single lock (state)
//! - Deciding whether it may take a bid at all (role)
//! - Best-effort push of the winning pair to peers (replication)
//! - Serving Bid/Result/Sync over gRPC and admin endpoints over HTTP

pub mod grpc;
pub mod http;
pub mod peer;
pub mod replication;
pub mod role;
pub mod server;
pub mod service;
pub mod state;

pub use peer::{connect_client, AuctionPeer, GrpcPeer, FORWARDED_BY_HEADER};
pub use replication::{ReplicationClient, ReplicationReport};
pub use role::{Admission, RoleController};
pub use server::{serve_grpc, AuctionNode};
pub use service::AuctionService;
pub use state::{AuctionState, BidOutcome, BidStatus, Rejection, StateMachine, SyncUpdate};
