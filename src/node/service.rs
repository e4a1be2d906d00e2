//! Request-handling facade: Bid, Result and Sync
//!
//! Composes the role controller (may this node take the bid?), the state
//! machine (is the bid valid?) and the replication client (tell the peers).
//! The state lock is always released before any peer is contacted.

use crate::common::{Error, FailoverPolicy, NodeMetrics, NodeRole, Result};
use crate::node::replication::ReplicationClient;
use crate::node::role::{Admission, RoleController};
use crate::node::state::{AuctionState, BidOutcome, Rejection, StateMachine, SyncUpdate};
use std::sync::Arc;

pub struct AuctionService {
    node_id: String,
    state: StateMachine,
    role: RoleController,
    replication: ReplicationClient,
    metrics: Arc<NodeMetrics>,
}

impl AuctionService {
    pub fn new(
        node_id: impl Into<String>,
        state: StateMachine,
        role: RoleController,
        replication: ReplicationClient,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            state,
            role,
            replication,
            metrics,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn role(&self) -> NodeRole {
        self.role.role()
    }

    pub fn is_leader(&self) -> bool {
        self.role.is_leader()
    }

    pub fn failover_policy(&self) -> FailoverPolicy {
        self.role.policy()
    }

    pub fn peer_addrs(&self) -> Vec<String> {
        self.replication.peer_addrs()
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    /// Client bid.
    pub async fn bid(&self, bidder_id: &str, amount: i32) -> BidOutcome {
        let outcome = match self.role.admit() {
            Admission::Accept => self.accept_locally(bidder_id, amount),
            Admission::Reject => Rejection::NotLeader {
                node_id: self.node_id.clone(),
            }
            .into(),
            Admission::Forward => self.forward_or_promote(bidder_id, amount).await,
        };

        if !outcome.is_accepted() {
            self.metrics.bids_rejected.inc();
            tracing::debug!(
                "Node {}: bid {} from {} rejected: {}",
                self.node_id,
                amount,
                bidder_id,
                outcome.reason
            );
        }
        outcome
    }

    /// Bid relayed by another node. Only a leader takes it; anything else
    /// is an error so the forwarder moves on to its next peer.
    pub async fn bid_forwarded(&self, bidder_id: &str, amount: i32, origin: &str) -> Result<BidOutcome> {
        if !self.role.is_leader() {
            tracing::debug!(
                "Node {}: refusing bid forwarded by {}, not leader",
                self.node_id,
                origin
            );
            return Err(Error::NotLeader(self.node_id.clone()));
        }

        let outcome = self.accept_locally(bidder_id, amount);
        if !outcome.is_accepted() {
            self.metrics.bids_rejected.inc();
        }
        Ok(outcome)
    }

    /// Current outcome; served by any node regardless of role.
    pub fn result(&self) -> AuctionState {
        self.state.snapshot()
    }

    /// Peer push of the winning pair. Always acknowledged.
    pub fn sync(&self, highest_bid: i32, winner_id: &str) -> bool {
        self.metrics.syncs_received.inc();
        self.role.observe_sync();

        if self.state.merge_remote_state(highest_bid, winner_id) {
            self.metrics.syncs_applied.inc();
            tracing::info!(
                "Node {}: synced highest bid {} from {}",
                self.node_id,
                highest_bid,
                winner_id
            );
        } else {
            tracing::debug!(
                "Node {}: ignored sync of {} from {}, not higher",
                self.node_id,
                highest_bid,
                winner_id
            );
        }
        true
    }

    /// Apply under the state lock, then (lock released) start replication.
    ///
    /// Callers reach this only after admission or promotion made this node
    /// leader for the bid, so replication follows that decision and not a
    /// later reading of the role.
    fn accept_locally(&self, bidder_id: &str, amount: i32) -> BidOutcome {
        let outcome = self.state.try_accept_bid(bidder_id, amount);
        if !outcome.is_accepted() {
            return outcome;
        }

        self.metrics.bids_accepted.inc();
        tracing::info!(
            "Node {}: new highest bid {} from {}",
            self.node_id,
            amount,
            bidder_id
        );

        // Detached: the bidder's answer does not wait on peers
        drop(self.replication.spawn_replicate(SyncUpdate {
            highest_bid: amount,
            winner_id: bidder_id.to_string(),
        }));
        outcome
    }

    async fn forward_or_promote(&self, bidder_id: &str, amount: i32) -> BidOutcome {
        if self.state.snapshot().is_over {
            return Rejection::Closed.into();
        }

        if let Some((peer, outcome)) = self.replication.forward_bid(bidder_id, amount).await {
            self.metrics.bids_forwarded.inc();
            tracing::debug!(
                "Node {}: bid {} from {} answered by {}: {}",
                self.node_id,
                amount,
                bidder_id,
                peer,
                outcome.status
            );
            return outcome;
        }

        if self.role.promote() {
            self.metrics.promotions.inc();
        }
        self.accept_locally(bidder_id, amount)
    }
}
