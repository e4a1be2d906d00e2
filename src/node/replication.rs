//! Best-effort replication to peers
//!
//! After a leader commits a bid locally it pushes the new winning pair to
//! every peer. Delivery is fire-and-observe: each peer is called on its own
//! with a deadline, failures are logged and counted, nothing is retried and
//! nothing is rolled back.

use crate::common::{Error, NodeMetrics, Result};
use crate::node::peer::AuctionPeer;
use crate::node::state::{BidOutcome, SyncUpdate};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Per-peer result of one fan-out
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplicationReport {
    pub delivered: Vec<String>,
    /// (peer address, error)
    pub failed: Vec<(String, String)>,
}

impl ReplicationReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct ReplicationClient {
    node_id: String,
    peers: Arc<Vec<Arc<dyn AuctionPeer>>>,
    peer_timeout: Duration,
    metrics: Arc<NodeMetrics>,
}

impl ReplicationClient {
    pub fn new(
        node_id: impl Into<String>,
        peers: Vec<Arc<dyn AuctionPeer>>,
        peer_timeout: Duration,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            peers: Arc::new(peers),
            peer_timeout,
            metrics,
        }
    }

    pub fn peer_addrs(&self) -> Vec<String> {
        self.peers.iter().map(|p| p.addr().to_string()).collect()
    }

    async fn with_deadline<T>(
        &self,
        addr: &str,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.peer_timeout, call)
            .await
            .map_err(|_| Error::Timeout(format!("peer {} after {:?}", addr, self.peer_timeout)))?
    }

    /// Push `update` to all peers concurrently and wait for every outcome.
    pub async fn replicate(&self, update: SyncUpdate) -> ReplicationReport {
        let calls = self.peers.iter().map(|peer| {
            let update = &update;
            async move {
                let addr = peer.addr().to_string();
                let result = self.with_deadline(&addr, peer.sync(update)).await;
                (addr, result)
            }
        });

        let mut report = ReplicationReport::default();
        for (addr, result) in join_all(calls).await {
            match result {
                Ok(true) => {
                    self.metrics.replication_delivered.inc();
                    report.delivered.push(addr);
                }
                Ok(false) => {
                    self.metrics.replication_failed.inc();
                    tracing::warn!("Node {}: peer {} did not ack sync", self.node_id, addr);
                    report.failed.push((addr, "sync not acknowledged".to_string()));
                }
                Err(e) => {
                    self.metrics.replication_failed.inc();
                    tracing::warn!("Node {}: sync to {} failed: {}", self.node_id, addr, e);
                    report.failed.push((addr, e.to_string()));
                }
            }
        }

        tracing::debug!(
            "Node {}: replicated bid {} from {} to {}/{} peers",
            self.node_id,
            update.highest_bid,
            update.winner_id,
            report.delivered.len(),
            self.peers.len()
        );
        report
    }

    /// Detached fan-out: outlives the bid request that triggered it.
    pub fn spawn_replicate(&self, update: SyncUpdate) -> JoinHandle<ReplicationReport> {
        let client = self.clone();
        tokio::spawn(async move { client.replicate(update).await })
    }

    /// Offer a bid to each peer in order and return the first answer.
    ///
    /// `None` means every peer failed at the transport level (or refused
    /// because it is not leading either).
    pub async fn forward_bid(&self, bidder_id: &str, amount: i32) -> Option<(String, BidOutcome)> {
        for peer in self.peers.iter() {
            let addr = peer.addr();
            match self
                .with_deadline(addr, peer.forward_bid(bidder_id, amount, &self.node_id))
                .await
            {
                Ok(outcome) => return Some((addr.to_string(), outcome)),
                Err(e) => {
                    tracing::warn!(
                        "Node {}: forwarding bid to {} failed: {}",
                        self.node_id,
                        addr,
                        e
                    );
                }
            }
        }
        None
    }
}
