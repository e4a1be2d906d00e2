//! Node counters in Prometheus text format

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counter for tracking event counts
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Per-node counters shared by the service, replication and admin API
#[derive(Debug)]
pub struct NodeMetrics {
    pub bids_accepted: Counter,
    pub bids_rejected: Counter,
    pub bids_forwarded: Counter,
    pub promotions: Counter,
    pub syncs_received: Counter,
    pub syncs_applied: Counter,
    pub replication_delivered: Counter,
    pub replication_failed: Counter,
    start_time: Instant,
}

impl NodeMetrics {
    pub fn new() -> Self {
        Self {
            bids_accepted: Counter::new(),
            bids_rejected: Counter::new(),
            bids_forwarded: Counter::new(),
            promotions: Counter::new(),
            syncs_received: Counter::new(),
            syncs_applied: Counter::new(),
            replication_delivered: Counter::new(),
            replication_failed: Counter::new(),
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export all counters in Prometheus text format
    pub fn to_prometheus(&self, node_id: &str) -> String {
        let counters = [
            ("bids_accepted_total", "Bids accepted locally", &self.bids_accepted),
            ("bids_rejected_total", "Bids rejected (closed, too low, not leader)", &self.bids_rejected),
            ("bids_forwarded_total", "Bids answered by a peer after forwarding", &self.bids_forwarded),
            ("promotions_total", "Self-promotions to leader", &self.promotions),
            ("syncs_received_total", "Sync calls received from peers", &self.syncs_received),
            ("syncs_applied_total", "Sync calls that raised the local high bid", &self.syncs_applied),
            ("replication_delivered_total", "Sync pushes acknowledged by a peer", &self.replication_delivered),
            ("replication_failed_total", "Sync pushes that failed", &self.replication_failed),
        ];

        let mut out = String::new();
        for (name, help, counter) in counters {
            out += &format!("# HELP miniauction_{} {}\n", name, help);
            out += &format!("# TYPE miniauction_{} counter\n", name);
            out += &format!(
                "miniauction_{}{{node_id=\"{}\"}} {}\n",
                name,
                node_id,
                counter.get()
            );
        }
        out += "# HELP miniauction_uptime_seconds Node uptime in seconds\n";
        out += "# TYPE miniauction_uptime_seconds gauge\n";
        out += &format!(
            "miniauction_uptime_seconds{{node_id=\"{}\"}} {}\n",
            node_id,
            self.uptime_seconds()
        );
        out
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);
        counter.inc();
        counter.add(4);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_prometheus_output() {
        let metrics = NodeMetrics::new();
        metrics.bids_accepted.inc();
        metrics.replication_failed.add(2);

        let out = metrics.to_prometheus("n1");
        assert!(out.contains("miniauction_bids_accepted_total{node_id=\"n1\"} 1"));
        assert!(out.contains("miniauction_replication_failed_total{node_id=\"n1\"} 2"));
        assert!(out.contains("# TYPE miniauction_promotions_total counter"));
        assert!(out.contains("miniauction_uptime_seconds{node_id=\"n1\"}"));
    }
}
