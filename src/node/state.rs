//! Auction state machine
//!
//! One `StateMachine` per node guards the node's copy of the auction outcome
//! with a single mutex. Every read-modify-write happens under that lock and
//! nothing else (peer calls in particular) ever runs while it is held.

use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Snapshot of the auction outcome so far.
///
/// `winner_id` is empty while `highest_bid` is 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionState {
    pub highest_bid: i32,
    pub winner_id: String,
    pub is_over: bool,
    pub end_time: DateTime<Utc>,
}

/// Outcome status of a bid, mirrors the wire enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidStatus {
    Success,
    Fail,
}

impl std::fmt::Display for BidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BidStatus::Success => write!(f, "SUCCESS"),
            BidStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// Why a bid was turned down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Closed,
    TooLow { current: i32 },
    NotLeader { node_id: String },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Closed => write!(f, "Auction is over"),
            Rejection::TooLow { current } => write!(f, "Bid too low. Current: {}", current),
            Rejection::NotLeader { node_id } => write!(
                f,
                "Node {} is not the leader. Send the bid to the leader node",
                node_id
            ),
        }
    }
}

/// Result of a bid: business rejections are outcomes, never errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidOutcome {
    pub status: BidStatus,
    pub reason: String,
}

impl BidOutcome {
    pub fn accepted() -> Self {
        Self {
            status: BidStatus::Success,
            reason: String::new(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == BidStatus::Success
    }
}

impl From<Rejection> for BidOutcome {
    fn from(rejection: Rejection) -> Self {
        Self {
            status: BidStatus::Fail,
            reason: rejection.to_string(),
        }
    }
}

/// Winning pair pushed from leader to followers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncUpdate {
    pub highest_bid: i32,
    pub winner_id: String,
}

#[derive(Debug)]
struct Ledger {
    highest_bid: i32,
    winner_id: String,
    closed: bool,
}

impl Ledger {
    /// Latches `closed` once `now` is past the deadline; it never reopens.
    fn observe_clock(&mut self, end_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.closed |= now > end_time;
        self.closed
    }
}

/// Lock-guarded auction state owned by exactly one node
#[derive(Debug)]
pub struct StateMachine {
    end_time: DateTime<Utc>,
    ledger: Mutex<Ledger>,
}

impl StateMachine {
    /// Opens an auction that closes at `end_time`
    pub fn new(end_time: DateTime<Utc>) -> Self {
        Self {
            end_time,
            ledger: Mutex::new(Ledger {
                highest_bid: 0,
                winner_id: String::new(),
                closed: false,
            }),
        }
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    // A poisoned lock still holds a consistent ledger: every write is two
    // plain assignments with nothing in between that can panic.
    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn try_accept_bid(&self, bidder_id: &str, amount: i32) -> BidOutcome {
        self.try_accept_bid_at(bidder_id, amount, Utc::now())
    }

    /// Check-then-set of a bid as one critical section, evaluated at `now`.
    pub fn try_accept_bid_at(&self, bidder_id: &str, amount: i32, now: DateTime<Utc>) -> BidOutcome {
        let mut ledger = self.lock();
        if ledger.observe_clock(self.end_time, now) {
            return Rejection::Closed.into();
        }
        if amount <= ledger.highest_bid {
            return Rejection::TooLow {
                current: ledger.highest_bid,
            }
            .into();
        }
        ledger.highest_bid = amount;
        ledger.winner_id = bidder_id.to_string();
        BidOutcome::accepted()
    }

    /// Adopts the remote pair only if it is strictly higher.
    ///
    /// Returns whether local state changed. Applying the same or a smaller
    /// pair again is a no-op, so duplicate Sync delivery is harmless.
    pub fn merge_remote_state(&self, remote_highest_bid: i32, remote_winner_id: &str) -> bool {
        let mut ledger = self.lock();
        if remote_highest_bid > ledger.highest_bid {
            ledger.highest_bid = remote_highest_bid;
            ledger.winner_id = remote_winner_id.to_string();
            true
        } else {
            false
        }
    }

    pub fn snapshot(&self) -> AuctionState {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> AuctionState {
        let mut ledger = self.lock();
        let is_over = ledger.observe_clock(self.end_time, now);
        AuctionState {
            highest_bid: ledger.highest_bid,
            winner_id: ledger.winner_id.clone(),
            is_over,
            end_time: self.end_time,
        }
    }
}
