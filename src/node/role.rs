//! Leader/follower role tracking and bid admission

use crate::common::{FailoverPolicy, NodeRole};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What a node may do with a bid addressed to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Leader: validate and apply locally
    Accept,
    /// Strict follower: refuse and point the caller at the leader
    Reject,
    /// Promoting follower: try peers first, promote if none answers
    Forward,
}

pub struct RoleController {
    node_id: String,
    role: Mutex<NodeRole>,
    policy: FailoverPolicy,
}

impl RoleController {
    pub fn new(node_id: impl Into<String>, role: NodeRole, policy: FailoverPolicy) -> Self {
        Self {
            node_id: node_id.into(),
            role: Mutex::new(role),
            policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, NodeRole> {
        self.role.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_leader(&self) -> bool {
        matches!(*self.lock(), NodeRole::Leader)
    }

    pub fn role(&self) -> NodeRole {
        *self.lock()
    }

    pub fn policy(&self) -> FailoverPolicy {
        self.policy
    }

    pub fn admit(&self) -> Admission {
        match (self.role(), self.policy) {
            (NodeRole::Leader, _) => Admission::Accept,
            (NodeRole::Follower, FailoverPolicy::Strict) => Admission::Reject,
            (NodeRole::Follower, FailoverPolicy::Promote) => Admission::Forward,
        }
    }

    /// Self-promotion after every forward failed. No-op under `Strict`.
    ///
    /// Returns true if the role changed.
    pub fn promote(&self) -> bool {
        if self.policy != FailoverPolicy::Promote {
            return false;
        }
        let mut role = self.lock();
        if *role == NodeRole::Leader {
            return false;
        }
        *role = NodeRole::Leader;
        tracing::warn!(
            "Node {} promoted itself to leader: no peer accepted a forwarded bid",
            self.node_id
        );
        true
    }

    /// A Sync means some other node is leading. Under `Promote` we step down.
    ///
    /// Returns true if the role changed.
    pub fn observe_sync(&self) -> bool {
        if self.policy != FailoverPolicy::Promote {
            return false;
        }
        let mut role = self.lock();
        if *role == NodeRole::Follower {
            return false;
        }
        *role = NodeRole::Follower;
        tracing::info!("Node {} stepped down to follower after Sync", self.node_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_admission() {
        let leader = RoleController::new("1", NodeRole::Leader, FailoverPolicy::Strict);
        assert!(leader.is_leader());
        assert_eq!(leader.admit(), Admission::Accept);

        let follower = RoleController::new("2", NodeRole::Follower, FailoverPolicy::Strict);
        assert!(!follower.is_leader());
        assert_eq!(follower.admit(), Admission::Reject);
    }

    #[test]
    fn test_strict_roles_are_fixed() {
        let follower = RoleController::new("2", NodeRole::Follower, FailoverPolicy::Strict);
        assert!(!follower.promote());
        assert_eq!(follower.role(), NodeRole::Follower);

        let leader = RoleController::new("1", NodeRole::Leader, FailoverPolicy::Strict);
        assert!(!leader.observe_sync());
        assert_eq!(leader.role(), NodeRole::Leader);
    }

    #[test]
    fn test_promote_policy_transitions() {
        let node = RoleController::new("3", NodeRole::Follower, FailoverPolicy::Promote);
        assert_eq!(node.admit(), Admission::Forward);

        assert!(node.promote());
        assert!(!node.promote());
        assert_eq!(node.admit(), Admission::Accept);

        assert!(node.observe_sync());
        assert!(!node.observe_sync());
        assert_eq!(node.role(), NodeRole::Follower);
        assert_eq!(node.admit(), Admission::Forward);
    }
}
